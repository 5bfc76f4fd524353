use feed_archive::models::QueryRequest;
use feed_archive::{logging, App, Config, RunOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    logging::init(&config.log_level);

    // Check for --once flag (single ingestion, then exit)
    let args: Vec<String> = std::env::args().collect();
    let run_once = args.len() >= 2 && args[1] == "--once";

    let mut app = App::new(&config).await?;

    // --query START END [PAGE] [PAGE_SIZE] prints the response envelope as JSON
    if args.len() >= 2 && args[1] == "--query" {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let mut request = QueryRequest {
            start_time: arg(2),
            end_time: arg(3),
            ..Default::default()
        };
        if let Some(page) = args.get(4) {
            request.page = page.parse()?;
        }
        if let Some(page_size) = args.get(5) {
            request.page_size = page_size.parse()?;
        }
        let response = app.query_request(&request).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if run_once {
        return match app.ingest().await {
            RunOutcome::Completed(summary) => {
                println!(
                    "Ingested {} posts ({} new, {} updated)",
                    summary.total(),
                    summary.inserted,
                    summary.updated
                );
                Ok(())
            }
            RunOutcome::Failed(e) => Err(anyhow::anyhow!("ingestion failed: {}", e)),
            RunOutcome::Skipped => Err(anyhow::anyhow!("ingestion already in progress")),
        };
    }

    tracing::info!(
        "Archiving {} into {} every {} seconds",
        config.feed_url,
        config.db_path,
        config.sync_interval_secs
    );
    app.start_scheduler();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    app.shutdown().await;

    Ok(())
}
