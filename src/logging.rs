use tracing::Level;
use tracing_subscriber::EnvFilter;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `level` applies only when `directives` set no level of their own.
fn build_filter(level: &str, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .parse_lossy(directives)
}

/// Log to stderr at `level`; `RUST_LOG`, when set, takes precedence.
pub fn init(level: &str) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level, &directives))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
