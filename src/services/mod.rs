mod ingest;
mod query;

pub use ingest::Ingestor;
pub use query::{clamp_paging, QueryService};
