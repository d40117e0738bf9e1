pub mod aggregator;
pub mod ingest;
