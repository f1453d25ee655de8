pub mod exporter;
pub mod query;
pub mod scraper;
pub mod tally_client;
