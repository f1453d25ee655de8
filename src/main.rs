use anyhow::{Context, Result};
use chrono::Local;

use tally_exporter::exporter::{CSV_FILE_PATH, Exporter, JSON_FILE_PATH, write_csv, write_json};
use tally_exporter::query::GRAPHQL_URL;
use tally_exporter::tally_client::TallyClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let api_key = std::env::var("API_KEY").context("API_KEY is not set")?;

    println!("Fetching and processing data at {}", Local::now());

    let exporter = Exporter::new(TallyClient::new(GRAPHQL_URL, api_key));
    let rows = exporter.run().await?;

    write_json(&rows, JSON_FILE_PATH)?;
    write_csv(&rows, CSV_FILE_PATH)?;

    println!(
        "Data has been successfully saved to {} and {}",
        JSON_FILE_PATH, CSV_FILE_PATH
    );
    Ok(())
}
