use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Result, anyhow};

use crate::query::Pagination;
use crate::scraper::{ProposalRow, flatten_proposal};
use crate::tally_client::{PageFetch, ProposalSource};

// The record count is assumed known ahead of time; there is no has-more
// detection in the API response.
pub const TOTAL_RECORDS: u64 = 27;
pub const LIMIT_PER_REQUEST: u64 = 20;

pub const JSON_FILE_PATH: &str = "tally_proposals_text_data.json";
pub const CSV_FILE_PATH: &str = "tally_proposals_text_data.csv";

/// Pages through the proposal source and flattens every proposal into the
/// export row shape, preserving page order then intra-page order.
pub struct Exporter<S> {
    source: S,
    total_records: u64,
    limit_per_request: u64,
}

impl<S: ProposalSource> Exporter<S> {
    pub fn new(source: S) -> Self {
        Self::with_window(source, TOTAL_RECORDS, LIMIT_PER_REQUEST)
    }

    pub fn with_window(source: S, total_records: u64, limit_per_request: u64) -> Self {
        Exporter {
            source,
            total_records,
            limit_per_request,
        }
    }

    /// A page that comes back with a non-200 status is logged and skipped;
    /// the remaining pages are still fetched. Everything else is fatal.
    pub async fn run(&self) -> Result<Vec<ProposalRow>> {
        let mut rows = Vec::new();
        let mut offset = 0;

        while offset < self.total_records {
            let window = Pagination {
                limit: self.limit_per_request,
                offset,
            };
            match self.source.fetch_page(window).await? {
                PageFetch::Proposals(proposals) => {
                    for proposal in &proposals {
                        rows.push(flatten_proposal(proposal)?);
                    }
                }
                PageFetch::Failed { status, body } => {
                    eprintln!("Error: {}, {}", status, body);
                }
            }
            offset += self.limit_per_request;
        }

        Ok(rows)
    }
}

/// 2-space-indented JSON array; non-ASCII characters stay literal.
pub fn write_json(rows: &[ProposalRow], path: impl AsRef<Path>) -> Result<()> {
    let serialized = serde_json::to_string_pretty(rows)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

pub fn write_csv(rows: &[ProposalRow], path: impl AsRef<Path>) -> Result<()> {
    if rows.is_empty() {
        return Err(anyhow!(
            "no rows to export, cannot derive the CSV header from an empty collection"
        ));
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(ProposalRow::headers())?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}
