use anyhow::Result;
use csv::ReaderBuilder;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Value, json};

use tally_exporter::exporter::{Exporter, write_csv, write_json};
use tally_exporter::query::Pagination;
use tally_exporter::scraper::{Proposal, ProposalRow};
use tally_exporter::tally_client::{PageFetch, ProposalSource};

enum Page {
    Proposals(Vec<Value>),
    Failed { status: u16, body: String },
}

/// Serves canned pages indexed by offset / limit.
struct FakeSource {
    pages: Vec<Page>,
}

impl ProposalSource for FakeSource {
    fn fetch_page<'a>(&'a self, window: Pagination) -> BoxFuture<'a, Result<PageFetch>> {
        let index = (window.offset / window.limit) as usize;
        async move {
            match &self.pages[index] {
                Page::Proposals(raw) => {
                    let proposals = raw
                        .iter()
                        .cloned()
                        .map(serde_json::from_value::<Proposal>)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(PageFetch::Proposals(proposals))
                }
                Page::Failed { status, body } => Ok(PageFetch::Failed {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }
        .boxed()
    }
}

fn proposal_json(id: u64) -> Value {
    json!({
        "id": format!("{id}"),
        "title": format!("Proposal {id}"),
        "description": "Allocate treasury funds — résumé in thread",
        "start": { "timestamp": 1705314600 },
        "end": { "timestamp": "2024-01-22T10:30:00Z" },
        "statusChanges": [{ "type": "ACTIVE" }],
        "voteStats": [
            { "support": "FOR", "votes": "12", "weight": "3400", "percent": 71.1 },
            { "support": "AGAINST", "votes": "4", "weight": "1200", "percent": 25.1 },
            { "support": "ABSTAIN", "votes": "1", "weight": "180", "percent": 3.8 }
        ],
        "governance": { "id": "eip155:42161:0xf07D", "name": "Test Governance" },
        "tallyProposal": { "id": id, "createdAt": "2024-01-10T00:00:00Z", "status": "EXECUTED" }
    })
}

fn page_of(ids: std::ops::Range<u64>) -> Page {
    Page::Proposals(ids.map(proposal_json).collect())
}

#[tokio::test]
async fn two_pages_export_all_rows_in_order() {
    let source = FakeSource {
        pages: vec![page_of(0..20), page_of(20..27)],
    };
    let rows = Exporter::with_window(source, 27, 20).run().await.unwrap();

    assert_eq!(rows.len(), 27);
    for (index, row) in rows.iter().enumerate() {
        assert_eq!(row.id, json!(format!("{index}")));
    }
    assert_eq!(rows[0].start_timestamp, "2024-01-15 10:30:00");
    assert_eq!(rows[0].end_timestamp, "2024-01-22 10:30:00");
}

#[tokio::test]
async fn failed_page_is_skipped_without_halting() {
    let source = FakeSource {
        pages: vec![
            page_of(0..20),
            Page::Failed {
                status: 500,
                body: "internal error".to_string(),
            },
        ],
    };
    let rows = Exporter::with_window(source, 27, 20).run().await.unwrap();

    assert_eq!(rows.len(), 20);
    assert_eq!(rows.last().unwrap().id, json!("19"));
}

#[tokio::test]
async fn malformed_proposal_aborts_the_run() {
    let mut broken = proposal_json(3);
    broken["start"]["timestamp"] = json!("not-a-timestamp");
    let source = FakeSource {
        pages: vec![Page::Proposals(vec![proposal_json(0), broken])],
    };

    assert!(Exporter::with_window(source, 2, 20).run().await.is_err());
}

#[tokio::test]
async fn json_and_csv_outputs_agree() {
    let source = FakeSource {
        pages: vec![page_of(0..20), page_of(20..27)],
    };
    let rows = Exporter::with_window(source, 27, 20).run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("proposals.json");
    let csv_path = dir.path().join("proposals.csv");
    write_json(&rows, &json_path).unwrap();
    write_csv(&rows, &csv_path).unwrap();

    let json_content = std::fs::read_to_string(&json_path).unwrap();
    // Non-ASCII stays literal in the JSON output
    assert!(json_content.contains("résumé"));
    let parsed: Vec<Value> = serde_json::from_str(&json_content).unwrap();
    assert_eq!(parsed.len(), 27);
    for object in &parsed {
        assert_eq!(object.as_object().unwrap().len(), 15);
    }

    let csv_content = std::fs::read_to_string(&csv_path).unwrap();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_content.as_bytes());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, ProposalRow::headers());
    // Parsed JSON objects hold keys in sorted order, so compare as sets
    let mut json_keys: Vec<String> = parsed[0].as_object().unwrap().keys().cloned().collect();
    let mut expected: Vec<String> = headers.clone();
    json_keys.sort();
    expected.sort();
    assert_eq!(json_keys, expected);

    let records: Vec<_> = rdr.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), parsed.len());
    assert_eq!(&records[0][0], "0");
    assert_eq!(&records[0][5], "12");
    assert_eq!(&records[26][0], "26");
}

#[tokio::test]
async fn empty_export_cannot_write_csv() {
    let source = FakeSource {
        pages: vec![Page::Failed {
            status: 502,
            body: "bad gateway".to_string(),
        }],
    };
    let rows = Exporter::with_window(source, 20, 20).run().await.unwrap();
    assert!(rows.is_empty());

    let dir = tempfile::tempdir().unwrap();
    assert!(write_csv(&rows, dir.path().join("empty.csv")).is_err());
    // The JSON side still produces an empty array
    let json_path = dir.path().join("empty.json");
    write_json(&rows, &json_path).unwrap();
    assert_eq!(std::fs::read_to_string(&json_path).unwrap(), "[]");
}
