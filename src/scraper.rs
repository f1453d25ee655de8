use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUPPORT_FOR: &str = "FOR";
pub const SUPPORT_AGAINST: &str = "AGAINST";
pub const SUPPORT_ABSTAIN: &str = "ABSTAIN";

/// A proposal as the Tally API returns it. Sub-objects the export does not
/// consume stay untyped.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Proposal {
    pub id: Value,
    pub title: String,
    pub description: String,
    pub start: TimestampBlock,
    pub end: TimestampBlock,
    #[serde(rename = "statusChanges", default)]
    pub status_changes: Vec<StatusChange>,
    #[serde(default)]
    pub block: Value,
    #[serde(rename = "voteStats", default)]
    pub vote_stats: Vec<VoteStats>,
    #[serde(default)]
    pub governance: Value,
    #[serde(rename = "tallyProposal")]
    pub tally_proposal: TallyProposal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StatusChange {
    #[serde(rename = "type")]
    pub status_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TimestampBlock {
    pub timestamp: BlockTimestamp,
}

/// Block timestamps arrive either as epoch seconds or as an ISO-8601 UTC
/// string; both normalize to epoch seconds.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum BlockTimestamp {
    Epoch(i64),
    Iso(String),
}

impl BlockTimestamp {
    pub fn epoch_seconds(&self) -> Result<i64> {
        match self {
            BlockTimestamp::Epoch(secs) => Ok(*secs),
            BlockTimestamp::Iso(raw) => {
                let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
                    .with_context(|| format!("invalid UTC timestamp string: {raw}"))?;
                Ok(parsed.and_utc().timestamp())
            }
        }
    }
}

pub fn format_utc_timestamp(secs: i64) -> Result<String> {
    let datetime_utc = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| anyhow!("timestamp out of range: {secs}"))?;
    Ok(datetime_utc.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Per-support vote aggregates. The API serves votes/weight as strings and
/// percent as a number; the values pass through to the outputs untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VoteStats {
    pub support: String,
    #[serde(default)]
    pub votes: Option<Value>,
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub percent: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TallyProposal {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub created_at: Value,
    pub status: String,
}

/// The flattened export shape: one row per proposal, scalar fields only.
/// Field order here fixes both the JSON key order and the CSV column order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProposalRow {
    pub id: Value,
    pub title: String,
    pub description: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub for_votes: Value,
    pub for_vote_weightage: Value,
    pub for_percentage: Value,
    pub against_votes: Value,
    pub against_vote_weightage: Value,
    pub against_percentage: Value,
    pub abstain_votes: Value,
    pub abstain_vote_weightage: Value,
    pub abstain_percentage: Value,
    pub tallyproposal_status: String,
}

impl ProposalRow {
    pub fn headers() -> Vec<&'static str> {
        vec![
            "id",
            "title",
            "description",
            "start_timestamp",
            "end_timestamp",
            "for_votes",
            "for_vote_weightage",
            "for_percentage",
            "against_votes",
            "against_vote_weightage",
            "against_percentage",
            "abstain_votes",
            "abstain_vote_weightage",
            "abstain_percentage",
            "tallyproposal_status",
        ]
    }

    pub fn to_record(&self) -> Vec<String> {
        vec![
            csv_field(&self.id),
            self.title.clone(),
            self.description.clone(),
            self.start_timestamp.clone(),
            self.end_timestamp.clone(),
            csv_field(&self.for_votes),
            csv_field(&self.for_vote_weightage),
            csv_field(&self.for_percentage),
            csv_field(&self.against_votes),
            csv_field(&self.against_vote_weightage),
            csv_field(&self.against_percentage),
            csv_field(&self.abstain_votes),
            csv_field(&self.abstain_vote_weightage),
            csv_field(&self.abstain_percentage),
            self.tallyproposal_status.clone(),
        ]
    }
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn support_values(stats: &[VoteStats], support: &str) -> (Value, Value, Value) {
    match stats.iter().find(|entry| entry.support == support) {
        Some(entry) => (
            stat_or_zero(&entry.votes),
            stat_or_zero(&entry.weight),
            stat_or_zero(&entry.percent),
        ),
        None => (Value::from(0), Value::from(0), Value::from(0)),
    }
}

fn stat_or_zero(value: &Option<Value>) -> Value {
    match value {
        Some(v) if !v.is_null() => v.clone(),
        _ => Value::from(0),
    }
}

pub fn flatten_proposal(proposal: &Proposal) -> Result<ProposalRow> {
    let start_secs = proposal.start.timestamp.epoch_seconds()?;
    let end_secs = proposal.end.timestamp.epoch_seconds()?;

    let (for_votes, for_weight, for_percent) = support_values(&proposal.vote_stats, SUPPORT_FOR);
    let (against_votes, against_weight, against_percent) =
        support_values(&proposal.vote_stats, SUPPORT_AGAINST);
    let (abstain_votes, abstain_weight, abstain_percent) =
        support_values(&proposal.vote_stats, SUPPORT_ABSTAIN);

    Ok(ProposalRow {
        id: proposal.id.clone(),
        title: proposal.title.clone(),
        description: proposal.description.clone(),
        start_timestamp: format_utc_timestamp(start_secs)?,
        end_timestamp: format_utc_timestamp(end_secs)?,
        for_votes,
        for_vote_weightage: for_weight,
        for_percentage: for_percent,
        against_votes,
        against_vote_weightage: against_weight,
        against_percentage: against_percent,
        abstain_votes,
        abstain_vote_weightage: abstain_weight,
        abstain_percentage: abstain_percent,
        tallyproposal_status: proposal.tally_proposal.status.clone(),
    })
}
