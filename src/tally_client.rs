use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::query::{Pagination, QueryVariables, request_body};
use crate::scraper::Proposal;

/// Outcome of one page request. A non-200 status is recoverable and carries
/// the response body for the error log; transport and decode failures
/// propagate as errors instead.
#[derive(Debug)]
pub enum PageFetch {
    Proposals(Vec<Proposal>),
    Failed { status: u16, body: String },
}

pub trait ProposalSource: Send + Sync {
    fn fetch_page<'a>(&'a self, window: Pagination) -> BoxFuture<'a, Result<PageFetch>>;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: ProposalsData,
}

#[derive(Deserialize)]
struct ProposalsData {
    proposals: Vec<Proposal>,
}

pub struct TallyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    variables: QueryVariables,
}

impl TallyClient {
    /// The API key is passed in explicitly so tests and callers can inject
    /// their own instead of reading the environment here.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        TallyClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            variables: QueryVariables::for_run(),
        }
    }
}

impl ProposalSource for TallyClient {
    fn fetch_page<'a>(&'a self, window: Pagination) -> BoxFuture<'a, Result<PageFetch>> {
        async move {
            let variables = self.variables.with_pagination(window);
            let response = self
                .http
                .post(&self.endpoint)
                .header("Api-key", &self.api_key)
                .json(&request_body(&variables))
                .send()
                .await?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                return Ok(PageFetch::Failed {
                    status: status.as_u16(),
                    body,
                });
            }

            let decoded: GraphQlResponse = response.json().await?;
            Ok(PageFetch::Proposals(decoded.data.proposals))
        }
        .boxed()
    }
}
