use serde::Serialize;
use serde_json::{Value, json};

pub const GRAPHQL_URL: &str = "https://api.tally.xyz/query";

const CHAIN_ID: &str = "eip155:42161";
const GOVERNANCE_IDS: [&str; 2] = [
    "eip155:42161:0xf07DeD9dC292157749B6Fd268E37DF6EA38395B9",
    "eip155:42161:0x789fC99093B09aD01C34DC7251D0C89ce743e5a4",
];

/// The full GovernanceProposals document. Some selections (statusChanges,
/// block, governance, votes behind the skip flag) are requested but not
/// flattened into the export; the request shape is part of the API contract.
pub const PROPOSALS_QUERY: &str = r#"
query GovernanceProposals($sort: ProposalSort, $chainId: ChainID!, $pagination: Pagination, $governanceIds: [AccountID!], $proposerIds: [AccountID!], $voters: [Address!], $votersPagination: Pagination, $includeVotes: Boolean!) {
  proposals(
    sort: $sort
    chainId: $chainId
    pagination: $pagination
    governanceIds: $governanceIds
    proposerIds: $proposerIds
  ) {
    id
    title
    description
    start {
      ... on Block {
        timestamp
      }
    }
    end {
      ... on Block {
        timestamp
      }
    }
    statusChanges {
      type
    }
    block {
      ... on Block {
        timestamp
      }
    }
    voteStats {
      votes
      weight
      support
      percent
    }
    votes(voters: $voters, pagination: $votersPagination) @include(if: $includeVotes) {
      support
      voter {
        picture
        address
        identities {
          twitter
        }
      }
    }
    governance {
      id
      quorum
      name
      timelockId
      organization {
        metadata {
          icon
        }
      }
      tokens {
        decimals
      }
    }
    tallyProposal {
      id
      createdAt
      status
    }
  }
}
"#;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct ProposalSort {
    pub field: &'static str,
    pub order: &'static str,
}

/// Variables for one GovernanceProposals request. Everything except
/// `pagination` is fixed for the whole run.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    pub sort: ProposalSort,
    pub chain_id: String,
    pub governance_ids: Vec<String>,
    pub voters_pagination: Pagination,
    pub include_votes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl QueryVariables {
    pub fn for_run() -> Self {
        QueryVariables {
            sort: ProposalSort {
                field: "START_BLOCK",
                order: "DESC",
            },
            chain_id: CHAIN_ID.to_string(),
            governance_ids: GOVERNANCE_IDS.iter().map(|id| id.to_string()).collect(),
            voters_pagination: Pagination {
                limit: 1,
                offset: 0,
            },
            include_votes: false,
            pagination: None,
        }
    }

    pub fn with_pagination(&self, window: Pagination) -> Self {
        QueryVariables {
            pagination: Some(window),
            ..self.clone()
        }
    }
}

pub fn request_body(variables: &QueryVariables) -> Value {
    json!({
        "query": PROPOSALS_QUERY,
        "variables": variables,
    })
}
