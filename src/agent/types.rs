//! Typed operation requests, outputs, and agent errors.
//!
//! Requests mirror the host's declarative parameter schema: a tagged
//! `operation` selector with camelCase per-operation fields. Dispatch is a
//! closed enum instead of string matching; each variant carries exactly the
//! fields its operation needs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::types::{Account, Asset, BlockchainError};

/// Errors surfaced by the publish agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or malformed input, detected before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A domain rule rejected the request before any broadcast.
    #[error("{0}")]
    Domain(String),

    /// Failure at the blockchain client boundary.
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    /// The image host answered with a non-2xx status.
    #[error("Failed to upload image: {status}")]
    UploadRejected { status: String },

    /// Transport failure talking to the image host.
    #[error("Failed to upload image: {0}")]
    UploadTransport(#[from] reqwest::Error),

    /// An error annotated with the index of the failing input item.
    #[error("Item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<AgentError>,
    },
}

pub type AgentResult<T> = Result<T, AgentError>;

/// What to do when an item in a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole batch on the first failure.
    #[default]
    Abort,
    /// Capture the failure as an `{"error": ...}` record and continue.
    Continue,
}

/// Search mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBy {
    Tag,
    Author,
}

fn default_limit() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

/// One input item: an operation plus its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum OperationRequest {
    /// Publish a new post; the permlink is derived from the title.
    #[serde(rename_all = "camelCase")]
    Create {
        title: String,
        content: String,
        #[serde(default)]
        tags: String,
    },

    /// Overwrite an existing post identified by author and permlink.
    #[serde(rename_all = "camelCase")]
    Update {
        author: String,
        permlink: String,
        title: String,
        content: String,
        #[serde(default)]
        tags: String,
    },

    /// Fetch a post by author and permlink.
    #[serde(rename_all = "camelCase")]
    Get { author: String, permlink: String },

    /// Fetch account information; defaults to the credential account.
    #[serde(rename_all = "camelCase")]
    GetAccount {
        #[serde(default)]
        username: Option<String>,
    },

    /// List posts by tag (trending) or by author (blog).
    #[serde(rename_all = "camelCase")]
    Search {
        search_by: SearchBy,
        search_term: String,
        #[serde(default = "default_limit")]
        limit: u32,
    },

    /// Upload an image, signed with the posting key.
    #[serde(rename_all = "camelCase")]
    UploadImage {
        /// Image bytes, base64-encoded.
        data: String,
        #[serde(default)]
        file_name: Option<String>,
    },

    /// Claim pending reward balances.
    #[serde(rename_all = "camelCase")]
    ClaimRewardBalance {
        #[serde(default = "default_true")]
        claim_all_rewards: bool,
        #[serde(default)]
        reward_steem: Option<String>,
        #[serde(default)]
        reward_sbd: Option<String>,
        #[serde(default)]
        reward_vests: Option<String>,
    },
}

/// A post in the normalized shape shared by create, update, and get.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Transaction id, present when the record came from a broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(rename = "lastUpdate", skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    pub tags: Vec<String>,
}

/// A row in a search result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostSummary {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub created: String,
    pub tags: Vec<String>,
}

/// Account information in the shape the host expects.
#[derive(Debug, Clone, Serialize)]
pub struct AccountRecord {
    pub name: String,
    pub created: String,
    pub reputation: serde_json::Value,
    pub balance: Asset,
    pub sbd_balance: Asset,
    pub vesting_shares: Asset,
    pub post_count: u64,
    /// Parsed metadata; an empty object when absent or malformed.
    pub json_metadata: serde_json::Value,
    pub last_account_update: String,
    pub last_post: String,
    pub last_vote_time: String,
    pub recovery_account: String,
    pub memo_key: String,
    pub reward_steem_balance: Asset,
    pub reward_sbd_balance: Asset,
    pub reward_vesting_balance: Asset,
    pub reward_vesting_steem: Asset,
}

impl From<Account> for AccountRecord {
    fn from(account: Account) -> Self {
        let json_metadata = parse_metadata_object(&account.json_metadata);
        Self {
            name: account.name,
            created: account.created,
            reputation: account.reputation,
            balance: account.balance,
            sbd_balance: account.sbd_balance,
            vesting_shares: account.vesting_shares,
            post_count: account.post_count,
            json_metadata,
            last_account_update: account.last_account_update,
            last_post: account.last_post,
            last_vote_time: account.last_vote_time,
            recovery_account: account.recovery_account,
            memo_key: account.memo_key,
            reward_steem_balance: account.reward_steem_balance,
            reward_sbd_balance: account.reward_sbd_balance,
            reward_vesting_balance: account.reward_vesting_balance,
            reward_vesting_steem: account.reward_vesting_steem,
        }
    }
}

/// Result of a signed image upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadOutcome {
    pub url: String,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub signature: String,
}

/// Amounts claimed by a reward-balance operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimedAmounts {
    pub steem: Asset,
    pub sbd: Asset,
    pub vests: Asset,
}

/// Result of a claim-reward-balance operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub success: bool,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_num: Option<u64>,
    pub claimed: ClaimedAmounts,
}

/// Output of one successfully executed operation.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Post(PostRecord),
    Posts { posts: Vec<PostSummary> },
    Account(Box<AccountRecord>),
    Upload(UploadOutcome),
    Claim(ClaimOutcome),
}

/// Recover the tag list from a raw `json_metadata` string.
///
/// The field is author-controlled and frequently absent, empty, or not
/// valid JSON; all of those yield an empty list rather than an error.
pub fn parse_tags(json_metadata: &str) -> Vec<String> {
    serde_json::from_str::<serde_json::Value>(json_metadata)
        .ok()
        .and_then(|value| {
            value.get("tags").and_then(|tags| {
                tags.as_array().map(|tags| {
                    tags.iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect()
                })
            })
        })
        .unwrap_or_default()
}

/// Parse a raw `json_metadata` string into an object, defaulting to `{}`.
pub fn parse_metadata_object(json_metadata: &str) -> serde_json::Value {
    serde_json::from_str(json_metadata)
        .ok()
        .filter(serde_json::Value::is_object)
        .unwrap_or_else(|| serde_json::json!({}))
}

/// Split a comma-separated tag string, trimming and dropping empties.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagging() {
        let raw = r#"{
            "operation": "search",
            "searchBy": "author",
            "searchTerm": "alice"
        }"#;
        let request: OperationRequest = serde_json::from_str(raw).unwrap();
        match request {
            OperationRequest::Search { search_by, search_term, limit } => {
                assert_eq!(search_by, SearchBy::Author);
                assert_eq!(search_term, "alice");
                assert_eq!(limit, 50);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_claim_request_defaults() {
        let request: OperationRequest =
            serde_json::from_str(r#"{"operation": "claimRewardBalance"}"#).unwrap();
        match request {
            OperationRequest::ClaimRewardBalance { claim_all_rewards, reward_steem, .. } => {
                assert!(claim_all_rewards);
                assert!(reward_steem.is_none());
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_get_account_tag_is_camel_case() {
        let request: OperationRequest =
            serde_json::from_str(r#"{"operation": "getAccount", "username": "bob"}"#).unwrap();
        assert!(matches!(
            request,
            OperationRequest::GetAccount { username: Some(ref u) } if u == "bob"
        ));
    }

    #[test]
    fn test_parse_tags_defensive() {
        assert_eq!(parse_tags(r#"{"tags":["a","b"]}"#), vec!["a", "b"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags("not json at all {{{").is_empty());
        assert!(parse_tags(r#"{"app":"x"}"#).is_empty());
        assert!(parse_tags(r#"{"tags":"oops"}"#).is_empty());
        // Non-string entries are dropped, not crashed on
        assert_eq!(parse_tags(r#"{"tags":["a",7]}"#), vec!["a"]);
    }

    #[test]
    fn test_parse_metadata_object_defensive() {
        assert_eq!(parse_metadata_object("[1,2]"), serde_json::json!({}));
        assert_eq!(parse_metadata_object("garbage"), serde_json::json!({}));
        assert_eq!(
            parse_metadata_object(r#"{"profile":{}}"#),
            serde_json::json!({"profile":{}})
        );
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("intro, test ,rust"), vec!["intro", "test", "rust"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ,").is_empty());
    }

    #[test]
    fn test_post_record_serialization_skips_absent_fields() {
        let record = PostRecord {
            id: None,
            parent_author: String::new(),
            parent_permlink: "steemit".to_string(),
            author: "alice".to_string(),
            permlink: "hello".to_string(),
            title: "Hello".to_string(),
            content: "body".to_string(),
            created: None,
            last_update: None,
            tags: Vec::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("created").is_none());
        assert_eq!(json["tags"], serde_json::json!([]));
    }
}
