//! Condenser API wire types and error definitions.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur at the blockchain client boundary.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Transport-level failure (connect error, all endpoints down).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node accepted the request but rejected it (invalid signature,
    /// duplicate permlink, expired transaction, ...). Message is verbatim.
    #[error("Remote rejection: {0}")]
    Remote(String),

    /// Invalid posting key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// No account exists with the given name.
    #[error("Account '{0}' not found")]
    AccountNotFound(String),

    /// Response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// An amount with a fixed-precision decimal and a symbol, e.g. `1.000 STEEM`.
///
/// The wire form in condenser JSON is the string representation; the binary
/// form (used for signing digests) is little-endian i64 amount, u8 precision
/// and a NUL-padded 7-byte symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    amount: i64,
    precision: u8,
    symbol: String,
}

impl Asset {
    /// Build an asset from an integer amount in the symbol's smallest unit.
    pub fn new(amount: i64, precision: u8, symbol: &str) -> Self {
        Self {
            amount,
            precision,
            symbol: symbol.to_string(),
        }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Graphene binary form for transaction serialization.
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.push(self.precision);
        let mut symbol = [0u8; 7];
        let bytes = self.symbol.as_bytes();
        symbol[..bytes.len().min(7)].copy_from_slice(&bytes[..bytes.len().min(7)]);
        buf.extend_from_slice(&symbol);
    }
}

impl FromStr for Asset {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || BlockchainError::Malformed(format!("invalid asset '{}'", s));

        let mut parts = s.split_whitespace();
        let number = parts.next().ok_or_else(err)?;
        let symbol = parts.next().ok_or_else(err)?;
        if parts.next().is_some() || symbol.is_empty() || symbol.len() > 7 {
            return Err(err());
        }

        let (integral, fractional) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        let negative = integral.starts_with('-');
        let integral = integral.strip_prefix('-').unwrap_or(integral);
        if integral.is_empty()
            || !integral.chars().all(|c| c.is_ascii_digit())
            || !fractional.chars().all(|c| c.is_ascii_digit())
            || fractional.len() > 12
        {
            return Err(err());
        }

        let precision = fractional.len() as u8;
        let mut amount: i64 = integral.parse().map_err(|_| err())?;
        for c in fractional.chars() {
            amount = amount
                .checked_mul(10)
                .and_then(|a| a.checked_add((c as u8 - b'0') as i64))
                .ok_or_else(err)?;
        }
        if negative {
            amount = -amount;
        }

        Ok(Self {
            amount,
            precision,
            symbol: symbol.to_string(),
        })
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let divisor = 10i64.pow(self.precision as u32) as u64;
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if self.precision == 0 {
            return write!(f, "{}{} {}", sign, magnitude, self.symbol);
        }
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            magnitude / divisor,
            magnitude % divisor,
            self.symbol,
            width = self.precision as usize
        )
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A `comment` operation payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommentOperation {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

/// A `claim_reward_balance` operation payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimRewardBalanceOperation {
    pub account: String,
    pub reward_steem: Asset,
    pub reward_sbd: Asset,
    pub reward_vests: Asset,
}

/// Closed set of operations this agent can broadcast.
///
/// Serializes to the condenser wire form `["<name>", { ...payload }]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Comment(CommentOperation),
    ClaimRewardBalance(ClaimRewardBalanceOperation),
}

impl Operation {
    /// Operation name on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Operation::Comment(_) => "comment",
            Operation::ClaimRewardBalance(_) => "claim_reward_balance",
        }
    }

    /// Numeric operation id in the graphene binary serialization.
    pub fn wire_id(&self) -> u64 {
        match self {
            Operation::Comment(_) => 1,
            Operation::ClaimRewardBalance(_) => 39,
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.wire_name())?;
        match self {
            Operation::Comment(op) => tuple.serialize_element(op)?,
            Operation::ClaimRewardBalance(op) => tuple.serialize_element(op)?,
        }
        tuple.end()
    }
}

/// Feed a discussion listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscussionSort {
    /// Trending feed, filtered by tag.
    Trending,
    /// An author's blog feed.
    Blog,
}

impl DiscussionSort {
    pub fn method(&self) -> &'static str {
        match self {
            DiscussionSort::Trending => "condenser_api.get_discussions_by_trending",
            DiscussionSort::Blog => "condenser_api.get_discussions_by_blog",
        }
    }
}

/// A post as returned by `get_content` and the discussion listings.
///
/// Only the fields the agent reshapes are kept; unknown fields in the
/// response are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Discussion {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub created: String,
    pub last_update: String,
    /// Raw metadata string; may be empty or malformed JSON.
    pub json_metadata: String,
}

/// An account as returned by `get_accounts`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub reputation: serde_json::Value,
    pub balance: Asset,
    pub sbd_balance: Asset,
    pub vesting_shares: Asset,
    #[serde(default)]
    pub post_count: u64,
    /// Raw metadata string; may be empty or malformed JSON.
    #[serde(default)]
    pub json_metadata: String,
    #[serde(default)]
    pub last_account_update: String,
    #[serde(default)]
    pub last_post: String,
    #[serde(default)]
    pub last_vote_time: String,
    #[serde(default)]
    pub recovery_account: String,
    #[serde(default)]
    pub memo_key: String,
    pub reward_steem_balance: Asset,
    pub reward_sbd_balance: Asset,
    pub reward_vesting_balance: Asset,
    pub reward_vesting_steem: Asset,
}

/// Chain head state needed to reference a transaction (TaPoS).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: String,
    /// Chain head time, `%Y-%m-%dT%H:%M:%S`.
    pub time: String,
}

/// Result of a synchronous broadcast.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastResult {
    /// Transaction id.
    pub id: String,
    /// Block the transaction was included in, when the node reports it.
    pub block_num: Option<u64>,
}
