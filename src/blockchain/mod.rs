//! Blockchain client subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variables (account name, posting key)
//!     → wallet.rs (WIF decoding, canonical signing)
//!     → client.rs (JSON-RPC with failover and timeouts)
//!     → transaction.rs (assemble, serialize, sign, broadcast)
//! ```
//!
//! # Security Constraints
//! - Posting keys ONLY from environment variables
//! - Never log keys or signing digests
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{CondenserClient, SteemApi};
pub use types::{Asset, BlockchainError, BlockchainResult, Operation};
pub use wallet::Wallet;
