//! Steemit publish agent library.

pub mod agent;
pub mod blockchain;
pub mod config;

pub use agent::{ErrorPolicy, OperationRequest, PublishAgent};
pub use blockchain::{CondenserClient, SteemApi, Wallet};
pub use config::AgentConfig;
