//! The publish agent.
//!
//! # Data Flow
//! ```text
//! Typed operation requests (host schema shape)
//!     → engine.rs (dispatch, one handler per operation)
//!     → permlink.rs (identifier derivation for new posts)
//!     → blockchain client boundary (reads + signed broadcasts)
//!     → upload.rs (signed image upload over HTTP)
//! ```
//!
//! Items are processed sequentially with one remote call in flight; the
//! caller picks whether a failing item aborts the batch or is captured as
//! an error record.

pub mod engine;
pub mod permlink;
pub mod types;
pub mod upload;

pub use engine::PublishAgent;
pub use permlink::PermlinkStrategy;
pub use types::{AgentError, AgentResult, ErrorPolicy, OperationOutput, OperationRequest};
