//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → read-only for the duration of a batch
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Credentials never live in the config file; they come from the
//!   environment (see `blockchain::wallet`)

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AgentConfig;
pub use schema::ApiConfig;
pub use schema::ImageHostConfig;
pub use schema::PublishConfig;
