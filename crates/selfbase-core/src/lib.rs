//! # selfbase-core
//!
//! Configuration and SQL identifier handling shared by every selfbase crate.

pub mod config;
pub mod ident;

pub use config::{
    ConfigError, ConnectionPoolConfig, FunctionsConfig, GatewayKind, McpConfig, SelfbaseConfig,
    SqlConfig, Transport,
};
pub use ident::{
    DEFAULT_BRANCH, IdentError, branch_ident, is_reserved_schema, quote_ident, quote_literal,
    sanitize_identifier,
};
