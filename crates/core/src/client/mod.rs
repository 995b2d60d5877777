//! External command client.
//!
//! The knowledge-workspace service is only reachable through a command-line
//! client that prints unstructured text. This module wraps it behind the
//! [`CommandClient`] trait:
//!
//! - Per-call timeout; timeouts and launch failures yield an empty string
//! - On a failed exit with empty stdout, stderr is returned instead
//! - A fixed cool-down after every call to respect rate limits
//! - Optional append-only command log per topic

mod cli;
mod config;
mod log;
mod traits;
mod types;

pub use cli::CliClient;
pub use config::ClientConfig;
pub use log::CommandLog;
pub use traits::CommandClient;
pub use types::{CommandRequest, DEFAULT_TIMEOUT};
