//! Trait definitions for the command client.

use async_trait::async_trait;

use super::types::CommandRequest;

/// Client for the external knowledge-workspace service.
///
/// Every call returns the raw text the service printed. An empty string means
/// "no signal": the call timed out, could not be launched, or printed nothing.
/// Implementations apply their cool-down before returning, so consecutive calls
/// from one worker are always spaced.
#[async_trait]
pub trait CommandClient: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Runs one action and returns its output text.
    async fn execute(&self, request: CommandRequest) -> String;
}
