//! Completion calls with bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::openai::{self, Role, Turn};

/// The one completion operation the gateway needs from a client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, openai::Error>;
}

#[async_trait]
impl CompletionClient for openai::Client {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, openai::Error> {
        openai::Client::chat(self, model, turns).await
    }
}

/// Obtains completions for finished turn sequences, retrying failures the
/// service itself reported.
pub struct CompletionGateway {
    pub client: Box<dyn CompletionClient>,
    pub model: String,
    /// System turn content, prepended to every request.
    pub persona: String,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Base wait between attempts; waits grow as unit, 2x unit, 4x unit, ...
    pub backoff_unit: Duration,
}

impl CompletionGateway {
    /// Request a completion for `turns`, which must not include the
    /// persona turn; it is prepended here into a fresh request.
    ///
    /// Service-reported errors are retried up to `max_retries` times with
    /// the same request; once attempts run out, the error's description
    /// becomes the returned reply text. Any other failure is handed back
    /// to the caller untouched, without retries.
    pub async fn complete(&self, turns: &[Turn]) -> Result<String, openai::Error> {
        let mut request = Vec::with_capacity(turns.len() + 1);
        request.push(Turn { role: Role::System, content: self.persona.clone() });
        request.extend_from_slice(turns);

        let mut attempt = 0;
        loop {
            match self.client.chat(&self.model, &request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_service_error() => {
                    if attempt >= self.max_retries {
                        warn!("Completion failed after {} attempts: {e}", attempt + 1);
                        return Ok(e.to_string());
                    }
                    let wait = self.backoff_unit * 2u32.saturating_pow(attempt);
                    warn!("Completion attempt {} failed: {e}, retrying in {wait:?}", attempt + 1);
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
