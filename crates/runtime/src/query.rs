//! The caller boundary: one prompt in, one user-facing string out.

use crate::agent::{Agent, DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT, Outcome};
use crate::prompt::system_instruction;
use crate::providers::{Provider, ProviderBackend};
use crate::tools::MarketTools;
use crate::{Error, Result};
use market::AlphaVantageClient;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything one query needs. Keys live here rather than in process state,
/// so concurrent queries with different keys never interfere.
#[derive(Clone)]
pub struct QueryConfig {
    /// Provider name, e.g. `"Gemini"`; parsed case-insensitively.
    pub provider: String,
    pub provider_key: Option<String>,
    pub data_api_key: Option<String>,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    pub max_turns: usize,
    pub tool_timeout: Duration,
    /// Supplementary text appended to the system instruction.
    pub context: String,
}

impl QueryConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            provider_key: None,
            data_api_key: None,
            model: None,
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            context: String::new(),
        }
    }
}

impl std::fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryConfig")
            .field("provider", &self.provider)
            .field("provider_key", &self.provider_key.as_ref().map(|_| "<redacted>"))
            .field("data_api_key", &self.data_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_turns", &self.max_turns)
            .field("tool_timeout", &self.tool_timeout)
            .finish_non_exhaustive()
    }
}

fn present(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

/// Answer `prompt`, returning either the model's answer or an error message.
pub async fn run_query(prompt: &str, config: &QueryConfig) -> String {
    run_query_cancellable(prompt, config, &CancellationToken::new()).await
}

/// [`run_query`] with an external cancellation token.
pub async fn run_query_cancellable(
    prompt: &str,
    config: &QueryConfig,
    cancel: &CancellationToken,
) -> String {
    match try_run_query(prompt, config, cancel).await {
        Ok(outcome) => outcome.into_message(),
        Err(err) => {
            warn!(error = %err, "query failed");
            err.to_string()
        }
    }
}

/// Validate the configuration, then run the loop.
///
/// Configuration problems are reported before any network activity.
pub async fn try_run_query(
    prompt: &str,
    config: &QueryConfig,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let provider: Provider = config.provider.parse()?;
    let provider_key =
        present(config.provider_key.as_deref()).ok_or(Error::MissingProviderKey)?;
    let data_key = present(config.data_api_key.as_deref()).ok_or(Error::MissingDataKey)?;

    let client = AlphaVantageClient::new(Some(data_key.to_string()))
        .with_timeout(config.tool_timeout);
    let backend = ProviderBackend::new(provider, provider_key, config.model.clone());
    let agent = Agent::new(backend, MarketTools::new(client))
        .with_system(system_instruction(&config.context))
        .with_max_turns(config.max_turns)
        .with_tool_timeout(config.tool_timeout);

    let outcome = agent.run(prompt, cancel).await?;
    info!(%provider, turns = outcome.turns(), "query finished");
    Ok(outcome)
}
