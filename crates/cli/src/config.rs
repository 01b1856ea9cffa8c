//! Configuration loading from fxanalyst.toml.

use runtime::{DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT, Provider, QueryConfig};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "fxanalyst.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Provider name: gemini, openai or claude.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model override; each provider has its own default.
    pub model: Option<String>,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Text file appended to the system instruction.
    pub context_file: Option<PathBuf>,

    #[serde(default)]
    pub keys: Keys,
}

/// API credentials, one per service.
#[derive(Default, Deserialize)]
pub struct Keys {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub claude: Option<String>,
    pub alpha_vantage: Option<String>,
}

impl Keys {
    pub fn for_provider(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Gemini => self.gemini.as_ref(),
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Claude => self.claude.as_ref(),
        }
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Keys")
            .field("gemini", &set(&self.gemini))
            .field("openai", &set(&self.openai))
            .field("claude", &set(&self.claude))
            .field("alpha_vantage", &set(&self.alpha_vantage))
            .finish()
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT.as_secs()
}

/// Environment variables that override `[keys]`.
const KEY_VARS: [&str; 4] = [
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "ALPHA_VANTAGE_API_KEY",
];

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load an explicit path, or `fxanalyst.toml` if present, or defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default_config()),
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration.
    pub fn default_config() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            max_turns: default_max_turns(),
            tool_timeout_secs: default_tool_timeout_secs(),
            context_file: None,
            keys: Keys::default(),
        }
    }

    /// Apply key overrides from the environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for var in KEY_VARS {
            let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            debug!(var, "key overridden from environment");
            let slot = match var {
                "GEMINI_API_KEY" => &mut self.keys.gemini,
                "OPENAI_API_KEY" => &mut self.keys.openai,
                "ANTHROPIC_API_KEY" => &mut self.keys.claude,
                _ => &mut self.keys.alpha_vantage,
            };
            *slot = Some(value);
        }
    }

    /// Resolve everything a query needs.
    ///
    /// An unknown provider name is passed through so the query reports it.
    pub fn query_config(&self) -> QueryConfig {
        let provider_key = self
            .provider
            .parse::<Provider>()
            .ok()
            .and_then(|provider| self.keys.for_provider(provider))
            .cloned();

        QueryConfig {
            provider: self.provider.clone(),
            provider_key,
            data_api_key: self.keys.alpha_vantage.clone(),
            model: self.model.clone(),
            max_turns: self.max_turns,
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            context: self
                .context_file
                .as_deref()
                .map(load_context)
                .unwrap_or_default(),
        }
    }
}

/// Read supplementary prompt context; a missing or unreadable file is empty.
pub fn load_context(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no prompt context loaded");
            String::new()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),
}
