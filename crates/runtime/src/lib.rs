//! fxanalyst runtime: model backends, the market tool catalog and the
//! tool-calling loop.
//!
//! # Overview
//!
//! - **Backend**: a trait over LLM providers (Gemini, OpenAI, Claude).
//! - **ToolHost**: a trait over tool execution; [`MarketTools`] maps the
//!   catalog onto Alpha Vantage calls.
//! - **Agent**: drives a backend against a tool host until the model answers,
//!   the turn budget runs out, or the query is cancelled.
//! - **run_query**: the caller boundary. It always yields a string.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{QueryConfig, run_query};
//!
//! # async fn example() {
//! let config = QueryConfig {
//!     provider_key: Some("AIza...".into()),
//!     data_api_key: Some("demo".into()),
//!     ..QueryConfig::new("Gemini")
//! };
//! let answer = run_query("How is EUR/USD trending this week?", &config).await;
//! println!("{answer}");
//! # }
//! ```

mod agent;
mod error;
pub mod model;
mod prompt;
pub mod providers;
mod query;
pub mod tools;

pub use agent::{Agent, DEFAULT_MAX_TURNS, DEFAULT_TOOL_TIMEOUT, Outcome};
pub use error::{Error, Result};
pub use model::{Backend, Message, ModelError, ToolCall, ToolResult, ToolSpec};
pub use prompt::system_instruction;
pub use providers::{Provider, ProviderBackend};
pub use query::{QueryConfig, run_query, run_query_cancellable, try_run_query};
pub use tools::{CATALOG, MarketTools, ToolError, ToolHost};
