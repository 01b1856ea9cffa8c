//! Alpha Vantage market data access.
//!
//! This crate is the boundary between the agent runtime and the upstream
//! financial-data API. It knows how to turn a [`Function`] code plus a flat
//! parameter set into an authenticated GET request, and how to normalize
//! currency pairs into the API's symbol convention.
//!
//! Response bodies are treated as opaque JSON: nothing here validates the
//! shape of a series or indicator payload.
//!
//! # Example
//!
//! ```no_run
//! use market::{AlphaVantageClient, Function, Params, QuoteApi};
//!
//! # async fn example() -> market::Result<()> {
//! let client = AlphaVantageClient::new(Some("demo".into()));
//! let mut params = Params::new();
//! params.insert("from_symbol", "EUR");
//! params.insert("to_symbol", "USD");
//!
//! let series = client.invoke(Function::FxDaily, &params).await?;
//! println!("{series}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod function;
mod params;
mod symbol;

pub use client::{AlphaVantageClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, QuoteApi};
pub use error::{ApiError, Result};
pub use function::Function;
pub use params::{ParamValue, Params};
pub use symbol::resolve_symbol;
