//! Tool execution and the market data catalog.

mod catalog;
pub mod errors;
mod host;

pub use catalog::{
    CATALOG, MarketTools, ParamDef, ParamDefault, ParamKind, SymbolBinding, ToolDefinition,
};
pub use errors::ToolError;
pub use host::ToolHost;
