//! The seam between the agent loop and tool side effects.

use crate::model::{ToolCall, ToolSpec};
use crate::tools::ToolError;
use serde_json::Value;
use std::future::Future;

/// Something that can advertise tools to a model and run the calls it makes.
///
/// `execute` may be called concurrently for every call in a batch.
pub trait ToolHost: Send + Sync {
    /// Specifications sent to the model with every request.
    fn specs(&self) -> &[ToolSpec];

    /// Run one call. Failures are reported to the model, not the caller.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<Value, ToolError>> + Send;
}
