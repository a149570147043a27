//! Tool invocation support.
//!
//! - [`payload`](crate::tools::payload) - recovers a `{tool, method, data}` object from model output
//! - [`dispatcher`](crate::tools::dispatcher) - sends payloads to the tool execution service
//! - [`registry`](crate::tools::registry) - the catalog of tools shown to the model
//!
//! ```ignore
//! let payload = extract_tool_payload(&Value::String(model_output));
//! let payload = ToolPayload::from_value(&payload)?;
//! let result = dispatcher.dispatch(&payload).await;
//! ```

pub mod dispatcher;
pub mod payload;
pub mod registry;

pub use dispatcher::ToolDispatcher;
pub use payload::{extract_tool_payload, is_error_payload, ToolPayload};
pub use registry::ToolRegistry;
