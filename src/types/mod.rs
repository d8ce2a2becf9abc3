mod message;
mod tool;
mod toolset;

pub use message::{Message, Role, ToolCall, system_message};
pub use tool::{ToolInvoker, ToolOutput};
pub use toolset::{ToolCallError, ToolObject, ToolSet, ToolSetCreationError};
