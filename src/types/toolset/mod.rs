mod tool_object;
mod toolset;

pub use tool_object::ToolObject;
pub use toolset::{ToolCallError, ToolSet, ToolSetCreationError};
