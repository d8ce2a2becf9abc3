use super::tool_object::ToolObject;
use crate::types::ToolOutput;

use async_openai::types::ChatCompletionTool;
use std::collections::hash_map::HashMap;
use thiserror::Error;

/// Tool name to capability mapping. Built once, then only read.
#[derive(Debug, Default)]
pub struct ToolSet {
    tools: HashMap<String, ToolObject>,
}

#[derive(Debug, Error)]
pub enum ToolSetCreationError {
    #[error("two or more tools have the same name: {0}")]
    NameConflict(String),
}

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("error deserializing tool call (possible hallucination)")]
    Deserialization(#[source] serde_json::Error),
    #[error("tool not in toolset: {0}")]
    NotFound(String),
    #[error("tool invocation failed: {0:#}")]
    Invocation(anyhow::Error),
}

impl ToolSet {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn add_tool(mut self, tool_object: ToolObject) -> Result<Self, ToolSetCreationError> {
        if self.tools.contains_key(&tool_object.name) {
            Err(ToolSetCreationError::NameConflict(tool_object.name.clone()))
        } else {
            self.tools.insert(tool_object.name.clone(), tool_object);
            Ok(self)
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn try_tool_call(
        &self,
        tool_name: &str,
        json: &str,
    ) -> Result<ToolOutput, ToolCallError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolCallError::NotFound(tool_name.to_owned()))?;
        let arguments = tool
            .try_deserialize(json)
            .map_err(ToolCallError::Deserialization)?;
        tool.invoker()
            .invoke(tool_name, arguments)
            .await
            .map_err(ToolCallError::Invocation)
    }

    /// Sorted by name so identical tool sets produce identical requests.
    pub fn openai_chatcompletion_toolset(&self) -> Vec<ChatCompletionTool> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        tools.into_iter().map(ChatCompletionTool::from).collect()
    }
}
