mod openai;
mod tool_loop;

pub use openai::OpenAiBackend;
pub use tool_loop::{ChatBackend, Completion, ToolLoop};

use crate::types::{Message, ToolCall, ToolOutput, ToolSet};

use async_openai::error::OpenAIError;
use async_trait::async_trait;
use thiserror::Error;

/// Upper bound on model rounds within one turn.
pub const MAX_STEPS: usize = 10;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model request failed: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub output: ToolOutput,
}

/// One model round, together with the tool calls it made and their results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
}

#[derive(Debug, Clone)]
pub struct Generation {
    /// Text of the final step, if it produced any.
    pub text: Option<String>,
    /// The history that was sent followed by every message generated during
    /// the call, in order.
    pub transcript: Vec<Message>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a ToolSet,
    pub max_steps: usize,
}

/// Notified once per finished step, in order.
pub trait StepObserver {
    fn on_step(&mut self, step: &Step);
}

impl<F: FnMut(&Step)> StepObserver for F {
    fn on_step(&mut self, step: &Step) {
        self(step)
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        request: GenerateRequest<'_>,
        observer: &mut (dyn StepObserver + Send),
    ) -> Result<Generation, GenerationError>;
}
