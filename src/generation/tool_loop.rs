use super::{GenerateRequest, Generation, GenerationError, Generator, Step, StepObserver, ToolResult};
use crate::types::{Message, ToolCall, ToolOutput, ToolSet};

use async_trait::async_trait;
use tracing::debug;

/// What the model produced in a single round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// A single request/response exchange with a hosted model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &ToolSet,
    ) -> Result<Completion, GenerationError>;
}

/// Runs model rounds until the model stops asking for tools or the step
/// budget runs out. Tool calls are executed one at a time, in the order the
/// model listed them, and their results are fed into the next round.
pub struct ToolLoop<B> {
    backend: B,
}

impl<B: ChatBackend> ToolLoop<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: ChatBackend> Generator for ToolLoop<B> {
    async fn generate(
        &self,
        request: GenerateRequest<'_>,
        observer: &mut (dyn StepObserver + Send),
    ) -> Result<Generation, GenerationError> {
        let mut transcript = request.messages.to_vec();
        let mut steps: Vec<Step> = vec![];

        for round in 0..request.max_steps {
            let completion = self
                .backend
                .complete(request.system_prompt, &transcript, request.tools)
                .await?;
            let text = completion.text.filter(|text| !text.is_empty());

            if text.is_some() || !completion.tool_calls.is_empty() {
                transcript.push(Message::Assistant {
                    content: text.clone(),
                    tool_calls: completion.tool_calls.clone(),
                });
            }

            let mut tool_results = vec![];
            for call in &completion.tool_calls {
                let output = match request.tools.try_tool_call(&call.name, &call.json).await {
                    Ok(output) => output,
                    Err(err) => ToolOutput::error(err.to_string()),
                };
                transcript.push(Message::Tool {
                    tool_call_id: call.id.clone(),
                    content: output.content.clone(),
                });
                tool_results.push(ToolResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    output,
                });
            }

            let step = Step {
                text,
                tool_calls: completion.tool_calls,
                tool_results,
            };
            observer.on_step(&step);
            let finished = step.tool_calls.is_empty();
            steps.push(step);

            if finished {
                break;
            }
            if round + 1 == request.max_steps {
                debug!(max_steps = request.max_steps, "step budget exhausted");
            }
        }

        Ok(Generation {
            text: steps.last().and_then(|step| step.text.clone()),
            transcript,
            steps,
        })
    }
}
