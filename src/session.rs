use crate::config::SessionConfig;
use crate::generation::{GenerateRequest, Generator, StepObserver};
use crate::types::{Message, Role, ToolSet};

use tracing::{debug, warn};

pub const FALLBACK_REPLY: &str = "No response generated.";
pub const ERROR_PREFIX: &str = "Error: ";

/// One conversation with the model. Turns run strictly one after another.
pub struct Session<G> {
    config: SessionConfig,
    generator: G,
    tools: ToolSet,
    history: Vec<Message>,
}

impl<G: Generator> Session<G> {
    pub fn new(config: SessionConfig, generator: G, tools: ToolSet) -> Self {
        Self {
            config,
            generator,
            tools,
            history: vec![],
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    #[cfg(test)]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Runs one turn and returns the text to show as the assistant's reply.
    ///
    /// `user_text` must not be blank; callers filter empty input. On success
    /// the history is replaced by the transcript the generator returns, which
    /// includes every tool call and result of the turn. A failed turn keeps
    /// the user message in history and comes back as an `Error: ` reply.
    pub async fn send(
        &mut self,
        user_text: &str,
        observer: &mut (dyn StepObserver + Send),
    ) -> String {
        self.history.push(Message::user(user_text));

        let request = GenerateRequest {
            system_prompt: &self.config.system_prompt,
            messages: &self.history,
            tools: &self.tools,
            max_steps: self.config.max_steps,
        };
        match self.generator.generate(request, observer).await {
            Ok(generation) => {
                let tool_results = generation
                    .transcript
                    .iter()
                    .filter(|message| message.role() == Role::ToolResult)
                    .count();
                debug!(
                    steps = generation.steps.len(),
                    messages = generation.transcript.len(),
                    tool_results,
                    "turn completed"
                );
                self.history = generation.transcript;
                generation
                    .text
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_owned())
            }
            Err(err) => {
                warn!("generation failed: {err}");
                format!("{ERROR_PREFIX}{err}")
            }
        }
    }
}
