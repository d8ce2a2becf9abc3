use super::{ChatBackend, Completion, GenerationError};
use crate::config::SessionConfig;
use crate::types::{Message, ToolCall, ToolSet, system_message};

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionResponseStream, CreateChatCompletionRequestArgs,
    FinishReason,
};
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;

#[derive(Debug)]
enum StreamPart {
    Content(String),
    ToolCall(ToolCall),
}

type PartStream = Pin<Box<dyn Stream<Item = Result<StreamPart, GenerationError>> + Send>>;

pub struct OpenAiBackend {
    inner: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(config: &SessionConfig) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(config.api_key.as_str());
        Self {
            inner: Client::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    async fn send_chat_message(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &ToolSet,
    ) -> Result<ChatCompletionResponseStream, GenerationError> {
        let mut messages = vec![system_message(system_prompt)];
        messages.extend(history.iter().map(ChatCompletionRequestMessage::from));

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.as_str()).messages(messages).n(1);
        // the API rejects an empty tools array
        if !tools.is_empty() {
            args.tools(tools.openai_chatcompletion_toolset());
        }
        let request = args.build()?;

        Ok(self.inner.chat().create_stream(request).await?)
    }

    /// Reassembles streamed deltas into text chunks and complete tool calls.
    /// Tool call fragments are keyed by their index and released in index
    /// order once the model finishes the round.
    fn parse_stream(mut stream: ChatCompletionResponseStream) -> PartStream {
        Box::pin(stream! {
            let mut tool_calls: BTreeMap<u32, ToolCall> = BTreeMap::new();
            let mut failed = false;
            while let Some(part) = stream.next().await {
                let part = match part {
                    Ok(part) => part,
                    Err(error) => {
                        failed = true;
                        yield Err(GenerationError::from(error));
                        break;
                    }
                };
                let Some(first) = part.choices.first() else {
                    continue;
                };
                if let Some(content) = &first.delta.content {
                    yield Ok(StreamPart::Content(content.clone()));
                }
                for call in first.delta.tool_calls.as_deref().unwrap_or_default() {
                    let partial = tool_calls.entry(call.index).or_default();
                    if let Some(id) = &call.id {
                        partial.id = id.clone();
                    }
                    if let Some(function) = &call.function {
                        if let Some(name) = &function.name {
                            partial.name.push_str(name);
                        }
                        if let Some(arguments) = &function.arguments {
                            partial.json.push_str(arguments);
                        }
                    }
                }
                if let Some(FinishReason::ToolCalls) = first.finish_reason {
                    for (index, call) in std::mem::take(&mut tool_calls) {
                        yield Ok(StreamPart::ToolCall(Self::complete_call(index, call)));
                    }
                }
            }
            // some servers end the stream without a tool_calls finish reason
            if !failed {
                for (index, call) in tool_calls {
                    yield Ok(StreamPart::ToolCall(Self::complete_call(index, call)));
                }
            }
        })
    }

    fn complete_call(index: u32, mut call: ToolCall) -> ToolCall {
        if call.id.is_empty() {
            call.id = format!("call_{index}");
        }
        call
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &ToolSet,
    ) -> Result<Completion, GenerationError> {
        let stream = self.send_chat_message(system_prompt, messages, tools).await?;
        let mut parts = Self::parse_stream(stream);

        let mut text = String::new();
        let mut tool_calls = vec![];
        while let Some(part) = parts.next().await {
            match part? {
                StreamPart::Content(chunk) => text.push_str(&chunk),
                StreamPart::ToolCall(call) if call.name.is_empty() => {
                    return Err(GenerationError::MalformedResponse(format!(
                        "tool call {} has no name",
                        call.id
                    )));
                }
                StreamPart::ToolCall(call) => tool_calls.push(call),
            }
        }

        Ok(Completion {
            text: if text.is_empty() { None } else { Some(text) },
            tool_calls,
        })
    }
}
