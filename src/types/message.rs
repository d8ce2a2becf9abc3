use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionToolType, FunctionCall,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub json: String,
}

/// One entry of the conversation transcript. Order is the only ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(text.into()),
            tool_calls: vec![],
        }
    }

    /// An assistant turn that carries tool calls is reported as `ToolCall`.
    pub fn role(&self) -> Role {
        match self {
            Self::User(_) => Role::User,
            Self::Assistant { tool_calls, .. } if !tool_calls.is_empty() => Role::ToolCall,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::ToolResult,
        }
    }
}

impl From<&ToolCall> for ChatCompletionMessageToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: call.name.clone(),
                arguments: call.json.clone(),
            },
        }
    }
}

impl From<&Message> for ChatCompletionRequestMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::User(text) => Self::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(text.clone()),
                name: None,
            }),
            Message::Assistant {
                content,
                tool_calls,
            } => Self::Assistant(ChatCompletionRequestAssistantMessage {
                content: content
                    .clone()
                    .map(ChatCompletionRequestAssistantMessageContent::Text),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.iter().map(Into::into).collect())
                },
                ..Default::default()
            }),
            Message::Tool {
                tool_call_id,
                content,
            } => Self::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(content.clone()),
                tool_call_id: tool_call_id.clone(),
            }),
        }
    }
}

pub fn system_message(instruction: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(instruction.to_owned()),
        name: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_follow_message_shape() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "search".into(),
            json: "{}".into(),
        };
        let messages = [
            Message::user("hi"),
            Message::assistant("hello"),
            Message::Assistant {
                content: None,
                tool_calls: vec![call],
            },
            Message::Tool {
                tool_call_id: "call_1".into(),
                content: "ok".into(),
            },
        ];
        let roles: Vec<_> = messages.iter().map(Message::role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::ToolCall, Role::ToolResult]
        );
    }

    #[test]
    fn assistant_without_calls_omits_tool_calls() {
        let request = ChatCompletionRequestMessage::from(&Message::assistant("done"));
        let ChatCompletionRequestMessage::Assistant(assistant) = request else {
            panic!("expected assistant message");
        };
        assert!(assistant.tool_calls.is_none());
        assert!(matches!(
            assistant.content,
            Some(ChatCompletionRequestAssistantMessageContent::Text(ref text)) if text == "done"
        ));
    }

    #[test]
    fn tool_message_keeps_call_id() {
        let request = ChatCompletionRequestMessage::from(&Message::Tool {
            tool_call_id: "call_9".into(),
            content: "42".into(),
        });
        let ChatCompletionRequestMessage::Tool(tool) = request else {
            panic!("expected tool message");
        };
        assert_eq!(tool.tool_call_id, "call_9");
    }
}
