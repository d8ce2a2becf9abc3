use crate::types::ToolInvoker;

use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub struct ToolObject {
    pub name: String,
    pub description: Option<String>,
    pub json_schema: Value,
    invoker: Arc<dyn ToolInvoker>,
}

impl ToolObject {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        json_schema: Value,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            json_schema: normalize_schema(json_schema),
            invoker,
        }
    }

    pub fn invoker(&self) -> &dyn ToolInvoker {
        self.invoker.as_ref()
    }

    // models send "" for tools that take no arguments
    pub fn try_deserialize(&self, data: &str) -> Result<Value, serde_json::Error> {
        if data.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(data)
    }
}

impl fmt::Debug for ToolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolObject")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("json_schema", &self.json_schema)
            .finish_non_exhaustive()
    }
}

impl From<&ToolObject> for ChatCompletionTool {
    fn from(value: &ToolObject) -> Self {
        Self {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: value.name.clone(),
                description: value.description.clone(),
                parameters: Some(value.json_schema.clone()),
                strict: None,
            },
        }
    }
}

/// Function parameters must be an object schema; anything else is replaced by
/// an empty one.
fn normalize_schema(schema: Value) -> Value {
    match schema {
        Value::Object(mut object) => {
            object
                .entry("type")
                .or_insert_with(|| Value::String("object".to_owned()));
            object
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            Value::Object(object)
        }
        _ => serde_json::json!({ "type": "object", "properties": {} }),
    }
}
