use crate::generation::MAX_STEPS;

use clap::Parser;
use clap::builder::BoolishValueParser;
use std::fmt;

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_SERVER_URL: &str = "https://mcp.deepwiki.com/mcp";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
    Use the available tools when they help answer the user's question, \
    and answer concisely.";

/// Terminal chat client for hosted language models with remote MCP tools.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// OpenAI API key; prompted for when absent
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// URL of the MCP tool server (streamable HTTP)
    #[arg(long, env = "MCP_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Bearer token for the tool server
    #[arg(long, env = "MCP_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// System instruction sent with every request
    #[arg(long, env = "SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Print raw tool arguments and tool error payloads
    #[arg(long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,
}

impl Args {
    /// The configured key, if it is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub max_steps: usize,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub session: SessionConfig,
    pub server_url: String,
    pub bearer_token: Option<String>,
    pub debug: bool,
}

impl Config {
    pub fn new(args: Args, api_key: String) -> Self {
        Self {
            session: SessionConfig {
                api_key,
                model: args.model,
                system_prompt: args.system_prompt,
                max_steps: MAX_STEPS,
            },
            server_url: args.server_url,
            bearer_token: args.token.filter(|token| !token.trim().is_empty()),
            debug: args.debug,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("session", &self.session)
            .field("server_url", &self.server_url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("debug", &self.debug)
            .finish()
    }
}
