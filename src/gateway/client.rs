use super::GatewayError;
use super::rpc::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, PROTOCOL_VERSION,
};
use super::transport::StreamableHttpTransport;
use crate::types::{ToolInvoker, ToolObject, ToolOutput, ToolSet};

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Connection to a remote MCP tool server.
pub struct ToolGateway {
    transport: StreamableHttpTransport,
    server: Option<Implementation>,
}

impl ToolGateway {
    /// Opens the transport and runs the MCP initialization handshake.
    pub async fn connect(url: &str, bearer_token: Option<&str>) -> Result<Arc<Self>, GatewayError> {
        let mut transport = StreamableHttpTransport::new(url, bearer_token)?;

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION,
            capabilities: json!({}),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        };
        let result = transport.open_session(serde_json::to_value(params)?).await?;
        let initialized: InitializeResult = serde_json::from_value(result)?;
        transport.set_protocol_version(initialized.protocol_version);
        transport.notify("notifications/initialized").await?;

        debug!(
            url,
            session_id = ?transport.session_id(),
            server = ?initialized.server_info,
            "tool gateway initialized"
        );
        Ok(Arc::new(Self {
            transport,
            server: initialized.server_info,
        }))
    }

    /// Never fails: any connection or discovery problem is logged and the
    /// session continues without tools.
    pub async fn connect_best_effort(
        url: &str,
        bearer_token: Option<&str>,
    ) -> (Option<Arc<Self>>, ToolSet) {
        let gateway = match Self::connect(url, bearer_token).await {
            Ok(gateway) => gateway,
            Err(err) => {
                warn!("could not connect to tool server at {url}: {err}");
                return (None, ToolSet::new());
            }
        };
        match gateway.discover_tools().await {
            Ok(tools) => {
                info!(url, tools = tools.len(), "connected to tool server");
                (Some(gateway), tools)
            }
            Err(err) => {
                warn!("could not list tools from {url}: {err}");
                if let Err(err) = gateway.close().await {
                    debug!("closing tool gateway failed: {err}");
                }
                (None, ToolSet::new())
            }
        }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server.as_ref().map(|server| server.name.as_str())
    }

    /// Fetches every page of `tools/list` into a frozen tool set whose
    /// entries invoke back through this gateway.
    pub async fn discover_tools(self: &Arc<Self>) -> Result<ToolSet, GatewayError> {
        let mut toolset = ToolSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|cursor| json!({ "cursor": cursor }));
            let page: ListToolsResult =
                serde_json::from_value(self.transport.request("tools/list", params).await?)?;

            for descriptor in page.tools {
                if toolset.contains(&descriptor.name) {
                    warn!(
                        "server listed tool {} more than once, keeping the first",
                        descriptor.name
                    );
                    continue;
                }
                let tool = ToolObject::new(
                    descriptor.name,
                    descriptor.description,
                    descriptor.input_schema,
                    Arc::clone(self) as Arc<dyn ToolInvoker>,
                );
                toolset = toolset
                    .add_tool(tool)
                    .map_err(|err| GatewayError::Protocol(err.to_string()))?;
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(toolset)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, GatewayError> {
        let params = serde_json::to_value(CallToolParams { name, arguments })?;
        let result = self.transport.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn close(&self) -> Result<(), GatewayError> {
        self.transport.close().await
    }
}

#[async_trait]
impl ToolInvoker for ToolGateway {
    async fn invoke(&self, name: &str, arguments: Value) -> anyhow::Result<ToolOutput> {
        let result = self.call_tool(name, arguments).await?;
        Ok(ToolOutput {
            content: result.render(),
            is_error: result.is_error,
        })
    }
}
