mod client;
mod rpc;
mod transport;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::ToolGateway;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected the credentials ({0})")]
    Unauthorized(StatusCode),
    #[error("unexpected http status {0}")]
    Status(StatusCode),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
}
