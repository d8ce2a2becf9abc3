use super::GatewayError;
use super::rpc::{Notification, Request, Response};

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_HEADER: &str = "mcp-protocol-version";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client side of the MCP streamable HTTP transport: every message is a POST
/// to one endpoint, answered with either plain JSON or an SSE stream.
pub struct StreamableHttpTransport {
    http: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
    session_id: Option<String>,
    protocol_version: Option<String>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl StreamableHttpTransport {
    pub fn new(url: &str, bearer_token: Option<&str>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.to_owned(),
            bearer_token: bearer_token.map(str::to_owned),
            session_id: None,
            protocol_version: None,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_protocol_version(&mut self, version: String) {
        self.protocol_version = Some(version);
    }

    pub async fn request(
        &self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let (result, _) = self.exchange(method, params).await?;
        Ok(result)
    }

    /// Sends `initialize` and remembers the session id the server assigns.
    pub async fn open_session(&mut self, params: Value) -> Result<Value, GatewayError> {
        let (result, session_id) = self.exchange("initialize", Some(params)).await?;
        self.session_id = session_id;
        Ok(result)
    }

    pub async fn notify(&self, method: &'static str) -> Result<(), GatewayError> {
        self.post(&Notification::new(method)).await?;
        Ok(())
    }

    /// Ends the server-side session. Only the first call does any work.
    pub async fn close(&self) -> Result<(), GatewayError> {
        if self.closed.swap(true, Ordering::SeqCst) || self.session_id.is_none() {
            return Ok(());
        }
        let response = self.decorate(self.http.delete(&self.url)).send().await?;
        match response.status() {
            // servers may refuse explicit termination
            StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            _ => check_status(response).map(|_| ()),
        }
    }

    async fn exchange(
        &self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<(Value, Option<String>), GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self.post(&Request::new(id, method, params)).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));

        let message = if is_event_stream {
            read_event_stream(response.bytes_stream(), id).await?
        } else {
            find_response(&response.text().await?, id)?
        };
        if let Some(error) = message.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok((message.result.unwrap_or(Value::Null), session_id))
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .decorate(self.http.post(&self.url))
            .json(body)
            .send()
            .await?;
        check_status(response)
    }

    fn decorate(&self, mut builder: RequestBuilder) -> RequestBuilder {
        builder = builder.header(ACCEPT, "application/json, text/event-stream");
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }
        if let Some(version) = &self.protocol_version {
            builder = builder.header(PROTOCOL_HEADER, version);
        }
        builder
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(GatewayError::Unauthorized(status))
    } else if !status.is_success() {
        Err(GatewayError::Status(status))
    } else {
        Ok(response)
    }
}

/// Picks the response to request `id` out of a plain JSON body holding a
/// single message or a batch.
fn find_response(body: &str, id: u64) -> Result<Response, GatewayError> {
    let message = serde_json::from_str::<Value>(body)?;
    answer_to(message, id).ok_or_else(|| no_response(id))
}

/// Reads SSE events as they arrive and returns as soon as the response to
/// `id` shows up. The server may keep the stream open afterwards.
async fn read_event_stream<S, B, E>(body: S, id: u64) -> Result<Response, GatewayError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut events = pin!(body.eventsource());
    while let Some(event) = events.next().await {
        let event =
            event.map_err(|err| GatewayError::Protocol(format!("broken event stream: {err}")))?;
        // priming and keep-alive events carry no payload
        if event.data.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&event.data) {
            Ok(message) => {
                if let Some(response) = answer_to(message, id) {
                    return Ok(response);
                }
            }
            Err(err) => debug!(event = %event.event, "skipping undecodable event: {err}"),
        }
    }
    Err(no_response(id))
}

fn answer_to(message: Value, id: u64) -> Option<Response> {
    let messages = match message {
        Value::Array(batch) => batch,
        single => vec![single],
    };
    messages
        .into_iter()
        .filter_map(|message| serde_json::from_value::<Response>(message).ok())
        .find(|response| response.answers(id))
}

fn no_response(id: u64) -> GatewayError {
    GatewayError::Protocol(format!("server sent no response to request {id}"))
}
