use super::io::LineSource;
use super::report::TurnReporter;
use crate::gateway::ToolGateway;
use crate::generation::Generator;
use crate::session::Session;

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

const PROMPT: &str = "You: ";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Exit,
    Message(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        Input::Exit
    } else {
        Input::Message(line)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Skip,
    Reply(String),
    Exit,
}

pub struct CliClient<G, I> {
    session: Session<G>,
    gateway: Option<Arc<ToolGateway>>,
    input: I,
    reporter: TurnReporter,
}

impl<G: Generator, I: LineSource> CliClient<G, I> {
    pub fn new(
        session: Session<G>,
        gateway: Option<Arc<ToolGateway>>,
        input: I,
        reporter: TurnReporter,
    ) -> Self {
        Self {
            session,
            gateway,
            input,
            reporter,
        }
    }

    /// Reads and answers lines until `exit`, `quit` or end of input.
    pub async fn chat(&mut self) -> Result<()> {
        while let Some(line) = self.input.read_line(PROMPT).await? {
            match self.handle_line(&line).await {
                Flow::Skip => continue,
                Flow::Reply(reply) => println!("Assistant: {reply}"),
                Flow::Exit => break,
            }
        }
        self.shutdown().await;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        match classify(line) {
            Input::Empty => Flow::Skip,
            Input::Exit => Flow::Exit,
            Input::Message(text) => Flow::Reply(self.session.send(text, &mut self.reporter).await),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(gateway) = self.gateway.take() {
            if let Err(err) = gateway.close().await {
                warn!("failed to close tool server session: {err}");
            }
        }
        self.input.close();
        println!("Goodbye!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_server::{Reply, ScriptedServer};
    use crate::session::tests::{Scripted, ScriptedGenerator, session_config};
    use crate::types::{Message, ToolSet};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct ScriptedInput {
        lines: VecDeque<&'static str>,
        prompts: usize,
        closed: bool,
    }

    #[async_trait]
    impl LineSource for ScriptedInput {
        async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
            assert_eq!(prompt, PROMPT);
            self.prompts += 1;
            Ok(self.lines.pop_front().map(str::to_owned))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn client(
        lines: Vec<&'static str>,
        script: Vec<Scripted>,
    ) -> CliClient<ScriptedGenerator, ScriptedInput> {
        let session = Session::new(
            session_config(),
            ScriptedGenerator::new(script),
            ToolSet::new(),
        );
        let input = ScriptedInput {
            lines: lines.into(),
            ..Default::default()
        };
        CliClient::new(session, None, input, TurnReporter::new(false))
    }

    fn generator_calls(client: &CliClient<ScriptedGenerator, ScriptedInput>) -> usize {
        client.session.generator().calls.load(Ordering::SeqCst)
    }

    #[test]
    fn classifies_input() {
        assert_eq!(classify(""), Input::Empty);
        assert_eq!(classify(" \t "), Input::Empty);
        assert_eq!(classify("EXIT"), Input::Exit);
        assert_eq!(classify("  Quit "), Input::Exit);
        assert_eq!(classify(" hello "), Input::Message("hello"));
        assert_eq!(classify("quit now"), Input::Message("quit now"));
    }

    #[tokio::test]
    async fn blank_lines_never_reach_the_model() {
        let mut client = client(vec![], vec![]);
        assert_eq!(client.handle_line("").await, Flow::Skip);
        assert_eq!(client.handle_line("   ").await, Flow::Skip);
        assert_eq!(generator_calls(&client), 0);
        assert!(client.session.history().is_empty());
    }

    #[tokio::test]
    async fn quit_stops_without_a_model_call() {
        let mut client = client(vec!["", "hello", "quit", "never read"], vec![Scripted::Reply("hi")]);
        client.chat().await.unwrap();

        assert_eq!(generator_calls(&client), 1);
        assert_eq!(client.input.prompts, 3);
        assert!(client.input.closed);
        assert_eq!(
            client.session.history(),
            &[Message::user("hello"), Message::assistant("hi")]
        );
    }

    #[tokio::test]
    async fn failed_turn_does_not_end_the_loop() {
        let mut client = client(
            vec!["first", "second"],
            vec![Scripted::Fail, Scripted::Reply("recovered")],
        );
        let Flow::Reply(reply) = client.handle_line("first").await else {
            panic!("expected a reply");
        };
        assert!(reply.starts_with("Error: "));
        assert_eq!(
            client.handle_line("second").await,
            Flow::Reply("recovered".into())
        );
    }

    #[tokio::test]
    async fn end_of_input_shuts_down() {
        let mut client = client(vec!["hello"], vec![Scripted::Reply("hi")]);
        client.chat().await.unwrap();
        assert_eq!(client.input.prompts, 2);
        assert!(client.input.closed);
    }

    #[tokio::test]
    async fn quit_closes_the_tool_session() {
        let server = ScriptedServer::start(vec![
            Reply::json(
                1,
                json!({ "protocolVersion": "2025-03-26", "capabilities": { "tools": {} } }),
            )
            .with_header("mcp-session-id", "session-3"),
            Reply::accepted(),
            Reply::empty(200),
        ])
        .await;
        let gateway = ToolGateway::connect(&server.url, None).await.ok();
        assert!(gateway.is_some());

        let mut client = client(vec!["quit"], vec![]);
        client.gateway = gateway;
        client.chat().await.unwrap();

        assert!(client.gateway.is_none());
        assert_eq!(generator_calls(&client), 0);
        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        let last = requests.last().unwrap();
        assert_eq!(last.method, "DELETE");
        assert_eq!(last.header("mcp-session-id"), Some("session-3"));
    }
}
