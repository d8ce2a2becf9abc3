use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::warn;

/// Where the chat loop reads its input from.
#[async_trait]
pub trait LineSource: Send {
    /// Shows `prompt` and reads one line. `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn close(&mut self);
}

pub struct Terminal {
    input: Option<BufReader<Stdin>>,
    output: Stdout,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            input: Some(BufReader::new(tokio::io::stdin())),
            output: tokio::io::stdout(),
        }
    }
}

#[async_trait]
impl LineSource for Terminal {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let Some(input) = self.input.as_mut() else {
            return Ok(None);
        };
        self.output.write_all(prompt.as_bytes()).await?;
        self.output.flush().await?;

        let mut raw = Vec::new();
        if input.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        Ok(Some(decode_line(raw)))
    }

    fn close(&mut self) {
        self.input = None;
    }
}

/// Strips the line ending. A line that is not valid UTF-8 comes back empty,
/// so the chat loop skips it instead of stopping.
fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.ends_with(b"\n") {
        raw.pop();
        if raw.ends_with(b"\r") {
            raw.pop();
        }
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(err) => {
            warn!("ignoring input line that is not valid UTF-8: {err}");
            String::new()
        }
    }
}
