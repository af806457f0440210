use std::future::Future;
use std::io::{self, Write};

use futures_util::{Stream, StreamExt};
use saldo_core::domain::session::SessionId;
use saldo_core::extract::extract_text;
use saldo_core::stream::{StreamDecoder, StreamOutput};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::runtime::{Delivery, Invocation, InvocationBoundary, InvocationRequest, InvokeError};

pub const INPUT_PROMPT: &str = "you> ";
pub const OUTPUT_PREFIX: &str = "assistant> ";

/// What one trimmed input line asks the driver to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Empty,
    Exit,
    ShowSession,
    NewSession,
    Prompt(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "/exit" | "/quit" | "exit" | "quit" => Self::Exit,
            "/session" => Self::ShowSession,
            "/new" => Self::NewSession,
            prompt => Self::Prompt(prompt.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error("output failed: {0}")]
    Io(#[from] io::Error),
}

/// Interactive loop over one agent session.
///
/// Each prompt is sent through the [`InvocationBoundary`] and its response is
/// rendered before the next line is read. Turn failures are reported on the
/// error writer and never end the loop.
pub struct ConversationDriver<B> {
    boundary: B,
    session: SessionId,
    delivery: Delivery,
}

impl<B> ConversationDriver<B>
where
    B: InvocationBoundary,
{
    pub fn new(boundary: B, session: SessionId, delivery: Delivery) -> Self {
        Self { boundary, session, delivery }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Runs until end of input, an exit command, or `interrupt` resolves.
    ///
    /// `lines` must not block the executor; an interrupt drops any pending read.
    pub async fn run<L, O, E, I>(
        &mut self,
        mut lines: L,
        out: &mut O,
        err: &mut E,
        interrupt: I,
    ) -> io::Result<()>
    where
        L: Stream<Item = io::Result<String>> + Unpin,
        O: Write,
        E: Write,
        I: Future,
    {
        tokio::pin!(interrupt);

        loop {
            write!(out, "{INPUT_PROMPT}")?;
            out.flush()?;

            let line = tokio::select! {
                biased;
                _ = &mut interrupt => None,
                line = lines.next() => Some(line.transpose()?),
            };
            let Some(line) = line else {
                writeln!(out)?;
                info!(event_name = "conversation.interrupted", "conversation interrupted");
                return Ok(());
            };
            let Some(line) = line else {
                writeln!(out)?;
                return Ok(());
            };

            let outcome = tokio::select! {
                biased;
                _ = &mut interrupt => None,
                outcome = self.handle_line(&line, out, err) => Some(outcome?),
            };
            match outcome {
                Some(TurnOutcome::Continue) => {}
                Some(TurnOutcome::Exit) => return Ok(()),
                None => {
                    writeln!(out)?;
                    info!(event_name = "conversation.interrupted", "conversation interrupted");
                    return Ok(());
                }
            }
        }
    }

    /// Applies one input line. Only failures writing to `err` escape.
    pub async fn handle_line<O, E>(
        &mut self,
        line: &str,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<TurnOutcome>
    where
        O: Write,
        E: Write,
    {
        match Command::parse(line) {
            Command::Empty => {}
            Command::Exit => return Ok(TurnOutcome::Exit),
            Command::ShowSession => {
                writeln!(out, "(session_id = {})", self.session)?;
            }
            Command::NewSession => {
                self.session = SessionId::generate();
                info!(event_name = "conversation.session.renewed", session_id = %self.session, "new session");
                writeln!(out, "(new session_id = {})", self.session)?;
            }
            Command::Prompt(prompt) => {
                if let Err(error) = self.dispatch(prompt, out).await {
                    warn!(event_name = "conversation.turn.failed", session_id = %self.session, %error, "turn failed");
                    writeln!(err, "[error] {error}")?;
                }
            }
        }
        Ok(TurnOutcome::Continue)
    }

    async fn dispatch<O>(&self, prompt: String, out: &mut O) -> Result<String, TurnError>
    where
        O: Write,
    {
        let request =
            InvocationRequest { prompt, session_id: self.session.clone(), delivery: self.delivery };
        let invocation = self.boundary.invoke(&request).await?;
        render(invocation, out).await
    }
}

/// Writes a response to `out`, returning the full assistant text.
pub async fn render<O>(invocation: Invocation, out: &mut O) -> Result<String, TurnError>
where
    O: Write,
{
    write!(out, "{OUTPUT_PREFIX}")?;

    match invocation {
        Invocation::Buffered(body) => {
            let text = buffered_text(&body);
            writeln!(out, "{text}")?;
            Ok(text)
        }
        Invocation::Streamed(mut lines) => {
            let mut decoder = StreamDecoder::new();
            while let Some(line) = lines.next().await {
                match decoder.decode_line(&line?) {
                    Some(StreamOutput::Text(text)) => write!(out, "{text}")?,
                    Some(StreamOutput::Passthrough(raw)) => writeln!(out, "{raw}")?,
                    None => continue,
                }
                out.flush()?;
            }
            writeln!(out)?;
            Ok(decoder.finish())
        }
    }
}

/// Extracted text, else the JSON dumped compactly, else the raw body.
pub fn buffered_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => extract_text(&parsed).unwrap_or_else(|| parsed.to_string()),
        Err(_) => body.to_string(),
    }
}
