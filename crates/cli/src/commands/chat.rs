use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use futures_util::{stream, Stream};

use saldo_agent::runtime::{resolve_runtime_arn, RuntimeSettings};
use saldo_agent::{
    AgentCoreClient, ConversationDriver, ConverseClient, Delivery, InvocationBoundary,
};
use saldo_core::config::{AgentTransport, AppConfig, ConfigOverrides};
use saldo_core::domain::session::SessionId;
use tokio::sync::mpsc;
use tracing::info;

use crate::commands::{current_thread_runtime, load_config, CommandResult};

const COMMAND: &str = "chat";

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub config_path: Option<PathBuf>,
    pub stream: bool,
    pub session: Option<String>,
    pub runtime_arn: Option<String>,
    pub transport: Option<AgentTransport>,
}

type Failure = (&'static str, String, u8);

pub fn run(options: ChatOptions) -> CommandResult {
    let overrides = ConfigOverrides {
        agent_runtime_arn: options.runtime_arn,
        agent_transport: options.transport,
        session_id: options.session,
    };
    let config = match load_config(COMMAND, options.config_path, overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let delivery = Delivery::from_stream_flag(options.stream);
    let result = runtime.block_on(async {
        let boundary = connect(&config).await?;
        let session = SessionId::normalize(config.agent.session_id.as_deref());
        converse(boundary, session, delivery)
            .await
            .map_err(|error| ("io", format!("conversation aborted: {error}"), 4u8))
    });

    match result {
        Ok(()) => CommandResult::silent(),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}

/// Builds the configured invocation adapter, resolving the runtime ARN by
/// agent name when none is configured.
async fn connect(config: &AppConfig) -> Result<Box<dyn InvocationBoundary>, Failure> {
    let runtime_arn = match config.agent.runtime_arn.clone() {
        Some(arn) => arn,
        None => resolve_runtime_arn(config, &config.agent.name)
            .await
            .map_err(|error| {
                ("agent_runtime", format!("could not list agent runtimes: {error}"), 1u8)
            })?
            .ok_or_else(|| {
                (
                    "agent_runtime",
                    format!(
                        "AGENT_RUNTIME_ARN is not set and no agent runtime is named `{}`",
                        config.agent.name
                    ),
                    1u8,
                )
            })?,
    };

    info!(
        event_name = "chat.connect",
        runtime_arn = %runtime_arn,
        transport = ?config.agent.transport,
        "connecting to agent"
    );

    let boundary: Box<dyn InvocationBoundary> = match config.agent.transport {
        AgentTransport::Runtime => {
            Box::new(AgentCoreClient::new(RuntimeSettings::from_config(config, runtime_arn)))
        }
        AgentTransport::Converse => Box::new(ConverseClient::from_config(config, runtime_arn)),
    };
    Ok(boundary)
}

async fn converse(
    boundary: Box<dyn InvocationBoundary>,
    session: SessionId,
    delivery: Delivery,
) -> io::Result<()> {
    println!("(session_id = {session})  /session shows it, /new starts over, /exit quits");

    let mut driver = ConversationDriver::new(boundary, session, delivery);
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    driver.run(stdin_lines(), &mut stdout, &mut stderr, tokio::signal::ctrl_c()).await
}

/// Stdin lines read on a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it must not belong to the
/// runtime: dropping the runtime after an interrupt would wait for the next
/// line.
fn stdin_lines() -> impl Stream<Item = io::Result<String>> + Unpin {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let failed = line.is_err();
            if sender.send(line).is_err() || failed {
                break;
            }
        }
    });
    stream::poll_fn(move |cx| receiver.poll_recv(cx))
}
