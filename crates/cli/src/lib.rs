pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use saldo_core::config::{AgentTransport, AppConfig, LogFormat};
use tracing::Level;

use crate::commands::chat::ChatOptions;

#[derive(Debug, Parser)]
#[command(
    name = "saldo",
    about = "Bank balance assistant CLI",
    long_about = "Chat with the hosted balance-lookup agent, query balances directly, and inspect configuration.",
    after_help = "Examples:\n  saldo chat --stream\n  saldo balance 001\n  saldo config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a saldo.toml configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation with the agent")]
    Chat {
        #[arg(long, help = "Render the reply incrementally as it streams in")]
        stream: bool,
        #[arg(long, help = "Session id to resume (short ids are padded, long ones truncated)")]
        session: Option<String>,
        #[arg(long, help = "Agent runtime ARN; skips lookup by agent name")]
        runtime_arn: Option<String>,
        #[arg(long, help = "Call shape: runtime or converse")]
        transport: Option<AgentTransport>,
    },
    #[command(about = "Look up one account balance through the Data API")]
    Balance {
        #[arg(help = "Account number to look up")]
        account_number: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { stream, session, runtime_arn, transport } => {
            commands::chat::run(ChatOptions {
                config_path: cli.config,
                stream,
                session,
                runtime_arn,
                transport,
            })
        }
        Command::Balance { account_number } => commands::balance::run(cli.config, &account_number),
        Command::Config => commands::config::run(cli.config),
    };

    if result.is_success() {
        if !result.output.is_empty() {
            println!("{}", result.output);
        }
    } else {
        eprintln!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Stdout carries the conversation, so logs always go to stderr.
pub fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when commands run in-process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
