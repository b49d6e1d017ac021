// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! courier: CLI client for the courier daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod daemon_process;
mod output;

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use client::{default_socket_path, ClientError};

#[derive(Parser)]
#[command(name = "courier", version, about = "Courier agent daemon CLI")]
struct Cli {
    /// Daemon socket path (default: platform runtime dir)
    #[arg(short = 's', long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon lifecycle
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
    /// Agent sessions
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Channel adapters
    Channel {
        #[command(subcommand)]
        command: ChannelCommand,
    },
    /// Conversation bindings
    Conversation {
        #[command(subcommand)]
        command: ConversationCommand,
    },
    /// Stream daemon logs
    Logs {
        /// Minimum level (trace|debug|info|warn|error)
        #[arg(short, long)]
        level: Option<String>,
    },
    /// Check daemon liveness
    Ping,
    /// Show daemon status
    Status,
    /// Daemon configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Guidance onboarding
    Onboard {
        #[command(subcommand)]
        command: OnboardCommand,
    },
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop {
        /// Hard shutdown with per-priority timeouts
        #[arg(long)]
        hard: bool,
        /// Per-priority timeout in milliseconds (hard mode)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Show daemon status
    Status,
    /// Request a config reload (stub)
    Reload,
}

#[derive(Subcommand)]
enum AgentCommand {
    /// List live agent sessions
    List,
    /// Show one agent
    Get { id: String },
    /// Spawn a new agent session
    Spawn {
        /// Model identifier, provider/model-name
        #[arg(short, long)]
        model: Option<String>,
        /// Initial input message
        #[arg(short, long)]
        input: Option<String>,
        /// Tags to attach
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Send a message to a running agent
    Send { id: String, message: String },
    /// Terminate an agent
    Terminate { id: String },
    /// Pause an agent
    Pause { id: String },
    /// Resume a paused agent
    Resume { id: String },
    /// Snapshot an agent to a checkpoint
    Snapshot { id: String },
    /// List persisted checkpoints
    Checkpoints,
    /// Stream an agent's output events
    Watch { id: String },
}

#[derive(Subcommand)]
enum ChannelCommand {
    /// List channels
    List,
    /// Show one channel
    Get { id: String },
    /// Disconnect a channel
    Disconnect { id: String },
    /// Reconnect a channel
    Reconnect { id: String },
}

#[derive(Subcommand)]
enum ConversationCommand {
    /// List conversation bindings
    List {
        /// Filter by channel
        #[arg(long)]
        channel: Option<String>,
        /// Only bound conversations
        #[arg(long)]
        bound: bool,
        /// Only unbound conversations
        #[arg(long)]
        unbound: bool,
    },
    /// Show one conversation
    Get {
        channel: String,
        conversation_ref: String,
    },
    /// Unbind a conversation from its agent
    Unbind {
        channel: String,
        conversation_ref: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the safe config subset
    Get,
    /// Validate the configuration
    Validate,
}

#[derive(Subcommand)]
enum OnboardCommand {
    /// Show onboarding status
    Status,
    /// Run onboarding
    Execute,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(default_socket_path);

    match run(cli.command, &socket).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", format_error(&e));
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Render the full error chain on one line.
fn format_error(error: &anyhow::Error) -> String {
    error
        .chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

/// Map errors onto the exit-code categories; client errors carry their own.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ClientError>()
        .map_or(1, ClientError::exit_code)
}

async fn run(command: Command, socket: &std::path::Path) -> anyhow::Result<i32> {
    match command {
        Command::Daemon { command } => match command {
            DaemonCommand::Start => commands::daemon::start(socket).await?,
            DaemonCommand::Stop { hard, timeout_ms } => {
                commands::daemon::stop(socket, hard, timeout_ms).await?
            }
            DaemonCommand::Status => commands::daemon::status(socket).await?,
            DaemonCommand::Reload => commands::daemon::reload(socket).await?,
        },
        Command::Agent { command } => match command {
            AgentCommand::List => commands::agent::list(socket).await?,
            AgentCommand::Get { id } => commands::agent::get(socket, &id).await?,
            AgentCommand::Spawn { model, input, tag } => {
                commands::agent::spawn(socket, model.as_deref(), input.as_deref(), &tag).await?
            }
            AgentCommand::Send { id, message } => {
                commands::agent::send(socket, &id, &message).await?
            }
            AgentCommand::Terminate { id } => commands::agent::terminate(socket, &id).await?,
            AgentCommand::Pause { id } => commands::agent::pause(socket, &id).await?,
            AgentCommand::Resume { id } => commands::agent::resume(socket, &id).await?,
            AgentCommand::Snapshot { id } => commands::agent::snapshot(socket, &id).await?,
            AgentCommand::Checkpoints => commands::agent::checkpoints(socket).await?,
            AgentCommand::Watch { id } => commands::agent::watch(socket, &id).await?,
        },
        Command::Channel { command } => match command {
            ChannelCommand::List => commands::channel::list(socket).await?,
            ChannelCommand::Get { id } => commands::channel::get(socket, &id).await?,
            ChannelCommand::Disconnect { id } => {
                commands::channel::disconnect(socket, &id).await?
            }
            ChannelCommand::Reconnect { id } => commands::channel::reconnect(socket, &id).await?,
        },
        Command::Conversation { command } => match command {
            ConversationCommand::List {
                channel,
                bound,
                unbound,
            } => {
                let has_agent = match (bound, unbound) {
                    (true, true) => bail!("--bound and --unbound are mutually exclusive"),
                    (true, false) => Some(true),
                    (false, true) => Some(false),
                    (false, false) => None,
                };
                commands::conversation::list(socket, channel.as_deref(), has_agent).await?
            }
            ConversationCommand::Get {
                channel,
                conversation_ref,
            } => commands::conversation::get(socket, &channel, &conversation_ref).await?,
            ConversationCommand::Unbind {
                channel,
                conversation_ref,
            } => commands::conversation::unbind(socket, &channel, &conversation_ref).await?,
        },
        Command::Logs { level } => commands::logs::follow(socket, level.as_deref()).await?,
        Command::Ping => commands::daemon::ping(socket).await?,
        Command::Status => commands::daemon::status(socket).await?,
        Command::Config { command } => match command {
            ConfigCommand::Get => commands::config::get(socket).await?,
            ConfigCommand::Validate => {
                // Invalid configuration maps to the config exit category
                if !commands::config::validate(socket).await? {
                    return Ok(6);
                }
            }
        },
        Command::Onboard { command } => match command {
            OnboardCommand::Status => commands::onboard::status(socket).await?,
            OnboardCommand::Execute => commands::onboard::execute(socket).await?,
        },
    }
    Ok(0)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
