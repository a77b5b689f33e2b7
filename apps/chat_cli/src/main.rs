use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{AuditChatClient, ChatEvent, IgnoreReason, SendOutcome};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{parse_line, ChatCommand, HELP};
use config::{load_settings, normalize_base_url};

#[derive(Parser, Debug)]
#[command(
    name = "audit-chat",
    about = "Chat with the financial audit service about CSV and PDF documents"
)]
struct Args {
    /// Root address of the audit service (overrides config and environment).
    #[arg(long)]
    api_base_url: Option<String>,
    /// Config file; defaults to ./chat_cli.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Document to stage before the first message. Repeatable.
    #[arg(long = "attach", value_name = "PATH")]
    attach: Vec<PathBuf>,
    /// Message to send right away.
    #[arg(long)]
    message: Option<String>,
    /// Exit after the first exchange instead of reading stdin.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    let api_base_url = normalize_base_url(&settings.api_base_url)?;
    info!(%api_base_url, "starting audit chat");

    let client = AuditChatClient::with_http(api_base_url);
    let renderer = spawn_renderer(client.subscribe_events());

    for path in &args.attach {
        if let Err(err) = client.attach_path(path).await {
            eprintln!("cannot attach {}: {err}", path.display());
        }
    }
    if args.message.is_some() || !args.attach.is_empty() {
        let text = args.message.unwrap_or_default();
        report_ignored(&client.send(&text).await);
    }

    if !args.once {
        println!("{HELP}");
        run_interactive(&client).await?;
    }

    drop(client);
    let _ = renderer.await;
    Ok(())
}

/// Prints log entries as the controller appends them. Never mutates state.
fn spawn_renderer(mut events: broadcast::Receiver<ChatEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChatEvent::MessageAppended(message)) => {
                    println!("{}", render::format_message(&message))
                }
                Ok(ChatEvent::BusyChanged(true)) => println!("… waiting for the audit service"),
                Ok(ChatEvent::Cleared) => println!("(conversation cleared)"),
                Ok(ChatEvent::SessionChanged(session)) => {
                    info!(session = %render::format_session(&session), "session changed")
                }
                Ok(ChatEvent::StagingChanged(_) | ChatEvent::BusyChanged(false)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "renderer fell behind; some entries were not printed")
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn report_ignored(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Ignored(IgnoreReason::Busy) => {
            eprintln!("still waiting on the previous message; try again when it finishes")
        }
        SendOutcome::Ignored(IgnoreReason::EmptyMessage) => {}
        SendOutcome::Completed(_) | SendOutcome::Discarded => {}
    }
}

async fn run_interactive(client: &Arc<AuditChatClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match command {
            ChatCommand::Send(text) => {
                if client.is_busy() {
                    report_ignored(&SendOutcome::Ignored(IgnoreReason::Busy));
                    continue;
                }
                // Sends run in the background so staging stays usable meanwhile.
                let client = client.clone();
                in_flight = Some(tokio::spawn(async move {
                    report_ignored(&client.send(&text).await);
                }));
            }
            ChatCommand::Attach(path) => {
                if let Err(err) = client.attach_path(&path).await {
                    eprintln!("cannot attach {}: {err}", path.display());
                }
            }
            ChatCommand::Remove(kind) => match client.remove(kind).await {
                Some(file) => println!("removed {}", file.name),
                None => println!("no {kind} document staged"),
            },
            ChatCommand::Clear => client.clear().await,
            ChatCommand::Status => println!("{}", render::format_status(&client.snapshot().await)),
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Quit => break,
        }
    }

    if let Some(handle) = in_flight {
        if !handle.is_finished() {
            println!("abandoning the outstanding request");
            handle.abort();
        }
        let _ = handle.await;
    }
    Ok(())
}
