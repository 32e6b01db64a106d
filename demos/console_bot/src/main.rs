//! Console Bot Example
//!
//! Runs a jibber bot without an XMPP server: every line typed on stdin is
//! delivered to the bot as a groupchat message, and everything the bot sends
//! is printed as `<nickname>: <body>`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot
//! cargo run --package console-bot -- --config demos/console_bot/jibber.toml
//! ```
//!
//! Then type, for example:
//!
//! ```text
//! bot: hi
//! bot: go make some tea!
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use jibber::core::InboundEvent;
use jibber::prelude::*;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

// ============================================================================
// Handlers
// ============================================================================

/// Acknowledges whatever it is told to do.
struct FakeActions;

impl FakeActions {
    /// Expects a trigger with one captured group, such as
    /// `^%(nickname)s: go (.*)`.
    fn do_things(&self, msg: &Message, matched: Option<&Match>) -> HandlerResult {
        let action = matched
            .and_then(|m| m.group(1))
            .ok_or_else(|| anyhow!("do_things needs a trigger with a captured action"))?;
        let action = action.trim_end_matches(['.', '?', '!', ',']);
        Ok(Reply::text(format!("{}: Okay, I will {action}.", msg.nick)))
    }
}

impl Handler for FakeActions {
    fn methods() -> Methods<Self> {
        Methods::new().legacy("do_things", Self::do_things)
    }
}

struct Greeter;

impl Greeter {
    fn say_hi(&self, msg: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
        Ok(Reply::text(format!("hi {}", msg.nick)))
    }
}

impl Handler for Greeter {
    fn methods() -> Methods<Self> {
        Methods::new().method("say_hi", Self::say_hi)
    }
}

fn catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with("demo.FakeActions", |_: &Value| Ok(FakeActions))
        .with("demo.Greeter", |_: &Value| Ok(Greeter))
}

/// Packages used when no configuration file is given.
fn default_config() -> JibberConfig {
    JibberConfig {
        client: ClientConfig {
            packages: vec![
                HandlerDescriptor::new("demo.Greeter").command("^%(nickname)s: hi", "say_hi"),
                HandlerDescriptor::new("demo.FakeActions")
                    .command("^%(nickname)s: go (.*)", "do_things"),
            ],
            ..Default::default()
        },
        ..Default::default()
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Parser, Debug)]
#[command(version, about = "Talk to a jibber bot from the terminal")]
struct Args {
    /// Configuration file. Without one the built-in demo packages are used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured nickname.
    #[arg(short, long)]
    nickname: Option<String>,

    /// Room the typed messages appear to come from.
    #[arg(short, long, default_value = "room@chat.example.com")]
    room: String,

    /// Nickname the typed messages appear to come from.
    #[arg(short, long, default_value = "Tester")]
    user: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = JibberRuntime::builder().catalog(catalog());
    builder = match &args.config {
        Some(path) => builder.config_file(path),
        None => builder.merge(default_config()),
    };
    let runtime = builder.build().context("failed to start the bot")?;
    if let Some(nickname) = &args.nickname {
        runtime.dispatcher().set_nickname(nickname.clone());
    }

    let mut outbound = runtime
        .take_outbound()
        .context("outbound channel already taken")?;
    let dispatcher = Arc::downgrade(runtime.dispatcher());
    let printer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let nickname = dispatcher.upgrade().map(|d| d.nickname()).unwrap_or_default();
            println!("{nickname}: {}", message.body);
        }
    });

    let inbound = runtime
        .take_inbound()
        .context("inbound channel already taken")?;
    let (room, user) = (args.room, args.user);
    let reader = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if inbound
                        .send(InboundEvent::Message(Message::groupchat(&room, &user, line)))
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("End of input");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read from stdin");
                    break;
                }
            }
        }
    };

    info!("Type messages for the bot; Ctrl+D or Ctrl+C to quit");
    runtime
        .run_until(async {
            tokio::select! {
                _ = reader => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        })
        .await?;

    // the dispatcher owns the last outbound sender
    drop(runtime);
    printer.await?;
    Ok(())
}
