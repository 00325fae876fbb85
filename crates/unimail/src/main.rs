//! `unimail` - list, fetch and watch mail from the command line.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unimail_core::{Client, LoginParams, MailClient, ParsedMessage, auto_login};

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unimail=info,unimail_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let path = args.config_path()?;
    let mut params = LoginParams::from_json_file(&path)
        .with_context(|| format!("failed to load account from {}", path.display()))?;
    if let Some(password) = args.password {
        params.password = password;
    }

    info!(host = %params.host, protocol = %params.protocol, "connecting");
    let mut client = auto_login(&params)
        .await
        .with_context(|| format!("login to {} failed", params.host))?;

    let result = run(&mut client, args.command).await;
    if let Err(e) = client.close().await {
        warn!(error = %e, "closing session");
    }
    result
}

async fn run(client: &mut Client, command: Command) -> Result<()> {
    match command {
        Command::List => {
            for name in client.list_mailboxes().await? {
                println!("{name}");
            }
        }
        Command::Fetch {
            count,
            mailbox,
            json,
        } => {
            let messages = client
                .get_email(&cli::fetch_options(count, &mailbox))
                .await?;
            print_messages(&messages, json)?;
        }
        Command::Monitor {
            count,
            mailbox,
            timeout,
            json,
        } => {
            info!(%mailbox, count, timeout, "waiting for new mail");
            let messages = client
                .monit_email(&cli::monitor_options(count, &mailbox, timeout))
                .await?;
            if messages.is_empty() && !json {
                println!("no new messages");
            }
            print_messages(&messages, json)?;
        }
    }
    Ok(())
}

fn print_messages(messages: &[ParsedMessage], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }
    for message in messages {
        println!("{}", summary(message));
    }
    Ok(())
}

fn summary(message: &ParsedMessage) -> String {
    let from = message
        .from
        .first()
        .map_or("(unknown sender)", |a| a.name.as_deref().unwrap_or(&a.address));
    let marker = if message.is_seen() { ' ' } else { '*' };
    let attachments = match message.attachments.len() {
        0 => String::new(),
        n => format!(" [{n} attachment(s)]"),
    };
    format!(
        "{marker} {}  {from:<24}  {}{attachments}",
        message.internal_date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
        message.subject,
    )
}
