//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use unimail_core::{DEFAULT_FETCH_COUNT, DEFAULT_MAILBOX, FetchOptions, MonitorOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the account file (JSON)
    #[arg(short, long, env = "UNIMAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Password, overriding the one in the account file
    #[arg(long, env = "UNIMAIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List mailboxes
    List,
    /// Print the most recent messages
    Fetch {
        /// Number of messages
        #[arg(short = 'n', long, default_value_t = DEFAULT_FETCH_COUNT)]
        count: u32,
        /// Mailbox to read (ignored for POP3)
        #[arg(short, long, default_value = DEFAULT_MAILBOX)]
        mailbox: String,
        /// Print messages as JSON
        #[arg(long)]
        json: bool,
    },
    /// Wait for new messages
    Monitor {
        /// Stop after this many new messages
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        /// Mailbox to watch
        #[arg(short, long, default_value = DEFAULT_MAILBOX)]
        mailbox: String,
        /// Give up after this many seconds
        #[arg(short, long, default_value_t = 300)]
        timeout: u64,
        /// Print messages as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    /// Resolves the account file: `--config`, else
    /// `<config dir>/unimail/account.json`.
    pub fn config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config {
            return Ok(path.clone());
        }
        let dir = dirs::config_dir().context("no configuration directory on this platform")?;
        Ok(dir.join("unimail").join("account.json"))
    }
}

pub fn fetch_options(count: u32, mailbox: &str) -> FetchOptions {
    FetchOptions::new().with_count(count).with_mailbox(mailbox)
}

pub fn monitor_options(count: u32, mailbox: &str, timeout: u64) -> MonitorOptions {
    MonitorOptions::new()
        .with_count(count)
        .with_mailbox(mailbox)
        .with_timeout(Duration::from_secs(timeout))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_defaults() {
        let args = Args::try_parse_from(["unimail", "fetch"]).unwrap();
        match args.command {
            Command::Fetch {
                count,
                mailbox,
                json,
            } => {
                assert_eq!(count, 10);
                assert_eq!(mailbox, "INBOX");
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_monitor_flags() {
        let args = Args::try_parse_from([
            "unimail", "--config", "/tmp/a.json", "monitor", "-n", "3", "-m", "Work", "-t", "60",
        ])
        .unwrap();
        assert_eq!(args.config_path().unwrap(), PathBuf::from("/tmp/a.json"));
        let Command::Monitor {
            count,
            mailbox,
            timeout,
            ..
        } = args.command
        else {
            panic!("expected monitor");
        };
        let options = monitor_options(count, &mailbox, timeout);
        assert_eq!(options.count, 3);
        assert_eq!(options.mailbox, "Work");
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.poll_interval, Duration::from_secs(3));
    }
}
