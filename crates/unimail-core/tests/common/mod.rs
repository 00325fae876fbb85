//! In-memory sessions, connector and token exchange shared by the
//! integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use unimail_core::{Connector, ImapSession, Pop3Session};
use unimail_imap::{FetchedMessage, SequenceRange};
use unimail_oauth::{TokenExchange, TokenOutcome};
use unimail_pop3::Stat;

/// A small RFC 5322 message whose subject is `m{n}`.
pub fn message(n: u32) -> Vec<u8> {
    format!(
        "From: Sender {n} <sender{n}@example.com>\r\n\
         To: me@example.com\r\n\
         Subject: m{n}\r\n\
         Message-ID: <{n}@example.com>\r\n\
         \r\n\
         body {n}\r\n"
    )
    .into_bytes()
}

/// Messages `1..=n`.
pub fn mailbox(n: u32) -> Vec<Vec<u8>> {
    (1..=n).map(message).collect()
}

pub fn subjects(messages: &[unimail_core::ParsedMessage]) -> Vec<String> {
    messages.iter().map(|m| m.subject.clone()).collect()
}

#[derive(Debug, Default)]
pub struct ImapState {
    pub password: String,
    pub accept_xoauth2: bool,
    pub messages: Vec<Vec<u8>>,
    pub log: Vec<String>,
    pub idling: bool,
    /// Successful IDLE entries left; `None` is unlimited.
    pub idle_budget: Option<usize>,
    /// STATUS commands left to fail.
    pub status_failures: usize,
    pub examine_fails: bool,
    /// FETCH waits this long before answering.
    pub fetch_stall: Option<Duration>,
}

impl ImapState {
    pub fn with_messages(messages: Vec<Vec<u8>>) -> Self {
        Self {
            password: "secret".to_string(),
            messages,
            ..Self::default()
        }
    }

    pub fn count(&self, command: &str) -> usize {
        self.log.iter().filter(|l| l.starts_with(command)).count()
    }
}

#[derive(Debug, Clone)]
pub struct FakeImap {
    pub state: Arc<Mutex<ImapState>>,
}

impl FakeImap {
    pub fn new(state: ImapState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn run<T>(
        &self,
        entry: String,
        f: impl FnOnce(&mut ImapState) -> unimail_imap::Result<T>,
    ) -> unimail_imap::Result<T> {
        let mut state = self.state.lock().unwrap();
        if state.idling && entry != "IDLE" && entry != "DONE" {
            return Err(unimail_imap::Error::InvalidState(format!(
                "{entry} while idling"
            )));
        }
        state.log.push(entry);
        f(&mut state)
    }
}

impl ImapSession for FakeImap {
    async fn login(&mut self, user: &str, password: &str) -> unimail_imap::Result<()> {
        self.run(format!("LOGIN {user}"), |s| {
            if s.password == password {
                Ok(())
            } else {
                Err(unimail_imap::Error::Auth("invalid credentials".into()))
            }
        })
    }

    async fn authenticate_xoauth2(&mut self, initial_response: &str) -> unimail_imap::Result<()> {
        self.run(format!("AUTHENTICATE XOAUTH2 {initial_response}"), |s| {
            if s.accept_xoauth2 {
                Ok(())
            } else {
                Err(unimail_imap::Error::Auth("AUTHENTICATE failed".into()))
            }
        })
    }

    async fn list_mailboxes(&mut self) -> unimail_imap::Result<Vec<String>> {
        self.run("LIST".into(), |_| {
            Ok(vec!["INBOX".into(), "Sent".into(), "Archive/2024".into()])
        })
    }

    async fn examine(&mut self, mailbox: &str) -> unimail_imap::Result<u32> {
        self.run(format!("EXAMINE {mailbox}"), |s| {
            if s.examine_fails {
                Err(unimail_imap::Error::No("no such mailbox".into()))
            } else {
                Ok(u32::try_from(s.messages.len()).unwrap())
            }
        })
    }

    async fn message_count(&mut self, mailbox: &str) -> unimail_imap::Result<u32> {
        self.run(format!("STATUS {mailbox}"), |s| {
            if s.status_failures > 0 {
                s.status_failures -= 1;
                Err(unimail_imap::Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "status timed out",
                )))
            } else {
                Ok(u32::try_from(s.messages.len()).unwrap())
            }
        })
    }

    async fn fetch(&mut self, range: SequenceRange) -> unimail_imap::Result<Vec<FetchedMessage>> {
        let stall = self.state.lock().unwrap().fetch_stall;
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        self.run(format!("FETCH {range}"), |s| {
            Ok((range.start()..=range.end())
                .filter_map(|seq| {
                    let raw = s.messages.get(usize::try_from(seq).ok()? - 1)?;
                    Some(FetchedMessage {
                        seq,
                        body: Some(raw.clone()),
                        ..FetchedMessage::default()
                    })
                })
                .collect())
        })
    }

    async fn idle_start(&mut self) -> unimail_imap::Result<()> {
        self.run("IDLE".into(), |s| {
            if s.idling {
                return Err(unimail_imap::Error::InvalidState("already idling".into()));
            }
            match &mut s.idle_budget {
                Some(0) => Err(unimail_imap::Error::Bad("IDLE not allowed".into())),
                Some(left) => {
                    *left -= 1;
                    s.idling = true;
                    Ok(())
                }
                None => {
                    s.idling = true;
                    Ok(())
                }
            }
        })
    }

    async fn idle_stop(&mut self) -> unimail_imap::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.idling {
            state.idling = false;
            state.log.push("DONE".into());
        }
        Ok(())
    }

    async fn close(&mut self) -> unimail_imap::Result<()> {
        self.run("LOGOUT".into(), |_| Ok(()))
    }
}

#[derive(Debug, Default)]
pub struct Pop3State {
    pub password: String,
    pub messages: Vec<Vec<u8>>,
    pub log: Vec<String>,
    pub stat_fails: bool,
}

impl Pop3State {
    pub fn with_messages(messages: Vec<Vec<u8>>) -> Self {
        Self {
            password: "secret".to_string(),
            messages,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakePop3 {
    pub state: Arc<Mutex<Pop3State>>,
}

impl FakePop3 {
    pub fn new(state: Pop3State) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl Pop3Session for FakePop3 {
    async fn login(&mut self, user: &str, password: &str) -> unimail_pop3::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("USER {user}"));
        if state.password == password {
            Ok(())
        } else {
            Err(unimail_pop3::Error::Auth("invalid password".into()))
        }
    }

    async fn stat(&mut self) -> unimail_pop3::Result<Stat> {
        let mut state = self.state.lock().unwrap();
        state.log.push("STAT".into());
        if state.stat_fails {
            return Err(unimail_pop3::Error::Err("maildrop locked".into()));
        }
        Ok(Stat {
            count: u32::try_from(state.messages.len()).unwrap(),
            size: state.messages.iter().map(|m| m.len() as u64).sum(),
        })
    }

    async fn retrieve(&mut self, index: u32) -> unimail_pop3::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("RETR {index}"));
        state
            .messages
            .get(index as usize - 1)
            .cloned()
            .ok_or_else(|| unimail_pop3::Error::Err("no such message".into()))
    }

    async fn quit(&mut self) -> unimail_pop3::Result<()> {
        self.state.lock().unwrap().log.push("QUIT".into());
        Ok(())
    }
}

/// Hands out sessions over shared state and counts dials.
#[derive(Debug)]
pub struct FakeConnector {
    pub imap: FakeImap,
    pub pop3: FakePop3,
    pub refuse: bool,
    pub imap_connects: AtomicUsize,
    pub pop3_connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(imap: ImapState, pop3: Pop3State) -> Self {
        Self {
            imap: FakeImap::new(imap),
            pop3: FakePop3::new(pop3),
            refuse: false,
            imap_connects: AtomicUsize::new(0),
            pop3_connects: AtomicUsize::new(0),
        }
    }

    pub fn dials(&self) -> usize {
        self.imap_connects.load(Ordering::SeqCst) + self.pop3_connects.load(Ordering::SeqCst)
    }

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
    }
}

impl Connector for FakeConnector {
    type Imap = FakeImap;
    type Pop3 = FakePop3;

    async fn connect_imap(&self, _host: &str, _port: u16) -> unimail_imap::Result<FakeImap> {
        self.imap_connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(Self::refused().into());
        }
        Ok(self.imap.clone())
    }

    async fn connect_pop3(&self, _host: &str, _port: u16) -> unimail_pop3::Result<FakePop3> {
        self.pop3_connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(Self::refused().into());
        }
        Ok(self.pop3.clone())
    }
}

/// Token exchange with a canned outcome.
#[derive(Debug)]
pub struct FakeExchange {
    outcome: fn() -> TokenOutcome,
    pub calls: AtomicUsize,
}

impl FakeExchange {
    pub fn new(outcome: fn() -> TokenOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenExchange for FakeExchange {
    async fn exchange(
        &self,
        _refresh_token: &str,
        _client_id: &str,
    ) -> unimail_oauth::Result<TokenOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.outcome)())
    }
}
