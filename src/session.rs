//! Mailbox sessions
//!
//! A session is one authenticated connection with a selected mailbox.
//! It is owned by exactly one enumeration pass or one worker and is
//! never shared. [`Connector`] opens sessions; [`MailSession`] is the
//! set of protocol operations the archiver needs from one.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use futures::StreamExt;
use std::future::Future;
use tracing::{debug, warn};

/// A message sequence number within the selected mailbox.
///
/// Only meaningful for the mailbox state it was observed in; it shifts
/// when messages are expunged.
pub type SeqNum = u32;

/// Result of fetching one message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// The server returned no message for the sequence number.
    Missing,
    /// A message came back but without a body section.
    NoBody,
    /// The raw message bytes.
    Body(Vec<u8>),
}

/// Protocol operations on a session with a selected mailbox.
pub trait MailSession: Send + Sized {
    /// Sequence numbers of messages dated strictly before `cutoff`, in
    /// ascending order.
    fn search_before(
        &mut self,
        cutoff: NaiveDate,
    ) -> impl Future<Output = Result<Vec<SeqNum>>> + Send;

    /// Fetch the raw body of message `seq`.
    ///
    /// The fetch is fully closed before this returns. Errors while
    /// closing it after the body was received are logged, not returned.
    fn fetch_body(&mut self, seq: SeqNum) -> impl Future<Output = Result<Fetched>> + Send;

    /// End the session.
    fn logout(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens sessions with the target mailbox selected.
pub trait Connector: Send + Sync + 'static {
    type Session: MailSession + 'static;

    /// Connect, authenticate and select the mailbox.
    fn open(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Format a date the way IMAP `SEARCH` expects it (`1-Jan-2024`).
#[must_use]
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

/// [`Connector`] backed by a real IMAP server.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: ImapConfig,
    mailbox: String,
}

impl ImapConnector {
    #[must_use]
    pub fn new(config: ImapConfig, mailbox: impl Into<String>) -> Self {
        Self {
            config,
            mailbox: mailbox.into(),
        }
    }

    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }
}

impl Connector for ImapConnector {
    type Session = SelectedMailbox;

    async fn open(&self) -> Result<SelectedMailbox> {
        let mut session = connection::connect(&self.config).await?;

        if let Err(e) = connection::select(&mut session, &self.mailbox).await {
            session.logout().await.ok();
            return Err(e);
        }

        Ok(SelectedMailbox { session })
    }
}

/// An IMAP session with the mailbox selected.
pub struct SelectedMailbox {
    session: ImapSession,
}

impl MailSession for SelectedMailbox {
    async fn search_before(&mut self, cutoff: NaiveDate) -> Result<Vec<SeqNum>> {
        let query = format!("BEFORE {}", imap_date(cutoff));
        let found = self
            .session
            .search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut seqs: Vec<SeqNum> = found.into_iter().collect();
        seqs.sort_unstable();
        debug!(query, count = seqs.len(), "Search completed");
        Ok(seqs)
    }

    async fn fetch_body(&mut self, seq: SeqNum) -> Result<Fetched> {
        let mut messages = self
            .session
            .fetch(seq.to_string(), "BODY.PEEK[]")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed for {seq}: {e}")))?;

        // Drain the whole response so the session is ready for the
        // next command.
        let mut outcome: Option<Result<Fetched>> = None;
        while let Some(item) = messages.next().await {
            match item {
                Ok(msg) if outcome.is_none() && msg.message == seq => {
                    outcome = Some(Ok(msg
                        .body()
                        .map_or(Fetched::NoBody, |body| Fetched::Body(body.to_vec()))));
                }
                Ok(_) => {}
                Err(e) if outcome.is_none() => {
                    outcome = Some(Err(Error::Imap(format!(
                        "Collect failed for {seq}: {e}"
                    ))));
                }
                Err(e) => {
                    warn!(seq, error = %e, "Error closing fetch");
                }
            }
        }
        drop(messages);

        outcome.unwrap_or(Ok(Fetched::Missing))
    }

    async fn logout(mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| Error::Imap(format!("Logout failed: {e}")))
    }
}
