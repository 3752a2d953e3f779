//! In-memory [`Connector`] for unit tests.
//!
//! A `ScriptedMailbox` decides what each sequence number returns; the
//! `ScriptedConnector` records every session it hands out and every
//! fetch made through them.

use crate::error::{Error, Result};
use crate::session::{Connector, Fetched, MailSession, SeqNum};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedMailbox {
    messages: BTreeMap<SeqNum, Fetched>,
    failing_fetches: HashSet<SeqNum>,
    search: Option<Vec<SeqNum>>,
    search_fails: bool,
    logout_fails: bool,
}

impl ScriptedMailbox {
    /// Messages `1..=count`, each with a distinct body.
    pub(crate) fn with_messages(count: u32) -> Self {
        Self {
            messages: (1..=count)
                .map(|seq| (seq, Fetched::Body(Self::body_of(seq))))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn body_of(seq: SeqNum) -> Vec<u8> {
        format!("Subject: message {seq}\r\n\r\nbody {seq}").into_bytes()
    }

    pub(crate) fn search_result(mut self, seqs: Vec<SeqNum>) -> Self {
        self.search = Some(seqs);
        self
    }

    pub(crate) fn missing(mut self, seq: SeqNum) -> Self {
        self.messages.insert(seq, Fetched::Missing);
        self
    }

    pub(crate) fn without_body(mut self, seq: SeqNum) -> Self {
        self.messages.insert(seq, Fetched::NoBody);
        self
    }

    pub(crate) fn failing_fetch(mut self, seq: SeqNum) -> Self {
        self.failing_fetches.insert(seq);
        self
    }

    pub(crate) const fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    pub(crate) const fn failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }
}

#[derive(Debug, Default)]
struct Journal {
    opens: AtomicUsize,
    logouts: AtomicUsize,
    searches: Mutex<Vec<NaiveDate>>,
    fetches: Mutex<Vec<(usize, SeqNum)>>,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedConnector {
    mailbox: Arc<ScriptedMailbox>,
    failing_opens: usize,
    journal: Arc<Journal>,
}

impl ScriptedConnector {
    pub(crate) fn new(mailbox: ScriptedMailbox) -> Self {
        Self {
            mailbox: Arc::new(mailbox),
            failing_opens: 0,
            journal: Arc::new(Journal::default()),
        }
    }

    /// Reject the first `count` session opens as a login failure.
    pub(crate) const fn fail_opens(mut self, count: usize) -> Self {
        self.failing_opens = count;
        self
    }

    pub(crate) fn logouts(&self) -> usize {
        self.journal.logouts.load(Ordering::SeqCst)
    }

    pub(crate) fn opens(&self) -> usize {
        self.journal.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn searched_with(&self) -> Vec<NaiveDate> {
        self.journal.searches.lock().unwrap().clone()
    }

    /// Every `(session, seq)` fetch, in the order they happened.
    pub(crate) fn fetches(&self) -> Vec<(usize, SeqNum)> {
        self.journal.fetches.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn open(&self) -> Result<ScriptedSession> {
        let attempt = self.journal.opens.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if attempt < self.failing_opens {
            return Err(Error::Auth("scripted login rejection".into()));
        }
        Ok(ScriptedSession {
            id: attempt,
            mailbox: Arc::clone(&self.mailbox),
            journal: Arc::clone(&self.journal),
        })
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedSession {
    id: usize,
    mailbox: Arc<ScriptedMailbox>,
    journal: Arc<Journal>,
}

impl MailSession for ScriptedSession {
    async fn search_before(&mut self, cutoff: NaiveDate) -> Result<Vec<SeqNum>> {
        self.journal.searches.lock().unwrap().push(cutoff);
        if self.mailbox.search_fails {
            return Err(Error::Imap("scripted search failure".into()));
        }
        let mut seqs = self
            .mailbox
            .search
            .clone()
            .unwrap_or_else(|| self.mailbox.messages.keys().copied().collect());
        seqs.sort_unstable();
        Ok(seqs)
    }

    async fn fetch_body(&mut self, seq: SeqNum) -> Result<Fetched> {
        self.journal.fetches.lock().unwrap().push((self.id, seq));
        tokio::task::yield_now().await;
        if self.mailbox.failing_fetches.contains(&seq) {
            return Err(Error::Imap(format!("scripted fetch failure for {seq}")));
        }
        Ok(self
            .mailbox
            .messages
            .get(&seq)
            .cloned()
            .unwrap_or(Fetched::Missing))
    }

    async fn logout(self) -> Result<()> {
        self.journal.logouts.fetch_add(1, Ordering::SeqCst);
        if self.mailbox.logout_fails {
            return Err(Error::Imap("scripted logout failure".into()));
        }
        Ok(())
    }
}
