//! Two-phase archive run
//!
//! Enumeration finishes before any worker starts, and its result is
//! the only input to the download phase.

use crate::config::ArchiveConfig;
use crate::enumerate::{cutoff_date, enumerate};
use crate::error::Result;
use crate::persist::Persister;
use crate::pool::{WorkerPool, WorkerReport};
use crate::session::{Connector, ImapConnector, SeqNum};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Messages found by the enumeration phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub cutoff: NaiveDate,
    pub seqs: Vec<SeqNum>,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cutoff: NaiveDate,
    pub directory: PathBuf,
    pub total: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed_workers: usize,
    pub workers: Vec<WorkerReport>,
}

/// Archives old messages from one mailbox.
pub struct Archiver<C: Connector = ImapConnector> {
    connector: Arc<C>,
    directory: PathBuf,
    workers: usize,
    progress_every: u64,
    age_months: u32,
}

impl Archiver<ImapConnector> {
    #[must_use]
    pub fn new(config: ArchiveConfig) -> Self {
        let connector = ImapConnector::new(config.imap.clone(), config.mailbox.clone());
        Self::with_connector(connector, &config)
    }
}

impl<C: Connector> Archiver<C> {
    /// Use `connector` for sessions; the IMAP part of `config` is
    /// ignored.
    #[must_use]
    pub fn with_connector(connector: C, config: &ArchiveConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            directory: config.directory.clone(),
            workers: config.workers,
            progress_every: config.progress_every,
            age_months: config.age_months,
        }
    }

    /// Find every message older than the configured age, as of `today`.
    ///
    /// # Errors
    ///
    /// Any connect, login, select or search failure. These end the run.
    pub async fn enumerate(&self, today: NaiveDate) -> Result<Enumeration> {
        let cutoff = cutoff_date(today, self.age_months)?;
        let seqs = enumerate(self.connector.as_ref(), cutoff).await?;
        Ok(Enumeration { cutoff, seqs })
    }

    /// Download everything in `enumeration` into the destination
    /// directory, creating it first if needed.
    ///
    /// Individual messages and workers may fail without failing the
    /// run; the summary says how many were saved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the destination directory cannot
    /// be created.
    pub async fn download(&self, enumeration: Enumeration) -> Result<RunSummary> {
        let persister = Persister::create(&self.directory).await?;

        let pool = WorkerPool::new(
            Arc::clone(&self.connector),
            persister,
            self.workers,
            self.progress_every,
        );
        let report = pool.run(enumeration.seqs).await;

        let total = report.progress.total();
        let completed = report.completed();
        info!(completed, total, "Archive run finished");

        Ok(RunSummary {
            cutoff: enumeration.cutoff,
            directory: self.directory.clone(),
            total,
            completed,
            skipped: total.saturating_sub(completed),
            failed_workers: report.failed_workers(),
            workers: report.workers,
        })
    }

    /// Enumerate, then download.
    ///
    /// # Errors
    ///
    /// See [`Self::enumerate`] and [`Self::download`].
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        let enumeration = self.enumerate(today).await?;
        self.download(enumeration).await
    }
}
