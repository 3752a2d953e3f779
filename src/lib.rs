//! Bulk IMAP mailbox archiver
//!
//! Finds every message in one mailbox dated before a cutoff and saves
//! each as `<directory>/<sequence number>.eml`. The run has two
//! phases: a single session enumerates the matching sequence numbers,
//! then a fixed pool of workers, each with its own session, drains a
//! shared queue of them.
//!
//! Sequence numbers are relative to the mailbox state a session saw.
//! Workers reuse the enumerated numbers in their own sessions, which
//! assumes nothing is expunged from the mailbox while the run is in
//! progress.

mod archiver;
mod config;
mod connection;
mod enumerate;
mod error;
mod persist;
mod pool;
mod progress;
mod session;
#[cfg(test)]
mod testing;

pub use archiver::{Archiver, Enumeration, RunSummary};
pub use config::{
    ArchiveConfig, DEFAULT_AGE_MONTHS, DEFAULT_PROGRESS_EVERY, DEFAULT_WORKERS, ImapConfig,
    Security,
};
pub use enumerate::{cutoff_date, enumerate};
pub use error::{Error, Result};
pub use persist::{EXTENSION, Persister};
pub use pool::{PoolReport, WorkerOutcome, WorkerPool, WorkerReport};
pub use progress::Progress;
pub use session::{Connector, Fetched, ImapConnector, MailSession, SelectedMailbox, SeqNum, imap_date};
