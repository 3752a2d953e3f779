//! Worker pool
//!
//! Every sequence number goes into one queue sized to hold them all,
//! the queue is closed, then a fixed number of workers drain it. Each
//! worker opens and owns its own session; the queue and the
//! [`Progress`] counter are the only shared state.
//!
//! A worker whose session cannot be set up exits without taking
//! anything from the queue. Nothing retries that setup or re-queues
//! work, so if every worker fails the remaining messages are skipped
//! for this run.

use crate::persist::Persister;
use crate::progress::Progress;
use crate::session::{Connector, Fetched, MailSession, SeqNum};
use async_channel::Receiver;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a single worker ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum WorkerOutcome {
    /// The session could not be opened; the worker took no messages.
    SetupFailed { error: String },
    /// The worker drained the queue.
    Drained { saved: u64, skipped: u64 },
    /// The worker task panicked or was cancelled.
    Aborted { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    #[serde(flatten)]
    pub outcome: WorkerOutcome,
}

/// Final state of a pool run.
#[derive(Debug)]
pub struct PoolReport {
    pub progress: Arc<Progress>,
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.progress.completed()
    }

    #[must_use]
    pub fn failed_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|r| !matches!(r.outcome, WorkerOutcome::Drained { .. }))
            .count()
    }
}

/// A fixed-size set of workers sharing one work queue.
pub struct WorkerPool<C: Connector> {
    connector: Arc<C>,
    persister: Persister,
    workers: usize,
    progress_every: u64,
}

impl<C: Connector> WorkerPool<C> {
    /// A pool of `workers` workers (at least one).
    #[must_use]
    pub fn new(connector: Arc<C>, persister: Persister, workers: usize, progress_every: u64) -> Self {
        Self {
            connector,
            persister,
            workers: workers.max(1),
            progress_every,
        }
    }

    /// Download every message in `seqs` and wait for all workers.
    pub async fn run(&self, seqs: Vec<SeqNum>) -> PoolReport {
        let progress = Arc::new(Progress::new(seqs.len() as u64, self.progress_every));
        if seqs.is_empty() {
            info!("Nothing to download; no workers started");
            return PoolReport {
                progress,
                workers: Vec::new(),
            };
        }

        let (sender, receiver) = async_channel::bounded(seqs.len());
        for seq in seqs {
            if sender.try_send(seq).is_err() {
                warn!(seq, "Work queue rejected message");
            }
        }
        sender.close();

        info!(
            workers = self.workers,
            total = progress.total(),
            "Starting worker pool"
        );

        let handles: Vec<_> = (1..=self.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    connector: Arc::clone(&self.connector),
                    queue: receiver.clone(),
                    persister: self.persister.clone(),
                    progress: Arc::clone(&progress),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(receiver);

        let workers = join_all(handles)
            .await
            .into_iter()
            .zip(1..)
            .map(|(joined, worker)| {
                joined.unwrap_or_else(|e| {
                    warn!(worker, error = %e, "Worker task aborted");
                    WorkerReport {
                        worker,
                        outcome: WorkerOutcome::Aborted {
                            error: e.to_string(),
                        },
                    }
                })
            })
            .collect();

        info!(
            completed = progress.completed(),
            total = progress.total(),
            "Worker pool finished"
        );

        PoolReport { progress, workers }
    }
}

struct Worker<C: Connector> {
    id: usize,
    connector: Arc<C>,
    queue: Receiver<SeqNum>,
    persister: Persister,
    progress: Arc<Progress>,
}

impl<C: Connector> Worker<C> {
    async fn run(self) -> WorkerReport {
        let mut session = match self.connector.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!(worker = self.id, error = %e, "Worker session setup failed");
                return WorkerReport {
                    worker: self.id,
                    outcome: WorkerOutcome::SetupFailed {
                        error: e.to_string(),
                    },
                };
            }
        };
        debug!(worker = self.id, "Worker session ready");

        let mut saved = 0;
        let mut skipped = 0;
        while let Ok(seq) = self.queue.recv().await {
            if self.download(&mut session, seq).await {
                saved += 1;
            } else {
                skipped += 1;
            }
        }

        if let Err(e) = session.logout().await {
            warn!(worker = self.id, error = %e, "Worker logout failed");
        }
        debug!(worker = self.id, saved, skipped, "Worker finished");

        WorkerReport {
            worker: self.id,
            outcome: WorkerOutcome::Drained { saved, skipped },
        }
    }

    /// Fetch and save one message. Returns whether it was saved.
    async fn download(&self, session: &mut C::Session, seq: SeqNum) -> bool {
        let body = match session.fetch_body(seq).await {
            Ok(Fetched::Body(body)) => body,
            Ok(Fetched::Missing) => {
                debug!(worker = self.id, seq, "No message for sequence number");
                return false;
            }
            Ok(Fetched::NoBody) => {
                warn!(worker = self.id, seq, "No body section in fetch response");
                return false;
            }
            Err(e) => {
                warn!(worker = self.id, seq, error = %e, "Fetch failed");
                return false;
            }
        };

        if let Err(e) = self.persister.save(seq, &body).await {
            warn!(
                worker = self.id,
                path = %self.persister.path_for(seq).display(),
                error = %e,
                "Write failed"
            );
            return false;
        }

        let completed = self.progress.record();
        if let Some(line) = self.progress.report(completed) {
            println!("{line}");
        }
        true
    }
}
