#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Archive old mailbox messages as individual `.eml` files

use clap::Parser;
use mail_archiver::{ArchiveConfig, Archiver, RunSummary, WorkerOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mail-archiver", version)]
#[command(about = "Download messages older than a cutoff into one .eml file each")]
struct Args {
    /// Destination directory (overrides ARCHIVE_DIR)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Mailbox to archive (overrides ARCHIVE_MAILBOX)
    #[arg(long)]
    mailbox: Option<String>,

    /// Number of concurrent connections (overrides ARCHIVE_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Print a progress line every N saved messages
    /// (overrides ARCHIVE_PROGRESS_EVERY)
    #[arg(long)]
    progress_every: Option<u64>,

    /// Archive messages older than this many months
    /// (overrides ARCHIVE_AGE_MONTHS)
    #[arg(long)]
    months: Option<u32>,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(self, config: &mut ArchiveConfig) {
        if let Some(dir) = self.dir {
            config.directory = dir;
        }
        if let Some(mailbox) = self.mailbox {
            config.mailbox = mailbox;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(every) = self.progress_every {
            config.progress_every = every;
        }
        if let Some(months) = self.months {
            config.age_months = months;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = args.json;

    let mut config = ArchiveConfig::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    let archiver = Archiver::new(config);
    let today = chrono::Local::now().date_naive();

    let enumeration = archiver.enumerate(today).await?;
    println!(
        "Found {} emails. Starting worker pool...",
        enumeration.seqs.len()
    );

    let summary = archiver.download(enumeration).await?;
    println!("All workers finished.");

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Saved {} of {} emails dated before {} to {}",
        summary.completed,
        summary.total,
        summary.cutoff,
        summary.directory.display()
    );
    if summary.skipped > 0 {
        println!("Skipped: {}", summary.skipped);
    }
    let (setup_failed, aborted) = summary.workers.iter().fold((0, 0), |(s, a), r| {
        match r.outcome {
            WorkerOutcome::SetupFailed { .. } => (s + 1, a),
            WorkerOutcome::Aborted { .. } => (s, a + 1),
            WorkerOutcome::Drained { .. } => (s, a),
        }
    });
    if setup_failed > 0 {
        println!("Workers that could not connect: {setup_failed}");
    }
    if aborted > 0 {
        println!("Workers that stopped unexpectedly: {aborted}");
    }
}
