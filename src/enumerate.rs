//! Enumeration phase
//!
//! Runs once, before any worker starts: one transient session searches
//! for every message dated before the cutoff and is then released.

use crate::error::{Error, Result};
use crate::session::{Connector, MailSession, SeqNum};
use chrono::{Months, NaiveDate};
use tracing::{info, warn};

/// The date `months` calendar months before `today`.
///
/// Days past the end of a shorter month clamp to its last day
/// (31 May minus three months is 28 or 29 February).
///
/// # Errors
///
/// Returns [`Error::Config`] if the result is out of range.
pub fn cutoff_date(today: NaiveDate, months: u32) -> Result<NaiveDate> {
    today
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| Error::Config(format!("Cutoff {months} months before {today} is out of range")))
}

/// Collect the sequence numbers of all messages dated before `cutoff`.
///
/// Any failure to open the session or to search is returned; without
/// this set no work can proceed. A failed logout after a successful
/// search is only logged.
///
/// # Errors
///
/// Returns the connect, authenticate, select or search error.
pub async fn enumerate<C: Connector>(connector: &C, cutoff: NaiveDate) -> Result<Vec<SeqNum>> {
    let mut session = connector.open().await?;

    let seqs = match session.search_before(cutoff).await {
        Ok(seqs) => seqs,
        Err(e) => {
            session.logout().await.ok();
            return Err(e);
        }
    };

    if let Err(e) = session.logout().await {
        warn!(error = %e, "Logout after enumeration failed");
    }

    info!(count = seqs.len(), %cutoff, "Enumerated messages before cutoff");
    Ok(seqs)
}
