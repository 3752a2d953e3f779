//! IMAP connection and archive run configuration

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 15;

/// Default number of saved messages between progress lines.
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Default age, in calendar months, of the newest archived message.
pub const DEFAULT_AGE_MONTHS: u32 = 3;

/// How the TCP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte (IMAPS, port 993).
    #[default]
    Tls,
    /// Plain connect followed by `STARTTLS` (port 143).
    StartTls,
}

impl Security {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 993,
            Self::StartTls => 143,
        }
    }
}

impl FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" | "imaps" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!(
                "Invalid IMAP_SECURITY '{other}' (expected 'tls' or 'starttls')"
            ))),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        })
    }
}

/// IMAP connection configuration
#[derive(Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub security: Security,
    /// Skip certificate verification (self-signed local servers).
    pub accept_invalid_certs: bool,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ImapConfig {
    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Variables (all optional):
    /// - `IMAP_HOST` (default: `imap.gmail.com`)
    /// - `IMAP_SECURITY` (default: `tls`)
    /// - `IMAP_PORT` (default: `993`, or `143` with `starttls`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `IMAP_USERNAME`, falling back to `GMAIL_USER`
    /// - `IMAP_PASSWORD`, falling back to `GMAIL_APP_PASSWORD`
    ///
    /// Missing credentials are left empty; the server rejects them at
    /// login.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let security = lookup("IMAP_SECURITY")
            .map(|s| s.parse::<Security>())
            .transpose()?
            .unwrap_or_default();

        let port = match lookup("IMAP_PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
            None => security.default_port(),
        };

        let accept_invalid_certs = lookup("IMAP_ACCEPT_INVALID_CERTS")
            .map(|v| parse_bool("IMAP_ACCEPT_INVALID_CERTS", &v))
            .transpose()?
            .unwrap_or(false);

        let username = lookup("IMAP_USERNAME")
            .or_else(|| lookup("GMAIL_USER"))
            .unwrap_or_else(|| {
                warn!("IMAP_USERNAME not set, login will be attempted with an empty user");
                String::new()
            });
        let password = lookup("IMAP_PASSWORD")
            .or_else(|| lookup("GMAIL_APP_PASSWORD"))
            .unwrap_or_else(|| {
                warn!("IMAP_PASSWORD not set, login will be attempted with an empty password");
                String::new()
            });

        Ok(Self {
            host: lookup("IMAP_HOST").unwrap_or_else(|| "imap.gmail.com".to_string()),
            port,
            security,
            accept_invalid_certs,
            username,
            password,
        })
    }
}

/// Settings for one archive run.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub imap: ImapConfig,
    pub mailbox: String,
    pub directory: PathBuf,
    pub workers: usize,
    pub progress_every: u64,
    pub age_months: u32,
}

impl ArchiveConfig {
    /// Archive settings with the fixed defaults: `INBOX`, 15 workers,
    /// a progress line every 100 messages, messages older than three
    /// months.
    #[must_use]
    pub fn new(imap: ImapConfig, directory: impl Into<PathBuf>) -> Self {
        Self {
            imap,
            mailbox: "INBOX".to_string(),
            directory: directory.into(),
            workers: DEFAULT_WORKERS,
            progress_every: DEFAULT_PROGRESS_EVERY,
            age_months: DEFAULT_AGE_MONTHS,
        }
    }

    /// Load the IMAP settings and the archive overrides from the
    /// environment.
    ///
    /// Reads `ARCHIVE_DIR` (default `raw_emails`), `ARCHIVE_MAILBOX`,
    /// `ARCHIVE_WORKERS`, `ARCHIVE_PROGRESS_EVERY` and
    /// `ARCHIVE_AGE_MONTHS` on top of [`ImapConfig::from_env`].
    /// Values are parsed but not range-checked, so later overrides can
    /// still replace them; call [`Self::validate`] before running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the run settings from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let imap = ImapConfig::from_lookup(&lookup)?;
        let directory = lookup("ARCHIVE_DIR").unwrap_or_else(|| "raw_emails".to_string());
        let mut config = Self::new(imap, directory);

        if let Some(mailbox) = lookup("ARCHIVE_MAILBOX") {
            config.mailbox = mailbox;
        }
        if let Some(workers) = lookup("ARCHIVE_WORKERS") {
            config.workers = parse_number("ARCHIVE_WORKERS", &workers)?;
        }
        if let Some(every) = lookup("ARCHIVE_PROGRESS_EVERY") {
            config.progress_every = parse_number("ARCHIVE_PROGRESS_EVERY", &every)?;
        }
        if let Some(months) = lookup("ARCHIVE_AGE_MONTHS") {
            config.age_months = parse_number("ARCHIVE_AGE_MONTHS", &months)?;
        }

        Ok(config)
    }

    /// Reject settings the worker pool cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the worker count or progress stride
    /// is zero, or the mailbox name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".into()));
        }
        if self.progress_every == 0 {
            return Err(Error::Config("progress stride must be at least 1".into()));
        }
        if self.mailbox.is_empty() {
            return Err(Error::Config("mailbox name is empty".into()));
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("Invalid {key}: '{other}'"))),
    }
}
