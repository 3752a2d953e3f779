//! Error types for mail-archiver
//!
//! Only enumeration and directory setup return these to the caller.
//! Inside the worker pool they are logged and the message or worker
//! is skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// SELECT, SEARCH, FETCH or LOGOUT was rejected or the response
    /// could not be read.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// The server refused the LOGIN.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// TCP connect failures and file writes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup, STARTTLS upgrade or handshake.
    #[error("TLS error: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;
