//! Test data model for the fake IMAP server
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .message(&raw_rfc2822_bytes)
//!         .bodiless(&raw_rfc2822_bytes)
//!         .garbled(&raw_rfc2822_bytes)
//!     .login_limit(2)
//!     .build();
//! ```
//!
//! Messages are addressed by sequence number: the 1-based position in
//! their folder, exactly as a real server numbers them after SELECT.

/// Folders plus server behaviour knobs.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    /// Accept only this many LOGINs over the server's lifetime;
    /// later attempts get `NO`. `None` accepts every login.
    pub login_limit: Option<usize>,
    /// Greet every connection with `* BYE` and hang up.
    pub refuse_connections: bool,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub messages: Vec<TestMessage>,
}

impl Folder {
    /// The message at 1-based sequence number `seq`.
    pub fn by_seq(&self, seq: u32) -> Option<&TestMessage> {
        let idx = usize::try_from(seq).ok()?.checked_sub(1)?;
        self.messages.get(idx)
    }
}

/// How FETCH answers for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serve {
    /// `BODY[]` as a counted literal.
    Body,
    /// Flags only, no body section.
    FlagsOnly,
    /// A FETCH line with a malformed literal that clients cannot parse.
    Garbled,
}

/// A stored message. Its `Date:` header drives SEARCH BEFORE/SINCE.
#[derive(Debug, Clone)]
pub struct TestMessage {
    pub raw: Vec<u8>,
    pub serve: Serve,
}

pub struct MailboxBuilder {
    folders: Vec<Folder>,
    login_limit: Option<usize>,
    refuse_connections: bool,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            login_limit: None,
            refuse_connections: false,
        }
    }

    /// Add a new folder. Subsequent message calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            messages: Vec::new(),
        });
        self
    }

    /// Append a message to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn message(self, raw: &[u8]) -> Self {
        self.push(raw, Serve::Body)
    }

    /// Append a message whose FETCH response carries no body section.
    pub fn bodiless(self, raw: &[u8]) -> Self {
        self.push(raw, Serve::FlagsOnly)
    }

    /// Append a message whose FETCH response is malformed.
    pub fn garbled(self, raw: &[u8]) -> Self {
        self.push(raw, Serve::Garbled)
    }

    pub const fn login_limit(mut self, limit: usize) -> Self {
        self.login_limit = Some(limit);
        self
    }

    pub const fn refuse_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    fn push(mut self, raw: &[u8], serve: Serve) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before adding messages")
            .messages
            .push(TestMessage {
                raw: raw.to_vec(),
                serve,
            });
        self
    }

    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            login_limit: self.login_limit,
            refuse_connections: self.refuse_connections,
        }
    }
}
