//! IMAP command handlers for the fake server.
//!
//! Each handler lives in its own module and processes a single IMAP
//! command (LOGIN, LOGOUT, SELECT, SEARCH, FETCH).


pub use fetch::{handle_fetch, requested_seqs};
pub use login::handle_login;
pub use logout::handle_logout;
pub use search::handle_search;
pub use select::handle_select;
