//! Session-scoped article storage.
//!
//! Each session holds the article the user is currently working with, the
//! latest summary of it and the log of answered questions. Sessions are
//! identified by a caller-chosen id; requests without one share the
//! [`DEFAULT_SESSION_ID`] session.
//!
//! # Example
//!
//! ```rust
//! use newsdesk::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.get_or_create("reader-1");
//! assert!(session.article().is_none());
//! ```

mod records;
mod store;

pub use records::{Answer, Article, Summary};
pub use store::{
    DEFAULT_SESSION_ID, DEFAULT_SESSION_TIMEOUT, Session, SessionSnapshot, SessionStore,
};
