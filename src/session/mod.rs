//! Per-page sessions.
//!
//! Every page load gets a fresh [`LoanSession`] with its own id, chat log,
//! form and upload state, and decision. Nothing is persisted; a session is
//! dropped once it has been idle for the configured timeout.
//!
//! # Example
//!
//! ```rust
//! use loan_advisor_ui::session::{SequentialSessionIds, SessionStore};
//!
//! let store = SessionStore::new();
//! let session = store.create(&SequentialSessionIds::new("page"));
//! assert_eq!(session.id(), "page-1");
//! assert_eq!(session.upload_trigger(), 0);
//! assert!(session.decision().is_none());
//! ```

mod id;
mod loan;
mod store;

pub use id::{RandomSessionIds, SequentialSessionIds, SessionIdSource};
pub use loan::{ChatRuntime, LoanSession};
pub use store::SessionStore;
