//! Server-rendered HTML.
//!
//! The page is plain HTML driven by htmx. Each panel is a fragment with a
//! stable id; handlers return the updated fragment and fire `HX-Trigger`
//! events so dependent panels refresh themselves.
//!
//! - [`page`]: document shell and the full page
//! - [`panels`]: form, upload, chat and decision fragments

pub mod page;
pub mod panels;

pub use page::{html_shell, render_missing_session, render_page};
pub use panels::{render_chat, render_decision, render_form, render_upload};
