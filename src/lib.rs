//! Loan Advisor UI
//!
//! Browser front end for a conversational loan-origination backend. Users fill
//! in a loan form, upload KYC or salary documents, and chat with the advisor;
//! the latest underwriting decision is shown alongside.
//!
//! # Architecture
//!
//! - **Server**: Axum renders HTML and htmx fragments per page session
//! - **Backend client**: `reqwest` calls to the loan API behind [`api::LoanBackend`]
//! - **Chat**: bounded auto-continuation driven by the backend's `step`
//! - **UI**: server-side HTML with a constrained markup renderer
//!
//! # Modules
//!
//! - [`api`]: backend client, wire types and errors
//! - [`chat`]: chat log, continuation loop and markup
//! - [`config`]: layered configuration
//! - [`decision`]: decision panel projection
//! - [`form`]: loan form coercion and submission
//! - [`session`]: per-page sessions and the session store
//! - [`ui`]: HTML rendering
//! - [`upload`]: document upload panel

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod api;
pub mod chat;
pub mod config;
pub mod decision;
pub mod form;
pub mod server;
pub mod session;
pub mod testing;
pub mod ui;
pub mod upload;

use std::fmt;
use std::sync::Arc;

use crate::api::LoanBackend;
use crate::chat::Delay;
use crate::config::AppConfig;
use crate::session::{ChatRuntime, SessionIdSource, SessionStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend client, delay strategy and continuation limits for chat.
    pub runtime: ChatRuntime,
    /// Live page sessions.
    pub sessions: SessionStore,
    /// Source of new session ids.
    pub ids: Arc<dyn SessionIdSource>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        backend: Arc<dyn LoanBackend>,
        delay: Arc<dyn Delay>,
        ids: Arc<dyn SessionIdSource>,
    ) -> Self {
        Self {
            runtime: ChatRuntime {
                backend,
                delay,
                policy: config.continuation_policy(),
            },
            sessions: SessionStore::new(),
            ids,
            config,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("runtime", &self.runtime)
            .field("sessions", &self.sessions.len())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
