//! Chat panel: message log, sends, and backend-driven follow-ups.
//!
//! # Structure
//!
//! - [`panel`]: per-session log, busy flag, and the bounded send loop
//! - [`continuation`]: which replies need a silent follow-up, and how long to wait
//! - [`markup`]: escaping renderer for `**bold**`, `[links](url)` and newlines

pub mod continuation;
pub mod markup;
pub mod panel;

pub use continuation::{Continuation, ContinuationPolicy, Delay, NoDelay, TokioDelay};
pub use panel::{
    CHECK_STATUS_MESSAGE, ChatMessage, ChatPanel, DecisionSink, ExchangeOutcome, ExchangeStop,
    GREETING, MessageOrigin, PendingSend, Role, UPLOAD_FOLLOW_UP,
};
