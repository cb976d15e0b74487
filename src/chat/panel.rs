//! Chat panel state and the send/continue loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::continuation::{ContinuationPolicy, Delay, next_continuation};
use crate::api::{ChatReply, ChatRequest, Decision, LoanBackend};

/// First message shown in every new session.
pub const GREETING: &str =
    "Hello! I'm your AI loan advisor. Fill out the form and submit, then chat with me to proceed!";

/// Sent silently after each completed document upload.
pub const UPLOAD_FOLLOW_UP: &str = "I uploaded my documents, please continue with verification";

/// Sent silently by the "Check Status" button.
pub const CHECK_STATUS_MESSAGE: &str = "Check my application status";

/// Callback receiving decisions reported by the backend.
pub type DecisionSink<'a> = dyn Fn(Decision) + Send + Sync + 'a;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One entry in the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, rename = "pdfId", skip_serializing_if = "Option::is_none")]
    pub pdf_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            step: None,
            pdf_id: None,
        }
    }
}

/// Whether a send shows up in the log as a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Typed by the user; echoed into the log before the request.
    User,
    /// Issued by the UI itself; never echoed.
    Synthetic,
}

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStop {
    /// Backend reached a step that needs no follow-up.
    Terminal,
    /// A chat call failed; the error is in the log.
    Failed,
    /// Follow-up budget ran out before the backend reached a terminal step.
    Capped,
}

/// Summary of one send including its follow-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    /// Chat calls made, the initial one included.
    pub backend_calls: usize,
    pub stop: ExchangeStop,
}

/// Chat panel for one session.
///
/// Clones share the same log. The busy flag admits one exchange at a time;
/// it is held by a [`PendingSend`] and released when that is dropped.
#[derive(Debug, Clone)]
pub struct ChatPanel {
    inner: Arc<ChatPanelInner>,
}

#[derive(Debug)]
struct ChatPanelInner {
    session_id: String,
    messages: RwLock<Vec<ChatMessage>>,
    pdf_id: RwLock<Option<String>>,
    busy: AtomicBool,
    last_upload_trigger: Mutex<u64>,
}

impl ChatPanel {
    /// Create a panel holding only the greeting.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ChatPanelInner {
                session_id: session_id.into(),
                messages: RwLock::new(vec![ChatMessage::new(Role::Assistant, GREETING)]),
                pdf_id: RwLock::new(None),
                busy: AtomicBool::new(false),
                last_upload_trigger: Mutex::new(0),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Snapshot of the log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner
            .messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent sanction-letter id seen in a reply.
    pub fn pdf_id(&self) -> Option<String> {
        self.inner
            .pdf_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    fn push(&self, message: ChatMessage) {
        self.inner
            .messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Start a send.
    ///
    /// Returns `None` when the text is blank or another exchange is running.
    /// Otherwise marks the panel busy, echoes user-origin text into the log,
    /// and hands back the pending send to run.
    pub fn begin(&self, text: &str, origin: MessageOrigin) -> Option<PendingSend> {
        if text.trim().is_empty() {
            return None;
        }
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        if origin == MessageOrigin::User {
            self.push(ChatMessage::new(Role::User, text));
        }

        Some(PendingSend {
            panel: self.clone(),
            message: text.to_string(),
        })
    }

    /// Begin and run a send to completion.
    pub async fn send(
        &self,
        text: &str,
        origin: MessageOrigin,
        backend: &dyn LoanBackend,
        delay: &dyn Delay,
        policy: &ContinuationPolicy,
        on_decision: &DecisionSink<'_>,
    ) -> Option<ExchangeOutcome> {
        let pending = self.begin(text, origin)?;
        Some(pending.run(backend, delay, policy, on_decision).await)
    }

    /// Record an upload-trigger value from the root.
    ///
    /// Returns `true` when the value differs from the last one seen and is
    /// not the initial zero, meaning [`UPLOAD_FOLLOW_UP`] should be sent.
    pub fn observe_upload_trigger(&self, value: u64) -> bool {
        if value == 0 {
            return false;
        }
        let mut last = self
            .inner
            .last_upload_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == value {
            return false;
        }
        *last = value;
        true
    }

    /// Append a backend reply to the log and report its decision.
    fn record_reply(&self, reply: &ChatReply, backend: &dyn LoanBackend, on_decision: &DecisionSink<'_>) {
        let mut text = reply.reply_text().unwrap_or("(no reply)").to_string();

        if let Some(pdf_id) = reply.pdf() {
            *self
                .inner
                .pdf_id
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(pdf_id.to_string());
            text.push_str(&format!(
                "\n\n📥 **[Click here to download your Sanction Letter]({})**",
                backend.download_url(pdf_id)
            ));
        }

        self.push(ChatMessage {
            role: Role::Assistant,
            text,
            step: reply.step.clone(),
            pdf_id: reply.pdf().map(str::to_string),
        });

        if let Some(decision) = &reply.decision {
            on_decision(decision.clone());
        }
    }
}

/// A send that holds the busy flag until it finishes or is dropped.
#[derive(Debug)]
pub struct PendingSend {
    panel: ChatPanel,
    message: String,
}

impl PendingSend {
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Call the chat endpoint, then keep following up while the backend
    /// reports an intermediate step, up to the policy's budget.
    pub async fn run(
        self,
        backend: &dyn LoanBackend,
        delay: &dyn Delay,
        policy: &ContinuationPolicy,
        on_decision: &DecisionSink<'_>,
    ) -> ExchangeOutcome {
        let panel = &self.panel;
        let mut message = self.message.clone();
        let mut backend_calls = 0;
        let mut follow_ups = 0;

        loop {
            backend_calls += 1;
            let request = ChatRequest::new(panel.session_id(), message);
            let reply = match backend.post_chat(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    panel.push(ChatMessage::new(Role::Assistant, format!("Error: {e}")));
                    return ExchangeOutcome {
                        backend_calls,
                        stop: ExchangeStop::Failed,
                    };
                }
            };

            panel.record_reply(&reply, backend, on_decision);

            let Some(next) = next_continuation(&reply) else {
                return ExchangeOutcome {
                    backend_calls,
                    stop: ExchangeStop::Terminal,
                };
            };

            if follow_ups >= policy.max_continuations {
                warn!(
                    name: "chat.continuation.capped",
                    session_id = %panel.session_id(),
                    follow_ups = follow_ups,
                    step = ?reply.step,
                    "Backend kept reporting an intermediate step; giving up"
                );
                panel.push(ChatMessage::new(
                    Role::System,
                    format!(
                        "Stopped waiting after {follow_ups} automatic follow-ups. Send a message to continue."
                    ),
                ));
                return ExchangeOutcome {
                    backend_calls,
                    stop: ExchangeStop::Capped,
                };
            }

            if let Some(notice) = next.notice() {
                panel.push(ChatMessage::new(Role::System, notice));
            }

            delay.wait(policy.delay_for(next)).await;
            follow_ups += 1;

            info!(
                name: "chat.continuation",
                session_id = %panel.session_id(),
                follow_up = follow_ups,
                follow_up_message = next.message(),
                "Sending automatic follow-up"
            );
            message = next.message().to_string();
        }
    }
}

impl Drop for PendingSend {
    fn drop(&mut self) {
        self.panel.inner.busy.store(false, Ordering::Release);
    }
}
