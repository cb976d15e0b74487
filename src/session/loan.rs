//! Per-page loan session: the root that wires the panels together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::{Decision, DocumentFile, LoanBackend};
use crate::chat::{ChatPanel, ContinuationPolicy, Delay, MessageOrigin, UPLOAD_FOLLOW_UP};
use crate::form::{LoanForm, LoanFormInput, SubmitOutcome};
use crate::upload::{UploadOutcome, UploadPanel};

/// Shared dependencies of a chat exchange.
#[derive(Clone)]
pub struct ChatRuntime {
    pub backend: Arc<dyn LoanBackend>,
    pub delay: Arc<dyn Delay>,
    pub policy: ContinuationPolicy,
}

impl std::fmt::Debug for ChatRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRuntime")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// One page load's UI state.
///
/// Holds the panels, the latest decision, and the upload-trigger counter.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct LoanSession {
    inner: Arc<LoanSessionInner>,
}

#[derive(Debug)]
struct LoanSessionInner {
    id: String,
    chat: ChatPanel,
    form: LoanForm,
    upload: UploadPanel,
    decision: RwLock<Option<Decision>>,
    upload_trigger: AtomicU64,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl LoanSession {
    pub(crate) fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(LoanSessionInner {
                chat: ChatPanel::new(id.clone()),
                id,
                form: LoanForm::new(),
                upload: UploadPanel::new(),
                decision: RwLock::new(None),
                upload_trigger: AtomicU64::new(0),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn chat(&self) -> &ChatPanel {
        &self.inner.chat
    }

    pub fn form(&self) -> &LoanForm {
        &self.inner.form
    }

    pub fn upload(&self) -> &UploadPanel {
        &self.inner.upload
    }

    /// Latest decision, from either the form placeholder or the backend.
    pub fn decision(&self) -> Option<Decision> {
        self.inner
            .decision
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_decision(&self, decision: Decision) {
        *self
            .inner
            .decision
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(decision);
    }

    /// Completed uploads so far.
    pub fn upload_trigger(&self) -> u64 {
        self.inner.upload_trigger.load(Ordering::Acquire)
    }

    /// Submit the loan form. A saved application sets the optimistic
    /// `submitted` decision.
    pub async fn submit_application(
        &self,
        input: &LoanFormInput,
        backend: &dyn LoanBackend,
    ) -> SubmitOutcome {
        let outcome = self.form().submit(self.id(), input, backend).await;
        if let SubmitOutcome::Saved(data) = &outcome {
            self.set_decision(Decision::submitted(data));
        }
        outcome
    }

    /// Upload a document. On success the upload trigger is bumped and the
    /// chat panel is asked to continue verification.
    pub async fn upload_document(
        &self,
        file: Option<DocumentFile>,
        runtime: &ChatRuntime,
    ) -> UploadOutcome {
        let outcome = self
            .upload()
            .upload(self.id(), file, runtime.backend.as_ref())
            .await;
        if matches!(outcome, UploadOutcome::Uploaded(_)) {
            let trigger = self.inner.upload_trigger.fetch_add(1, Ordering::AcqRel) + 1;
            if self.chat().observe_upload_trigger(trigger) {
                self.spawn_chat(UPLOAD_FOLLOW_UP, MessageOrigin::Synthetic, runtime);
            }
        }
        outcome
    }

    /// Start a chat exchange in the background.
    ///
    /// Returns `false` if the text is blank or an exchange is already running.
    pub fn spawn_chat(&self, text: &str, origin: MessageOrigin, runtime: &ChatRuntime) -> bool {
        let Some(pending) = self.chat().begin(text, origin) else {
            return false;
        };

        let session = self.clone();
        let runtime = runtime.clone();
        tokio::spawn(async move {
            let sink = |decision: Decision| session.set_decision(decision);
            let outcome = pending
                .run(
                    runtime.backend.as_ref(),
                    runtime.delay.as_ref(),
                    &runtime.policy,
                    &sink,
                )
                .await;
            debug!(
                session_id = %session.id(),
                backend_calls = outcome.backend_calls,
                stop = ?outcome.stop,
                "Chat exchange finished"
            );
        });
        true
    }

    /// Update the last activity timestamp.
    pub(crate) fn touch(&self) {
        *self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Negative duration means clock skew; treat as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }

    /// Get the session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        (Utc::now() - self.inner.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crate::testing::{RecordingDelay, ScriptedBackend};
    use crate::upload::UploadStatus;
    use crate::api::{ChatReply, UploadResult};

    fn runtime(backend: Arc<ScriptedBackend>) -> ChatRuntime {
        ChatRuntime {
            backend,
            delay: Arc::new(RecordingDelay::new()),
            policy: ContinuationPolicy::default(),
        }
    }

    async fn wait_until_idle(session: &LoanSession) {
        for _ in 0..200 {
            if !session.chat().is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("chat exchange did not finish");
    }

    fn payslip() -> DocumentFile {
        DocumentFile {
            file_name: "payslip.pdf".to_string(),
            content_type: None,
            bytes: vec![0; 16],
        }
    }

    #[tokio::test]
    async fn test_submit_sets_placeholder_decision() {
        let backend = ScriptedBackend::new();
        let session = LoanSession::new("s-1".to_string());
        let input = LoanFormInput {
            loan_amount: "500000".to_string(),
            tenure: "12".to_string(),
            income: "80000".to_string(),
            employment: "Salaried".to_string(),
            age: "30".to_string(),
            ..LoanFormInput::default()
        };

        session.submit_application(&input, &backend).await;

        let decision = session.decision().unwrap();
        assert_eq!(decision.status.as_deref(), Some("submitted"));
        assert_eq!(decision.amount, Some(500_000.0));
        assert_eq!(decision.tenure, Some(12.0));
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_decision_alone() {
        let backend = ScriptedBackend::new().with_apply_status(502);
        let session = LoanSession::new("s-1".to_string());
        session
            .submit_application(&LoanFormInput::default(), &backend)
            .await;
        assert!(session.decision().is_none());
    }

    #[tokio::test]
    async fn test_each_upload_sends_one_follow_up() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_upload_result(UploadResult {
                    filename: "aadhaar.pdf".to_string(),
                    ..UploadResult::default()
                })
                .with_upload_result(UploadResult {
                    filename: "payslip.pdf".to_string(),
                    salary_slip: true,
                    ..UploadResult::default()
                }),
        );
        let runtime = runtime(Arc::clone(&backend));
        let session = LoanSession::new("s-1".to_string());
        assert_eq!(session.upload_trigger(), 0);

        session.upload_document(Some(payslip()), &runtime).await;
        wait_until_idle(&session).await;
        session.upload_document(Some(payslip()), &runtime).await;
        wait_until_idle(&session).await;

        assert_eq!(session.upload_trigger(), 2);
        assert_eq!(
            backend.chat_messages(),
            vec![UPLOAD_FOLLOW_UP, UPLOAD_FOLLOW_UP]
        );
        assert!(session.chat().messages().iter().all(|m| m.role != Role::User));
        assert_eq!(
            session.upload().status(),
            UploadStatus::Uploaded {
                filename: "payslip.pdf".to_string(),
                salary_slip: true
            }
        );
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_trigger_chat() {
        let backend = Arc::new(ScriptedBackend::new().with_upload_status(500));
        let session = LoanSession::new("s-1".to_string());
        session
            .upload_document(Some(payslip()), &runtime(Arc::clone(&backend)))
            .await;
        assert_eq!(session.upload_trigger(), 0);
        assert!(backend.chat_messages().is_empty());
    }

    #[tokio::test]
    async fn test_chat_decision_replaces_placeholder() {
        let backend = Arc::new(ScriptedBackend::new().with_chat_reply(ChatReply {
            reply: Some("Approved".to_string()),
            step: Some("completed".to_string()),
            decision: Some(Decision {
                status: Some("approved".to_string()),
                emi: Some(20_000.0),
                ..Decision::default()
            }),
            ..ChatReply::default()
        }));
        let session = LoanSession::new("s-1".to_string());
        session.set_decision(Decision {
            status: Some("submitted".to_string()),
            ..Decision::default()
        });

        assert!(session.spawn_chat("status?", MessageOrigin::User, &runtime(backend)));
        wait_until_idle(&session).await;

        let decision = session.decision().unwrap();
        assert_eq!(decision.status.as_deref(), Some("approved"));
        assert_eq!(decision.emi, Some(20_000.0));
    }

    #[test]
    fn test_expiry() {
        let session = LoanSession::new("s-1".to_string());
        assert!(!session.is_expired_with_timeout(Duration::from_secs(60)));
        assert!(session.age() < Duration::from_secs(60));
    }
}
