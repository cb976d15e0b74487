//! Auto-continuation policy for the chat panel.
//!
//! While the backend reports an intermediate workflow step, the panel keeps
//! the conversation moving by itself with silent follow-up messages:
//!
//! | Reply                                                        | Follow-up                   | Delay  |
//! |--------------------------------------------------------------|-----------------------------|--------|
//! | `step = "sanction"` and no `pdfId`                           | `generate sanction letter`  | 500ms  |
//! | `step = "underwriting"`, reply without `APPROVED`/`Declined` | `check status`              | 1000ms |
//!
//! Every other step is terminal. The loop driving these follow-ups is bounded
//! by [`ContinuationPolicy::max_continuations`].

use std::time::Duration;

use async_trait::async_trait;

use crate::api::ChatReply;

/// Step label that triggers sanction-letter generation.
pub const STEP_SANCTION: &str = "sanction";
/// Step label that triggers status polling.
pub const STEP_UNDERWRITING: &str = "underwriting";

/// Markers in an underwriting reply that mean a verdict has been reached.
const UNDERWRITING_TERMINAL_MARKERS: &[&str] = &["APPROVED", "Declined"];

/// A silent follow-up the panel sends on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Ask the backend to produce the sanction-letter PDF.
    GenerateSanctionLetter,
    /// Poll the underwriting result.
    CheckStatus,
}

impl Continuation {
    /// Message sent to the chat endpoint.
    pub fn message(self) -> &'static str {
        match self {
            Self::GenerateSanctionLetter => "generate sanction letter",
            Self::CheckStatus => "check status",
        }
    }

    /// System notice appended to the log before the follow-up, if any.
    pub fn notice(self) -> Option<&'static str> {
        match self {
            Self::GenerateSanctionLetter => Some("⏳ Generating Sanction Letter..."),
            Self::CheckStatus => None,
        }
    }
}

/// Decide whether a reply needs a follow-up.
pub fn next_continuation(reply: &ChatReply) -> Option<Continuation> {
    if reply.step_is(STEP_SANCTION) && reply.pdf().is_none() {
        return Some(Continuation::GenerateSanctionLetter);
    }

    if reply.step_is(STEP_UNDERWRITING) {
        let text = reply.reply_text()?;
        let decided = UNDERWRITING_TERMINAL_MARKERS
            .iter()
            .any(|marker| text.contains(marker));
        if !decided {
            return Some(Continuation::CheckStatus);
        }
    }

    None
}

/// Limits and pacing for the continuation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationPolicy {
    /// Follow-ups allowed per user-initiated send.
    pub max_continuations: usize,
    pub sanction_delay: Duration,
    pub status_delay: Duration,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self {
            max_continuations: 10,
            sanction_delay: Duration::from_millis(500),
            status_delay: Duration::from_millis(1000),
        }
    }
}

impl ContinuationPolicy {
    /// Pause before sending the given follow-up.
    pub fn delay_for(&self, continuation: Continuation) -> Duration {
        match continuation {
            Continuation::GenerateSanctionLetter => self.sanction_delay,
            Continuation::CheckStatus => self.status_delay,
        }
    }
}

/// Strategy for waiting between follow-ups.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real wall-clock delay on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Skips every wait.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(step: &str, text: &str, pdf_id: Option<&str>) -> ChatReply {
        ChatReply {
            reply: Some(text.to_string()),
            step: Some(step.to_string()),
            decision: None,
            pdf_id: pdf_id.map(str::to_string),
        }
    }

    #[test]
    fn test_sanction_without_pdf_generates_letter() {
        let r = reply("sanction", "🎉 Your loan is APPROVED!", None);
        assert_eq!(
            next_continuation(&r),
            Some(Continuation::GenerateSanctionLetter)
        );
    }

    #[test]
    fn test_sanction_with_pdf_is_terminal() {
        let r = reply("sanction", "Here is your letter", Some("pdf-1"));
        assert_eq!(next_continuation(&r), None);
    }

    #[test]
    fn test_underwriting_polls_until_marker() {
        let r = reply("underwriting", "Running credit assessment...", None);
        assert_eq!(next_continuation(&r), Some(Continuation::CheckStatus));

        let r = reply("underwriting", "Your loan is APPROVED", None);
        assert_eq!(next_continuation(&r), None);

        let r = reply("underwriting", "Application Declined", None);
        assert_eq!(next_continuation(&r), None);
    }

    #[test]
    fn test_underwriting_markers_are_case_sensitive() {
        let r = reply("underwriting", "approved? declined?", None);
        assert_eq!(next_continuation(&r), Some(Continuation::CheckStatus));
    }

    #[test]
    fn test_underwriting_without_reply_is_terminal() {
        let r = ChatReply {
            step: Some("underwriting".to_string()),
            ..ChatReply::default()
        };
        assert_eq!(next_continuation(&r), None);
    }

    #[test]
    fn test_other_steps_are_terminal() {
        for step in ["sales", "verification", "need_docs", "rejected", "completed", "end", "error"] {
            assert_eq!(next_continuation(&reply(step, "text", None)), None, "{step}");
        }
        assert_eq!(next_continuation(&ChatReply::default()), None);
    }

    #[test]
    fn test_policy_delays() {
        let policy = ContinuationPolicy::default();
        assert_eq!(
            policy.delay_for(Continuation::GenerateSanctionLetter),
            Duration::from_millis(500)
        );
        assert_eq!(
            policy.delay_for(Continuation::CheckStatus),
            Duration::from_millis(1000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_delay_waits() {
        let start = tokio::time::Instant::now();
        TokioDelay.wait(Duration::from_millis(750)).await;
        assert!(start.elapsed() >= Duration::from_millis(750));
    }
}
