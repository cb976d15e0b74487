//! In-memory session store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::id::SessionIdSource;
use super::loan::LoanSession;

/// Thread-safe store for all live page sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug, Default)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, LoanSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with an id from `ids`.
    pub fn create(&self, ids: &dyn SessionIdSource) -> LoanSession {
        self.create_with_id(ids.next_id())
    }

    /// Create a session with a specific id, replacing any previous one.
    pub fn create_with_id(&self, id: impl Into<String>) -> LoanSession {
        let id = id.into();
        let session = LoanSession::new(id.clone());
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session.clone());
        info!(name: "session.created", session_id = %session.id(), "Session created");
        session
    }

    /// Look up a session and mark it active.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<LoanSession> {
        let session = self
            .inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;
        session.touch();
        Some(session)
    }

    pub fn remove(&self, id: &str) -> Option<LoanSession> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed. Exchanges already running
    /// keep their own handle and finish normally.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    /// Periodically drop idle sessions.
    pub fn spawn_sweeper(&self, interval: Duration, idle_timeout: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired_with_timeout(idle_timeout);
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Swept idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SequentialSessionIds;

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();
        let ids = SequentialSessionIds::new("s");
        assert!(store.is_empty());

        let session = store.create(&ids);
        assert_eq!(session.id(), "s-1");
        assert_eq!(store.len(), 1);

        let retrieved = store.get("s-1").unwrap();
        assert_eq!(retrieved.id(), session.id());

        store.remove("s-1");
        assert!(store.is_empty());
        assert!(store.get("s-1").is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let ids = SequentialSessionIds::new("s");
        let a = store.create(&ids);
        let b = store.create(&ids);

        a.set_decision(crate::api::Decision::default());
        assert!(a.decision().is_some());
        assert!(b.decision().is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore::new();
        let ids = SequentialSessionIds::new("s");
        let _ = store.create(&ids);

        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(3600)), 0);
        assert_eq!(store.len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_millis(1)), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_idle_sessions() {
        let store = SessionStore::new();
        let _ = store.create_with_id("idle");
        std::thread::sleep(Duration::from_millis(5));

        let handle = store.spawn_sweeper(Duration::from_secs(60), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(store.is_empty());
        handle.abort();
    }
}
