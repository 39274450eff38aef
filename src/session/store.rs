//! Per-session article slot and the store that owns all sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::records::{Answer, Article, Summary};

/// Default session idle timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Id used when a request does not name a session.
pub const DEFAULT_SESSION_ID: &str = "default";

/// A single user session.
///
/// Holds at most one [`Article`] and one [`Summary`] (last write wins) plus an
/// append-only answer log. Cloning is cheap and yields a handle to the same
/// session.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    slot: RwLock<Slot>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Slot {
    article: Option<Article>,
    summary: Option<Summary>,
    answers: Vec<Answer>,
}

/// Point-in-time copy of a session, as returned by `GET /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub article: Option<Article>,
    pub summary: Option<Summary>,
    pub answers: Vec<Answer>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id,
                slot: RwLock::new(Slot::default()),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Store a freshly fetched article.
    ///
    /// The previous summary and answers described the old article, so they
    /// are dropped along with it.
    pub fn put_article(&self, article: Article) {
        {
            let mut slot = self.write_slot();
            slot.article = Some(article);
            slot.summary = None;
            slot.answers.clear();
        }
        self.touch();
    }

    #[must_use]
    pub fn article(&self) -> Option<Article> {
        self.read_slot().article.clone()
    }

    pub fn put_summary(&self, summary: Summary) {
        self.write_slot().summary = Some(summary);
        self.touch();
    }

    #[must_use]
    pub fn summary(&self) -> Option<Summary> {
        self.read_slot().summary.clone()
    }

    pub fn append_answer(&self, answer: Answer) {
        self.write_slot().answers.push(answer);
        self.touch();
    }

    /// Answers in the order they were asked.
    #[must_use]
    pub fn answers(&self) -> Vec<Answer> {
        self.read_slot().answers.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let slot = self.read_slot();
        SessionSnapshot {
            session_id: self.inner.id.clone(),
            article: slot.article.clone(),
            summary: slot.summary.clone(),
            answers: slot.answers.clone(),
            created_at: self.inner.created_at,
            last_activity: self.last_activity(),
        }
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Slot> {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> std::sync::RwLockWriteGuard<'_, Slot> {
        self.inner.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_activity(&self) -> DateTime<Utc> {
        *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = self.last_activity();
        // Negative durations (clock skew) count as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        if let Some(session) = self.get(id) {
            return session;
        }
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have created it between the two locks.
        guard
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id.to_string()))
            .clone()
    }

    /// Get a session by ID, or an empty session that is not kept in the store.
    #[must_use]
    pub fn get_or_transient(&self, id: &str) -> Session {
        self.get(id).unwrap_or_else(|| Session::new(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}
