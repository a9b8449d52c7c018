use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use crate::error::BatchError;
use crate::models::{BatchSession, SessionId, SessionStatus};

static SHARED: OnceLock<Arc<SessionStore>> = OnceLock::new();

/// In-memory batch sessions. Sessions are never evicted; finished ones stay
/// queryable for the life of the process. At most one session runs at a time.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, BatchSession>>,
    active: Mutex<Option<SessionId>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide store for callers that do not inject their own.
    pub fn shared() -> &'static Arc<SessionStore> {
        SHARED.get_or_init(|| Arc::new(SessionStore::new()))
    }

    pub fn create(&self, session: BatchSession) -> Result<SessionId, BatchError> {
        let id = session.id;
        let mut guard = self.sessions.write().map_err(|_| BatchError::StoreUnavailable)?;
        guard.insert(id, session);
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Result<BatchSession, BatchError> {
        let guard = self.sessions.read().map_err(|_| BatchError::StoreUnavailable)?;
        guard
            .get(&id)
            .cloned()
            .ok_or_else(|| BatchError::SessionNotFound(id.to_string()))
    }

    /// Mutate a session in place under the write lock.
    pub fn update<R>(&self, id: SessionId, f: impl FnOnce(&mut BatchSession) -> R) -> Result<R, BatchError> {
        let mut guard = self.sessions.write().map_err(|_| BatchError::StoreUnavailable)?;
        let session = guard
            .get_mut(&id)
            .ok_or_else(|| BatchError::SessionNotFound(id.to_string()))?;
        Ok(f(session))
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .map(|guard| guard.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Claim the single run slot and move the session to `processing`.
    pub fn begin_run(&self, id: SessionId) -> Result<(), BatchError> {
        let mut active = self.active.lock().map_err(|_| BatchError::StoreUnavailable)?;
        if let Some(running) = *active {
            return Err(BatchError::AlreadyRunning(running.to_string()));
        }
        self.update(id, |session| {
            if session.status != SessionStatus::Idle {
                return Err(BatchError::NotIdle {
                    id: id.to_string(),
                    status: session.status.to_string(),
                });
            }
            session.status = SessionStatus::Processing;
            session.started_at = Some(Utc::now());
            Ok(())
        })??;
        *active = Some(id);
        Ok(())
    }

    /// Release the run slot if `id` holds it.
    pub fn end_run(&self, id: SessionId) {
        if let Ok(mut active) = self.active.lock() {
            if *active == Some(id) {
                *active = None;
            }
        }
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.lock().ok().and_then(|guard| *guard)
    }

    pub fn request_cancel(&self, id: SessionId) -> Result<(), BatchError> {
        self.update(id, |session| session.cancel_requested = true)
    }

    pub fn is_cancel_requested(&self, id: SessionId) -> bool {
        self.sessions
            .read()
            .ok()
            .and_then(|guard| guard.get(&id).map(|s| s.cancel_requested))
            .unwrap_or(false)
    }
}
