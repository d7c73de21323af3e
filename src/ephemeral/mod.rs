//! Ephemeral in-memory storage backend.
//!
//! Provides volatile session storage when `storage = "ephemeral"`.
//! All data is lost on restart. Enforces the same uniqueness rules as the
//! SQLite schema: one record per session id and per email.

use crate::error::{ConflictKind, CoreError, Result};
use crate::session::{Session, SessionStatus};
use crate::store::UpdateOutcome;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    /// session_id -> (insertion sequence, record)
    sessions: HashMap<String, (u64, Session)>,
    /// email -> session_id
    emails: HashMap<String, String>,
    next_seq: u64,
}

/// In-memory session index
#[derive(Default)]
pub struct EphemeralIndex {
    inner: RwLock<Inner>,
}

impl EphemeralIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| CoreError::Storage("Ephemeral index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| CoreError::Storage("Ephemeral index lock poisoned".to_string()))
    }

    pub fn insert_session(&self, session: Session) -> Result<()> {
        let mut inner = self.write()?;

        if inner.sessions.contains_key(&session.session_id) {
            return Err(CoreError::Conflict(ConflictKind::SessionIdTaken));
        }
        if inner.emails.contains_key(&session.email) {
            return Err(CoreError::Conflict(ConflictKind::EmailTaken));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .emails
            .insert(session.email.clone(), session.session_id.clone());
        inner
            .sessions
            .insert(session.session_id.clone(), (seq, session));
        Ok(())
    }

    pub fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self
            .read()?
            .sessions
            .get(session_id)
            .map(|(_, session)| session.clone()))
    }

    /// List sessions in registration order, optionally filtered by status
    pub fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<Session>> {
        let inner = self.read()?;
        let mut entries: Vec<&(u64, Session)> = inner
            .sessions
            .values()
            .filter(|(_, s)| status.map_or(true, |wanted| s.status == wanted))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, s)| s.clone()).collect())
    }

    pub fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        updated_at: &str,
        from: &[SessionStatus],
    ) -> Result<UpdateOutcome> {
        let mut inner = self.write()?;
        let Some((_, session)) = inner.sessions.get_mut(session_id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if !from.contains(&session.status) {
            return Ok(UpdateOutcome::Skipped(session.status));
        }

        session.status = status;
        session.updated_at = updated_at.to_string();
        Ok(UpdateOutcome::Updated)
    }

    pub fn delete_all(&self) -> Result<usize> {
        let mut inner = self.write()?;
        let count = inner.sessions.len();
        inner.sessions.clear();
        inner.emails.clear();
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
