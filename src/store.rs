//! SessionStore - abstracts the storage backend behind the registry.
//!
//! Uses enum dispatch to support multiple backends without trait objects.
//! - `Db` variant - SQLite database (storage = "db")
//! - `Ephemeral` variant - in-memory index (storage = "ephemeral")

use crate::config::{Config, Storage};
use crate::db::Database;
use crate::ephemeral::EphemeralIndex;
use crate::error::Result;
use crate::session::{Session, SessionStatus};
use std::sync::Arc;

/// Result of a conditional status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record matched and was written
    Updated,
    /// No record has this session id
    Missing,
    /// The record exists but its current status doesn't allow the transition
    Skipped(SessionStatus),
}

/// Storage backend used by the session registry.
#[derive(Clone)]
pub enum SessionStore {
    /// SQLite database backend
    Db(Arc<Database>),
    /// In-memory ephemeral backend
    Ephemeral(Arc<EphemeralIndex>),
}

impl SessionStore {
    /// Open the backend selected in the configuration
    pub fn open(config: &Config) -> Result<Self> {
        match config.storage {
            Storage::Db => {
                let db_path = config.data_dir().join("sessions.db");
                tracing::info!("Opening session database at {}", db_path.display());
                Ok(SessionStore::Db(Arc::new(Database::new(db_path)?)))
            }
            Storage::Ephemeral => {
                tracing::info!("Using ephemeral in-memory session storage");
                Ok(SessionStore::Ephemeral(Arc::new(EphemeralIndex::new())))
            }
        }
    }

    pub fn storage(&self) -> Storage {
        match self {
            SessionStore::Db(_) => Storage::Db,
            SessionStore::Ephemeral(_) => Storage::Ephemeral,
        }
    }

    /// Persist a new session. Fails with a conflict on duplicate id or email.
    pub async fn create(&self, session: Session) -> Result<()> {
        match self {
            SessionStore::Db(db) => {
                db.with_conn(move |conn| crate::db::sessions::insert_session(conn, &session))
                    .await
            }
            SessionStore::Ephemeral(idx) => idx.insert_session(session),
        }
    }

    pub async fn find_one(&self, session_id: &str) -> Result<Option<Session>> {
        match self {
            SessionStore::Db(db) => {
                let session_id = session_id.to_string();
                db.with_conn(move |conn| crate::db::sessions::find_session(conn, &session_id))
                    .await
            }
            SessionStore::Ephemeral(idx) => idx.find_session(session_id),
        }
    }

    /// All sessions in registration order, optionally restricted to one status
    pub async fn find(&self, status: Option<SessionStatus>) -> Result<Vec<Session>> {
        match self {
            SessionStore::Db(db) => {
                db.with_conn(move |conn| crate::db::sessions::list_sessions(conn, status))
                    .await
            }
            SessionStore::Ephemeral(idx) => idx.list_sessions(status),
        }
    }

    /// Set `status` and `updated_at` if the session exists and its current
    /// status is one of `from`.
    pub async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        updated_at: String,
        from: &'static [SessionStatus],
    ) -> Result<UpdateOutcome> {
        match self {
            SessionStore::Db(db) => {
                let session_id = session_id.to_string();
                db.with_conn(move |conn| {
                    crate::db::sessions::update_status(conn, &session_id, status, &updated_at, from)
                })
                .await
            }
            SessionStore::Ephemeral(idx) => idx.update_status(session_id, status, &updated_at, from),
        }
    }

    /// Remove every session, returning the count removed
    pub async fn delete_all(&self) -> Result<usize> {
        match self {
            SessionStore::Db(db) => db.with_conn(|conn| crate::db::sessions::delete_all(conn)).await,
            SessionStore::Ephemeral(idx) => idx.delete_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NetworkIdentity;

    fn session(id: &str, email: &str) -> Session {
        Session {
            session_id: id.to_string(),
            name: "Ana".to_string(),
            email: email.to_string(),
            client_data: NetworkIdentity::default(),
            server_data: NetworkIdentity::default(),
            status: SessionStatus::Active,
            created_at: "2026-10-16T10:00:00.000-06:00".to_string(),
            updated_at: "2026-10-16T10:00:00.000-06:00".to_string(),
        }
    }

    fn backends() -> Vec<SessionStore> {
        vec![
            SessionStore::Db(Arc::new(Database::open_in_memory().unwrap())),
            SessionStore::Ephemeral(Arc::new(EphemeralIndex::new())),
        ]
    }

    #[tokio::test]
    async fn test_backends_agree() {
        for store in backends() {
            store.create(session("s1", "a@x.com")).await.unwrap();
            store.create(session("s2", "b@x.com")).await.unwrap();
            assert!(store.create(session("s3", "a@x.com")).await.is_err());

            let outcome = store
                .update_status(
                    "s2",
                    SessionStatus::UserTerminated,
                    "2026-10-16T10:05:00.000-06:00".to_string(),
                    &[SessionStatus::Active],
                )
                .await
                .unwrap();
            assert_eq!(outcome, UpdateOutcome::Updated, "{:?}", store.storage());

            let active = store.find(Some(SessionStatus::Active)).await.unwrap();
            assert_eq!(active.len(), 1);
            assert_eq!(store.find(None).await.unwrap().len(), 2);
            assert!(store.find_one("s3").await.unwrap().is_none());

            assert_eq!(store.delete_all().await.unwrap(), 2);
            assert!(store.find(None).await.unwrap().is_empty());
        }
    }

    #[test]
    fn test_open_ephemeral_from_config() {
        let mut config = Config::default();
        config.storage = Storage::Ephemeral;
        let store = SessionStore::open(&config).unwrap();
        assert_eq!(store.storage(), Storage::Ephemeral);
    }

    #[test]
    fn test_open_db_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();
        let store = SessionStore::open(&config).unwrap();
        assert_eq!(store.storage(), Storage::Db);
        assert!(dir.path().join("sessions.db").exists());
    }
}
