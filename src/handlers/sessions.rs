//! Session lifecycle logic
//!
//! Register, inspect, refresh, terminate and bulk operations over the
//! session store. Holds no per-request state; everything lives in the store.

use crate::clock::Clock;
use crate::error::{ConflictKind, CoreError, Result};
use crate::network::IdentityProvider;
use crate::session::{
    NetworkIdentity, RegisterRequest, Session, SessionDetails, SessionStatus,
};
use crate::store::{SessionStore, UpdateOutcome};

/// Session registry
#[derive(Clone)]
pub struct SessionRegistry {
    store: SessionStore,
    identity: IdentityProvider,
    clock: Clock,
    strict_updates: bool,
}

impl SessionRegistry {
    pub fn new(store: SessionStore, identity: IdentityProvider, clock: Clock) -> Self {
        SessionRegistry {
            store,
            identity,
            clock,
            strict_updates: false,
        }
    }

    /// Answer refresh/terminate on unknown ids with NotFound instead of an ack
    pub fn with_strict_updates(mut self, strict: bool) -> Self {
        self.strict_updates = strict;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Register a new Active session and return its id
    pub async fn register(
        &self,
        request: RegisterRequest,
        caller_ip: Option<String>,
    ) -> Result<String> {
        let new = request.validate()?;

        let now = self.clock.stamp();
        let session = Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            client_data: NetworkIdentity {
                mac_address: Some(new.client_mac),
                ip_address: caller_ip,
            },
            server_data: self.identity.server_identity(),
            status: SessionStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        };
        let session_id = session.session_id.clone();

        match self.store.create(session).await {
            Ok(()) => {
                tracing::info!("Registered session {}", session_id);
                Ok(session_id)
            }
            Err(CoreError::Conflict(kind)) => {
                tracing::warn!("Registration rejected: {}", kind.code());
                Err(CoreError::Conflict(kind))
            }
            Err(e) => {
                tracing::error!("Failed to store session {}: {}", session_id, e);
                Err(e)
            }
        }
    }

    /// Fetch a session and the seconds elapsed since it was last updated
    pub async fn inspect(&self, session_id: &str) -> Result<SessionDetails> {
        let session_id = require_id(session_id)?;

        let session = self
            .store
            .find_one(session_id)
            .await
            .inspect_err(|e| tracing::error!("Failed to load session {}: {}", session_id, e))?
            .ok_or_else(|| CoreError::NotFound("Session", session_id.to_string()))?;

        let session_duration_seconds = self.clock.seconds_since(&session.updated_at)?;

        Ok(SessionDetails {
            session,
            session_duration_seconds,
        })
    }

    pub async fn list_active(&self) -> Result<Vec<Session>> {
        self.store
            .find(Some(SessionStatus::Active))
            .await
            .inspect_err(|e| tracing::error!("Failed to list active sessions: {}", e))
    }

    pub async fn list_all(&self) -> Result<Vec<Session>> {
        self.store
            .find(None)
            .await
            .inspect_err(|e| tracing::error!("Failed to list sessions: {}", e))
    }

    /// Mark a session Active again and stamp updatedAt.
    ///
    /// Terminated sessions are never reactivated.
    pub async fn refresh(&self, session_id: &str) -> Result<()> {
        let session_id = require_id(session_id)?;
        let outcome = self
            .store
            .update_status(
                session_id,
                SessionStatus::Active,
                self.clock.stamp(),
                SessionStatus::refreshable(),
            )
            .await
            .inspect_err(|e| tracing::error!("Failed to refresh session {}: {}", session_id, e))?;

        match outcome {
            UpdateOutcome::Updated => {
                tracing::debug!("Refreshed session {}", session_id);
                Ok(())
            }
            UpdateOutcome::Missing => self.on_missing(session_id),
            UpdateOutcome::Skipped(current) => {
                tracing::debug!(
                    "Refresh ignored for session {} in status {}",
                    session_id,
                    current
                );
                if self.strict_updates {
                    Err(CoreError::Conflict(ConflictKind::SessionTerminated))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// End a session on behalf of its user
    pub async fn terminate(&self, session_id: &str) -> Result<()> {
        let session_id = require_id(session_id)?;
        let outcome = self
            .store
            .update_status(
                session_id,
                SessionStatus::UserTerminated,
                self.clock.stamp(),
                SessionStatus::refreshable(),
            )
            .await
            .inspect_err(|e| tracing::error!("Failed to terminate session {}: {}", session_id, e))?;

        match outcome {
            UpdateOutcome::Updated => {
                tracing::info!("Session {} terminated by user", session_id);
                Ok(())
            }
            UpdateOutcome::Missing => self.on_missing(session_id),
            UpdateOutcome::Skipped(current) => {
                debug_assert!(current.is_terminated());
                tracing::debug!("Session {} already {}", session_id, current);
                Ok(())
            }
        }
    }

    /// Delete every session. Irreversible.
    pub async fn purge_all(&self) -> Result<usize> {
        let deleted = self
            .store
            .delete_all()
            .await
            .inspect_err(|e| tracing::error!("Failed to purge sessions: {}", e))?;
        tracing::info!("Purged {} sessions", deleted);
        Ok(deleted)
    }

    fn on_missing(&self, session_id: &str) -> Result<()> {
        if self.strict_updates {
            Err(CoreError::NotFound("Session", session_id.to_string()))
        } else {
            tracing::debug!("No session {} to update", session_id);
            Ok(())
        }
    }
}

fn require_id(session_id: &str) -> Result<&str> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(CoreError::Validation("Falta el sessionId".to_string()));
    }
    Ok(session_id)
}
