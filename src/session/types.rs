//! Session record and request types

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Registered or refreshed
    Active,
    /// Declared but never reached by any exposed operation
    Inactive,
    /// Ended by the client via logout
    UserTerminated,
    /// Reserved for failures detected outside the request path
    SystemFailureTerminated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Inactive => "Inactive",
            SessionStatus::UserTerminated => "UserTerminated",
            SessionStatus::SystemFailureTerminated => "SystemFailureTerminated",
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(
            self,
            SessionStatus::UserTerminated | SessionStatus::SystemFailureTerminated
        )
    }

    /// Live statuses: the only ones refresh and terminate may move away from
    pub fn refreshable() -> &'static [SessionStatus] {
        &[SessionStatus::Active, SessionStatus::Inactive]
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(SessionStatus::Active),
            "Inactive" => Ok(SessionStatus::Inactive),
            "UserTerminated" => Ok(SessionStatus::UserTerminated),
            "SystemFailureTerminated" => Ok(SessionStatus::SystemFailureTerminated),
            other => Err(CoreError::Storage(format!("Unknown session status: {}", other))),
        }
    }
}

/// MAC + IPv4 pair captured once at registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkIdentity {
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
}

/// A tracked session as persisted and returned over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub name: String,
    pub email: String,
    pub client_data: NetworkIdentity,
    pub server_data: NetworkIdentity,
    pub status: SessionStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Registration input as received from the caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub client_mac: Option<String>,
}

/// Registration input after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub name: String,
    pub email: String,
    pub client_mac: String,
}

impl RegisterRequest {
    /// Trim every field and reject the request if any is missing or blank
    pub fn validate(self) -> Result<NewSession> {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let name = present(self.name);
        let email = present(self.email);
        let client_mac = present(self.client_mac);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if email.is_none() {
            missing.push("email");
        }
        if client_mac.is_none() {
            missing.push("clientMac");
        }

        match (name, email, client_mac) {
            (Some(name), Some(email), Some(client_mac)) => Ok(NewSession {
                name,
                email,
                client_mac,
            }),
            _ => Err(CoreError::Validation(format!(
                "Datos no recibidos correctamente, faltan: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Session plus elapsed seconds since its last update
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    pub session: Session,
    pub session_duration_seconds: i64,
}
