//! Session queries against the SQLite backend

use crate::error::{ConflictKind, CoreError, Result};
use crate::session::{NetworkIdentity, Session, SessionStatus};
use crate::store::UpdateOutcome;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

const SESSION_COLUMNS: &str = "session_id, name, email, client_mac, client_ip, server_mac, \
                               server_ip, status, created_at, updated_at";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(7)?;
    let status = status
        .parse::<SessionStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Session {
        session_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        client_data: NetworkIdentity {
            mac_address: row.get(3)?,
            ip_address: row.get(4)?,
        },
        server_data: NetworkIdentity {
            mac_address: row.get(5)?,
            ip_address: row.get(6)?,
        },
        status,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Translate a failed INSERT into a conflict when a UNIQUE constraint fired
fn map_insert_error(e: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(ref err, Some(ref msg)) = e {
        if err.code == ErrorCode::ConstraintViolation {
            if msg.contains("sessions.email") {
                return CoreError::Conflict(ConflictKind::EmailTaken);
            }
            if msg.contains("sessions.session_id") {
                return CoreError::Conflict(ConflictKind::SessionIdTaken);
            }
        }
    }
    CoreError::Database(e)
}

pub fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (session_id, name, email, client_mac, client_ip,
                               server_mac, server_ip, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            session.session_id,
            session.name,
            session.email,
            session.client_data.mac_address,
            session.client_data.ip_address,
            session.server_data.mac_address,
            session.server_data.ip_address,
            session.status.as_str(),
            session.created_at,
            session.updated_at,
        ],
    )
    .map_err(map_insert_error)?;
    Ok(())
}

pub fn find_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    let query = format!("SELECT {} FROM sessions WHERE session_id = ?", SESSION_COLUMNS);
    Ok(conn
        .query_row(&query, [session_id], row_to_session)
        .optional()?)
}

/// List sessions in registration order, optionally filtered by status
pub fn list_sessions(conn: &Connection, status: Option<SessionStatus>) -> Result<Vec<Session>> {
    let sessions = match status {
        Some(status) => {
            let query = format!(
                "SELECT {} FROM sessions WHERE status = ? ORDER BY rowid",
                SESSION_COLUMNS
            );
            let mut stmt = conn.prepare(&query)?;
            let sessions = stmt
                .query_map([status.as_str()], row_to_session)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            sessions
        }
        None => {
            let query = format!("SELECT {} FROM sessions ORDER BY rowid", SESSION_COLUMNS);
            let mut stmt = conn.prepare(&query)?;
            let sessions = stmt
                .query_map([], row_to_session)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            sessions
        }
    };

    Ok(sessions)
}

/// Set status and updated_at, but only while the current status is one of `from`
pub fn update_status(
    conn: &mut Connection,
    session_id: &str,
    status: SessionStatus,
    updated_at: &str,
    from: &[SessionStatus],
) -> Result<UpdateOutcome> {
    let tx = conn.transaction()?;

    let current: Option<String> = tx
        .query_row(
            "SELECT status FROM sessions WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )
        .optional()?;

    let outcome = match current {
        None => UpdateOutcome::Missing,
        Some(current) => {
            let current: SessionStatus = current.parse()?;
            if from.contains(&current) {
                tx.execute(
                    "UPDATE sessions SET status = ?, updated_at = ? WHERE session_id = ?",
                    params![status.as_str(), updated_at, session_id],
                )?;
                UpdateOutcome::Updated
            } else {
                UpdateOutcome::Skipped(current)
            }
        }
    };

    tx.commit()?;
    Ok(outcome)
}

/// Delete every session, returning how many rows went away
pub fn delete_all(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM sessions", [])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    fn session(id: &str, email: &str) -> Session {
        Session {
            session_id: id.to_string(),
            name: "Ana".to_string(),
            email: email.to_string(),
            client_data: NetworkIdentity {
                mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
                ip_address: Some("10.0.0.2".to_string()),
            },
            server_data: NetworkIdentity::default(),
            status: SessionStatus::Active,
            created_at: "2026-10-16T10:00:00.000-06:00".to_string(),
            updated_at: "2026-10-16T10:00:00.000-06:00".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let conn = conn();
        insert_session(&conn, &session("s1", "ana@x.com")).unwrap();

        let found = find_session(&conn, "s1").unwrap().unwrap();
        assert_eq!(found, session("s1", "ana@x.com"));
        assert!(find_session(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let conn = conn();
        insert_session(&conn, &session("s1", "ana@x.com")).unwrap();

        let err = insert_session(&conn, &session("s2", "ana@x.com")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ConflictKind::EmailTaken)));
        assert_eq!(list_sessions(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_id_is_conflict() {
        let conn = conn();
        insert_session(&conn, &session("s1", "ana@x.com")).unwrap();

        let err = insert_session(&conn, &session("s1", "bob@x.com")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ConflictKind::SessionIdTaken)));
    }

    #[test]
    fn test_update_status_outcomes() {
        let mut conn = conn();
        insert_session(&conn, &session("s1", "ana@x.com")).unwrap();

        let outcome = update_status(
            &mut conn,
            "s1",
            SessionStatus::UserTerminated,
            "2026-10-16T10:05:00.000-06:00",
            &[SessionStatus::Active],
        )
        .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let stored = find_session(&conn, "s1").unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::UserTerminated);
        assert_eq!(stored.updated_at, "2026-10-16T10:05:00.000-06:00");

        let outcome = update_status(
            &mut conn,
            "s1",
            SessionStatus::Active,
            "2026-10-16T10:06:00.000-06:00",
            SessionStatus::refreshable(),
        )
        .unwrap();
        assert_eq!(outcome, UpdateOutcome::Skipped(SessionStatus::UserTerminated));

        let outcome = update_status(
            &mut conn,
            "missing",
            SessionStatus::Active,
            "2026-10-16T10:06:00.000-06:00",
            SessionStatus::refreshable(),
        )
        .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[test]
    fn test_list_by_status_and_delete_all() {
        let mut conn = conn();
        insert_session(&conn, &session("s1", "a@x.com")).unwrap();
        insert_session(&conn, &session("s2", "b@x.com")).unwrap();
        update_status(
            &mut conn,
            "s2",
            SessionStatus::UserTerminated,
            "2026-10-16T10:05:00.000-06:00",
            &[SessionStatus::Active],
        )
        .unwrap();

        let active = list_sessions(&conn, Some(SessionStatus::Active)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, "s1");

        let all = list_sessions(&conn, None).unwrap();
        assert_eq!(
            all.iter().map(|s| s.session_id.as_str()).collect::<Vec<_>>(),
            vec!["s1", "s2"]
        );

        assert_eq!(delete_all(&conn).unwrap(), 2);
        assert!(list_sessions(&conn, None).unwrap().is_empty());
    }
}
