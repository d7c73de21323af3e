//! SQLite schema for the session registry

use rusqlite::{Connection, Result};

/// Initialize the database with required tables
pub fn init_db(conn: &Connection) -> Result<()> {
    // Sessions table - one row per registered session
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            client_mac TEXT,
            client_ip TEXT,
            server_mac TEXT,
            server_ip TEXT,
            status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN (
                'Active', 'Inactive', 'UserTerminated', 'SystemFailureTerminated'
            )),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status)",
        [],
    )?;

    Ok(())
}
