//! Session repository over the SQLite store.
//!
//! Read side: `load_all` (opened-at descending) and `delete`, behind the
//! `SessionRepository` trait so the history view can be driven against a
//! stub store in tests. Write side: `open_session`, `close_session`, and
//! `record_sale`, the operations the drawer-open and checkout flows call.
//!
//! The repository keeps no cache. After any mutation, callers re-derive
//! their views from a fresh `load_all`; the store of record is the only
//! source of truth.

use std::path::Path;
use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, DbState};
use crate::session::{Session, SessionStatus};

/// Failures originating at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed.
    /// Recoverable: the user may retry, and callers keep their previous
    /// in-memory list intact.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The target session does not exist.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The operation conflicts with the session's current state
    /// (already open, already closed, non-positive amount).
    #[error("{0}")]
    Conflict(String),
}

/// Result of a delete. A missing target is an outcome, not an error:
/// the record is gone either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Read-side contract consumed by the history view.
pub trait SessionRepository {
    /// Load every session, ordered by `opened_at` descending.
    fn load_all(&self) -> Result<Vec<Session>, StoreError>;

    /// Permanently remove a session. No soft-delete, no undo.
    fn delete(&self, session_id: &str) -> Result<DeleteOutcome, StoreError>;
}

/// `SessionRepository` backed by the local SQLite ledger database.
pub struct SqliteRepository {
    db: DbState,
}

const SESSION_COLUMNS: &str =
    "id, user_id, user_name, starting_cash, ending_cash, total_sales, opened_at, closed_at, status";

impl SqliteRepository {
    pub fn new(db: DbState) -> Self {
        Self { db }
    }

    /// Open (or create) the ledger database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        db::init(data_dir).map(Self::new).map_err(StoreError::Unavailable)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Fetch a single session by id.
    pub fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.conn()?;
        fetch_session(&conn, session_id)
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Open a new session for an operator.
    ///
    /// Rejects a second open session for the same operator; one drawer per
    /// cashier at a time.
    pub fn open_session(
        &self,
        user_id: &str,
        user_name: Option<&str>,
        starting_cash: f64,
    ) -> Result<Session, StoreError> {
        let conn = self.conn()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM cashier_sessions WHERE user_id = ?1 AND status = 'open'",
                params![user_id],
                |row| row.get(0),
            )
            .ok();
        if let Some(existing_id) = existing {
            return Err(StoreError::Conflict(format!(
                "operator {user_id} already has an open session ({existing_id})"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let opened_at = Utc::now();
        let now = opened_at.to_rfc3339();

        conn.execute(
            "INSERT INTO cashier_sessions (
                id, user_id, user_name, starting_cash, total_sales,
                opened_at, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, 'open', ?5, ?5)",
            params![id, user_id, user_name, starting_cash, now],
        )
        .map_err(|e| StoreError::Unavailable(format!("insert session: {e}")))?;

        info!(session_id = %id, user_id = %user_id, starting_cash = %starting_cash, "Session opened");

        Ok(Session {
            id,
            user_id: user_id.to_string(),
            user_name: user_name.map(String::from),
            starting_cash,
            ending_cash: None,
            total_sales: 0.0,
            opened_at,
            closed_at: None,
            status: SessionStatus::Open,
        })
    }

    /// Close an open session against the counted drawer cash.
    ///
    /// Sets `ending_cash`, `closed_at`, and the persisted
    /// `expected_cash`/`variance` snapshot in one statement. The
    /// `status = 'open'` guard makes the close exactly-once; a partial
    /// close is unrepresentable.
    pub fn close_session(&self, session_id: &str, ending_cash: f64) -> Result<Session, StoreError> {
        let conn = self.conn()?;

        let mut session = fetch_session(&conn, session_id)?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        if session.is_closed() {
            return Err(StoreError::Conflict(format!(
                "session {session_id} is already closed"
            )));
        }

        let expected = session.expected_cash();
        let variance = ending_cash - expected;
        let closed_at = Utc::now();
        let now = closed_at.to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE cashier_sessions SET
                    ending_cash = ?1, closed_at = ?2, expected_cash = ?3,
                    variance = ?4, status = 'closed', updated_at = ?2
                 WHERE id = ?5 AND status = 'open'",
                params![ending_cash, now, expected, variance, session_id],
            )
            .map_err(|e| StoreError::Unavailable(format!("close session: {e}")))?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "session {session_id} is already closed"
            )));
        }

        info!(session_id = %session_id, variance = %variance, "Session closed");

        session.ending_cash = Some(ending_cash);
        session.closed_at = Some(closed_at);
        session.status = SessionStatus::Closed;
        Ok(session)
    }

    /// Accumulate a completed cash sale onto an open session. Called by the
    /// checkout flow; `total_sales` only ever grows while the session is open.
    pub fn record_sale(&self, session_id: &str, amount: f64) -> Result<(), StoreError> {
        if amount <= 0.0 {
            return Err(StoreError::Conflict("sale amount must be positive".into()));
        }

        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE cashier_sessions SET
                    total_sales = total_sales + ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'open'",
                params![amount, Utc::now().to_rfc3339(), session_id],
            )
            .map_err(|e| StoreError::Unavailable(format!("record sale: {e}")))?;

        if changed == 0 {
            return match fetch_session(&conn, session_id)? {
                None => Err(StoreError::NotFound(session_id.to_string())),
                Some(_) => Err(StoreError::Conflict(format!(
                    "cannot record a sale on closed session {session_id}"
                ))),
            };
        }

        info!(session_id = %session_id, amount = %amount, "Sale recorded");
        Ok(())
    }
}

impl SessionRepository for SqliteRepository {
    fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM cashier_sessions ORDER BY opened_at DESC"
            ))
            .map_err(|e| StoreError::Unavailable(format!("prepare load: {e}")))?;

        let rows = stmt
            .query_map([], session_from_row)
            .map_err(|e| StoreError::Unavailable(format!("query sessions: {e}")))?;

        let mut sessions = Vec::new();
        for row in rows {
            match row {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("skipping malformed session row: {e}"),
            }
        }

        Ok(sessions)
    }

    fn delete(&self, session_id: &str) -> Result<DeleteOutcome, StoreError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM cashier_sessions WHERE id = ?1",
                params![session_id],
            )
            .map_err(|e| StoreError::Unavailable(format!("delete session: {e}")))?;

        if changed == 0 {
            Ok(DeleteOutcome::NotFound)
        } else {
            info!(session_id = %session_id, "Session deleted");
            Ok(DeleteOutcome::Deleted)
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map a `SESSION_COLUMNS` row to a `Session`.
///
/// The persisted `expected_cash`/`variance` columns are deliberately not
/// selected: both are recomputed from the base fields on read.
fn session_from_row(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let opened_at: String = row.get(6)?;
    let closed_at: Option<String> = row.get(7)?;
    let status: String = row.get(8)?;

    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        starting_cash: row.get(3)?,
        ending_cash: row.get(4)?,
        total_sales: row.get(5)?,
        opened_at: parse_timestamp(6, &opened_at)?,
        closed_at: match closed_at {
            Some(ts) => Some(parse_timestamp(7, &ts)?),
            None => None,
        },
        status: SessionStatus::from_db(&status),
    })
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn fetch_session(conn: &Connection, session_id: &str) -> Result<Option<Session>, StoreError> {
    let result = conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM cashier_sessions WHERE id = ?1"),
        params![session_id],
        session_from_row,
    );

    match result {
        Ok(session) => Ok(Some(session)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Unavailable(format!("query session: {e}"))),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
