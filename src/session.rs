//! Session entity for the cashier ledger.
//!
//! A session covers one cashier shift from drawer-open to drawer-close.
//! `expected_cash` and `variance` are pure functions of the base fields,
//! recomputed on every read. The store persists both at close for external
//! consumers, but nothing in this crate reads the stored copies back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown when a session has no denormalized cashier name.
pub const UNKNOWN_CASHIER: &str = "Unknown cashier";

/// Lifecycle state of a session. There are no intermediate states:
/// `Closed` holds exactly when both `ending_cash` and `closed_at` are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }

    /// Map a stored status string. Anything other than `closed` reads as
    /// `Open`; upstream rows with unknown statuses must not crash the view.
    pub fn from_db(raw: &str) -> SessionStatus {
        if raw.eq_ignore_ascii_case("closed") {
            SessionStatus::Closed
        } else {
            SessionStatus::Open
        }
    }
}

/// One cashier session as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub starting_cash: f64,
    pub ending_cash: Option<f64>,
    pub total_sales: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl Session {
    /// Display label for the operator who opened the session.
    pub fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_CASHIER)
    }

    /// Cash the drawer should contain: starting float plus accumulated sales.
    pub fn expected_cash(&self) -> f64 {
        self.starting_cash + self.total_sales
    }

    /// Counted cash minus expected cash. Positive = over, negative = short.
    ///
    /// `None` until the drawer has been counted, including the degenerate
    /// case of a `Closed` row whose `ending_cash` is missing. Write-side
    /// validation lives upstream; such rows are tolerated here.
    pub fn variance(&self) -> Option<f64> {
        self.ending_cash.map(|ending| ending - self.expected_cash())
    }

    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }
}

// ===========================================================================
// Tests
// ===========================================================================
