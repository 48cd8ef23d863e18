//! Session list filtering.
//!
//! Pure predicate evaluation over an in-memory session list: free-text
//! query, inclusive open-date range, and status selector, ANDed together.
//! `apply` never mutates its input and owns no state; the caller re-invokes
//! it whenever the list or the criteria change.

use chrono::NaiveDate;

use crate::session::Session;

/// Status selector for the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Closed,
}

/// Filter criteria for the session history view.
///
/// An empty query matches everything; an absent date bound is unconstrained
/// on that side. `date_to` is inclusive through end-of-day. The date range
/// is evaluated against `opened_at` (sessions *opened* within range), not
/// against the close time.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub query: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: StatusFilter,
}

impl FilterCriteria {
    /// True when every predicate accepts the session.
    pub fn matches(&self, session: &Session) -> bool {
        self.matches_text(session) && self.matches_date_range(session) && self.matches_status(session)
    }

    /// Case-insensitive substring match against the displayed cashier name
    /// and the session id. Source data is Latin-script names and UUIDs, so
    /// ASCII case folding is sufficient.
    fn matches_text(&self, session: &Session) -> bool {
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        let query = query.to_ascii_lowercase();
        session
            .display_name()
            .to_ascii_lowercase()
            .contains(&query)
            || session.id.to_ascii_lowercase().contains(&query)
    }

    fn matches_date_range(&self, session: &Session) -> bool {
        // Comparing calendar dates makes date_to inclusive through 23:59:59
        let opened = session.opened_at.date_naive();
        self.date_from.map_or(true, |from| opened >= from)
            && self.date_to.map_or(true, |to| opened <= to)
    }

    fn matches_status(&self, session: &Session) -> bool {
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Open => !session.is_closed(),
            StatusFilter::Closed => session.is_closed(),
        }
    }
}

/// Derive the visible subset of `sessions` under `criteria`.
///
/// Deterministic and idempotent; preserves the input order.
pub fn apply(sessions: &[Session], criteria: &FilterCriteria) -> Vec<Session> {
    sessions
        .iter()
        .filter(|s| criteria.matches(s))
        .cloned()
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
