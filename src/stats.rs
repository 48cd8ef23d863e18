//! Summary statistics over the visible session subset.
//!
//! Recomputed from scratch on every criteria or list change. Session
//! counts are operational, not high-volume; there is no incremental
//! state to keep consistent.

use serde::Serialize;

use crate::session::Session;

/// Derived aggregate line shown above the session table. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub session_count: usize,
    pub total_sales: f64,
    pub average_variance: f64,
}

/// Compute summary statistics over an already-filtered session list.
///
/// `total_sales` sums every visible session. `average_variance` averages
/// only the closed ones; with no closed sessions in the subset the average
/// is exactly 0.0, never a division by zero. A closed row with no counted
/// cash contributes 0 to the variance sum but still counts in the divisor.
pub fn summarize(sessions: &[Session]) -> SummaryStats {
    let total_sales = sessions.iter().map(|s| s.total_sales).sum();

    let mut closed_count = 0usize;
    let mut variance_sum = 0.0;
    for session in sessions.iter().filter(|s| s.is_closed()) {
        closed_count += 1;
        variance_sum += session.variance().unwrap_or(0.0);
    }

    let average_variance = if closed_count == 0 {
        0.0
    } else {
        variance_sum / closed_count as f64
    };

    SummaryStats {
        session_count: sessions.len(),
        total_sales,
        average_variance,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
