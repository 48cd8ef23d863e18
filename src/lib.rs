//! Cashier session ledger & reconciliation core.
//!
//! Backend core of the POS companion's session-history feature: the
//! session ledger (open/close with cash variance), multi-predicate
//! filtering, summary statistics, CSV export, and the confirm-then-commit
//! deletion workflow. The UI layer is a thin view over this crate.
//!
//! The SQLite store is the single source of truth. Every mutation is
//! followed by a fresh `load_all`; filtering and aggregation are pure
//! functions over the loaded list, re-invoked by the caller whenever the
//! list or the criteria change.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod db;
pub mod export;
pub mod filter;
pub mod history;
pub mod repository;
pub mod session;
pub mod stats;
pub mod workflow;

pub use filter::{FilterCriteria, StatusFilter};
pub use history::SessionHistory;
pub use repository::{DeleteOutcome, SessionRepository, SqliteRepository, StoreError};
pub use session::{Session, SessionStatus};
pub use stats::SummaryStats;
pub use workflow::{DeleteState, DeletionWorkflow};

/// Initialize structured console logging for an embedding app.
///
/// Honors `RUST_LOG`; defaults to info globally with debug for this crate.
/// Call once at startup.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cashier_ledger=debug"));

    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
