//! Session history view core.
//!
//! Owns the loaded session list, the active filter criteria, the deletion
//! workflow, and the optional detail view. The visible subset, summary
//! line, and export are pure re-derivations from the owned list. Nothing
//! is cached; after any store mutation the list is reloaded wholesale
//! rather than patched in place.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::export;
use crate::filter::{self, FilterCriteria, StatusFilter};
use crate::repository::{DeleteOutcome, SessionRepository, StoreError};
use crate::session::Session;
use crate::stats::{self, SummaryStats};
use crate::workflow::{DeleteState, DeletionWorkflow};

/// Backing state of the session-history screen.
pub struct SessionHistory<R: SessionRepository> {
    repo: R,
    sessions: Vec<Session>,
    criteria: FilterCriteria,
    workflow: DeletionWorkflow,
    /// Id of the session currently open in the detail view, if any.
    detail_view: Option<String>,
    last_error: Option<String>,
}

impl<R: SessionRepository> SessionHistory<R> {
    /// Create an empty view over `repo`. Call `reload` to populate it.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            sessions: Vec::new(),
            criteria: FilterCriteria::default(),
            workflow: DeletionWorkflow::new(),
            detail_view: None,
            last_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Replace the owned list with a fresh load from the store.
    ///
    /// On failure the previous list stays intact and the error message is
    /// recorded for the UI to surface.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        match self.repo.load_all() {
            Ok(sessions) => {
                self.sessions = sessions;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session reload failed, keeping previous list");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The full loaded list, newest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Message describing the most recent store failure, cleared by the
    /// next successful reload.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // -----------------------------------------------------------------------
    // Filtering & derived views
    // -----------------------------------------------------------------------

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.criteria.query = query.into();
    }

    pub fn set_date_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        self.criteria.date_from = from;
        self.criteria.date_to = to;
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.criteria.status = status;
    }

    /// The visible subset under the current criteria.
    pub fn visible(&self) -> Vec<Session> {
        filter::apply(&self.sessions, &self.criteria)
    }

    /// Summary line over the visible subset.
    pub fn summary(&self) -> SummaryStats {
        stats::summarize(&self.visible())
    }

    /// CSV document of the visible subset.
    pub fn export_csv(&self) -> String {
        export::to_csv(&self.visible())
    }

    /// Suggested file name for an export produced right now.
    pub fn export_filename(&self) -> String {
        export::export_filename(Utc::now().date_naive())
    }

    // -----------------------------------------------------------------------
    // Detail view
    // -----------------------------------------------------------------------

    pub fn open_detail(&mut self, session_id: &str) {
        self.detail_view = Some(session_id.to_string());
    }

    pub fn close_detail(&mut self) {
        self.detail_view = None;
    }

    /// The session shown in the detail view, if it is still loaded.
    pub fn detail_session(&self) -> Option<&Session> {
        let id = self.detail_view.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    pub fn delete_state(&self) -> &DeleteState {
        self.workflow.state()
    }

    /// Ask for confirmation to delete a loaded session. Returns false when
    /// the id is not in the current list.
    pub fn request_delete(&mut self, session_id: &str) -> bool {
        match self.sessions.iter().find(|s| s.id == session_id) {
            Some(session) => {
                self.workflow.request_delete(session.clone());
                true
            }
            None => false,
        }
    }

    /// Dismiss the confirmation. No store mutation occurs.
    pub fn cancel_delete(&mut self) {
        self.workflow.cancel();
    }

    /// Commit the pending deletion against the store.
    ///
    /// A missing target counts as success: the record is gone either way.
    /// On success the list is reloaded and a detail view showing the
    /// deleted session is closed. On failure the workflow returns to
    /// `PendingConfirmation` and the error is recorded, never swallowed.
    pub fn confirm_delete(&mut self) -> Result<(), StoreError> {
        let Some(target) = self.workflow.confirm() else {
            return Ok(());
        };

        match self.repo.delete(&target.id) {
            Ok(DeleteOutcome::NotFound) => {
                warn!(session_id = %target.id, "Delete target already gone, treating as success");
                self.finish_delete(&target)
            }
            Ok(DeleteOutcome::Deleted) => {
                info!(session_id = %target.id, "Session deleted");
                self.finish_delete(&target)
            }
            Err(e) => {
                self.workflow.delete_failed();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn finish_delete(&mut self, target: &Session) -> Result<(), StoreError> {
        self.workflow.delete_succeeded();
        if self.detail_view.as_deref() == Some(target.id.as_str()) {
            self.detail_view = None;
        }
        self.reload()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use chrono::{TimeZone, Utc};
    use std::cell::{Cell, RefCell};

    fn session(id: &str, name: &str, ending_cash: Option<f64>, total_sales: f64) -> Session {
        let closed = ending_cash.is_some();
        Session {
            id: id.to_string(),
            user_id: format!("u-{id}"),
            user_name: Some(name.to_string()),
            starting_cash: 100_000.0,
            ending_cash,
            total_sales,
            opened_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            closed_at: closed.then(|| Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap()),
            status: if closed {
                SessionStatus::Closed
            } else {
                SessionStatus::Open
            },
        }
    }

    /// In-memory store with failure injection.
    #[derive(Default)]
    struct StubRepo {
        sessions: RefCell<Vec<Session>>,
        fail_load: Cell<bool>,
        fail_delete: Cell<bool>,
        delete_calls: Cell<usize>,
    }

    impl StubRepo {
        fn with_sessions(sessions: Vec<Session>) -> Self {
            Self {
                sessions: RefCell::new(sessions),
                ..Default::default()
            }
        }
    }

    impl SessionRepository for &StubRepo {
        fn load_all(&self) -> Result<Vec<Session>, StoreError> {
            if self.fail_load.get() {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            Ok(self.sessions.borrow().clone())
        }

        fn delete(&self, session_id: &str) -> Result<DeleteOutcome, StoreError> {
            self.delete_calls.set(self.delete_calls.get() + 1);
            if self.fail_delete.get() {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            let mut sessions = self.sessions.borrow_mut();
            match sessions.iter().position(|s| s.id == session_id) {
                Some(pos) => {
                    sessions.remove(pos);
                    Ok(DeleteOutcome::Deleted)
                }
                None => Ok(DeleteOutcome::NotFound),
            }
        }
    }

    #[test]
    fn test_reload_failure_preserves_previous_list() {
        let repo = StubRepo::with_sessions(vec![
            session("s-1", "Ani", Some(105_000.0), 5_200.0),
            session("s-2", "Budi", None, 1_000.0),
        ]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();
        assert_eq!(history.sessions().len(), 2);

        repo.fail_load.set(true);
        assert!(history.reload().is_err());

        // Previous data intact, error surfaced
        assert_eq!(history.sessions().len(), 2);
        assert!(history.last_error().unwrap().contains("unavailable"));

        // A later successful reload clears the error
        repo.fail_load.set(false);
        history.reload().unwrap();
        assert!(history.last_error().is_none());
    }

    #[test]
    fn test_confirmed_delete_removes_session_and_reloads() {
        let repo = StubRepo::with_sessions(vec![
            session("s-1", "Ani", Some(105_000.0), 5_200.0),
            session("s-2", "Budi", None, 1_000.0),
        ]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();
        history.open_detail("s-1");

        assert!(history.request_delete("s-1"));
        history.confirm_delete().unwrap();

        assert!(matches!(history.delete_state(), DeleteState::Idle));
        assert!(history.sessions().iter().all(|s| s.id != "s-1"));
        // The detail view showing the deleted session must close
        assert!(history.detail_session().is_none());
    }

    #[test]
    fn test_cancel_makes_no_store_mutation() {
        let repo = StubRepo::with_sessions(vec![session("s-1", "Ani", None, 0.0)]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();

        history.request_delete("s-1");
        history.cancel_delete();

        assert_eq!(repo.delete_calls.get(), 0);
        assert_eq!(history.sessions().len(), 1);

        // Confirm after cancel is a no-op
        history.confirm_delete().unwrap();
        assert_eq!(repo.delete_calls.get(), 0);
    }

    #[test]
    fn test_delete_failure_keeps_confirmation_and_surfaces_error() {
        let repo = StubRepo::with_sessions(vec![session("s-1", "Ani", None, 0.0)]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();

        repo.fail_delete.set(true);
        history.request_delete("s-1");
        assert!(history.confirm_delete().is_err());

        // Not silently back to Idle: the user must see this failed
        assert!(matches!(
            history.delete_state(),
            DeleteState::PendingConfirmation(s) if s.id == "s-1"
        ));
        assert!(history.last_error().is_some());
        assert_eq!(history.sessions().len(), 1);

        // Retry succeeds once the store is back
        repo.fail_delete.set(false);
        history.confirm_delete().unwrap();
        assert!(history.sessions().is_empty());
    }

    #[test]
    fn test_delete_not_found_is_treated_as_success() {
        let repo = StubRepo::with_sessions(vec![session("s-1", "Ani", None, 0.0)]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();
        history.request_delete("s-1");

        // Another terminal removed the session in the meantime
        repo.sessions.borrow_mut().clear();

        history.confirm_delete().unwrap();
        assert!(matches!(history.delete_state(), DeleteState::Idle));
        assert!(history.sessions().is_empty());
    }

    #[test]
    fn test_request_delete_unknown_id() {
        let repo = StubRepo::with_sessions(vec![]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();

        assert!(!history.request_delete("missing"));
        assert!(matches!(history.delete_state(), DeleteState::Idle));
    }

    #[test]
    fn test_summary_ignores_closed_sessions_outside_subset() {
        // One open, one closed; an Open filter averages variance to 0
        // even though a closed session exists in the full list
        let repo = StubRepo::with_sessions(vec![
            session("s-1", "Ani", Some(104_000.0), 5_200.0),
            session("s-2", "Budi", None, 1_000.0),
        ]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();

        history.set_status(StatusFilter::Open);
        let stats = history.summary();
        assert_eq!(stats.session_count, 1);
        assert_eq!(stats.total_sales, 1_000.0);
        assert_eq!(stats.average_variance, 0.0);

        history.set_status(StatusFilter::Closed);
        let stats = history.summary();
        assert_eq!(stats.session_count, 1);
        // 104,000 counted against 105,200 expected
        assert_eq!(stats.average_variance, -1_200.0);
    }

    #[test]
    fn test_export_covers_visible_subset_only() {
        let repo = StubRepo::with_sessions(vec![
            session("s-1", "Ani", Some(105_000.0), 5_200.0),
            session("s-2", "Budi", None, 1_000.0),
        ]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();
        history.set_query("ani");

        let csv = history.export_csv();
        assert!(csv.contains("Ani"));
        assert!(!csv.contains("Budi"));
    }

    #[test]
    fn test_detail_session_lookup() {
        let repo = StubRepo::with_sessions(vec![session("s-1", "Ani", None, 0.0)]);
        let mut history = SessionHistory::new(&repo);
        history.reload().unwrap();

        assert!(history.detail_session().is_none());
        history.open_detail("s-1");
        assert_eq!(history.detail_session().map(|s| s.display_name()), Some("Ani"));
        history.close_detail();
        assert!(history.detail_session().is_none());
    }

    // -----------------------------------------------------------------------
    // End-to-end against the SQLite repository
    // -----------------------------------------------------------------------

    mod sqlite {
        use super::*;
        use crate::db::{self, DbState};
        use crate::repository::SqliteRepository;
        use rusqlite::Connection;
        use std::path::PathBuf;
        use std::sync::Mutex;

        fn test_repo() -> SqliteRepository {
            let conn = Connection::open_in_memory().expect("open in-memory db");
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )
            .expect("pragma setup");
            db::run_migrations_for_test(&conn);
            SqliteRepository::new(DbState {
                conn: Mutex::new(conn),
                db_path: PathBuf::from(":memory:"),
            })
        }

        #[test]
        fn test_full_flow_open_close_filter_delete() {
            let repo = test_repo();
            let ani = repo.open_session("u-1", Some("Ani"), 100_000.0).unwrap();
            repo.record_sale(&ani.id, 5_200.0).unwrap();
            repo.close_session(&ani.id, 105_000.0).unwrap();
            let budi = repo.open_session("u-2", Some("Budi"), 50_000.0).unwrap();

            let mut history = SessionHistory::new(repo);
            history.reload().unwrap();
            assert_eq!(history.sessions().len(), 2);

            history.set_status(StatusFilter::Closed);
            let visible = history.visible();
            assert_eq!(visible.len(), 1);
            assert_eq!(visible[0].variance(), Some(-200.0));
            assert_eq!(history.summary().average_variance, -200.0);

            // Delete the open session through the workflow
            history.set_status(StatusFilter::All);
            assert!(history.request_delete(&budi.id));
            history.confirm_delete().unwrap();

            assert_eq!(history.sessions().len(), 1);
            assert!(history.sessions().iter().all(|s| s.id != budi.id));
        }
    }
}
