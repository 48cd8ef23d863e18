//! Deletion confirmation workflow.
//!
//! The two-step confirm/cancel dialog around the irreversible delete,
//! reframed as an explicit state machine so it can be unit-tested without
//! a UI harness. The machine holds intent only; the history view performs
//! the actual store call between `confirm` and
//! `delete_succeeded`/`delete_failed`.

use crate::session::Session;

/// Where the workflow currently stands for a single delete attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DeleteState {
    #[default]
    Idle,
    /// The user asked to delete this session; nothing has hit the store yet.
    PendingConfirmation(Session),
    /// The store call is in flight.
    Deleting(Session),
}

/// Confirm-then-commit state machine guarding session deletion.
///
/// Re-entrant: a new `request_delete` from any state simply restarts at
/// `PendingConfirmation` with the new target. Pending deletions are never
/// queued.
#[derive(Debug, Default)]
pub struct DeletionWorkflow {
    state: DeleteState,
}

impl DeletionWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeleteState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DeleteState::Idle
    }

    /// The session currently awaiting confirmation or being deleted.
    pub fn target(&self) -> Option<&Session> {
        match &self.state {
            DeleteState::Idle => None,
            DeleteState::PendingConfirmation(s) | DeleteState::Deleting(s) => Some(s),
        }
    }

    /// Capture the delete intent. No store call happens here.
    pub fn request_delete(&mut self, session: Session) {
        self.state = DeleteState::PendingConfirmation(session);
    }

    /// Abandon the pending confirmation. No side effects. Ignored while a
    /// delete is already in flight; there is nothing left to abort.
    pub fn cancel(&mut self) {
        if matches!(self.state, DeleteState::PendingConfirmation(_)) {
            self.state = DeleteState::Idle;
        }
    }

    /// Commit the pending deletion, returning the target the caller must
    /// now delete from the store. `None` when nothing was pending.
    pub fn confirm(&mut self) -> Option<Session> {
        match std::mem::take(&mut self.state) {
            DeleteState::PendingConfirmation(session) => {
                self.state = DeleteState::Deleting(session.clone());
                Some(session)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// The store delete completed. Returns the deleted session so the
    /// caller can reload and close any detail view showing it.
    pub fn delete_succeeded(&mut self) -> Option<Session> {
        match std::mem::take(&mut self.state) {
            DeleteState::Deleting(session) => Some(session),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// The store delete failed. The target returns to
    /// `PendingConfirmation`; the workflow must never fall back to `Idle`
    /// as if the deletion had succeeded.
    pub fn delete_failed(&mut self) {
        if let DeleteState::Deleting(session) = std::mem::take(&mut self.state) {
            self.state = DeleteState::PendingConfirmation(session);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
