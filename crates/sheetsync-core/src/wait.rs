//! Revision wait (long-poll)
//!
//! A client that knows revision `n` asks to be told about anything newer.
//! The store is read up to `max_attempts` times, `interval` apart; the first
//! read that finds a revision above `n` ends the wait. Between reads the
//! task sleeps on the tokio timer, so dropping the future (client went
//! away) stops polling at once.
//!
//! ```text
//! Idle -> Authorizing -> Polling(1) -> ... -> Polling(max) -> NoChange
//!              |             |                    |
//!              v             v                    v
//!            Failed     Found | Failed      Found | Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use sheetsync_store::{DocumentId, DocumentRecord, Revision, SnapshotStore};

use crate::access::load_owned;
use crate::config::WaitConfig;
use crate::error::SheetError;
use crate::license::{Credentials, LicenseRegistry};

/// Attempt budget of one wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    /// Store reads before giving up; at least one read always happens
    pub max_attempts: u32,
    /// Pause between reads
    pub interval: Duration,
}

impl WaitBudget {
    /// Create a budget
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Total pause a wait can spend sleeping between reads
    ///
    /// There is no pause after the last read, so `n` attempts sleep `n - 1`
    /// intervals. Store reads add to the wall-clock time.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

impl From<WaitConfig> for WaitBudget {
    fn from(config: WaitConfig) -> Self {
        Self::new(config.max_attempts, config.interval())
    }
}

/// Progress of one wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitState {
    /// Not started
    Idle,
    /// Checking credentials and ownership
    Authorizing,
    /// Reading the store, 1-based attempt number
    Polling(u32),
    /// A newer revision was found
    Found,
    /// Budget exhausted without a newer revision
    NoChange,
    /// Ended with an error
    Failed,
}

impl WaitState {
    /// Whether the wait has ended
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Found | Self::NoChange | Self::Failed)
    }
}

/// Transition not in the wait state table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal wait transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// State before
    pub from: WaitState,
    /// Rejected target
    pub to: WaitState,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: WaitState) -> Vec<WaitState> {
    use WaitState::*;
    match from {
        Idle => vec![Authorizing],
        Authorizing => vec![Polling(1), Failed],
        Polling(n) => vec![Polling(n.saturating_add(1)), Found, NoChange, Failed],
        Found | NoChange | Failed => vec![],
    }
}

/// Check one transition against the state table
///
/// # Errors
/// Returns [`IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(from: WaitState, to: WaitState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

#[derive(Debug)]
struct Tracker {
    document_id: DocumentId,
    state: WaitState,
}

impl Tracker {
    fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            state: WaitState::Idle,
        }
    }

    fn advance(&mut self, to: WaitState) {
        let checked = validate_transition(self.state, to);
        debug_assert!(checked.is_ok(), "{checked:?}");
        tracing::trace!(document_id = %self.document_id, from = ?self.state, ?to, "wait transition");
        self.state = to;
    }

    fn fail(&mut self, err: SheetError) -> SheetError {
        self.advance(WaitState::Failed);
        err
    }
}

/// Result of a wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// A revision newer than the known one
    Updated(DocumentRecord),
    /// Nothing newer within the budget
    NoChange,
}

/// Long-poll over the snapshot store
#[derive(Clone)]
pub struct RevisionWaiter {
    store: Arc<dyn SnapshotStore>,
    licenses: Arc<LicenseRegistry>,
    budget: WaitBudget,
}

impl std::fmt::Debug for RevisionWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionWaiter")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl RevisionWaiter {
    /// Create a waiter with a default budget
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, licenses: Arc<LicenseRegistry>, budget: WaitBudget) -> Self {
        Self {
            store,
            licenses,
            budget,
        }
    }

    /// Default budget
    #[inline]
    #[must_use]
    pub fn budget(&self) -> WaitBudget {
        self.budget
    }

    /// Wait with the default budget
    ///
    /// # Errors
    /// See [`Self::wait_with`].
    pub async fn wait(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        known: Revision,
    ) -> Result<WaitOutcome, SheetError> {
        self.wait_with(credentials, id, known, self.budget).await
    }

    /// Wait for a revision above `known`
    ///
    /// Known revision `0` returns the current document on the first read.
    ///
    /// # Errors
    /// Auth errors, `NotFound` for missing or foreign documents, and
    /// `Conflict` when `known` is above the stored revision.
    pub async fn wait_with(
        &self,
        credentials: &Credentials,
        id: DocumentId,
        known: Revision,
        budget: WaitBudget,
    ) -> Result<WaitOutcome, SheetError> {
        let mut tracker = Tracker::new(id);
        tracker.advance(WaitState::Authorizing);

        let tenant = self.licenses.authorize(credentials).map_err(|e| tracker.fail(e))?;
        let mut current = load_owned(self.store.as_ref(), &tenant, id)
            .await
            .map_err(|e| tracker.fail(e))?;
        if known > current.revision {
            return Err(tracker.fail(SheetError::Conflict(format!(
                "Revision {known} is ahead of the current revision {}",
                current.revision
            ))));
        }

        let attempts = budget.max_attempts.max(1);
        for attempt in 1..=attempts {
            tracker.advance(WaitState::Polling(attempt));
            if attempt > 1 {
                tokio::time::sleep(budget.interval).await;
                current = self.store.get(id).await.map_err(|e| tracker.fail(e.into()))?;
            }
            tracing::debug!(document_id = %id, attempt, revision = %current.revision, "polled");

            if current.revision > known {
                tracker.advance(WaitState::Found);
                tracing::info!(document_id = %id, known = %known, revision = %current.revision, "update found");
                return Ok(WaitOutcome::Updated(current));
            }
        }

        tracker.advance(WaitState::NoChange);
        Ok(WaitOutcome::NoChange)
    }
}
