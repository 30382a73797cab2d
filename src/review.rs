use crate::progress::{ProgressKey, ProgressStore, StoreError};
use crate::rating::{Quality, Rating};
use crate::scheduler::{self, ReviewOutcome, SchedulingState};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// A single review of an item by a user
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEvent {
    pub user_id: String,
    pub item_id: String,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
    /// Build an event from a learner's rating label
    pub fn from_rating(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        label: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            quality: Rating::from_label(label).quality(),
            reviewed_at,
        }
    }

    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(self.user_id.clone(), self.item_id.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The transition was computed but could not be stored. `pending` holds
    /// what would have been returned; resubmitting the review is safe.
    #[error("Failed to persist review of {key}: {source}")]
    Persist {
        key: ProgressKey,
        pending: Option<ReviewOutcome>,
        #[source]
        source: StoreError,
    },
}

impl ReviewError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewError::Persist { source, .. } => source.is_retryable(),
        }
    }
}

/// Apply a review: load the current state (or the initial one), schedule, and store
/// the result in one atomic step.
pub fn submit_review(
    store: &dyn ProgressStore,
    event: &ReviewEvent,
) -> Result<ReviewOutcome, ReviewError> {
    let key = event.key();
    let mut outcome = None;

    let stored = store.update(&key, &mut |current: Option<SchedulingState>| {
        let current = current.unwrap_or_else(|| SchedulingState::initial(event.reviewed_at));
        let transition = scheduler::schedule(event.quality, &current, event.reviewed_at);
        outcome = Some(transition.outcome);
        transition.state
    });

    match stored {
        Ok(state) => {
            info!(
                key = %key,
                quality = event.quality.value(),
                interval = state.interval,
                repetitions = state.repetitions,
                "review recorded"
            );
            Ok(outcome.expect("ProgressStore::update runs the closure before returning Ok"))
        }
        Err(source) => {
            warn!(key = %key, error = %source, "failed to persist review");
            Err(ReviewError::Persist {
                key,
                pending: outcome,
                source,
            })
        }
    }
}
