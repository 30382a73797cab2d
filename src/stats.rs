use crate::progress::{ProgressStore, Result};
use crate::scheduler::{INITIAL_EASE_FACTOR, SchedulingState};
use serde::{Deserialize, Serialize};

/// Successful reviews in a row required before an item can count as mastered
pub const MASTERED_REPETITIONS: u32 = 5;

/// Learning progress bucket of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    New,
    Learning,
    Mastered,
}

impl Stage {
    pub fn of(state: &SchedulingState) -> Self {
        if state.repetitions >= MASTERED_REPETITIONS && state.ease_factor > INITIAL_EASE_FACTOR {
            Stage::Mastered
        } else if state.repetitions > 0 {
            Stage::Learning
        } else {
            Stage::New
        }
    }
}

/// Aggregate review statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_cards: usize,
    pub mastered_cards: usize,
    pub learning_cards: usize,
    pub new_cards: usize,
    /// Mean ease factor, 0 when there are no cards
    pub average_ease_factor: f64,
}

impl Statistics {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a SchedulingState>) -> Self {
        let mut stats = Statistics::default();
        let mut total_ease = 0.0;

        for state in states {
            stats.total_cards += 1;
            total_ease += state.ease_factor;
            match Stage::of(state) {
                Stage::Mastered => stats.mastered_cards += 1,
                Stage::Learning => stats.learning_cards += 1,
                Stage::New => stats.new_cards += 1,
            }
        }

        if stats.total_cards > 0 {
            stats.average_ease_factor = total_ease / stats.total_cards as f64;
        }
        stats
    }
}

/// Compute statistics over every item the user has reviewed
pub fn statistics(store: &dyn ProgressStore, user_id: &str) -> Result<Statistics> {
    let states = store.states_for_user(user_id)?;
    Ok(Statistics::from_states(&states))
}
