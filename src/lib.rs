//! SM-2 spaced repetition scheduling.
//!
//! A review (user, item, rating) is converted to a quality score, combined with the
//! item's stored [`SchedulingState`] and written back through a [`ProgressStore`].
//! Due-set selection and statistics read the same store.

pub mod config;
pub mod due;
pub mod progress;
pub mod rating;
pub mod review;
pub mod scheduler;
pub mod stats;
pub mod storage;

pub use due::due_items;
pub use progress::{MemoryStore, ProgressKey, ProgressStore, StoreError};
pub use rating::{Quality, Rating};
pub use review::{ReviewError, ReviewEvent, submit_review};
pub use scheduler::{ReviewOutcome, SchedulingState, Transition, schedule};
pub use stats::{Stage, Statistics, statistics};
pub use storage::SqliteStore;
