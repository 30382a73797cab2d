use crate::progress::{ProgressStore, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Items of `user_id` whose next review date is at or before `now`.
/// Order follows whatever the store returns; callers must not rely on it.
pub fn due_items(store: &dyn ProgressStore, user_id: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
    let items: Vec<String> = store
        .due_keys(user_id, now)?
        .into_iter()
        .map(|key| key.item_id)
        .collect();

    debug!(user_id, due = items.len(), "selected due items");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemoryStore, ProgressKey};
    use crate::scheduler::SchedulingState;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_only_past_items_are_due() {
        let store = MemoryStore::new();
        let mut past = SchedulingState::initial(now() - Duration::days(3));
        past.next_review_date = now() - Duration::hours(1);
        let mut future = SchedulingState::initial(now());
        future.next_review_date = now() + Duration::days(2);

        store.set(&ProgressKey::new("user123", "card1"), &past).unwrap();
        store.set(&ProgressKey::new("user123", "card2"), &future).unwrap();

        assert_eq!(due_items(&store, "user123", now()).unwrap(), vec!["card1".to_string()]);
    }

    #[test]
    fn test_as_of_later_date_includes_future_items() {
        let store = MemoryStore::new();
        let mut future = SchedulingState::initial(now());
        future.next_review_date = now() + Duration::days(2);
        store.set(&ProgressKey::new("u", "card"), &future).unwrap();

        assert!(due_items(&store, "u", now()).unwrap().is_empty());
        assert_eq!(due_items(&store, "u", now() + Duration::days(2)).unwrap(), vec!["card".to_string()]);
    }

    #[test]
    fn test_unknown_user_has_nothing_due() {
        let store = MemoryStore::new();
        assert!(due_items(&store, "nobody", now()).unwrap().is_empty());
    }

    #[test]
    fn test_item_ids_with_separators_are_kept_whole() {
        let store = MemoryStore::new();
        let past = SchedulingState::initial(now() - Duration::days(1));
        store.set(&ProgressKey::new("user_1", "card_a_b"), &past).unwrap();

        assert_eq!(due_items(&store, "user_1", now()).unwrap(), vec!["card_a_b".to_string()]);
    }
}
