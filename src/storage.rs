use crate::progress::{ProgressKey, ProgressStore, Result, StoreError};
use crate::rating::Quality;
use crate::scheduler::SchedulingState;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SELECT_STATE: &str = "SELECT repetitions, ease_factor, interval_days,
        next_review_date, last_review_date, last_quality
 FROM progress";

/// Scheduling state row as read from the database, timestamps still in epoch micros
struct StoredProgress {
    repetitions: u32,
    ease_factor: f64,
    interval_days: u32,
    next_review_date: i64,
    last_review_date: i64,
    last_quality: i64,
}

impl StoredProgress {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredProgress {
            repetitions: row.get(0)?,
            ease_factor: row.get(1)?,
            interval_days: row.get(2)?,
            next_review_date: row.get(3)?,
            last_review_date: row.get(4)?,
            last_quality: row.get(5)?,
        })
    }

    fn into_state(self) -> Result<SchedulingState> {
        Ok(SchedulingState {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval: self.interval_days,
            next_review_date: parse_timestamp(self.next_review_date)?,
            last_review_date: parse_timestamp(self.last_review_date)?,
            last_quality: Quality::clamped(self.last_quality),
        })
    }
}

/// Microseconds since the Unix epoch, so SQL comparisons follow time order
fn format_timestamp(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn parse_timestamp(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::InvalidTimestamp(micros.to_string()))
}

/// SQLite-backed progress store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, busy_timeout)
    }

    /// Throwaway database that lives as long as the store
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, Duration::ZERO)
    }

    fn with_connection(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout)?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS progress (
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                repetitions INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 0,
                next_review_date INTEGER NOT NULL,
                last_review_date INTEGER NOT NULL,
                last_quality INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, item_id)
            );

            CREATE INDEX IF NOT EXISTS idx_progress_due ON progress(user_id, next_review_date);
            ",
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read(conn: &Connection, key: &ProgressKey) -> Result<Option<SchedulingState>> {
        let row = conn.query_row(
            &format!("{SELECT_STATE} WHERE user_id = ?1 AND item_id = ?2"),
            params![key.user_id, key.item_id],
            StoredProgress::from_row,
        );

        match row {
            Ok(stored) => stored.into_state().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(conn: &Connection, key: &ProgressKey, state: &SchedulingState) -> Result<()> {
        conn.execute(
            "INSERT INTO progress (user_id, item_id, repetitions, ease_factor, interval_days,
                                   next_review_date, last_review_date, last_quality)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id, item_id) DO UPDATE SET
                repetitions = ?3,
                ease_factor = ?4,
                interval_days = ?5,
                next_review_date = ?6,
                last_review_date = ?7,
                last_quality = ?8",
            params![
                key.user_id,
                key.item_id,
                state.repetitions,
                state.ease_factor,
                state.interval,
                format_timestamp(state.next_review_date),
                format_timestamp(state.last_review_date),
                state.last_quality.value(),
            ],
        )?;

        Ok(())
    }
}

impl ProgressStore for SqliteStore {
    fn get(&self, key: &ProgressKey) -> Result<Option<SchedulingState>> {
        let conn = self.conn()?;
        Self::read(&conn, key)
    }

    fn set(&self, key: &ProgressKey, state: &SchedulingState) -> Result<()> {
        let conn = self.conn()?;
        Self::write(&conn, key, state)
    }

    fn update(
        &self,
        key: &ProgressKey,
        f: &mut dyn FnMut(Option<SchedulingState>) -> SchedulingState,
    ) -> Result<SchedulingState> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front, so other processes sharing the
        // file cannot interleave between our read and write.
        let tx: Transaction<'_> = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let next = f(Self::read(&tx, key)?);
        Self::write(&tx, key, &next)?;
        tx.commit()?;

        Ok(next)
    }

    fn due_keys(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ProgressKey>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id FROM progress
             WHERE user_id = ?1 AND next_review_date <= ?2
             ORDER BY next_review_date ASC",
        )?;

        let keys = stmt
            .query_map(params![user_id, format_timestamp(now)], |row| {
                Ok(ProgressKey::new(user_id, row.get::<_, String>(0)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    fn states_for_user(&self, user_id: &str) -> Result<Vec<SchedulingState>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_STATE} WHERE user_id = ?1"))?;

        let rows = stmt
            .query_map(params![user_id], StoredProgress::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredProgress::into_state).collect()
    }
}
