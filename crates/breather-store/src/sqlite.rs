//! SQLite-based store implementation
//!
//! Every process opens its own handle on the same database file. WAL mode
//! and a busy timeout let the controller, monitor and shield contexts write
//! concurrently without surfacing `SQLITE_BUSY` on short contention.

use breather_api::{RestartSignal, SignalReason};
use breather_util::{SignalId, Timestamp};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Key, StateStore, StoreError, StoreResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "Opened store");

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Shared key/value namespace
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Restart signals, consumed once
            CREATE TABLE IF NOT EXISTS signals (
                id TEXT PRIMARY KEY,
                at REAL NOT NULL,
                reason TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_signals_at ON signals(at);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn upsert(conn: &Connection, key: Key, value: &Value) -> StoreResult<()> {
    let encoded = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key.as_str(), encoded],
    )?;
    Ok(())
}

impl StateStore for SqliteStore {
    fn get(&self, key: Key) -> StoreResult<Option<Value>> {
        let conn = self.conn()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Undecodable stored value, treating as absent");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: Key, value: Value) -> StoreResult<()> {
        let conn = self.conn()?;
        upsert(&conn, key, &value)?;
        debug!(key = %key, value = %value, "Stored value");
        Ok(())
    }

    fn set_many(&self, entries: &[(Key, Value)]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (key, value) in entries {
            upsert(&tx, *key, value)?;
        }
        tx.commit()?;

        debug!(count = entries.len(), "Stored values");
        Ok(())
    }

    fn post_signal(&self, signal: &RestartSignal) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (id, at, reason) VALUES (?, ?, ?)",
            params![
                signal.id.to_string(),
                signal.at.as_secs(),
                signal.reason.as_str()
            ],
        )?;

        debug!(id = %signal.id, reason = %signal.reason, "Posted restart signal");
        Ok(())
    }

    fn take_signals(&self) -> StoreResult<Vec<RestartSignal>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows: Vec<(String, f64, String)> = {
            let mut stmt = tx.prepare("SELECT id, at, reason FROM signals ORDER BY at, rowid")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<Result<_, _>>()?
        };
        tx.execute("DELETE FROM signals", [])?;
        tx.commit()?;

        let signals = rows
            .into_iter()
            .filter_map(|(id, at, reason)| {
                let parsed_id = SignalId::parse(&id);
                let parsed_reason = SignalReason::parse(&reason);
                match (parsed_id, parsed_reason) {
                    (Some(id), Some(reason)) => Some(RestartSignal {
                        id,
                        at: Timestamp::from_secs(at),
                        reason,
                    }),
                    _ => {
                        warn!(id = %id, reason = %reason, "Dropping malformed restart signal");
                        None
                    }
                }
            })
            .collect();

        Ok(signals)
    }

    fn pending_signals(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM signals", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = SqliteStore::in_memory().unwrap();

        assert_eq!(store.get(Key::BlockStartTime).unwrap(), None);

        store.set(Key::BlockStartTime, Value::from(1_700_000_000.25)).unwrap();
        assert_eq!(
            store.get(Key::BlockStartTime).unwrap(),
            Some(Value::from(1_700_000_000.25))
        );

        store.set(Key::BlockStartTime, Value::from(0.0)).unwrap();
        assert_eq!(store.get(Key::BlockStartTime).unwrap(), Some(Value::from(0.0)));
    }

    #[test]
    fn test_set_many_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.set(Key::ProtectionEnabled, Value::from(false)).unwrap();

        store
            .set_many(&[
                (Key::ProtectionEnabled, Value::from(true)),
                (Key::BlockMode, Value::from("delayed")),
            ])
            .unwrap();

        assert_eq!(store.get(Key::ProtectionEnabled).unwrap(), Some(Value::from(true)));
        assert_eq!(store.get(Key::BlockMode).unwrap(), Some(Value::from("delayed")));
    }

    #[test]
    fn test_signals_consumed_once() {
        let store = SqliteStore::in_memory().unwrap();

        let first = RestartSignal::new(SignalReason::BlockStarted, Timestamp::from_secs(10.0));
        let second = RestartSignal::new(SignalReason::BreakCompleted, Timestamp::from_secs(20.0));
        store.post_signal(&second).unwrap();
        store.post_signal(&first).unwrap();
        assert_eq!(store.pending_signals().unwrap(), 2);

        let taken = store.take_signals().unwrap();
        assert_eq!(taken, vec![first, second]);
        assert_eq!(store.pending_signals().unwrap(), 0);
        assert!(store.take_signals().unwrap().is_empty());
    }

    #[test]
    fn test_handles_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        let controller = SqliteStore::open(&path).unwrap();
        let monitor = SqliteStore::open(&path).unwrap();

        monitor.set(Key::TotalMinutesUsed, Value::from(3)).unwrap();
        monitor
            .post_signal(&RestartSignal::new(
                SignalReason::ThresholdReached,
                Timestamp::from_secs(1.0),
            ))
            .unwrap();

        assert_eq!(controller.get(Key::TotalMinutesUsed).unwrap(), Some(Value::from(3)));
        assert_eq!(controller.take_signals().unwrap().len(), 1);
        assert_eq!(monitor.pending_signals().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.is_healthy());
        assert!(path.exists());
    }
}
