//! SQLite implementation of the event store.
//!
//! A single connection behind a lock serializes every call, so enqueue,
//! load and remove for the same key never interleave. Writes run inside
//! immediate transactions with `synchronous = FULL`.

use crate::migrations;
use crate::store::{EventStore, PersistedEvent, StoreConfig};
use crate::{StoreError, StoreResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use transport_types::{DeliveryKey, EventId, EventRecord, Metadata, Priority};

/// Durable event store backed by a SQLite file (or memory, for tests).
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
    config: StoreConfig,
    path: Option<PathBuf>,
}

/// Raw `events` row before decoding.
struct EventRow {
    id: i64,
    destination: String,
    transport_name: String,
    priority: i64,
    event_time_ms: i64,
    uptime_ms: i64,
    payload: Vec<u8>,
    attempt_count: i64,
    decorated: bool,
}

impl SqliteEventStore {
    /// Opens (or creates) a store at the given path and runs migrations.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        info!(path = %path.display(), "Opened event store");

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store.
    ///
    /// Useful for testing.
    pub fn in_memory(config: StoreConfig) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            path: None,
        })
    }

    fn configure(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        migrations::run_migrations(conn)
    }

    /// The database file path, if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    fn load_metadata(conn: &Connection, event_id: i64) -> StoreResult<Metadata> {
        let mut stmt = conn.prepare_cached(
            "SELECT name, value FROM event_metadata WHERE event_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut metadata = Metadata::new();
        for row in rows {
            let (name, value) = row?;
            metadata.insert(name, value);
        }
        Ok(metadata)
    }

    fn insert_metadata(conn: &Connection, event_id: i64, metadata: &Metadata) -> StoreResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO event_metadata (event_id, name, value) VALUES (?1, ?2, ?3)",
        )?;
        for (name, value) in metadata {
            stmt.execute(params![event_id, name, value])?;
        }
        Ok(())
    }

    fn decode(conn: &Connection, row: EventRow) -> StoreResult<PersistedEvent> {
        let priority = Priority::from_i64(row.priority)
            .map_err(|e| StoreError::InvalidData(format!("event {}: {}", row.id, e)))?;
        let attempt_count = u32::try_from(row.attempt_count).map_err(|_| {
            StoreError::InvalidData(format!(
                "event {}: attempt count {} out of range",
                row.id, row.attempt_count
            ))
        })?;
        let metadata = Self::load_metadata(conn, row.id)?;

        let record = EventRecord::new(
            row.destination,
            row.transport_name,
            priority,
            row.event_time_ms,
            row.uptime_ms,
            row.payload,
        )
        .with_all_metadata(metadata)
        .with_attempt_count(attempt_count);

        Ok(PersistedEvent {
            id: EventId(row.id),
            record,
            decorated: row.decorated,
        })
    }
}

impl EventStore for SqliteEventStore {
    fn enqueue(&self, record: &EventRecord) -> StoreResult<EventId> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(limit) = self.config.max_records_per_destination {
            let stored: i64 = tx.query_row(
                "SELECT COUNT(*) FROM events WHERE destination = ?1",
                params![record.destination()],
                |row| row.get(0),
            )?;
            if stored >= limit as i64 {
                return Err(StoreError::CapacityExceeded {
                    destination: record.destination().to_string(),
                    limit,
                });
            }
        }

        tx.execute(
            "INSERT INTO events (destination, transport_name, priority, event_time_ms, uptime_ms, payload, attempt_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.destination(),
                record.transport_name(),
                record.priority().to_i64(),
                record.event_time_millis(),
                record.uptime_millis(),
                record.payload(),
                record.attempt_count(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_metadata(&tx, id, record.metadata())?;
        tx.commit()?;

        debug!(
            id,
            destination = %record.destination(),
            priority = %record.priority(),
            "Stored event"
        );
        Ok(EventId(id))
    }

    fn load_batch(&self, key: &DeliveryKey, max_records: usize) -> StoreResult<Vec<PersistedEvent>> {
        let conn = self.conn.lock();
        let rows = {
            let mut stmt = conn.prepare_cached(
                "SELECT id, destination, transport_name, priority, event_time_ms, uptime_ms, payload, attempt_count, decorated
                 FROM events
                 WHERE destination = ?1 AND priority = ?2
                 ORDER BY id
                 LIMIT ?3",
            )?;
            let limit = i64::try_from(max_records).unwrap_or(i64::MAX);
            let mapped = stmt.query_map(
                params![key.destination, key.priority.to_i64(), limit],
                |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        destination: row.get(1)?,
                        transport_name: row.get(2)?,
                        priority: row.get(3)?,
                        event_time_ms: row.get(4)?,
                        uptime_ms: row.get(5)?,
                        payload: row.get(6)?,
                        attempt_count: row.get(7)?,
                        decorated: row.get(8)?,
                    })
                },
            )?;
            mapped.collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|row| Self::decode(&conn, row))
            .collect()
    }

    fn remove(&self, ids: &[EventId]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM events WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id.0])?;
            }
        }
        tx.commit()?;

        debug!(requested = ids.len(), removed, "Removed events");
        Ok(removed)
    }

    fn has_pending(&self, key: &DeliveryKey) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM events WHERE destination = ?1 AND priority = ?2 LIMIT 1",
                params![key.destination, key.priority.to_i64()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn apply_decoration(&self, id: EventId, record: &EventRecord) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute("UPDATE events SET decorated = 1 WHERE id = ?1", params![id.0])?;
        if updated == 0 {
            return Ok(false);
        }
        tx.execute("DELETE FROM event_metadata WHERE event_id = ?1", params![id.0])?;
        Self::insert_metadata(&tx, id.0, record.metadata())?;
        tx.commit()?;
        Ok(true)
    }

    fn record_failed_attempt(&self, ids: &[EventId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt =
                tx.prepare_cached("UPDATE events SET attempt_count = attempt_count + 1 WHERE id = ?1")?;
            for id in ids {
                stmt.execute(params![id.0])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn pending_keys(&self) -> StoreResult<Vec<DeliveryKey>> {
        Ok(self
            .pending_counts()?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    fn pending_counts(&self) -> StoreResult<Vec<(DeliveryKey, usize)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT destination, priority, COUNT(*) FROM events
             GROUP BY destination, priority
             ORDER BY destination, priority",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (destination, priority, count) = row?;
            let priority = Priority::from_i64(priority)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?;
            counts.push((DeliveryKey::new(destination, priority), count as usize));
        }
        Ok(counts)
    }
}
