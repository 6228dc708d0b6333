//! Append-only attendance ledger in the `checkins` table.
//!
//! Rows are only ever inserted. Nothing in this crate updates or deletes them.
//!
//! Times are naive local wall-clock values with no offset stored, so the
//! never-earlier clamp compares local times. When the local clock falls back
//! (end of DST, or a manual step), check-ins keep the last pre-step time until
//! the wall clock catches up. Rows written by other tools with SQLite's
//! `CURRENT_TIMESTAMP` are UTC and are not converted.

use crate::{open_connection, StoreError};
use chrono::{Local, NaiveDateTime, SubsecRound};
use roster_core::{CheckInEvent, TIMESTAMP_FORMAT};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

pub struct Ledger {
    conn: Connection,
    /// Timestamp of the most recent row; new rows never go below it.
    last: Option<NaiveDateTime>,
}

impl Ledger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(open_connection(path.as_ref())?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS checkins (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                user     TEXT NOT NULL,
                time     TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_checkins_user ON checkins(user)",
            [],
        )?;

        let last = conn
            .query_row(
                "SELECT id, user, time, location FROM checkins ORDER BY id DESC LIMIT 1",
                [],
                row_to_event,
            )
            .optional()?
            .map(|e| e.timestamp);

        Ok(Self { conn, last })
    }

    /// Record a check-in for `identity` at the current local time.
    pub fn append(&mut self, identity: &str, location: &str) -> Result<CheckInEvent, StoreError> {
        self.append_at(identity, location, Local::now().naive_local())
    }

    /// Record a check-in with an explicit capture time.
    ///
    /// The time is truncated to whole seconds and clamped so it is never
    /// earlier than the previous row's. `at` is local wall-clock time.
    pub fn append_at(
        &mut self,
        identity: &str,
        location: &str,
        at: NaiveDateTime,
    ) -> Result<CheckInEvent, StoreError> {
        let mut timestamp = at.trunc_subsecs(0);
        if let Some(last) = self.last {
            if timestamp < last {
                tracing::warn!(%timestamp, %last, "clock went backwards; clamping check-in time");
                timestamp = last;
            }
        }

        self.conn.execute(
            "INSERT INTO checkins (user, time, location) VALUES (?1, ?2, ?3)",
            params![identity, timestamp.format(TIMESTAMP_FORMAT).to_string(), location],
        )?;
        let id = self.conn.last_insert_rowid();
        self.last = Some(timestamp);

        tracing::debug!(id, identity, location, %timestamp, "check-in appended");

        Ok(CheckInEvent {
            id,
            identity: identity.to_string(),
            timestamp,
            location: location.to_string(),
        })
    }

    /// Every event, in insertion order.
    pub fn entries(&self) -> Result<Vec<CheckInEvent>, StoreError> {
        self.query(
            "SELECT id, user, time, location FROM checkins ORDER BY id",
            params![],
        )
    }

    /// Events for one identity, in insertion order.
    pub fn entries_for(&self, identity: &str) -> Result<Vec<CheckInEvent>, StoreError> {
        self.query(
            "SELECT id, user, time, location FROM checkins WHERE user = ?1 ORDER BY id",
            params![identity],
        )
    }

    /// The newest `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<CheckInEvent>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut events = self.query(
            "SELECT id, user, time, location FROM checkins ORDER BY id DESC LIMIT ?1",
            params![limit],
        )?;
        events.reverse();
        Ok(events)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM checkins", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CheckInEvent>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_event)?;
        let events = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<CheckInEvent> {
    let time: String = row.get(2)?;
    let timestamp = NaiveDateTime::parse_from_str(&time, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(CheckInEvent {
        id: row.get(0)?,
        identity: row.get(1)?,
        timestamp,
        location: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(h, m, s, 750)
            .unwrap()
    }

    #[test]
    fn test_append_and_read_back() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger.is_empty().unwrap());

        let event = ledger.append_at("alice", "office", at(9, 0, 5)).unwrap();
        assert_eq!(event.identity, "alice");
        assert_eq!(event.location, "office");
        assert_eq!(event.timestamp, at(9, 0, 5).trunc_subsecs(0));

        let entries = ledger.entries().unwrap();
        assert_eq!(entries, vec![event]);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let first = ledger.append_at("alice", "office", at(9, 30, 0)).unwrap();
        let second = ledger.append_at("bob", "office", at(9, 29, 0)).unwrap();
        assert_eq!(second.timestamp, first.timestamp);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_clock_fall_back_holds_last_time_until_caught_up() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let before = ledger.append_at("alice", "office", at(2, 59, 0)).unwrap();

        // Wall clock falls back an hour: 02:59 -> 02:00.
        let during: Vec<_> = [at(2, 0, 0), at(2, 30, 0), at(2, 58, 0)]
            .into_iter()
            .map(|t| ledger.append_at("bob", "office", t).unwrap())
            .collect();
        assert!(during.iter().all(|e| e.timestamp == before.timestamp));

        let after = ledger.append_at("carol", "office", at(3, 1, 0)).unwrap();
        assert_eq!(after.timestamp, at(3, 1, 0).trunc_subsecs(0));

        let times: Vec<_> = ledger.entries().unwrap().iter().map(|e| e.timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_entries_for_and_recent() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        ledger.append_at("alice", "office", at(8, 0, 0)).unwrap();
        ledger.append_at("bob", "lab", at(8, 1, 0)).unwrap();
        ledger.append_at("alice", "lab", at(8, 2, 0)).unwrap();

        let alice = ledger.entries_for("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|e| e.identity == "alice"));

        let recent = ledger.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].identity, "bob");
        assert_eq!(recent[1].identity, "alice");
        assert_eq!(ledger.len().unwrap(), 3);
    }

    #[test]
    fn test_append_is_durable_and_resumes_clamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger.append_at("alice", "office", at(12, 0, 0)).unwrap();
        }

        let mut ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.len().unwrap(), 1);
        let later = ledger.append_at("bob", "office", at(11, 0, 0)).unwrap();
        assert_eq!(later.timestamp, at(12, 0, 0).trunc_subsecs(0));
    }

    #[test]
    fn test_reads_rows_written_with_sqlite_current_timestamp() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .conn
            .execute(
                "INSERT INTO checkins (user, time) VALUES ('dave', CURRENT_TIMESTAMP)",
                [],
            )
            .unwrap();
        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, "");
    }
}
