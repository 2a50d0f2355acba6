use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::models::CanonicalEvent;
use crate::utils;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                event_date TEXT,
                event_time TEXT,
                first_seen_utc TEXT NOT NULL,
                last_seen_utc TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Inserts the event or replaces the stored payload for its id. Returns
    /// `false` for events without an id, which cannot be keyed.
    pub fn upsert_event(&self, event: &CanonicalEvent) -> rusqlite::Result<bool> {
        upsert(&self.conn, event)
    }

    /// Upserts a batch in one transaction; returns how many were stored.
    pub fn upsert_events(&mut self, events: &[CanonicalEvent]) -> rusqlite::Result<usize> {
        let tx = self.conn.transaction()?;
        let mut stored = 0;
        for event in events {
            if upsert(&tx, event)? {
                stored += 1;
            } else {
                log::warn!("Skipping event without id: {}", event.title);
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    /// All stored events, earliest first; undated events last.
    pub fn list_events(&self) -> rusqlite::Result<Vec<CanonicalEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM events
             ORDER BY event_date IS NULL, event_date, event_time, id",
        )?;
        let rows = stmt.query_map([], |row| {
            let payload: String = row.get(0)?;
            decode(payload)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_event(&self, id: &str) -> rusqlite::Result<CanonicalEvent> {
        let payload: String = self.conn.query_row(
            "SELECT payload FROM events WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        decode(payload)
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
    }
}

fn upsert(conn: &Connection, event: &CanonicalEvent) -> rusqlite::Result<bool> {
    let Some(id) = event.id.as_deref() else {
        return Ok(false);
    };
    let now = Utc::now().to_rfc3339();
    let payload = serde_json::to_string(event)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
    conn.execute(
        "INSERT INTO events (id, payload, event_date, event_time, first_seen_utc, last_seen_utc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(id) DO UPDATE SET
           payload = excluded.payload,
           event_date = excluded.event_date,
           event_time = excluded.event_time,
           last_seen_utc = excluded.last_seen_utc",
        params![id, payload, event.date, event.time, now],
    )?;
    Ok(true)
}

fn decode(payload: String) -> rusqlite::Result<CanonicalEvent> {
    serde_json::from_str(&payload).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            payload.len(),
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: Option<&str>, title: &str, date: Option<&str>) -> CanonicalEvent {
        CanonicalEvent {
            id: id.map(str::to_string),
            title: title.to_string(),
            description: String::new(),
            date: date.map(str::to_string),
            time: date.map(|_| "18:00".to_string()),
            location: "Shoreditch".to_string(),
            tags: vec!["Tech".to_string()],
            link: "https://example.com/event".to_string(),
            img: None,
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = Store::open_in_memory().expect("open store");
        assert!(store
            .upsert_event(&event(Some("meetup-1"), "First", Some("2025-06-10")))
            .expect("insert"));
        assert!(store
            .upsert_event(&event(Some("meetup-1"), "Renamed", Some("2025-06-10")))
            .expect("update"));

        assert_eq!(store.count().expect("count"), 1);
        assert_eq!(store.get_event("meetup-1").expect("get").title, "Renamed");
    }

    #[test]
    fn skips_events_without_id() {
        let mut store = Store::open_in_memory().expect("open store");
        let stored = store
            .upsert_events(&[
                event(None, "Anonymous", None),
                event(Some("eventbrite-7"), "Keyed", Some("2025-06-11")),
            ])
            .expect("batch upsert");
        assert_eq!(stored, 1);
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn lists_events_by_date_with_undated_last() {
        let mut store = Store::open_in_memory().expect("open store");
        store
            .upsert_events(&[
                event(Some("c"), "Undated", None),
                event(Some("b"), "Later", Some("2025-07-01")),
                event(Some("a"), "Sooner", Some("2025-06-01")),
            ])
            .expect("batch upsert");
        let titles: Vec<String> = store
            .list_events()
            .expect("list")
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Sooner", "Later", "Undated"]);
    }

    #[test]
    fn persists_to_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("events.sqlite");
        {
            let store = Store::open(&path).expect("open file store");
            store
                .upsert_event(&event(Some("meetup-9"), "Saved", Some("2025-06-10")))
                .expect("insert");
        }
        let reopened = Store::open(&path).expect("reopen");
        assert_eq!(reopened.list_events().expect("list").len(), 1);
    }
}
