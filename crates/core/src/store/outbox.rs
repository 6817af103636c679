//! SQLite outbox operations.

use async_trait::async_trait;
use tokio_rusqlite::params;

use super::connection::OfflineDb;
use super::OutboxStore;
use crate::Error;
use crate::model::{HeaderList, Method, NewOutboxEntry, OutboxEntry, QueuedBody};

/// Columns as stored, before decoding.
struct OutboxRow {
    id: i64,
    url: String,
    method: String,
    headers_json: String,
    body_kind: String,
    body: String,
    queued_at: String,
    attempts: u32,
    last_error: Option<String>,
}

impl OutboxRow {
    fn decode(self) -> Result<OutboxEntry, Error> {
        let method: Method = self.method.parse()?;
        let headers: HeaderList = serde_json::from_str(&self.headers_json)?;
        let body = match self.body_kind.as_str() {
            "json" => QueuedBody::Json(serde_json::from_str(&self.body)?),
            "text" => QueuedBody::Text(self.body),
            other => return Err(Error::Codec(format!("outbox {}: unknown body kind {other}", self.id))),
        };

        Ok(OutboxEntry {
            id: self.id,
            url: self.url,
            method,
            headers,
            body,
            queued_at: self.queued_at,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}

fn encode_body(body: &QueuedBody) -> Result<(&'static str, String), Error> {
    match body {
        QueuedBody::Json(value) => Ok(("json", serde_json::to_string(value)?)),
        QueuedBody::Text(text) => Ok(("text", text.clone())),
    }
}

#[async_trait]
impl OutboxStore for OfflineDb {
    async fn add(&self, entry: NewOutboxEntry) -> Result<i64, Error> {
        if !entry.method.is_mutating() {
            return Err(Error::InvalidInput(format!("{} requests are never queued", entry.method)));
        }
        let headers_json = serde_json::to_string(&entry.headers)?;
        let (body_kind, body) = encode_body(&entry.body)?;

        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO outbox (url, method, headers_json, body_kind, body, queued_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![entry.url, entry.method.as_str(), headers_json, body_kind, body, entry.queued_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(id, "outbox entry stored");
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<OutboxEntry>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<OutboxRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, url, method, headers_json, body_kind, body, queued_at, attempts, last_error
                     FROM outbox ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(OutboxRow {
                            id: row.get(0)?,
                            url: row.get(1)?,
                            method: row.get(2)?,
                            headers_json: row.get(3)?,
                            body_kind: row.get(4)?,
                            body: row.get(5)?,
                            queued_at: row.get(6)?,
                            attempts: row.get(7)?,
                            last_error: row.get(8)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                row.decode()
                    .inspect_err(|e| tracing::warn!(id, "skipping undecodable outbox entry: {e}"))
                    .ok()
            })
            .collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error> {
        let reason = reason.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, reason],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(title: &str) -> NewOutboxEntry {
        NewOutboxEntry::new(
            "http://localhost:8080/api/notes",
            Method::Post,
            vec![("content-type".into(), "application/json".into())],
            QueuedBody::Json(json!({ "title": title })),
        )
    }

    #[tokio::test]
    async fn test_add_and_list_in_order() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let first = db.add(note("a")).await.unwrap();
        let second = db.add(note("b")).await.unwrap();
        assert!(second > first);

        let entries = db.list_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[0].body, QueuedBody::Json(json!({ "title": "a" })));
        assert_eq!(entries[1].id, second);
        assert_eq!(entries[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_duplicate_headers_survive() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let entry = NewOutboxEntry::new(
            "http://localhost:8080/api/tags",
            Method::Put,
            vec![("x-tag".into(), "a".into()), ("x-tag".into(), "b".into())],
            QueuedBody::Text("plain".into()),
        );
        db.add(entry).await.unwrap();

        let stored = &db.list_all().await.unwrap()[0];
        assert_eq!(stored.headers, vec![("x-tag".to_string(), "a".to_string()), ("x-tag".to_string(), "b".to_string())]);
        assert_eq!(stored.body, QueuedBody::Text("plain".into()));
        assert_eq!(stored.method, Method::Put);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let first = db.add(note("a")).await.unwrap();
        db.delete_by_id(first).await.unwrap();
        let second = db.add(note("b")).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        db.delete_by_id(42).await.unwrap();
        assert!(db.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let id = db.add(note("a")).await.unwrap();
        db.record_failure(id, "status 503").await.unwrap();
        db.record_failure(id, "connection refused").await.unwrap();

        let entry = &db.list_all().await.unwrap()[0];
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_rejects_non_mutating() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let entry = NewOutboxEntry::new("http://localhost/", Method::Get, Vec::new(), QueuedBody::Text(String::new()));
        assert!(matches!(db.add(entry).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_undecodable_row_skipped() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let first = db.add(note("a")).await.unwrap();
        db.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO outbox (url, method, headers_json, body_kind, body, queued_at, attempts)
                     VALUES ('http://localhost:8080/api/notes', 'POST', '[]', 'json', '{not json', '2026-01-01T00:00:00Z', 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        let third = db.add(note("c")).await.unwrap();

        let ids: Vec<i64> = db.list_all().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first, third]);
    }
}
