//! SQLite named caches.

use async_trait::async_trait;
use tokio_rusqlite::{params, rusqlite::OptionalExtension};

use super::BlobCacheStore;
use super::connection::OfflineDb;
use crate::Error;
use crate::model::{CacheKey, HeaderList, ResponseSnapshot};

#[async_trait]
impl BlobCacheStore for OfflineDb {
    async fn open_named(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, name: &str, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        let name = name.to_string();
        let key_hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(u16, String, Vec<u8>)>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM cache_entries
                         WHERE cache_name = ?1 AND key_hash = ?2",
                        params![name, key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some((status, headers_json, body)) => {
                let headers: HeaderList = serde_json::from_str(&headers_json)?;
                Ok(Some(ResponseSnapshot { status, headers, body }))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, name: &str, key: &CacheKey, response: ResponseSnapshot) -> Result<(), Error> {
        let name = name.to_string();
        let key_hash = key.digest();
        let method = key.method().as_str();
        let url = key.url().to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (cache_name, key_hash, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![name, key_hash, method, url, response.status, headers_json, response.body, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> ResponseSnapshot {
        ResponseSnapshot {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let key = CacheKey::get("http://localhost:8080/index.html");

        db.put("offsync-static-v1", &key, page("<h1>home</h1>")).await.unwrap();

        let hit = db.match_entry("offsync-static-v1", &key).await.unwrap().unwrap();
        assert_eq!(hit, page("<h1>home</h1>"));
        assert!(db.match_entry("offsync-runtime-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let key = CacheKey::get("http://localhost:8080/api/data");

        db.put("offsync-runtime-v1", &key, page("old")).await.unwrap();
        db.put("offsync-runtime-v1", &key, page("new")).await.unwrap();

        let hit = db.match_entry("offsync-runtime-v1", &key).await.unwrap().unwrap();
        assert_eq!(hit.body, b"new".to_vec());
    }

    #[tokio::test]
    async fn test_names_in_creation_order() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        db.open_named("b").await.unwrap();
        db.open_named("a").await.unwrap();
        db.open_named("b").await.unwrap();
        assert_eq!(db.cache_names().await.unwrap(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_cache_cascades() {
        let db = OfflineDb::open_in_memory().await.unwrap();
        let key = CacheKey::get("http://localhost:8080/app.js");
        db.put("offsync-static-v0", &key, page("js")).await.unwrap();

        assert!(db.delete_cache("offsync-static-v0").await.unwrap());
        assert!(!db.delete_cache("offsync-static-v0").await.unwrap());
        assert!(db.match_entry("offsync-static-v0", &key).await.unwrap().is_none());

        db.open_named("offsync-static-v0").await.unwrap();
        assert!(db.match_entry("offsync-static-v0", &key).await.unwrap().is_none());
    }
}
