//! Cache entry CRUD operations.
//!
//! Bodies are compressed on the way in and decompressed on the way out, so
//! callers only ever see raw bytes.

use std::collections::BTreeMap;

use super::codec;
use super::connection::ContentStore;
use crate::{Error, Item};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One cached origin response, keyed by its path relative to the origin prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: String,
    pub status: u16,
    /// Lower-cased header name to value.
    pub headers: BTreeMap<String, String>,
    pub content: Option<Vec<u8>>,
    /// Unix epoch seconds of the last successful fetch or validation.
    pub updated: Option<i64>,
}

impl CacheEntry {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Convert into the transient value handed to callers.
    pub fn into_item(self) -> Item {
        let content_type = self.header("content-type").map(str::to_string);
        let location = self.header("location").map(str::to_string);
        Item {
            content: self.content.map(Bytes::from).unwrap_or_default(),
            status: Some(self.status),
            content_type,
            location,
            updated: self.updated,
        }
    }
}

impl ContentStore {
    /// Insert or replace a cache entry.
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        let path = entry.path.clone();
        let status = entry.status;
        let headers = codec::encode_headers(&entry.headers)?;
        let content = entry.content.clone();
        let updated = entry.updated;

        self.writer
            .call(move |conn| -> Result<(), Error> {
                let packed = content.as_deref().map(codec::compress).transpose()?;
                conn.execute(
                    "INSERT OR REPLACE INTO cache (path, status, headers, content, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![path, status, headers, packed, updated],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Refresh only the `updated` timestamp of an existing entry.
    ///
    /// Returns false if no entry exists for `path`.
    pub async fn touch(&self, path: &str, updated: i64) -> Result<bool, Error> {
        let path = path.to_string();
        self.writer
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("UPDATE cache SET updated = ?1 WHERE path = ?2", params![updated, path])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by path.
    ///
    /// Returns None if the path has never been stored.
    pub async fn get(&self, path: &str) -> Result<Option<CacheEntry>, Error> {
        let path = path.to_string();
        self.reader()
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt =
                    conn.prepare_cached("SELECT status, headers, content, updated FROM cache WHERE path = ?1")?;

                let row = stmt.query_row(params![path], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<Vec<u8>>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                });

                let (status, headers, content, updated) = match row {
                    Ok(r) => r,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                Ok(Some(CacheEntry {
                    path,
                    status,
                    headers: codec::decode_headers(&headers)?,
                    content: content.as_deref().map(codec::decompress).transpose()?,
                    updated,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Status of a stored path without decoding its body.
    pub async fn status(&self, path: &str) -> Result<Option<u16>, Error> {
        let path = path.to_string();
        self.reader()
            .call(move |conn| -> Result<Option<u16>, Error> {
                let result =
                    conn.query_row("SELECT status FROM cache WHERE path = ?1", params![path], |row| row.get(0));
                match result {
                    Ok(status) => Ok(Some(status)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of cached paths.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.reader()
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_entry(path: &str, body: &[u8]) -> CacheEntry {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html; charset=utf-8".to_string());
        headers.insert("etag".to_string(), "\"abc\"".to_string());
        CacheEntry {
            path: path.to_string(),
            status: 200,
            headers,
            content: Some(body.to_vec()),
            updated: Some(1_700_000_000),
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> ContentStore {
        ContentStore::open(dir.path().join("cache.sqlite"), 2).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        let entry = make_test_entry("library/os.html", "<h1>os</h1>".repeat(100).as_bytes());

        store.put(&entry).await.unwrap();

        let retrieved = store.get("library/os.html").await.unwrap().unwrap();
        assert_eq!(retrieved, entry);
    }

    #[tokio::test]
    async fn test_content_is_compressed_at_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        let body = "<p>repeat</p>".repeat(1000);
        store.put(&make_test_entry("big.html", body.as_bytes())).await.unwrap();

        let stored_len: i64 = store
            .reader()
            .call(|conn| {
                conn.query_row("SELECT length(content) FROM cache WHERE path = 'big.html'", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert!((stored_len as usize) < body.len());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        assert!(store.get("nonexistent").await.unwrap().is_none());
        assert!(store.status("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        store.put(&make_test_entry("index.html", b"old")).await.unwrap();
        let mut newer = make_test_entry("index.html", b"new");
        newer.status = 404;
        store.put(&newer).await.unwrap();

        let retrieved = store.get("index.html").await.unwrap().unwrap();
        assert_eq!(retrieved.content.as_deref(), Some(&b"new"[..]));
        assert_eq!(retrieved.status, 404);
        assert_eq!(store.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_touch_only_changes_updated() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        let entry = make_test_entry("index.html", b"body");
        store.put(&entry).await.unwrap();

        assert!(store.touch("index.html", 1_800_000_000).await.unwrap());
        assert!(store.touch("index.html", 1_800_000_000).await.unwrap());

        let retrieved = store.get("index.html").await.unwrap().unwrap();
        assert_eq!(retrieved.updated, Some(1_800_000_000));
        assert_eq!(retrieved.status, entry.status);
        assert_eq!(retrieved.headers, entry.headers);
        assert_eq!(retrieved.content, entry.content);
    }

    #[tokio::test]
    async fn test_touch_missing_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        assert!(!store.touch("nowhere.html", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_null_content_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(&tmp).await;
        let entry = CacheEntry { content: None, updated: None, ..make_test_entry("empty", b"") };
        store.put(&entry).await.unwrap();
        assert_eq!(store.get("empty").await.unwrap().unwrap(), entry);
    }

    #[test]
    fn test_into_item_picks_headers() {
        let mut entry = make_test_entry("old.html", b"");
        entry.status = 302;
        entry.headers.insert("location".into(), "https://example.com/new.html".into());

        let item = entry.into_item();
        assert_eq!(item.status, Some(302));
        assert_eq!(item.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(item.location.as_deref(), Some("https://example.com/new.html"));
        assert_eq!(item.updated, Some(1_700_000_000));
    }
}
