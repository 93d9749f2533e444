//! Mirror-wide key/value properties.
//!
//! Values are opaque JSON scalars. Property writes are rare operator
//! actions, so they go straight to the writer connection instead of
//! through the write-behind queue.

use std::collections::HashMap;

use super::connection::ContentStore;
use crate::Error;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Epoch cutoff below which cached entries must be revalidated.
pub const BASELINE: &str = "baseline";

impl ContentStore {
    /// Read one property.
    pub async fn get_property(&self, key: &str) -> Result<Option<Value>, Error> {
        let key = key.to_string();
        self.reader()
            .call(move |conn| -> Result<Option<Value>, Error> {
                let result = conn.query_row("SELECT value FROM prop WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                });
                match result {
                    Ok(raw) => Ok(Some(decode(&raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace one property.
    pub async fn set_property(&self, key: &str, value: &Value) -> Result<(), Error> {
        let key = key.to_string();
        let raw = serde_json::to_string(value).map_err(|e| Error::Codec(format!("property {key}: {e}")))?;
        self.writer
            .call(move |conn| -> Result<(), Error> {
                conn.execute("INSERT OR REPLACE INTO prop (key, value) VALUES (?1, ?2)", params![key, raw])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Load every property, used once when a mirror is opened.
    pub async fn properties(&self) -> Result<HashMap<String, Value>, Error> {
        self.reader()
            .call(|conn| -> Result<HashMap<String, Value>, Error> {
                let mut stmt = conn.prepare("SELECT key, value FROM prop")?;
                let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

                let mut props = HashMap::new();
                for row in rows {
                    let (key, raw) = row?;
                    props.insert(key, decode(&raw)?);
                }
                Ok(props)
            })
            .await
            .map_err(Error::from)
    }
}

fn decode(raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|e| Error::Codec(format!("property value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get_property() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path().join("cache.sqlite"), 1).await.unwrap();

        assert!(store.get_property(BASELINE).await.unwrap().is_none());

        store.set_property(BASELINE, &json!(1_700_000_000)).await.unwrap();
        assert_eq!(store.get_property(BASELINE).await.unwrap(), Some(json!(1_700_000_000)));

        store.set_property(BASELINE, &json!(1_800_000_000)).await.unwrap();
        assert_eq!(store.get_property(BASELINE).await.unwrap(), Some(json!(1_800_000_000)));
    }

    #[tokio::test]
    async fn test_properties_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.sqlite");
        {
            let store = ContentStore::open(&path, 1).await.unwrap();
            store.set_property(BASELINE, &json!(42)).await.unwrap();
            store.set_property("title", &json!("Python 3 docs")).await.unwrap();
        }

        let store = ContentStore::open(&path, 1).await.unwrap();
        let props = store.properties().await.unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[BASELINE], json!(42));
        assert_eq!(props["title"], json!("Python 3 docs"));
    }
}
