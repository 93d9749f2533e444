//! Database connection management with pragma configuration.
//!
//! A store opens one writer connection (which also runs migrations) and a
//! fixed pool of reader connections on the same WAL-mode database file.

use super::migrations;
use crate::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;";

/// Content store handle.
///
/// Wraps tokio-rusqlite connections that run database operations on
/// background threads. Cloning is cheap and shares the same connections.
#[derive(Clone, Debug)]
pub struct ContentStore {
    pub(crate) writer: Connection,
    readers: Arc<[Connection]>,
    next_reader: Arc<AtomicUsize>,
}

impl ContentStore {
    /// Open a store at the specified path with `readers` reader connections.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations before the readers are opened.
    pub async fn open(path: impl AsRef<Path>, readers: usize) -> Result<Self, Error> {
        let path = path.as_ref();
        let writer = open_connection(path).await?;
        migrations::run(&writer).await?;

        let mut pool = Vec::with_capacity(readers.max(1));
        for _ in 0..readers.max(1) {
            pool.push(open_connection(path).await?);
        }

        tracing::debug!("opened content store {} with {} readers", path.display(), pool.len());

        Ok(Self { writer, readers: pool.into(), next_reader: Arc::new(AtomicUsize::new(0)) })
    }

    /// Pick the next reader connection, round-robin.
    pub(crate) fn reader(&self) -> &Connection {
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        &self.readers[idx]
    }

    /// Number of reader connections in the pool.
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}

async fn open_connection(path: &Path) -> Result<Connection, Error> {
    let conn = Connection::open(path).await.map_err(|e| Error::Store(e.into()))?;

    conn.call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::Store)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.sqlite");
        let store = ContentStore::open(&path, 3).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.reader_count(), 3);

        let mode = store
            .reader()
            .call(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_open_zero_readers_clamps_to_one() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path().join("cache.sqlite"), 0).await.unwrap();
        assert_eq!(store.reader_count(), 1);
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.sqlite");
        drop(ContentStore::open(&path, 1).await.unwrap());
        assert!(ContentStore::open(&path, 1).await.is_ok());
    }
}
