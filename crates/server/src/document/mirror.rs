//! Live mirror of a remote origin backed by the content store.
//!
//! ### Lookup
//! - Fallback names are checked against the store in order; the first stored
//!   candidate wins, whatever its status, so 404s are cached like any other
//!   answer.
//! - A stored entry older than the `baseline` property is revalidated with
//!   `If-Modified-Since` before being served.
//! - Only when no candidate is stored is the requested path fetched, and only
//!   that path; fallback names never reach the network.
//! - A path that is an absolute http(s) URL comes from a rewritten foreign
//!   redirect. It is fetched as-is when the request policy admits it, and
//!   cached under the full URL.
//!
//! ### Writes
//! - Every store mutation goes through the [`WriterQueue`], so lookups return
//!   as soon as the origin answers.
//!
//! ### Concurrency
//! - Identical lookups share a slot in [`RecentLookups`], collapsing bursts
//!   into a single origin round trip.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use docmirror_client::{FetchConfig, FetchOutcome, OriginFetcher, absolute};
use docmirror_core::clock::epoch;
use docmirror_core::store::BASELINE;
use docmirror_core::{
    AppConfig, CacheEntry, ContentStore, DocumentConfig, DocumentFormat, Error, Item, WriteOp, WriterQueue,
    WriterState,
};
use serde_json::Value;
use url::Url;

use super::index::{self, SymbolIndex};
use super::memo::RecentLookups;
use super::{Document, DocumentBase, Resolved, candidate_names};

/// File name of the per-mirror database inside `docs_dir/<name>/`.
pub const DATABASE_FILE: &str = "cache.sqlite";

pub struct MirrorDocument {
    base: DocumentBase,
    fetcher: OriginFetcher,
    store: ContentStore,
    writer: WriterQueue,
    props: RwLock<HashMap<String, Value>>,
    recent: RecentLookups,
    index_location: Option<String>,
    db_path: PathBuf,
}

impl MirrorDocument {
    /// Open (or create) the mirror database and spawn its writer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when `url` is missing or is not a
    /// valid origin prefix, and store errors if the database cannot be opened.
    pub async fn open(config: &DocumentConfig, app: &AppConfig) -> Result<Self, Error> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Configuration(format!("document {} has no origin url", config.name)))?;
        let fetcher = OriginFetcher::new(url, FetchConfig::from(app))?;

        let dir = app.docs_dir.join(&config.name);
        tokio::fs::create_dir_all(&dir).await?;
        let db_path = dir.join(DATABASE_FILE);

        let store = ContentStore::open(&db_path, app.reader_connections).await?;
        let props = store.properties().await?;
        let writer = WriterQueue::spawn(store.clone());

        tracing::info!("mirror {} of {} at {}", config.name, fetcher.prefix(), db_path.display());

        Ok(Self {
            base: DocumentBase::new(config),
            fetcher,
            store,
            writer,
            props: RwLock::new(props),
            recent: RecentLookups::new(app.recent_lookups),
            index_location: config.index.clone(),
            db_path,
        })
    }

    /// Resolve `path` to an item, collapsing concurrent identical lookups.
    pub async fn lookup(&self, path: &str) -> Result<Item, Error> {
        self.find(path).await.map(|found| found.item)
    }

    /// Like [`lookup`](Self::lookup), also naming the candidate that matched.
    pub async fn find(&self, path: &str) -> Result<Resolved, Error> {
        let slot = self.recent.slot(path);
        if let Some(found) = slot.get() {
            self.counter().record_cache();
            return Ok(found.clone());
        }

        let mut resolved_here = false;
        let result = slot
            .get_or_try_init(|| {
                resolved_here = true;
                self.scan(path)
            })
            .await;

        match result {
            Ok(found) => {
                if !resolved_here {
                    self.counter().record_cache();
                }
                Ok(found.clone())
            }
            Err(e) => {
                self.recent.forget(path, &slot);
                Err(e)
            }
        }
    }

    async fn scan(&self, path: &str) -> Result<Resolved, Error> {
        for name in candidate_names(path) {
            let entry = match self.store.get(&name).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("store read failed for {}: {}", name, e);
                    continue;
                }
            };

            if self.is_stale(&entry) {
                let item = self.revalidate(&name, entry).await;
                return Ok(Resolved::new(name, item));
            }

            tracing::debug!("CACHE {} {}", name, entry.status);
            self.counter().record_cache();
            return Ok(Resolved::new(name, entry.into_item()));
        }

        self.fetch_fresh(path).await
    }

    fn is_stale(&self, entry: &CacheEntry) -> bool {
        self.baseline().is_some_and(|baseline| entry.updated.is_none_or(|updated| updated < baseline))
    }

    /// Fetch errors fall back to the cached copy, so this never fails.
    async fn revalidate(&self, name: &str, entry: CacheEntry) -> Item {
        let since = entry.updated;
        let now = epoch();

        match self.fetcher.fetch(name, since).await {
            Ok(FetchOutcome::NotModified) => {
                self.writer.enqueue(WriteOp::Touch { path: name.to_string(), updated: now });
                self.counter().record_refresh();
                tracing::debug!("REFRESH {} not modified", name);
                Item { updated: Some(now), ..entry.into_item() }
            }
            Ok(FetchOutcome::Fetched(response)) => {
                self.writer.enqueue(WriteOp::Put(response.to_entry(name, now)));
                self.counter().record_refresh();
                self.counter().record_fetch();
                tracing::debug!("REFRESH {} replaced with {}", name, response.status);
                response.to_item(now)
            }
            Err(e) => {
                tracing::warn!("revalidation of {} failed, serving cached copy: {}", name, e);
                self.counter().record_cache();
                entry.into_item()
            }
        }
    }

    async fn fetch_fresh(&self, path: &str) -> Result<Resolved, Error> {
        if let Some(url) = absolute(path) {
            let url = url.map_err(|e| Error::Fetch(e.to_string()))?;
            if !self.admit(&url).is_allowed() {
                return Err(Error::Blocked(url.to_string()));
            }
        }

        let now = epoch();
        match self.fetcher.fetch(path, None).await? {
            FetchOutcome::Fetched(response) => {
                self.writer.enqueue(WriteOp::Put(response.to_entry(path, now)));
                self.counter().record_fetch();
                tracing::debug!("stored {} after {}ms", path, response.fetch_ms);
                Ok(Resolved::new(path, response.to_item(now)))
            }
            FetchOutcome::NotModified => Err(Error::Fetch(format!("unexpected 304 for {}", path))),
        }
    }

    /// Cached property value as loaded at open or last written.
    pub fn property(&self, key: &str) -> Option<Value> {
        self.props.read().ok().and_then(|props| props.get(key).cloned())
    }

    /// Persist a property and update the in-memory copy.
    pub async fn set_property(&self, key: &str, value: Value) -> Result<(), Error> {
        self.store.set_property(key, &value).await?;
        if let Ok(mut props) = self.props.write() {
            props.insert(key.to_string(), value);
        }
        Ok(())
    }

    /// Revalidation cutoff; `None` when unset or zero.
    pub fn baseline(&self) -> Option<i64> {
        self.property(BASELINE).and_then(|v| v.as_i64()).filter(|b| *b > 0)
    }

    /// Mark entries fetched before `timestamp` as stale.
    ///
    /// Clears the recent-lookup memo so the next lookups consult the store.
    pub async fn set_baseline(&self, timestamp: i64) -> Result<(), Error> {
        self.set_property(BASELINE, Value::from(timestamp)).await?;
        self.recent.clear();
        tracing::info!("baseline of {} set to {}", self.name(), timestamp);
        Ok(())
    }

    /// Wait for queued writes to land.
    pub async fn flush(&self) -> bool {
        self.writer.flush().await
    }

    pub fn writer_state(&self) -> WriterState {
        self.writer.state()
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn database_path(&self) -> &std::path::Path {
        &self.db_path
    }
}

#[async_trait]
impl Document for MirrorDocument {
    fn base(&self) -> &DocumentBase {
        &self.base
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Mirror
    }

    fn root(&self) -> String {
        self.fetcher.prefix().to_string()
    }

    fn origin(&self) -> Option<&Url> {
        Some(self.fetcher.prefix())
    }

    /// Unknown paths may exist at the origin; only a cached 404 rules one out.
    async fn contains(&self, path: &str) -> bool {
        match self.store.status(path).await {
            Ok(Some(status)) => status != 404,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("store read failed for {}: {}", path, e);
                true
            }
        }
    }

    async fn resolve(&self, path: &str) -> Result<Resolved, Error> {
        self.find(path).await
    }

    async fn symbol_index(&self) -> Result<Option<SymbolIndex>, Error> {
        match &self.index_location {
            Some(location) => {
                let item = self.lookup(location).await?;
                index::parse(location, &item.content)
            }
            None => index::probe(self).await,
        }
    }

    async fn stop(&self) {
        self.writer.shutdown().await;
    }
}
