//! Path-addressable documents.
//!
//! A document is anything the gateway can serve: a directory on disk, a zip
//! archive, or a live mirror of a remote origin. All three share the same
//! lookup contract and the same fallback name order.

pub mod archive;
pub mod directory;
pub mod index;
pub mod memo;
pub mod mirror;

use std::sync::Arc;

use async_trait::async_trait;
use docmirror_client::{RequestPolicy, Verdict};
use docmirror_core::{AppConfig, Counter, CounterSnapshot, DocumentConfig, DocumentFormat, Error, Item, Whitelist};
use url::Url;

pub use archive::ArchiveDocument;
pub use directory::DirectoryDocument;
pub use index::{Symbol, SymbolIndex};
pub use mirror::MirrorDocument;

/// Names tried, in order, when resolving a logical path.
///
/// `name`, then `name.html`, then `name/index.html` (or `index.html` for the
/// empty name). The first one that exists wins.
pub fn candidate_names(name: &str) -> [String; 3] {
    let index = if name.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}/index.html", name.trim_end_matches('/'))
    };
    [name.to_string(), format!("{name}.html"), index]
}

/// An item and the fallback name it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub name: String,
    pub item: Item,
}

impl Resolved {
    pub fn new(name: impl Into<String>, item: Item) -> Self {
        Self { name: name.into(), item }
    }
}

/// State every document kind carries.
#[derive(Debug)]
pub struct DocumentBase {
    name: String,
    start: Option<String>,
    policy: RequestPolicy,
    counter: Counter,
}

impl DocumentBase {
    pub fn new(config: &DocumentConfig) -> Self {
        Self {
            name: config.name.clone(),
            start: config.start.clone(),
            policy: RequestPolicy::new(Whitelist::new(&config.whitelist)),
            counter: Counter::default(),
        }
    }
}

/// The lookup contract shared by directory, archive and mirror documents.
#[async_trait]
pub trait Document: Send + Sync {
    fn base(&self) -> &DocumentBase;

    fn format(&self) -> DocumentFormat;

    /// Location shown in diagnostics: a filesystem path or the origin prefix.
    fn root(&self) -> String;

    /// Origin prefix for mirrored documents.
    fn origin(&self) -> Option<&Url> {
        None
    }

    /// Whether `path` exists as-is, without fallback names.
    async fn contains(&self, path: &str) -> bool;

    /// Find the item at `path`, trying fallback names, and report which
    /// name matched.
    async fn resolve(&self, path: &str) -> Result<Resolved, Error>;

    /// Fetch the item at `path`, trying fallback names.
    async fn get(&self, path: &str) -> Result<Item, Error> {
        self.resolve(path).await.map(|found| found.item)
    }

    /// Load the document's search index, if it ships one.
    async fn symbol_index(&self) -> Result<Option<SymbolIndex>, Error> {
        index::probe(self).await
    }

    /// Release background resources.
    async fn stop(&self) {}

    fn name(&self) -> &str {
        &self.base().name
    }

    fn start_page(&self) -> Option<&str> {
        self.base().start.as_deref()
    }

    fn counter(&self) -> &Counter {
        &self.base().counter
    }

    fn counter_snapshot(&self) -> CounterSnapshot {
        self.counter().snapshot()
    }

    /// Called at the start of each top-level page load.
    fn reset_counter(&self) {
        self.counter().reset();
    }

    fn is_whitelisted(&self, url: &Url) -> bool {
        self.base().policy.whitelist().is_whitelisted(url)
    }

    /// Apply the request policy for a resource the page wants to load,
    /// counting denials.
    fn admit(&self, url: &Url) -> Verdict {
        let verdict = self.base().policy.evaluate(url);
        if let Verdict::Block(reason) = &verdict {
            tracing::debug!(document = %self.name(), %url, "{}", reason);
            self.counter().record_block();
        }
        verdict
    }
}

/// Open a configured document in whichever format it is stored.
pub async fn open_document(config: &DocumentConfig, app: &AppConfig) -> Result<Arc<dyn Document>, Error> {
    config.validate()?;
    let doc: Arc<dyn Document> = match config.format(&app.docs_dir)? {
        DocumentFormat::Mirror => Arc::new(MirrorDocument::open(config, app).await?),
        DocumentFormat::Archive => Arc::new(ArchiveDocument::open(config, &app.docs_dir)?),
        DocumentFormat::Directory => Arc::new(DirectoryDocument::open(config, &app.docs_dir)?),
    };
    tracing::debug!("opened {:?} document {} at {}", doc.format(), doc.name(), doc.root());
    Ok(doc)
}
