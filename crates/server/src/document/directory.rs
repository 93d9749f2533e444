//! Documents served from a directory tree on disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use docmirror_core::{DocumentConfig, DocumentFormat, Error, Item};

use super::{Document, DocumentBase, Resolved, candidate_names};

pub struct DirectoryDocument {
    base: DocumentBase,
    root: PathBuf,
}

impl DirectoryDocument {
    /// Open `docs_dir/<path or name>[/dir][/prefix]`.
    pub fn open(config: &DocumentConfig, docs_dir: &Path) -> Result<Self, Error> {
        let mut root = config.root(docs_dir);
        if let Some(dir) = &config.dir {
            root.push(dir);
        }
        if let Some(prefix) = &config.prefix {
            root.push(prefix);
        }
        if !root.is_dir() {
            return Err(Error::Configuration(format!("{} is not a directory", root.display())));
        }
        Ok(Self { base: DocumentBase::new(config), root })
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = safe_relative(name)?;
        Some(self.root.join(relative))
    }
}

/// Reject absolute paths and `..` so lookups stay under the root.
fn safe_relative(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

fn modified_epoch(meta: &std::fs::Metadata) -> Option<i64> {
    let modified = meta.modified().ok()?;
    let since = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    i64::try_from(since.as_secs()).ok()
}

#[async_trait]
impl Document for DirectoryDocument {
    fn base(&self) -> &DocumentBase {
        &self.base
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Directory
    }

    fn root(&self) -> String {
        self.root.display().to_string()
    }

    async fn contains(&self, path: &str) -> bool {
        let Some(file) = self.locate(path) else { return false };
        tokio::fs::metadata(file).await.is_ok_and(|m| m.is_file())
    }

    async fn resolve(&self, path: &str) -> Result<Resolved, Error> {
        for name in candidate_names(path) {
            let Some(file) = self.locate(&name) else { continue };
            let meta = match tokio::fs::metadata(&file).await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let content = tokio::fs::read(&file).await?;
            return Ok(Resolved::new(name, Item { updated: modified_epoch(&meta), ..Item::new(content) }));
        }
        Err(Error::NotFound(format!("cannot find {} in {}", path, self.root.display())))
    }
}
