//! Documents served from a zip archive.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use docmirror_core::{DocumentConfig, DocumentFormat, Error, Item};
use zip::ZipArchive;
use zip::result::ZipError;

use super::{Document, DocumentBase, Resolved, candidate_names};

pub struct ArchiveDocument {
    base: DocumentBase,
    path: PathBuf,
    prefix: String,
    archive: Arc<Mutex<ZipArchive<File>>>,
}

impl ArchiveDocument {
    pub fn open(config: &DocumentConfig, docs_dir: &Path) -> Result<Self, Error> {
        let path = config.archive_path(docs_dir);
        let file = File::open(&path).map_err(|e| Error::Archive(format!("{}: {}", path.display(), e)))?;
        let archive = ZipArchive::new(file).map_err(|e| Error::Archive(format!("{}: {}", path.display(), e)))?;

        let prefix = match config.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(p) if !p.is_empty() => format!("{p}/"),
            _ => String::new(),
        };

        tracing::debug!("opened archive {} with {} entries", path.display(), archive.len());
        Ok(Self { base: DocumentBase::new(config), path, prefix, archive: Arc::new(Mutex::new(archive)) })
    }

    fn member(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

fn zip_epoch(dt: zip::DateTime) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))?;
    let time = date.and_hms_opt(u32::from(dt.hour()), u32::from(dt.minute()), u32::from(dt.second()))?;
    Some(time.and_utc().timestamp())
}

/// First of `names` stored as a file under `prefix`.
fn read_member(archive: &mut ZipArchive<File>, prefix: &str, names: [String; 3]) -> Result<Option<Resolved>, Error> {
    for name in names {
        let mut file = match archive.by_name(&format!("{prefix}{name}")) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(Error::Archive(format!("{}: {}", name, e))),
        };
        if file.is_dir() {
            continue;
        }
        let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut content)?;
        let updated = file.last_modified().and_then(zip_epoch);
        return Ok(Some(Resolved::new(name, Item { updated, ..Item::new(content) })));
    }
    Ok(None)
}

#[async_trait]
impl Document for ArchiveDocument {
    fn base(&self) -> &DocumentBase {
        &self.base
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Archive
    }

    fn root(&self) -> String {
        if self.prefix.is_empty() {
            self.path.display().to_string()
        } else {
            format!("{}!/{}", self.path.display(), self.prefix)
        }
    }

    async fn contains(&self, path: &str) -> bool {
        let member = self.member(path);
        match self.archive.lock() {
            Ok(archive) => archive.index_for_name(&member).is_some(),
            Err(_) => false,
        }
    }

    async fn resolve(&self, path: &str) -> Result<Resolved, Error> {
        let names = candidate_names(path);
        let prefix = self.prefix.clone();
        let archive = Arc::clone(&self.archive);

        let found = tokio::task::spawn_blocking(move || {
            let mut archive = archive.lock().map_err(|_| Error::Archive("archive lock poisoned".into()))?;
            read_member(&mut archive, &prefix, names)
        })
        .await
        .map_err(|e| Error::Archive(format!("read task failed: {}", e)))??;

        found.ok_or_else(|| Error::NotFound(format!("cannot find {} in {}", path, self.root())))
    }
}
