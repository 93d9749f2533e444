//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DOCMIRROR_*)
//! 2. TOML config file (if DOCMIRROR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DOCMIRROR_*)
/// 2. TOML config file (if DOCMIRROR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory holding document trees, archives and mirror databases.
    ///
    /// Set via DOCMIRROR_DOCS_DIR environment variable.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// User-Agent string for origin requests.
    ///
    /// Set via DOCMIRROR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via DOCMIRROR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of concurrent origin connections per mirror.
    ///
    /// Set via DOCMIRROR_MAX_CONNECTIONS environment variable.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Number of reader handles opened on each mirror database.
    ///
    /// Set via DOCMIRROR_READER_CONNECTIONS environment variable.
    #[serde(default = "default_reader_connections")]
    pub reader_connections: usize,

    /// Capacity of the recent-lookup memo kept by each mirror.
    ///
    /// Set via DOCMIRROR_RECENT_LOOKUPS environment variable.
    #[serde(default = "default_recent_lookups")]
    pub recent_lookups: usize,

    /// Documents to open.
    #[serde(default)]
    pub documents: Vec<DocumentConfig>,
}

/// Per-document configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Display name, also the directory name under `docs_dir`.
    pub name: String,

    /// Origin prefix for mirrored documents. Must end with `/`.
    #[serde(default)]
    pub url: Option<String>,

    /// Location relative to `docs_dir`; defaults to `name`.
    #[serde(default)]
    pub path: Option<String>,

    /// Archive file name inside the document directory.
    #[serde(default)]
    pub zip: Option<String>,

    /// Sub-directory inside the document tree.
    #[serde(default)]
    pub dir: Option<String>,

    /// Prefix inside the document tree or archive.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Start page opened by the embedding client.
    #[serde(default)]
    pub start: Option<String>,

    /// Additional trusted hosts for this document.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Remote path of a pre-built search index.
    #[serde(default)]
    pub index: Option<String>,
}

/// Storage format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Directory,
    Archive,
    Mirror,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_user_agent() -> String {
    "docmirror/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_connections() -> usize {
    5
}

fn default_reader_connections() -> usize {
    4
}

fn default_recent_lookups() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_connections: default_max_connections(),
            reader_connections: default_reader_connections(),
            recent_lookups: default_recent_lookups(),
            documents: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DOCMIRROR_`
    /// 2. TOML file from `DOCMIRROR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DOCMIRROR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DOCMIRROR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Find a configured document by name.
    pub fn document(&self, name: &str) -> Option<&DocumentConfig> {
        self.documents.iter().find(|d| d.name == name)
    }
}

impl DocumentConfig {
    /// Root of the document under `docs_dir`.
    pub fn root(&self, docs_dir: &Path) -> PathBuf {
        docs_dir.join(self.path.as_deref().unwrap_or(&self.name))
    }

    /// Detect the storage format of this document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when nothing on disk matches and no
    /// origin is configured.
    pub fn format(&self, docs_dir: &Path) -> Result<DocumentFormat, ConfigError> {
        if self.url.is_some() {
            return Ok(DocumentFormat::Mirror);
        }
        if self.zip.is_some() {
            return Ok(DocumentFormat::Archive);
        }

        let root = self.root(docs_dir);
        if root.extension().is_some_and(|ext| ext == "zip") {
            return Ok(DocumentFormat::Archive);
        }
        if root.is_dir() {
            return Ok(DocumentFormat::Directory);
        }
        if root.with_extension("zip").exists() {
            return Ok(DocumentFormat::Archive);
        }

        Err(ConfigError::Invalid {
            field: format!("documents.{}", self.name),
            reason: format!("no directory or archive at {}", root.display()),
        })
    }

    /// Path of the zip archive backing this document.
    pub fn archive_path(&self, docs_dir: &Path) -> PathBuf {
        let root = self.root(docs_dir);
        match &self.zip {
            Some(zip) => docs_dir.join(&self.name).join(zip),
            None if root.extension().is_some_and(|ext| ext == "zip") => root,
            None => root.with_extension("zip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.docs_dir, PathBuf::from("./docs"));
        assert_eq!(config.user_agent, "docmirror/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.reader_connections, 4);
        assert_eq!(config.recent_lookups, 20);
        assert!(config.documents.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_format_mirror_when_url_set() {
        let doc = DocumentConfig {
            name: "python".into(),
            url: Some("https://docs.python.org/3/".into()),
            ..Default::default()
        };
        assert_eq!(doc.format(Path::new("/nonexistent")).unwrap(), DocumentFormat::Mirror);
    }

    #[test]
    fn test_format_directory_and_archive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("rust")).unwrap();
        std::fs::write(tmp.path().join("qt.zip"), b"").unwrap();

        let dir = DocumentConfig { name: "rust".into(), ..Default::default() };
        assert_eq!(dir.format(tmp.path()).unwrap(), DocumentFormat::Directory);

        let zipped = DocumentConfig { name: "qt".into(), ..Default::default() };
        assert_eq!(zipped.format(tmp.path()).unwrap(), DocumentFormat::Archive);
        assert_eq!(zipped.archive_path(tmp.path()), tmp.path().join("qt.zip"));

        let missing = DocumentConfig { name: "nothing".into(), ..Default::default() };
        assert!(matches!(missing.format(tmp.path()), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_archive_path_with_zip_key() {
        let doc = DocumentConfig { name: "qt".into(), zip: Some("qt-6.8.zip".into()), ..Default::default() };
        assert_eq!(doc.archive_path(Path::new("/docs")), PathBuf::from("/docs/qt/qt-6.8.zip"));
        assert_eq!(doc.format(Path::new("/docs")).unwrap(), DocumentFormat::Archive);
    }

    #[test]
    fn test_document_lookup() {
        let config = AppConfig {
            documents: vec![DocumentConfig { name: "mdn".into(), ..Default::default() }],
            ..Default::default()
        };
        assert!(config.document("mdn").is_some());
        assert!(config.document("python").is_none());
    }
}
