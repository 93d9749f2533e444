//! Core types and shared functionality for docmirror.
//!
//! This crate provides:
//! - Content store with SQLite backend and zstd-compressed bodies
//! - Single-writer queue for store mutations
//! - Unified error types
//! - Configuration structures
//! - Items, counters and the host whitelist shared by every document kind

pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod item;
pub mod store;
pub mod whitelist;
pub mod writer;

pub use config::{AppConfig, ConfigError, DocumentConfig, DocumentFormat};
pub use counter::{Counter, CounterSnapshot};
pub use error::Error;
pub use item::Item;
pub use store::{CacheEntry, ContentStore};
pub use whitelist::Whitelist;
pub use writer::{WriteOp, WriterQueue, WriterState};
