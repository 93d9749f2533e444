//! SQLite-backed content store for mirrored documents.
//!
//! Each mirror owns one database holding:
//!
//! - `cache`: status, headers and zstd-compressed body per relative path
//! - `prop`: mirror-wide metadata such as the baseline cutoff
//!
//! Reads go through a small pool of reader connections, all mutations go
//! through a single writer connection (see [`crate::writer`]).

pub mod codec;
pub mod connection;
pub mod entries;
pub mod migrations;
pub mod properties;

pub use crate::Error;

pub use connection::ContentStore;
pub use entries::CacheEntry;
pub use properties::BASELINE;
