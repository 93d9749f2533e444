//! Documents and the local HTTP gateway for docmirror.
//!
//! This crate provides:
//! - The `Document` trait with directory, archive and mirror variants
//! - The recent-lookup memo and symbol index loader
//! - The loopback gateway that serves a document to a web client

pub mod document;
pub mod error;
pub mod gateway;

pub use document::{
    ArchiveDocument, DirectoryDocument, Document, MirrorDocument, Resolved, Symbol, SymbolIndex, candidate_names,
    open_document,
};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayState, fix_redirect, router};
