//! Client code for docmirror.
//!
//! This crate provides the origin fetch pipeline used by mirrored documents
//! and the request policy applied by the embedding web client.

pub mod fetch;
pub mod policy;

pub use fetch::{FetchConfig, FetchOutcome, FetchResponse, OriginFetcher, absolute, http_date};
pub use policy::{BlockReason, RequestPolicy, Verdict};
