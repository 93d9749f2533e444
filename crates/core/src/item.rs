//! The transient value every document lookup produces.

use bytes::Bytes;

/// A resolved resource handed to the caller and discarded after use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub content: Bytes,
    /// HTTP status; `None` for local documents, which only hold successes.
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Redirect target as sent by the origin.
    pub location: Option<String>,
    /// Unix epoch seconds of the last fetch, validation or file modification.
    pub updated: Option<i64>,
}

impl Item {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }

    /// Status with the local-document default of 200 applied.
    pub fn status_or_ok(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, Some(300..=399))
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}
