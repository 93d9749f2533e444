//! Symbol index loading.
//!
//! Supports the two machine-readable formats documentation generators ship:
//! a JSON pair of parallel arrays (`index.json`) and the Sphinx
//! `searchindex.js` payload.

use docmirror_core::Error;
use serde::Serialize;
use serde_json::Value;

use super::Document;

/// Files probed, in order, when no index location is configured.
pub const PROBE_FILES: &[&str] = &["searchindex.js", "index.json"];

const SPHINX_PREFIX: &[u8] = b"Search.setIndex(";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub symbol: String,
    pub location: String,
}

/// Flat symbol to location table, sorted by symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolIndex {
    entries: Vec<Symbol>,
}

impl SymbolIndex {
    pub fn new(mut entries: Vec<Symbol>) -> Self {
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Self { entries }
    }

    pub fn entries(&self) -> &[Symbol] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn location(&self, symbol: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|s| s.symbol.as_str().cmp(symbol))
            .ok()
            .map(|i| self.entries[i].location.as_str())
    }
}

/// Parse index content according to the file name at the end of `path`.
///
/// Returns `Ok(None)` for file names that are not a supported format.
pub fn parse(path: &str, content: &[u8]) -> Result<Option<SymbolIndex>, Error> {
    match path.rsplit('/').next().unwrap_or(path) {
        "index.json" => parse_index_json(content).map(Some),
        "searchindex.js" => parse_searchindex(content, path).map(Some),
        _ => Ok(None),
    }
}

fn parse_index_json(content: &[u8]) -> Result<SymbolIndex, Error> {
    let (symbols, locations): (Vec<String>, Vec<String>) =
        serde_json::from_slice(content).map_err(|e| Error::Codec(format!("index.json: {}", e)))?;
    if symbols.len() != locations.len() {
        return Err(Error::Codec(format!(
            "index.json: {} symbols but {} locations",
            symbols.len(),
            locations.len()
        )));
    }
    let entries = symbols.into_iter().zip(locations).map(|(symbol, location)| Symbol { symbol, location }).collect();
    Ok(SymbolIndex::new(entries))
}

fn parse_searchindex(content: &[u8], path: &str) -> Result<SymbolIndex, Error> {
    let trimmed = content.trim_ascii();
    let body = trimmed
        .strip_prefix(SPHINX_PREFIX)
        .ok_or_else(|| Error::Codec(format!("{}: not a Sphinx search index", path)))?;
    let body = body.strip_suffix(b";").unwrap_or(body);
    let body = body.strip_suffix(b")").unwrap_or(body);

    let data: Value = serde_json::from_slice(body).map_err(|e| Error::Codec(format!("{}: {}", path, e)))?;

    let (docs, add_html) = match (data.get("docnames"), data.get("docurls")) {
        (Some(Value::Array(names)), _) => (names, true),
        (None, Some(Value::Array(urls))) => (urls, false),
        _ => return Err(Error::Codec(format!("{}: missing docnames", path))),
    };

    let mut entries = Vec::new();
    if let Some(Value::Object(index)) = data.get("indexentries") {
        for (symbol, targets) in index {
            let Some([target]) = targets.as_array().map(Vec::as_slice) else { continue };
            let Some(doc) = target.get(0).and_then(Value::as_u64).and_then(|i| docs.get(i as usize)) else { continue };
            let Some(doc) = doc.as_str() else { continue };

            let mut location = doc.to_string();
            if add_html {
                location.push_str(".html");
            }
            if let Some(anchor) = target.get(1).and_then(Value::as_str).filter(|a| !a.is_empty()) {
                location.push('#');
                location.push_str(anchor);
            }
            entries.push(Symbol { symbol: symbol.clone(), location });
        }
    }

    Ok(SymbolIndex::new(entries))
}

/// Probe the well-known index files of `doc`.
///
/// A missing file moves on to the next candidate; a file answered with a
/// non-success status ends the probe.
pub async fn probe<D: Document + ?Sized>(doc: &D) -> Result<Option<SymbolIndex>, Error> {
    for file in PROBE_FILES {
        match doc.get(file).await {
            Ok(item) if item.status.is_none_or(|s| s == 200) => return parse(file, &item.content),
            Ok(_) => return Ok(None),
            Err(Error::NotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}
