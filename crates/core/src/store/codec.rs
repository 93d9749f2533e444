//! Encoding of stored rows: zstd bodies and JSON header maps.

use std::collections::BTreeMap;

use crate::Error;

const ZSTD_LEVEL: i32 = 3;

pub fn compress(content: &[u8]) -> Result<Vec<u8>, Error> {
    zstd::encode_all(content, ZSTD_LEVEL).map_err(|e| Error::Codec(format!("compress: {e}")))
}

pub fn decompress(content: &[u8]) -> Result<Vec<u8>, Error> {
    zstd::decode_all(content).map_err(|e| Error::Codec(format!("decompress: {e}")))
}

pub fn encode_headers(headers: &BTreeMap<String, String>) -> Result<String, Error> {
    serde_json::to_string(headers).map_err(|e| Error::Codec(format!("headers: {e}")))
}

pub fn decode_headers(raw: &str) -> Result<BTreeMap<String, String>, Error> {
    serde_json::from_str(raw).map_err(|e| Error::Codec(format!("headers: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_shrinks_repetitive_html() {
        let html = "<p>lorem ipsum</p>".repeat(500);
        let packed = compress(html.as_bytes()).unwrap();
        assert!(packed.len() < html.len() / 10);
        assert_eq!(decompress(&packed).unwrap(), html.as_bytes());
    }

    #[test]
    fn test_decompress_garbage() {
        assert!(matches!(decompress(b"definitely not zstd"), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_headers_rejects_non_object() {
        assert!(decode_headers("[1, 2]").is_err());
        assert!(decode_headers("{}").unwrap().is_empty());
    }
}
