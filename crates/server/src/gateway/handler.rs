//! Request handler translating gateway paths into document lookups.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Response, StatusCode, Uri, header};
use axum::response::IntoResponse;
use docmirror_core::DocumentFormat;

use super::redirect::fix_redirect;
use crate::document::{Document, Resolved, candidate_names};
use crate::error::GatewayError;

/// One week; assets are immutable as far as the client is concerned.
pub const CACHE_CONTROL: &str = "max-age=604800";

/// Shared state for every request on one gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub doc: Arc<dyn Document>,
    /// `http://127.0.0.1:<port>/`
    pub prefix: Arc<str>,
}

pub async fn serve(State(state): State<GatewayState>, method: Method, uri: Uri) -> Response<Body> {
    if method != Method::GET && method != Method::HEAD {
        return GatewayError::MethodNotAllowed(method.to_string()).into_response();
    }
    match respond(&state, uri.path()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Map a request path onto a name the document holds.
///
/// Local documents serve `index.html` for the root; a mirror passes the empty
/// path through to its origin.
pub async fn resolve_path(doc: &dyn Document, raw: &str) -> Result<String, GatewayError> {
    let mut path = raw.trim_start_matches('/').to_string();
    if path.is_empty() && doc.format() != DocumentFormat::Mirror {
        path = "index.html".to_string();
    }

    if doc.contains(&path).await {
        return Ok(path);
    }

    let [_, html, index] = candidate_names(&path);
    if !path.ends_with(".html") && doc.contains(&html).await {
        return Ok(html);
    }
    if doc.contains(&index).await {
        return Ok(index);
    }

    Err(GatewayError::NotFound { path, root: doc.root() })
}

async fn respond(state: &GatewayState, raw_path: &str) -> Result<Response<Body>, GatewayError> {
    let path = resolve_path(state.doc.as_ref(), raw_path).await?;
    let Resolved { name, item } = state.doc.resolve(&path).await?;

    let status = item.status_or_ok();
    let status =
        StatusCode::from_u16(status).map_err(|_| GatewayError::Response(format!("invalid status {status}")))?;
    let mime = match item.content_type.clone() {
        Some(mime) => mime,
        None => mime_guess::from_path(&name).first_or_octet_stream().to_string(),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, item.content.len())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");

    if item.is_redirect() {
        if let Some(location) = item.location.as_deref() {
            let location = fix_redirect(location, state.doc.origin(), &state.prefix)?;
            builder = builder.header(header::LOCATION, location);
        }
    } else if status == StatusCode::OK {
        builder = builder.header(header::CACHE_CONTROL, CACHE_CONTROL);
    }

    builder.body(Body::from(item.content)).map_err(|e| GatewayError::Response(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DirectoryDocument;
    use docmirror_core::DocumentConfig;

    fn directory(files: &[(&str, &str)]) -> (tempfile::TempDir, Arc<dyn Document>) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("doc");
        std::fs::create_dir(&root).unwrap();
        for (name, body) in files {
            let file = root.join(name);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, body).unwrap();
        }
        let config = DocumentConfig { name: "doc".into(), ..Default::default() };
        let doc = DirectoryDocument::open(&config, tmp.path()).unwrap();
        (tmp, Arc::new(doc))
    }

    #[tokio::test]
    async fn test_resolve_fallbacks() {
        let (_tmp, doc) = directory(&[("index.html", "home"), ("api.html", "api"), ("guide/index.html", "guide")]);

        assert_eq!(resolve_path(doc.as_ref(), "/").await.unwrap(), "index.html");
        assert_eq!(resolve_path(doc.as_ref(), "/api").await.unwrap(), "api.html");
        assert_eq!(resolve_path(doc.as_ref(), "/guide").await.unwrap(), "guide/index.html");
        assert_eq!(resolve_path(doc.as_ref(), "/guide/").await.unwrap(), "guide/index.html");
    }

    #[tokio::test]
    async fn test_resolve_missing_names_path_and_root() {
        let (_tmp, doc) = directory(&[("index.html", "home")]);
        let err = resolve_path(doc.as_ref(), "/missing").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains(&doc.root()));
    }

    #[tokio::test]
    async fn test_respond_headers() {
        let (_tmp, doc) = directory(&[("style.css", "body{}")]);
        let state = GatewayState { doc, prefix: Arc::from("http://127.0.0.1:1/") };

        let response = respond(&state, "/style.css").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::CACHE_CONTROL], CACHE_CONTROL);
    }

    #[tokio::test]
    async fn test_serve_rejects_post() {
        let (_tmp, doc) = directory(&[("index.html", "home")]);
        let state = GatewayState { doc, prefix: Arc::from("http://127.0.0.1:1/") };
        let response = serve(State(state), Method::POST, Uri::from_static("/")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
