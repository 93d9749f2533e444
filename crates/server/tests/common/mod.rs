//! Loopback origin shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Response, StatusCode, Uri, header};
use docmirror_core::{AppConfig, DocumentConfig};
use docmirror_server::MirrorDocument;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone)]
struct OriginState {
    prefix: String,
    away: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

/// A tiny origin under `/docs/` that counts hits per path.
///
/// - `page.html`, `guide/index.html`, `slow.html`: 200, or 304 when
///   `If-Modified-Since` is sent
/// - `changed.html`: always 200 with a new body
/// - `redirect`: 302 to `<prefix>foo/bar`
/// - `away`: 302 to `https://example.org/x`, or the target given to
///   [`Origin::start_away`]
/// - anything else: 404
pub struct Origin {
    pub prefix: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Origin {
    pub async fn start() -> Self {
        Self::start_away("https://example.org/x").await
    }

    /// Origin whose `away` page redirects to `target`.
    pub async fn start_away(target: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let prefix = format!("http://127.0.0.1:{}/docs/", listener.local_addr().unwrap().port());
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let state = OriginState { prefix: prefix.clone(), away: target.to_string(), hits: Arc::clone(&hits) };

        let app = Router::new().fallback(answer).with_state(state);
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self { prefix, hits, shutdown: Some(tx) }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

impl Drop for Origin {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn answer(State(state): State<OriginState>, headers: HeaderMap, uri: Uri) -> Response<Body> {
    let path = uri.path().trim_start_matches("/docs/").to_string();
    *state.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    let conditional = headers.contains_key(header::IF_MODIFIED_SINCE);
    let builder = Response::builder();

    match path.as_str() {
        "page.html" | "guide/index.html" | "slow.html" => {
            if path == "slow.html" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            if conditional {
                return builder.status(StatusCode::NOT_MODIFIED).body(Body::empty()).unwrap();
            }
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .body(Body::from(format!("<p>{path}</p>")))
                .unwrap()
        }
        "changed.html" => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from("v2"))
            .unwrap(),
        "redirect" => builder
            .status(StatusCode::FOUND)
            .header(header::LOCATION, format!("{}foo/bar", state.prefix))
            .body(Body::empty())
            .unwrap(),
        "away" => builder
            .status(StatusCode::FOUND)
            .header(header::LOCATION, state.away.as_str())
            .body(Body::empty())
            .unwrap(),
        _ => builder
            .status(StatusCode::NOT_FOUND)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("no such page"))
            .unwrap(),
    }
}

pub fn app_config(docs_dir: &std::path::Path) -> AppConfig {
    AppConfig { docs_dir: docs_dir.to_path_buf(), timeout_ms: 5000, ..Default::default() }
}

pub fn mirror_config(name: &str, url: &str) -> DocumentConfig {
    DocumentConfig { name: name.into(), url: Some(url.into()), ..Default::default() }
}

pub async fn open_mirror(docs_dir: &std::path::Path, url: &str) -> MirrorDocument {
    MirrorDocument::open(&mirror_config("mirror", url), &app_config(docs_dir)).await.unwrap()
}

pub fn http() -> reqwest::Client {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap()
}
