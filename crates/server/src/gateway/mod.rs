//! Loopback HTTP gateway fronting one document.
//!
//! Binds `127.0.0.1:0` so the OS picks the port; [`Gateway::prefix`] is the
//! base URL the embedding client builds page URLs from. No access log is
//! installed; the document counters are the operational signal.

pub mod handler;
pub mod redirect;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use docmirror_core::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::document::Document;
pub use handler::GatewayState;
pub use redirect::fix_redirect;

/// Build the router serving every path of `state.doc`.
pub fn router(state: GatewayState) -> Router {
    Router::new().fallback(handler::serve).with_state(state)
}

pub struct Gateway {
    addr: SocketAddr,
    prefix: String,
    doc: Arc<dyn Document>,
    listener: Option<TcpListener>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Gateway {
    /// Bind an ephemeral loopback port for `doc`. Call [`Gateway::start`] to
    /// begin accepting.
    pub async fn bind(doc: Arc<dyn Document>) -> Result<Self, Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let prefix = format!("http://127.0.0.1:{}/", addr.port());
        Ok(Self { addr, prefix, doc, listener: Some(listener), shutdown_tx: None, task: None })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://127.0.0.1:<port>/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the gateway was already started.
    pub fn start(&mut self) -> Result<(), Error> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| Error::Configuration(format!("gateway {} already started", self.prefix)))?;

        let app = router(GatewayState { doc: Arc::clone(&self.doc), prefix: Arc::from(self.prefix.as_str()) });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let name = self.doc.name().to_string();

        let task = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                tracing::error!("gateway for {} failed: {}", name, e);
            }
        });

        tracing::info!("gateway for {} listening on {}", self.doc.name(), self.prefix);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Stop accepting, let in-flight responses finish, then release the port.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("gateway task ended abnormally: {}", e);
        }
        self.listener = None;
        tracing::info!("gateway for {} stopped", self.doc.name());
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
