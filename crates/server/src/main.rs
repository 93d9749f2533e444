//! docmirror entry point.
//!
//! Opens every configured document, serves each on its own loopback gateway
//! and runs until Ctrl-C. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use docmirror_core::AppConfig;
use docmirror_server::{Document, Gateway, open_document};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting docmirror with {} documents under {}", config.documents.len(), config.docs_dir.display());

    let mut running: Vec<(Arc<dyn Document>, Gateway)> = Vec::new();
    for doc_config in &config.documents {
        let doc = match open_document(doc_config, &config).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("failed to open {}: {}", doc_config.name, e);
                continue;
            }
        };

        let mut gateway = Gateway::bind(Arc::clone(&doc)).await?;
        gateway.start()?;
        tracing::info!(
            document = %doc.name(),
            prefix = %gateway.prefix(),
            start = doc.start_page().unwrap_or(""),
            "serving"
        );
        running.push((doc, gateway));
    }

    if running.is_empty() {
        tracing::warn!("no documents to serve");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    for (doc, mut gateway) in running {
        gateway.stop().await;
        doc.stop().await;
        let counts = doc.counter_snapshot();
        tracing::info!(
            document = %doc.name(),
            fetch = counts.fetch,
            cache = counts.cache,
            refresh = counts.refresh,
            block = counts.block,
            "stopped"
        );
    }

    Ok(())
}
