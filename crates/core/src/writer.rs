//! Single-writer queue for content store mutations.
//!
//! Lookups run concurrently on many tasks but every mutation is funnelled
//! through one unbounded channel into one worker task, which owns the only
//! path to the store's writer connection. Enqueueing never blocks, so a
//! fetch returns its item before the write is durable.
//!
//! A failed write is logged and dropped: the next cache miss simply
//! refetches. Stopping the queue does not flush; anything still queued is
//! discarded.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::store::{CacheEntry, ContentStore};

/// A mutation to apply to the store.
#[derive(Debug)]
pub enum WriteOp {
    /// Insert or replace a whole entry.
    Put(CacheEntry),
    /// Refresh the `updated` timestamp only (after a 304).
    Touch { path: String, updated: i64 },
    /// Resolves once every earlier operation has been applied.
    Barrier(oneshot::Sender<()>),
}

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Draining,
    Stopped,
}

impl WriterState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WriterState::Idle,
            1 => WriterState::Draining,
            _ => WriterState::Stopped,
        }
    }
}

/// Handle to the single store writer.
pub struct WriterQueue {
    tx: mpsc::UnboundedSender<WriteOp>,
    stop_tx: watch::Sender<bool>,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriterQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(store: ContentStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let state = Arc::new(AtomicU8::new(WriterState::Idle as u8));

        let worker = tokio::spawn(run(store, rx, stop_rx, Arc::clone(&state)));

        Self { tx, stop_tx, state, worker: Mutex::new(Some(worker)) }
    }

    /// Queue a mutation. Never blocks; dropped with a warning once stopped.
    pub fn enqueue(&self, op: WriteOp) {
        if self.state() == WriterState::Stopped {
            tracing::warn!("writer stopped, dropping {}", describe(&op));
            return;
        }
        if let Err(e) = self.tx.send(op) {
            tracing::warn!("writer gone, dropping {}", describe(&e.0));
        }
    }

    /// Wait until every operation queued before this call has been applied.
    ///
    /// Returns false if the queue stopped before reaching the barrier.
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.state() == WriterState::Stopped || self.tx.send(WriteOp::Barrier(done_tx)).is_err() {
            return false;
        }
        done_rx.await.is_ok()
    }

    pub fn state(&self) -> WriterState {
        WriterState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Stop draining. Operations still queued are dropped.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for the worker to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::warn!("writer task ended abnormally: {}", e);
        }
    }
}

impl Drop for WriterQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    store: ContentStore, mut rx: mpsc::UnboundedReceiver<WriteOp>, mut stop_rx: watch::Receiver<bool>,
    state: Arc<AtomicU8>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            op = rx.recv() => {
                let Some(op) = op else { break };
                state.store(WriterState::Draining as u8, Ordering::Release);
                let ack = apply(&store, op).await;
                if rx.is_empty() {
                    state.store(WriterState::Idle as u8, Ordering::Release);
                }
                if let Some(done) = ack {
                    let _ = done.send(());
                }
            }
        }
    }

    state.store(WriterState::Stopped as u8, Ordering::Release);
    rx.close();
    let dropped = rx.len();
    if dropped > 0 {
        tracing::info!("writer stopped with {} queued writes dropped", dropped);
    } else {
        tracing::debug!("writer stopped");
    }
}

/// Apply one operation. A barrier is handed back so it is acknowledged only
/// after the state has been updated.
async fn apply(store: &ContentStore, op: WriteOp) -> Option<oneshot::Sender<()>> {
    match op {
        WriteOp::Put(entry) => {
            if let Err(e) = store.put(&entry).await {
                tracing::warn!("dropping write for {}: {}", entry.path, e);
            }
        }
        WriteOp::Touch { path, updated } => match store.touch(&path, updated).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("touch for uncached path {}", path),
            Err(e) => tracing::warn!("dropping touch for {}: {}", path, e),
        },
        WriteOp::Barrier(done) => return Some(done),
    }
    None
}

fn describe(op: &WriteOp) -> String {
    match op {
        WriteOp::Put(entry) => format!("put {}", entry.path),
        WriteOp::Touch { path, .. } => format!("touch {path}"),
        WriteOp::Barrier(_) => "barrier".to_string(),
    }
}
