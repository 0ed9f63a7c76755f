//! Store-owning worker thread.
//!
//! The SQLite connection lives on one dedicated thread; every store
//! operation is a closure shipped over a channel and executed there in
//! arrival order.  Callers block on the reply with a bounded wait.  This
//! keeps all store access serialized (the property the old
//! per-entity-executor design provided, now global) without a blocking
//! future per call site, and it means compound operations like
//! [`crate::store::Storage::toggle_like`] cannot interleave.
//!
//! There is no cancellation: a job that outlives the caller's wait still
//! runs to completion on the worker; the caller just stops waiting and gets
//! [`DataError::Timeout`].

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::store::{Storage, StoreError};

/// How long a caller waits for the worker to answer before giving up.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce(&mut Storage) + Send + 'static>;

enum Msg {
    Job(Job),
    Shutdown,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Uniform failure type at the data-access boundary.  Every layer above the
/// store reports errors through this one enum; there is no second,
/// exception-like channel.
#[derive(Debug)]
pub enum DataError {
    /// Input rejected before reaching the store.
    Invalid(String),
    /// The operation is not defined for this entity type.
    Unsupported(&'static str),
    /// The store itself failed (constraint, missing row, io).
    Store(StoreError),
    /// The bounded wait elapsed before the worker answered.
    Timeout,
    /// The worker has shut down.
    Closed,
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Invalid(msg) => write!(f, "invalid input: {msg}"),
            DataError::Unsupported(op) => write!(f, "unsupported operation: {op}"),
            DataError::Store(e) => write!(f, "store error: {e}"),
            DataError::Timeout => write!(f, "store operation timed out"),
            DataError::Closed => write!(f, "store worker is shut down"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<StoreError> for DataError {
    fn from(e: StoreError) -> Self {
        DataError::Store(e)
    }
}

impl DataError {
    /// True when the failure is a store-level constraint rejection
    /// (duplicate key, broken reference).
    pub fn is_conflict(&self) -> bool {
        matches!(self, DataError::Store(StoreError::Conflict(_)))
    }

    /// True when the failure is a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::Store(StoreError::NotFound(_)))
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Owns the worker thread.  [`shutdown`] (or drop) stops the thread after
/// the jobs already queued ahead of the stop marker have run.
///
/// [`shutdown`]: StoreWorker::shutdown
pub struct StoreWorker {
    tx: mpsc::Sender<Msg>,
    thread: Option<JoinHandle<()>>,
}

impl StoreWorker {
    /// Move `storage` onto a new worker thread and start draining jobs.
    pub fn spawn(mut storage: Storage) -> Self {
        let (tx, rx) = mpsc::channel::<Msg>();
        let thread = thread::Builder::new()
            .name("forkfeed-store".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        Msg::Job(job) => job(&mut storage),
                        Msg::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn store worker thread");
        Self {
            tx,
            thread: Some(thread),
        }
    }

    /// A cheap, cloneable handle for issuing store operations.
    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            tx: self.tx.clone(),
        }
    }

    /// Stop the worker and wait for it to exit.  Jobs queued before the
    /// stop marker still run; calls made afterwards fail with
    /// [`DataError::Closed`].
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(Msg::Shutdown);
            let _ = thread.join();
        }
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Client side of the worker channel.  Handlers hold one of these.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Msg>,
}

impl StoreHandle {
    /// Run `f` on the store worker and wait up to [`STORE_TIMEOUT`] for its
    /// result.
    pub fn call<T, F>(&self, f: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Storage) -> Result<T, StoreError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let job: Job = Box::new(move |storage| {
            let _ = reply_tx.send(f(storage));
        });
        self.tx.send(Msg::Job(job)).map_err(|_| DataError::Closed)?;
        match reply_rx.recv_timeout(STORE_TIMEOUT) {
            Ok(result) => result.map_err(DataError::from),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DataError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DataError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
