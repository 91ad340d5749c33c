//! Bounded task queue: caps how many files are in flight at once.
//!
//! Submitted tasks go onto an unbounded channel (the FIFO backlog). One
//! dispatcher task drains it in order, waits for a semaphore permit, and
//! spawns the task holding that permit. The permit is released when the task
//! finishes or panics, which lets the dispatcher admit the next one. Results
//! are not collected here; each task writes its own outcome.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

pub const MIN_POOL_SIZE: usize = 2;
pub const MAX_POOL_SIZE: usize = 8;
pub const DEFAULT_POOL_SIZE: usize = 4;

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Pool size for a parallelism hint: clamped to 2..=8, 4 when unknown.
pub fn pool_size_for(hint: Option<usize>) -> usize {
    hint.unwrap_or(DEFAULT_POOL_SIZE)
        .clamp(MIN_POOL_SIZE, MAX_POOL_SIZE)
}

/// Cheap to clone; clones feed the same backlog and share the same permits.
///
/// The dispatcher stops once every clone has been dropped and the backlog is
/// empty.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    pool_size: usize,
}

impl TaskQueue {
    /// Must be called from within a Tokio runtime.
    pub fn new(pool_size_hint: Option<usize>) -> Self {
        let pool_size = pool_size_for(pool_size_hint);
        let semaphore = Arc::new(Semaphore::new(pool_size));
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch(
            rx,
            Arc::clone(&semaphore),
            Arc::clone(&pending),
            pool_size,
        ));

        Self {
            tx,
            semaphore,
            pending,
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Tasks currently holding a permit.
    pub fn active(&self) -> usize {
        self.pool_size
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Tasks waiting for a free slot.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Append a task to the backlog. It runs once every earlier task has been
    /// admitted and a slot is free.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Box::pin(task)).is_err() {
            // Only possible if the runtime hosting the dispatcher shut down
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("task queue dispatcher is gone; task dropped");
        }
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<Task>,
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    pool_size: usize,
) {
    while let Some(task) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let waiting = pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(
            active = pool_size.saturating_sub(semaphore.available_permits()),
            pending = waiting,
            "task admitted"
        );

        tokio::spawn(async move {
            let _permit = permit; // released when the task completes
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                warn!("queued task panicked");
            }
        });
    }
    debug!("task queue closed");
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pool_size", &self.pool_size)
            .field("active", &self.active())
            .field("pending", &self.pending())
            .finish()
    }
}
