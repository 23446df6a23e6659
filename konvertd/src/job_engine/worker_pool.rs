// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender, TrySendError};
use futures::channel::oneshot;
use log::{debug, error, info, warn};
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::job_engine::job::{Job, JobId, SubmitError};
use crate::process_tools::Executor;

/// One worker per available CPU, but never fewer than two.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(2)
        .max(2)
}

/// Fixed set of worker threads draining one FIFO queue.
///
/// Every worker blocks for the full duration of the external process it runs,
/// so at most `worker_count` converters execute at the same time.
#[derive(Debug)]
pub struct WorkerPool {
    tx: Sender<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    completed: Arc<AtomicU64>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(executor: Arc<dyn Executor>, queue_capacity: Option<usize>) -> io::Result<Self> {
        Self::with_workers(default_worker_count(), executor, queue_capacity)
    }

    /// `queue_capacity` of `None` keeps the queue unbounded.
    pub fn with_workers(
        worker_count: usize,
        executor: Arc<dyn Executor>,
        queue_capacity: Option<usize>,
    ) -> io::Result<Self> {
        let worker_count = worker_count.max(1);
        let (tx, rx) = match queue_capacity {
            Some(capacity) => async_channel::bounded(capacity.max(1)),
            None => async_channel::unbounded(),
        };
        let completed = Arc::new(AtomicU64::new(0));

        info!(
            "Starting worker pool with {} worker threads (queue capacity: {})",
            worker_count,
            queue_capacity.map_or("unbounded".to_string(), |c| c.to_string())
        );

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let rx = rx.clone();
            let executor = executor.clone();
            let completed = completed.clone();
            let handle = thread::Builder::new()
                .name(format!("konvertd-worker-{index}"))
                .spawn(move || worker_loop(index, rx, executor, completed));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // let already running workers see a closed queue and exit
                    tx.close();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            tx,
            workers: Mutex::new(workers),
            completed,
            worker_count,
        })
    }

    /// Enqueue a job and return immediately.
    ///
    /// A rejected job is dropped without running its callback.
    pub fn submit(
        &self,
        args: Vec<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) -> Result<JobId, SubmitError> {
        let job = Job::new(args, input_path, output_path, Box::new(on_complete));
        let id = job.id();
        match self.tx.try_send(job) {
            Ok(()) => {
                debug!("queued {} ({} waiting)", id, self.tx.len());
                Ok(id)
            }
            Err(TrySendError::Full(job)) => {
                warn!("rejecting {}: queue is full", job.id());
                Err(SubmitError::QueueFull)
            }
            Err(TrySendError::Closed(job)) => {
                warn!("rejecting {}: pool is shut down", job.id());
                Err(SubmitError::ShutDown)
            }
        }
    }

    /// Like [`WorkerPool::submit`], but hands the outcome to a future instead of a callback.
    pub fn submit_with_receiver(
        &self,
        args: Vec<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Result<(JobId, oneshot::Receiver<bool>), SubmitError> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let id = self.submit(args, input_path, output_path, move |success| {
            // the receiver may be gone if the requester hung up
            let _ = outcome_tx.send(success);
        })?;
        Ok((id, outcome_rx))
    }

    /// Number of jobs that finished with success since the pool started.
    pub fn total_completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queued_jobs(&self) -> usize {
        self.tx.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop accepting jobs, finish everything already queued, then join the workers.
    pub fn shutdown(&self) {
        if self.tx.close() {
            info!(
                "Worker pool shutting down, draining {} queued jobs",
                self.tx.len()
            );
        }

        // the lock is held while joining so that concurrent callers also wait
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let current = thread::current().id();
        for handle in workers.drain(..) {
            if handle.thread().id() == current {
                warn!("worker pool dropped from one of its own workers, not joining it");
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread terminated with a panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    index: usize,
    rx: Receiver<Job>,
    executor: Arc<dyn Executor>,
    completed: Arc<AtomicU64>,
) {
    debug!("worker {index} started");
    // recv_blocking keeps returning queued jobs after close, so the queue drains
    while let Ok(job) = rx.recv_blocking() {
        let id = job.id();
        info!("Worker {} processing {}: {}", index, id, job.desc());
        debug!(
            "{id}: {} -> {}",
            job.input_path().display(),
            job.output_path().display()
        );

        let success = match panic::catch_unwind(AssertUnwindSafe(|| executor.run(job.args()))) {
            Ok(success) => success,
            Err(_) => {
                error!("executor panicked while running {id}");
                false
            }
        };
        info!("{} finished (success: {})", id, success);

        if panic::catch_unwind(AssertUnwindSafe(|| job.complete(success))).is_err() {
            error!("completion callback of {id} panicked");
        }
        if success {
            completed.fetch_add(1, Ordering::Relaxed);
        }
    }
    debug!("worker {index} exiting, queue closed and drained");
}
