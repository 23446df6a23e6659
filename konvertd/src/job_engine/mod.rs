// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Bounded Worker Pool for External Converters
//!
//! ## Overview
//! Requests must never wait for a converter. They hand a job to the pool and get
//! the outcome back through a callback that runs on a worker thread.
//!
//! - One FIFO queue, shared by all workers. Jobs start in submission order.
//! - A fixed number of worker threads (CPU count, at least two).
//! - A worker blocks while its converter runs. Without a queue capacity this is
//!   the only backpressure.
//! - Shutdown closes the queue; workers drain what is left, then exit.
//! - Failures never leave a worker. Everything collapses into `false`.
//!
//! ```text
//!            submit()        submit()        submit()
//!               |               |               |
//!         +-----v---------------v---------------v-----+
//!         |             FIFO job queue               |
//!         +-----+---------------+---------------+-----+
//!               |               |               |
//!         +-----v----+    +-----v----+    +-----v----+
//!         | worker 0 |    | worker 1 |    | worker N |
//!         |  run()   |    |  run()   |    |  run()   |
//!         +-----+----+    +-----+----+    +-----+----+
//!               |               |               |
//!          callback(ok)    callback(ok)    callback(ok)
//! ```

pub mod job;
pub mod worker_pool;

pub use job::{CompletionCallback, Job, JobId, SubmitError};
pub use worker_pool::{default_worker_count, WorkerPool};

#[cfg(test)]
mod tests;
