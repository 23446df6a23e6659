// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Invoked exactly once, on a worker thread, with the outcome of the job.
pub type CompletionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One queued request to run an external process.
///
/// The paths are bookkeeping for the submitter; the pool never touches them.
pub struct Job {
    id: JobId,
    args: Vec<String>,
    input_path: PathBuf,
    output_path: PathBuf,
    on_complete: CompletionCallback,
}

impl Job {
    pub fn new(
        args: Vec<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        on_complete: CompletionCallback,
    ) -> Self {
        Self {
            id: JobId::next(),
            args,
            input_path: input_path.into(),
            output_path: output_path.into(),
            on_complete,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Free-form description, used for logging
    pub fn desc(&self) -> String {
        self.args.join(" ")
    }

    /// Consumes the job, so the callback cannot fire twice.
    pub(crate) fn complete(self, success: bool) {
        (self.on_complete)(success)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("job queue is full")]
    QueueFull,
}
