// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Background loop that deletes old uploads and downloads.
//!
//! The sweeper shares no locks with the worker pool. It could in principle
//! remove a file a converter is still writing, but only if that conversion
//! runs longer than the configured maximum age.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

/// A directory the sweeper may prune, and how old its files may get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTarget {
    pub dir: PathBuf,
    pub max_age: Duration,
}

impl RetentionTarget {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    interval: Duration,
    targets: Vec<RetentionTarget>,
}

impl RetentionSweeper {
    pub fn new(interval: Duration, targets: Vec<RetentionTarget>) -> Self {
        Self { interval, targets }
    }

    pub fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now())
    }

    /// One pass over all targets, as if the current time were `now`.
    pub fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        for target in &self.targets {
            let Some(cutoff) = now.checked_sub(target.max_age) else {
                continue;
            };
            sweep_dir(&target.dir, cutoff, &mut report);
        }
        report
    }

    /// Moves the sweeper onto its own thread. The first pass happens one interval from now.
    pub fn spawn(self) -> io::Result<SweeperHandle> {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_in_thread = stop.clone();
        let thread = thread::Builder::new()
            .name("konvertd-sweeper".to_string())
            .spawn(move || self.run(stop_in_thread))?;
        Ok(SweeperHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn run(self, stop: Arc<(Mutex<bool>, Condvar)>) {
        info!(
            "Retention sweeper started (interval {:?}, {} targets)",
            self.interval,
            self.targets.len()
        );
        let (lock, cvar) = &*stop;
        loop {
            let stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let (stopped, _) = cvar
                .wait_timeout_while(stopped, self.interval, |stopped| !*stopped)
                .unwrap_or_else(PoisonError::into_inner);
            if *stopped {
                break;
            }
            drop(stopped);

            info!("Running old file cleanup...");
            let report = self.sweep_once();
            if report.removed > 0 || report.failed > 0 {
                info!(
                    "cleanup removed {} files ({} failures)",
                    report.removed, report.failed
                );
            }
        }
        info!("Retention sweeper stopped");
    }
}

/// Non-recursive. Anything that goes wrong is logged and skipped.
fn sweep_dir(dir: &Path, cutoff: SystemTime, report: &mut SweepReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("skipping {}: does not exist", dir.display());
            return;
        }
        Err(e) => {
            warn!("cannot scan {}: {}", dir.display(), e);
            report.failed += 1;
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cannot read entry in {}: {}", dir.display(), e);
                report.failed += 1;
                continue;
            }
        };
        let path = entry.path();

        // fs::metadata follows symlinks, so a link to a regular file counts as one
        let modified = match fs::metadata(&path).and_then(|metadata| {
            if metadata.is_file() {
                metadata.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) => {
                warn!("cannot stat {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleting old file: {}", path.display());
                report.removed += 1;
            }
            // removed concurrently, which is what we wanted anyway
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Error deleting file {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }
}

/// Owns the sweeper thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct SweeperHandle {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Interrupts the current wait and joins the thread.
    pub fn shutdown(&mut self) {
        let (lock, cvar) = &*self.stop;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("retention sweeper thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
