// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use futures::executor::block_on;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use konvertd::job_engine::{SubmitError, WorkerPool};
use konvertd::process_tools::ProcessExecutor;
use konvertd::retention::{RetentionSweeper, RetentionTarget};
use konvertd_tests::fixtures::{argv, backdate, init_logging};

const TEST_OK: &str = env!("CARGO_BIN_EXE_test-ok");
const TEST_FAIL: &str = env!("CARGO_BIN_EXE_test-fail");
const TEST_SLEEP: &str = env!("CARGO_BIN_EXE_test-sleep");
const TEST_CRASH: &str = env!("CARGO_BIN_EXE_test-crash");

fn pool(workers: usize) -> WorkerPool {
    WorkerPool::with_workers(workers, Arc::new(ProcessExecutor::new()), None).unwrap()
}

#[test]
fn test_real_processes_report_their_outcome() {
    init_logging();
    let pool = pool(2);
    let (tx, rx) = mpsc::channel();

    for (name, program) in [
        ("ok", TEST_OK),
        ("fail", TEST_FAIL),
        ("crash", TEST_CRASH),
        ("missing", "/nonexistent/konvertd-tool"),
    ] {
        let tx = tx.clone();
        pool.submit(argv(program, &[]), "", "", move |success| {
            tx.send((name, success)).unwrap();
        })
        .unwrap();
    }
    drop(tx);

    let mut outcomes: Vec<(&str, bool)> = rx.iter().collect();
    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![("crash", false), ("fail", false), ("missing", false), ("ok", true)]
    );
    // the counter moves after the callback, so wait for the workers first
    pool.shutdown();
    assert_eq!(pool.total_completed_count(), 1);
}

#[test]
fn test_workers_run_in_parallel() {
    init_logging();
    let pool = pool(4);
    let (tx, rx) = mpsc::channel();
    let started = Instant::now();

    for _ in 0..4 {
        let tx = tx.clone();
        pool.submit(argv(TEST_SLEEP, &["400"]), "", "", move |success| {
            tx.send(success).unwrap();
        })
        .unwrap();
    }
    drop(tx);

    assert!(rx.iter().all(|success| success));
    // four sequential sleeps would take at least 1.6s
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[test]
fn test_shutdown_drains_queued_processes() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(1);

    let outputs: Vec<_> = (0..5)
        .map(|i| dir.path().join(format!("out-{i}.wav")))
        .collect();
    for output in &outputs {
        let output_arg = output.to_string_lossy().into_owned();
        pool.submit(argv(TEST_OK, &[output_arg.as_str()]), "", output, |_| {})
            .unwrap();
    }
    pool.shutdown();

    assert!(outputs.iter().all(|o| o.is_file()));
    assert_eq!(pool.total_completed_count(), 5);
    assert_eq!(
        pool.submit(argv(TEST_OK, &[]), "", "", |_| {}),
        Err(SubmitError::ShutDown)
    );
}

#[test]
fn test_sweeper_prunes_finished_outputs() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(2);

    let stale = dir.path().join("stale.mp3");
    let fresh = dir.path().join("fresh.mp3");
    for output in [&stale, &fresh] {
        let output_arg = output.to_string_lossy().into_owned();
        let (id, outcome) = pool
            .submit_with_receiver(argv(TEST_OK, &[output_arg.as_str()]), "", output)
            .unwrap();
        assert_eq!(block_on(outcome), Ok(true), "{id}");
    }
    backdate(&stale, Duration::from_secs(2 * 3600)).unwrap();

    let sweeper = RetentionSweeper::new(
        Duration::from_secs(300),
        vec![RetentionTarget::new(dir.path(), Duration::from_secs(3600))],
    );
    let report = sweeper.sweep_once();

    assert_eq!(report.removed, 1);
    assert!(!stale.exists());
    assert!(fresh.exists());
}
