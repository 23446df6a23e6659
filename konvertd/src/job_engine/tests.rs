use crate::job_engine::{SubmitError, WorkerPool};
use crate::process_tools::Executor;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Interprets argv as `[name, millis, ok|fail|panic]` and records start/end events.
#[derive(Default)]
struct ScriptedExecutor {
    events: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, args: &[String]) -> bool {
        let name = args[0].clone();
        self.events.lock().unwrap().push(format!("start {name}"));
        let millis: u64 = args.get(1).and_then(|m| m.parse().ok()).unwrap_or(0);
        thread::sleep(Duration::from_millis(millis));
        self.events.lock().unwrap().push(format!("end {name}"));
        match args.get(2).map(String::as_str) {
            Some("fail") => false,
            Some("panic") => panic!("intentional test panic"),
            _ => true,
        }
    }
}

/// Blocks every job until the test opens the gate.
struct GatedExecutor {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl Executor for GatedExecutor {
    fn run(&self, _args: &[String]) -> bool {
        let _ = self.gate.lock().unwrap().recv();
        true
    }
}

fn job(name: &str, millis: u64, result: &str) -> Vec<String> {
    vec![name.to_string(), millis.to_string(), result.to_string()]
}

fn shared_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

//
// 1. Drain: every job queued before shutdown completes exactly once
//
#[test]
fn test_shutdown_drains_queue() {
    for workers in 1..=4 {
        for k in [0usize, 1, 7, 50] {
            let executor = Arc::new(ScriptedExecutor::default());
            let pool = WorkerPool::with_workers(workers, executor, None).unwrap();
            let fired = shared_counter();

            for i in 0..k {
                let fired = fired.clone();
                pool.submit(job(&format!("j{i}"), 1, "ok"), "", "", move |_| {
                    fired.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
            pool.shutdown();

            assert_eq!(fired.load(Ordering::SeqCst), k, "workers={workers} k={k}");
            assert_eq!(pool.total_completed_count(), k as u64);
        }
    }
}

//
// 2. Ordering: a single worker runs jobs strictly one after another
//
#[test]
fn test_fifo_with_single_worker() {
    let executor = Arc::new(ScriptedExecutor::default());
    let pool = WorkerPool::with_workers(1, executor.clone(), None).unwrap();
    let completions = Arc::new(Mutex::new(Vec::new()));

    for (name, millis) in [("A", 150), ("B", 1), ("C", 1)] {
        let completions = completions.clone();
        pool.submit(job(name, millis, "ok"), "", "", move |_| {
            completions.lock().unwrap().push(name);
        })
        .unwrap();
    }
    pool.shutdown();

    assert_eq!(
        executor.events(),
        vec!["start A", "end A", "start B", "end B", "start C", "end C"]
    );
    assert_eq!(*completions.lock().unwrap(), vec!["A", "B", "C"]);
}

//
// 3. Failure propagation
//
#[test]
fn test_failed_job_reports_false_and_is_not_counted() {
    let executor = Arc::new(ScriptedExecutor::default());
    let pool = WorkerPool::with_workers(2, executor, None).unwrap();
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    for (name, result) in [("ok-1", "ok"), ("bad", "fail"), ("ok-2", "ok")] {
        let outcomes = outcomes.clone();
        pool.submit(job(name, 0, result), "", "", move |success| {
            outcomes.lock().unwrap().push((name, success));
        })
        .unwrap();
    }
    pool.shutdown();

    let mut outcomes = outcomes.lock().unwrap().clone();
    outcomes.sort();
    assert_eq!(outcomes, vec![("bad", false), ("ok-1", true), ("ok-2", true)]);
    assert_eq!(pool.total_completed_count(), 2);
}

#[test]
fn test_panics_do_not_disable_the_worker() {
    let executor = Arc::new(ScriptedExecutor::default());
    let pool = WorkerPool::with_workers(1, executor, None).unwrap();
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    let o = outcomes.clone();
    pool.submit(job("exec-panic", 0, "panic"), "", "", move |success| {
        o.lock().unwrap().push(success);
    })
    .unwrap();

    pool.submit(job("callback-panic", 0, "ok"), "", "", |_| {
        panic!("intentional callback panic");
    })
    .unwrap();

    let o = outcomes.clone();
    pool.submit(job("after", 0, "ok"), "", "", move |success| {
        o.lock().unwrap().push(success);
    })
    .unwrap();
    pool.shutdown();

    assert_eq!(*outcomes.lock().unwrap(), vec![false, true]);
}

//
// 4. Submission after shutdown
//
#[test]
fn test_no_jobs_after_shutdown() {
    let pool = WorkerPool::with_workers(2, Arc::new(ScriptedExecutor::default()), None).unwrap();
    pool.shutdown();
    assert!(pool.is_shut_down());

    let fired = shared_counter();
    let f = fired.clone();
    let result = pool.submit(job("late", 0, "ok"), "", "", move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(result, Err(SubmitError::ShutDown));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    // a second shutdown is harmless
    pool.shutdown();
}

//
// 5. Bounded queue rejects instead of growing
//
#[test]
fn test_bounded_queue_rejects_when_full() {
    let (open_gate, gate) = mpsc::channel();
    let executor = Arc::new(GatedExecutor {
        gate: Mutex::new(gate),
    });
    let pool = WorkerPool::with_workers(1, executor, Some(1)).unwrap();
    let fired = shared_counter();

    let submit = |name: &str| {
        let fired = fired.clone();
        pool.submit(job(name, 0, "ok"), "", "", move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    };

    // the first job is picked up by the worker and blocks on the gate
    submit("running").unwrap();
    while pool.queued_jobs() > 0 {
        thread::sleep(Duration::from_millis(5));
    }
    submit("queued").unwrap();
    assert_eq!(submit("rejected"), Err(SubmitError::QueueFull));

    open_gate.send(()).unwrap();
    open_gate.send(()).unwrap();
    pool.shutdown();

    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

//
// 6. Future-based completion
//
#[test]
fn test_submit_with_receiver() {
    let pool = WorkerPool::with_workers(2, Arc::new(ScriptedExecutor::default()), None).unwrap();

    let (_, ok) = pool.submit_with_receiver(job("ok", 0, "ok"), "", "").unwrap();
    let (_, bad) = pool
        .submit_with_receiver(job("bad", 0, "fail"), "", "")
        .unwrap();

    assert_eq!(futures::executor::block_on(ok), Ok(true));
    assert_eq!(futures::executor::block_on(bad), Ok(false));
}

//
// 7. Stress: many short jobs from many threads
//
#[test]
fn test_concurrent_submitters() {
    let pool = Arc::new(
        WorkerPool::with_workers(4, Arc::new(ScriptedExecutor::default()), None).unwrap(),
    );
    let fired = shared_counter();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let pool = pool.clone();
            let fired = fired.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let fired = fired.clone();
                    pool.submit(job(&format!("{t}-{i}"), 0, "ok"), "", "", move |_| {
                        fired.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    pool.shutdown();

    assert_eq!(fired.load(Ordering::SeqCst), 200);
    assert_eq!(pool.total_completed_count(), 200);
}

#[test]
fn test_job_ids_are_unique() {
    let pool = WorkerPool::with_workers(1, Arc::new(ScriptedExecutor::default()), None).unwrap();
    let a = pool.submit(job("a", 0, "ok"), "in", "out", |_| {}).unwrap();
    let b = pool.submit(job("b", 0, "ok"), "in", "out", |_| {}).unwrap();
    assert_ne!(a, b);
    assert!(b.as_u64() > a.as_u64());
}

#[test]
fn test_default_worker_count_has_floor_of_two() {
    assert!(crate::job_engine::default_worker_count() >= 2);
}

#[test]
fn test_job_keeps_its_paths() {
    let job = crate::job_engine::Job::new(
        job("a", 0, "ok"),
        "uploads/x_in.mov",
        "uploads/x.mp3",
        Box::new(|_| {}),
    );
    assert_eq!(job.input_path(), std::path::Path::new("uploads/x_in.mov"));
    assert_eq!(job.output_path(), std::path::Path::new("uploads/x.mp3"));
    assert_eq!(job.desc(), "a 0 ok");
}
