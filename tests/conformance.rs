/*!
 * Conformance Harness Tests
 *
 * The reference workload: 100 workers x 100 critical sections over a
 * 1000-cell array, plus the unguarded negative control.
 */

use mcs_queue_lock::core::sync::Unguarded;
use mcs_queue_lock::{ConformanceDriver, ConformanceReport, McsLock, QueueMutex, RawLock};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_reference_workload_is_atomic() {
    let driver = ConformanceDriver::default();
    let lock = McsLock::new();

    let report = driver.run_guarded(&lock).unwrap();

    assert!(report.atomic, "cells diverged at {:?}", report.first_mismatch);
    assert_eq!(report.workers, 100);
    assert_eq!(report.iterations, 100);
    assert_eq!(report.len, 1000);

    let stats = lock.stats();
    assert_eq!(stats.acquisitions, 10_000);
    assert!(!lock.is_locked());
    // Workers were joined, so their nodes are gone
    assert_eq!(lock.registered_threads(), 0);
}

#[test]
fn test_guarded_with_yield_inside_section() {
    let driver = ConformanceDriver {
        workers: 16,
        iterations: 50,
        len: 256,
        yield_midway: true,
    };

    for _ in 0..5 {
        let report = driver.run_guarded(&McsLock::new()).unwrap();
        assert!(report.atomic, "cells diverged at {:?}", report.first_mismatch);
    }
}

#[test]
fn test_unguarded_negative_control_detects_overlap() {
    let driver = ConformanceDriver {
        workers: 16,
        iterations: 50,
        len: 256,
        yield_midway: true,
    };

    let detected = (0..20).any(|_| !driver.run_unguarded().unwrap().atomic);
    assert!(detected, "unguarded runs never overlapped; the check is blind");
}

#[test]
fn test_driver_accepts_any_raw_lock() {
    struct Counting<'a> {
        inner: McsLock,
        releases: &'a AtomicUsize,
    }

    impl RawLock for Counting<'_> {
        fn acquire(&self) -> mcs_queue_lock::LockResult<()> {
            self.inner.acquire()
        }

        fn release(&self) -> mcs_queue_lock::LockResult<()> {
            self.releases.fetch_add(1, Ordering::Relaxed);
            self.inner.release()
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    let releases = AtomicUsize::new(0);
    let lock = Counting {
        inner: McsLock::new(),
        releases: &releases,
    };
    let driver = ConformanceDriver {
        workers: 4,
        iterations: 25,
        len: 32,
        yield_midway: false,
    };

    let report = driver.run_guarded(&lock).unwrap();
    assert!(report.atomic);
    assert_eq!(report.lock, "counting");
    assert_eq!(releases.load(Ordering::Relaxed), 100);
}

#[test]
fn test_report_serializes() {
    let driver = ConformanceDriver {
        workers: 2,
        iterations: 3,
        len: 8,
        yield_midway: false,
    };
    let report = driver.run_guarded(&Unguarded).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["lock"], "unguarded");
    assert_eq!(json["workers"], 2);

    let back: ConformanceReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn test_queue_mutex_protects_array_like_data() {
    let cells = QueueMutex::new(vec![1.0f64; 100]);
    let driver = ConformanceDriver {
        workers: 8,
        iterations: 100,
        len: 0,
        yield_midway: false,
    };

    driver
        .exercise(&Unguarded, |worker, _| {
            let v = if worker % 2 == 0 { 1.0 } else { -0.5 };
            let mut guard = cells.lock().unwrap();
            for x in guard.iter_mut() {
                *x += v * *x;
            }
        })
        .unwrap();

    let cells = cells.into_inner();
    assert!(cells.iter().all(|&x| x == cells[0]));
    // 400 doublings and 400 halvings
    assert_eq!(cells[0], 1.0);
}
