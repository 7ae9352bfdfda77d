// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tests for execution trackers shared between recording and polling threads.

use bp_metadata::BpExitStatus;
use bp_runner::{
    observer::ExecutionObserver,
    reporter::StatusReporterBuilder,
    tracker::ExecutionTracker,
};
use color_eyre::eyre::{Result, ensure};
use std::{
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

const RECORDERS: usize = 4;

#[test]
fn concurrent_records_are_never_lost() -> Result<()> {
    let tracker = ExecutionTracker::new();
    let barrier = Barrier::new(RECORDERS + 1);
    let flags: Vec<_> = BpExitStatus::all().iter().collect();

    thread::scope(|s| {
        for chunk in flags.chunks(flags.len().div_ceil(RECORDERS)) {
            let tracker = &tracker;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                tracker.record_tests_started();
                for flag in chunk {
                    assert!(tracker.record_failure(*flag));
                }
            });
        }
        barrier.wait();
    });

    ensure!(
        tracker.mark_complete() == BpExitStatus::all(),
        "every flag recorded by every thread is present: {:?}",
        tracker.exit_status()
    );
    Ok(())
}

#[test]
fn pollers_see_consistent_monotonic_state() -> Result<()> {
    let tracker = Arc::new(ExecutionTracker::new());
    let done = AtomicBool::new(false);

    let observed = thread::scope(|s| {
        let poller = s.spawn(|| {
            let mut previous = tracker.snapshot();
            let mut polls = 0usize;
            loop {
                // Read the later milestone first: if tests have started, the launch must already
                // be visible.
                let started = tracker.did_tests_start();
                let launched = tracker.is_application_launched();
                assert!(!started || launched, "tests started before launch");

                let snapshot = tracker.snapshot();
                assert!(snapshot.is_consistent(), "inconsistent snapshot: {snapshot:?}");
                assert!(
                    snapshot.exit_status.contains(previous.exit_status),
                    "flags were lost: {previous:?} -> {snapshot:?}"
                );
                assert!(snapshot.stage() >= previous.stage(), "stage went backwards");
                previous = snapshot;
                polls += 1;

                if done.load(Ordering::Acquire) && snapshot.execution_complete {
                    return (previous, polls);
                }
            }
        });

        tracker.record_application_launched();
        tracker.record_tests_started();
        for flag in [
            BpExitStatus::TESTS_FAILED,
            BpExitStatus::APP_CRASHED,
            BpExitStatus::TEST_TIMEOUT,
        ] {
            tracker.record_failure(flag);
            thread::yield_now();
        }
        tracker.mark_complete();
        done.store(true, Ordering::Release);

        poller.join().expect("poller thread panicked")
    });

    let (last, polls) = observed;
    ensure!(polls > 0, "poller ran at least once");
    ensure!(
        last.exit_status
            == BpExitStatus::TESTS_FAILED | BpExitStatus::APP_CRASHED | BpExitStatus::TEST_TIMEOUT,
        "final status seen by the poller: {:?}",
        last.exit_status
    );
    Ok(())
}

#[test]
fn shared_observer_reports_final_status() -> Result<()> {
    let tracker = Arc::new(ExecutionTracker::new());
    let observer: Arc<dyn ExecutionObserver + Send + Sync> = tracker.clone();

    let handle = {
        let tracker = Arc::clone(&tracker);
        thread::spawn(move || {
            tracker.record_tests_started();
            tracker.record_failure(BpExitStatus::SIMULATOR_CRASHED);
            tracker.interrupt()
        })
    };
    let final_status = handle.join().expect("recorder thread panicked");

    ensure!(observer.is_execution_complete(), "attempt is complete");
    ensure!(
        observer.exit_status() == final_status,
        "observer and tracker agree"
    );
    ensure!(
        final_status.has(BpExitStatus::SIMULATOR_CRASHED)
            && final_status.has(BpExitStatus::INTERRUPTED),
        "both conditions recorded: {final_status:?}"
    );

    let mut out = Vec::new();
    let code = StatusReporterBuilder::default()
        .build()
        .report(&observer, &mut out)?;
    ensure!(code == 24, "exit code is the combined bitmask, got {code}");
    ensure!(
        String::from_utf8(out)? == "        FAIL interrupted, simulator crashed (exit status 24)\n",
        "unexpected report"
    );
    Ok(())
}
