// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracking for a single execution attempt.
//!
//! [`ExecutionTracker`] is the component that owns the state an [`ExecutionObserver`] reports.
//! Simulator management and process supervision call into it as they observe the attempt; the
//! reporter and retry logic read it through the observer interface.

use crate::observer::{ExecutionObserver, ExecutionSnapshot};
use bitflags::bitflags;
use bp_metadata::BpExitStatus;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Progress: u32 {
        const APPLICATION_LAUNCHED = 1 << 0;
        const TESTS_STARTED = 1 << 1;
        const EXECUTION_COMPLETE = 1 << 2;
    }
}

// The exit status lives in the low half of the state word and progress in the high half.
const PROGRESS_SHIFT: u32 = 32;

fn encode(progress: Progress, status: BpExitStatus) -> u64 {
    (u64::from(progress.bits()) << PROGRESS_SHIFT) | u64::from(status.bits())
}

fn decode(word: u64) -> (Progress, BpExitStatus) {
    (
        Progress::from_bits_truncate((word >> PROGRESS_SHIFT) as u32),
        BpExitStatus::from_bits_truncate(word as u32),
    )
}

/// The result of applying an update to the tracker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    /// The state changed.
    Changed,
    /// Everything in the update had already been recorded.
    Unchanged,
    /// The attempt was already complete, so the update was dropped.
    Rejected,
}

/// Tracks the progress and failures of one execution attempt.
///
/// All state lives in a single atomic word. Every update is one read-modify-write and every read
/// is one load, so observers polling from other threads never see a torn state, and recorded
/// flags are never lost or cleared.
///
/// Once [`mark_complete`](Self::mark_complete) has been called the attempt is in a terminal state:
/// further records are dropped and the exit status is final.
#[derive(Debug)]
pub struct ExecutionTracker {
    state: AtomicU64,
    start: Instant,
    timeout: Option<Duration>,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTracker {
    /// Creates a tracker with no time budget.
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(encode(Progress::empty(), BpExitStatus::ALL_PASSED)),
            start: Instant::now(),
            timeout: None,
        }
    }

    /// Creates a tracker that considers the attempt timed out after `timeout`.
    ///
    /// The timeout is only recorded when [`check_timeout`](Self::check_timeout) is called.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new()
        }
    }

    /// Returns the time budget for this attempt, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the time elapsed since this tracker was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records that the application under test has launched.
    ///
    /// Returns true if this is the first time the launch was recorded.
    pub fn record_application_launched(&self) -> bool {
        let transition = self.apply(Progress::APPLICATION_LAUNCHED, BpExitStatus::ALL_PASSED);
        if transition == Transition::Changed {
            debug!("application launched");
        }
        transition == Transition::Changed
    }

    /// Records that the first test case has started.
    ///
    /// Tests can only start inside a running application, so this also records the launch.
    /// Returns true if this is the first time the start was recorded.
    pub fn record_tests_started(&self) -> bool {
        let transition = self.apply(
            Progress::APPLICATION_LAUNCHED | Progress::TESTS_STARTED,
            BpExitStatus::ALL_PASSED,
        );
        if transition == Transition::Changed {
            debug!("tests started");
        }
        transition == Transition::Changed
    }

    /// Records one or more failure flags.
    ///
    /// Bits outside the vocabulary are dropped with a warning. Returns false if nothing could be
    /// recorded: either the attempt was already complete, or `failure` only had unknown bits.
    pub fn record_failure(&self, failure: BpExitStatus) -> bool {
        let known = failure.known_flags();
        if failure.has_unknown_bits() {
            warn!(
                "ignoring unknown status bits {:#x} in recorded failure",
                failure.bits() & !known.bits()
            );
            if known.is_all_passed() {
                return false;
            }
        }
        if known.is_all_passed() {
            // Nothing to record.
            return !self.is_execution_complete();
        }

        match self.apply(Progress::empty(), known) {
            Transition::Changed => {
                debug!(failure = %known, "recorded failure");
                true
            }
            Transition::Unchanged => true,
            Transition::Rejected => {
                warn!("ignoring failure ({known}) recorded after execution completed");
                false
            }
        }
    }

    /// Records that the run was interrupted, and completes the attempt.
    ///
    /// Returns the final exit status.
    pub fn interrupt(&self) -> BpExitStatus {
        if self.apply(Progress::EXECUTION_COMPLETE, BpExitStatus::INTERRUPTED)
            == Transition::Changed
        {
            debug!("execution interrupted");
        }
        self.exit_status()
    }

    /// Moves the attempt to its terminal state and returns the final exit status.
    ///
    /// Calling this more than once is harmless and returns the same status.
    pub fn mark_complete(&self) -> BpExitStatus {
        if self.apply(Progress::EXECUTION_COMPLETE, BpExitStatus::ALL_PASSED)
            == Transition::Changed
        {
            debug!(exit_status = %self.exit_status(), "execution complete");
        }
        self.exit_status()
    }

    /// Records [`TEST_TIMEOUT`](BpExitStatus::TEST_TIMEOUT) if the time budget has been exceeded
    /// and the attempt is still running.
    ///
    /// Returns true if the attempt is marked as timed out, whether by this call or earlier.
    pub fn check_timeout(&self) -> bool {
        self.check_timeout_at(self.elapsed())
    }

    /// Like [`check_timeout`](Self::check_timeout), but with a caller-provided elapsed time.
    pub fn check_timeout_at(&self, elapsed: Duration) -> bool {
        if let Some(timeout) = self.timeout
            && elapsed >= timeout
            && !self.is_execution_complete()
        {
            self.record_failure(BpExitStatus::TEST_TIMEOUT);
        }
        self.exit_status().has(BpExitStatus::TEST_TIMEOUT)
    }

    fn load(&self) -> (Progress, BpExitStatus) {
        decode(self.state.load(Ordering::Acquire))
    }

    fn apply(&self, progress: Progress, status: BpExitStatus) -> Transition {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (current_progress, current_status) = decode(word);
                if current_progress.contains(Progress::EXECUTION_COMPLETE) {
                    return None;
                }
                let next = encode(
                    current_progress | progress,
                    current_status.combine(status),
                );
                (next != word).then_some(next)
            });

        match result {
            Ok(_) => Transition::Changed,
            Err(word) => {
                let (current_progress, _) = decode(word);
                if current_progress.contains(Progress::EXECUTION_COMPLETE) {
                    Transition::Rejected
                } else {
                    Transition::Unchanged
                }
            }
        }
    }
}

impl ExecutionObserver for ExecutionTracker {
    fn is_execution_complete(&self) -> bool {
        self.load().0.contains(Progress::EXECUTION_COMPLETE)
    }

    fn is_application_launched(&self) -> bool {
        self.load().0.contains(Progress::APPLICATION_LAUNCHED)
    }

    fn did_tests_start(&self) -> bool {
        self.load().0.contains(Progress::TESTS_STARTED)
    }

    fn exit_status(&self) -> BpExitStatus {
        self.load().1
    }

    fn snapshot(&self) -> ExecutionSnapshot {
        let (progress, exit_status) = self.load();
        ExecutionSnapshot {
            execution_complete: progress.contains(Progress::EXECUTION_COMPLETE),
            application_launched: progress.contains(Progress::APPLICATION_LAUNCHED),
            tests_started: progress.contains(Progress::TESTS_STARTED),
            exit_status,
        }
    }
}
