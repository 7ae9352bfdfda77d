// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only views over the progress of an execution attempt.
//!
//! An execution attempt can stall or fail at several overlapping stages: the application may
//! launch without any tests starting, or tests may start and never finish. The progress
//! milestones are therefore reported as independent booleans rather than as a single state, so
//! that callers can tell these cases apart.

use bp_metadata::BpExitStatus;
use std::{fmt, sync::Arc};

/// Reports the progress and accumulated status of a single execution attempt.
///
/// Every milestone is monotonic: once an accessor returns true for an attempt, it keeps returning
/// true. Accessors may be polled at any time and from any thread while the attempt is running.
pub trait ExecutionObserver {
    /// Returns true once the attempt has reached a terminal state, successful or not.
    fn is_execution_complete(&self) -> bool;

    /// Returns true once the application under test has been observed starting.
    ///
    /// This stays true even if the application later crashes.
    fn is_application_launched(&self) -> bool;

    /// Returns true once at least one test case has begun executing.
    fn did_tests_start(&self) -> bool;

    /// Returns the union of every failure flag recorded so far.
    ///
    /// Before [`is_execution_complete`](Self::is_execution_complete) returns true this is a
    /// partial snapshot. Flags are never cleared, so a later call returns a superset of an earlier
    /// one.
    fn exit_status(&self) -> BpExitStatus;

    /// Returns all progress milestones and the exit status at once.
    ///
    /// The default implementation reads completion first and launch last. Since milestones only
    /// ever go from false to true, this ordering never shows tests as started without the
    /// application having launched, and never shows the attempt as complete with a partial
    /// status. Implementations that can read their whole state atomically should override this.
    fn snapshot(&self) -> ExecutionSnapshot {
        let execution_complete = self.is_execution_complete();
        let exit_status = self.exit_status();
        let tests_started = self.did_tests_start();
        let application_launched = self.is_application_launched();
        ExecutionSnapshot {
            execution_complete,
            application_launched,
            tests_started,
            exit_status,
        }
    }
}

impl<T: ExecutionObserver + ?Sized> ExecutionObserver for &T {
    fn is_execution_complete(&self) -> bool {
        (**self).is_execution_complete()
    }

    fn is_application_launched(&self) -> bool {
        (**self).is_application_launched()
    }

    fn did_tests_start(&self) -> bool {
        (**self).did_tests_start()
    }

    fn exit_status(&self) -> BpExitStatus {
        (**self).exit_status()
    }

    fn snapshot(&self) -> ExecutionSnapshot {
        (**self).snapshot()
    }
}

impl<T: ExecutionObserver + ?Sized> ExecutionObserver for Arc<T> {
    fn is_execution_complete(&self) -> bool {
        (**self).is_execution_complete()
    }

    fn is_application_launched(&self) -> bool {
        (**self).is_application_launched()
    }

    fn did_tests_start(&self) -> bool {
        (**self).did_tests_start()
    }

    fn exit_status(&self) -> BpExitStatus {
        (**self).exit_status()
    }

    fn snapshot(&self) -> ExecutionSnapshot {
        (**self).snapshot()
    }
}

/// A point-in-time view of an execution attempt.
///
/// Returned by [`ExecutionObserver::snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionSnapshot {
    /// Whether the attempt has reached a terminal state.
    pub execution_complete: bool,

    /// Whether the application under test has launched.
    pub application_launched: bool,

    /// Whether at least one test has started.
    pub tests_started: bool,

    /// The failure flags recorded so far.
    pub exit_status: BpExitStatus,
}

impl ExecutionSnapshot {
    /// Returns the furthest stage the attempt has reached.
    pub fn stage(&self) -> ExecutionStage {
        if self.execution_complete {
            ExecutionStage::Complete
        } else if self.tests_started {
            ExecutionStage::TestsRunning
        } else if self.application_launched {
            ExecutionStage::Launched
        } else {
            ExecutionStage::Pending
        }
    }

    /// Returns true if the milestones respect launch-before-start ordering.
    ///
    /// Snapshots produced by [`ExecutionTracker`](crate::tracker::ExecutionTracker) always do.
    pub fn is_consistent(&self) -> bool {
        !self.tests_started || self.application_launched
    }
}

/// The furthest stage an execution attempt has reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionStage {
    /// The application has not launched yet.
    Pending,

    /// The application launched, but no tests have started.
    Launched,

    /// Tests are running.
    TestsRunning,

    /// The attempt reached a terminal state.
    Complete,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "waiting for launch"),
            Self::Launched => write!(f, "launched, tests not started"),
            Self::TestsRunning => write!(f, "tests running"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use test_case::test_case;

    /// An observer whose state is set directly, for exercising the provided methods.
    #[derive(Default)]
    struct FixedObserver {
        complete: Cell<bool>,
        launched: Cell<bool>,
        started: Cell<bool>,
        status: Cell<BpExitStatus>,
    }

    impl ExecutionObserver for FixedObserver {
        fn is_execution_complete(&self) -> bool {
            self.complete.get()
        }

        fn is_application_launched(&self) -> bool {
            self.launched.get()
        }

        fn did_tests_start(&self) -> bool {
            self.started.get()
        }

        fn exit_status(&self) -> BpExitStatus {
            self.status.get()
        }
    }

    #[test]
    fn default_snapshot_reads_every_accessor() {
        let observer = FixedObserver::default();
        observer.launched.set(true);
        observer.status.set(BpExitStatus::APP_CRASHED);

        let snapshot = observer.snapshot();
        assert_eq!(
            snapshot,
            ExecutionSnapshot {
                execution_complete: false,
                application_launched: true,
                tests_started: false,
                exit_status: BpExitStatus::APP_CRASHED,
            }
        );

        // Forwarding impls go through the same path.
        let by_ref: &dyn ExecutionObserver = &observer;
        assert_eq!(by_ref.snapshot(), snapshot);
        assert_eq!((&by_ref).snapshot(), snapshot);
    }

    #[test_case(false, false, false, ExecutionStage::Pending)]
    #[test_case(false, true, false, ExecutionStage::Launched)]
    #[test_case(false, true, true, ExecutionStage::TestsRunning)]
    #[test_case(true, false, false, ExecutionStage::Complete)]
    #[test_case(true, true, true, ExecutionStage::Complete)]
    fn stage(complete: bool, launched: bool, started: bool, expected: ExecutionStage) {
        let snapshot = ExecutionSnapshot {
            execution_complete: complete,
            application_launched: launched,
            tests_started: started,
            exit_status: BpExitStatus::ALL_PASSED,
        };
        assert_eq!(snapshot.stage(), expected);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn started_without_launch_is_inconsistent() {
        let snapshot = ExecutionSnapshot {
            execution_complete: false,
            application_launched: false,
            tests_started: true,
            exit_status: BpExitStatus::ALL_PASSED,
        };
        assert!(!snapshot.is_consistent());
    }
}
