// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::InvalidExitStatus;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The outcome of a single execution attempt, as a set of failure flags.
///
/// Flags are independent: an attempt may record several of them (for example,
/// [`APP_CRASHED`](Self::APP_CRASHED) together with [`TEST_TIMEOUT`](Self::TEST_TIMEOUT) if a crash
/// is detected just as the deadline expires). The empty set is
/// [`ALL_PASSED`](Self::ALL_PASSED).
///
/// Bit assignments are part of the public interface and are never renumbered: in
/// [`ExitCodeMode::Bitmask`] mode the low 8 bits of a status are also the process exit code.
///
/// Values can only be built from the known vocabulary. Conversions from integers and strings
/// ([`from_code`](Self::from_code), [`FromStr`], `TryFrom`, and deserialization) reject unknown
/// bits and names with an [`InvalidExitStatus`] error.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BpExitStatus(u32);

bitflags! {
    impl BpExitStatus: u32 {
        /// At least one test assertion failed.
        const TESTS_FAILED = 1 << 0;

        /// The simulator could not be created.
        const SIMULATOR_CREATION_FAILED = 1 << 1;

        /// The application under test could not be installed.
        const INSTALL_APP_FAILED = 1 << 2;

        /// The run was cancelled from outside, for example by a signal.
        const INTERRUPTED = 1 << 3;

        /// The simulator crashed while tests were running.
        const SIMULATOR_CRASHED = 1 << 4;

        /// The application process failed to start.
        const LAUNCH_APP_FAILED = 1 << 5;

        /// The run exceeded its time budget.
        const TEST_TIMEOUT = 1 << 6;

        /// The application process crashed during execution.
        const APP_CRASHED = 1 << 7;

        /// The simulator was torn down unexpectedly.
        const SIMULATOR_DELETED = 1 << 8;

        /// Uninstalling the application during cleanup failed.
        const UNINSTALL_APP_FAILED = 1 << 9;

        /// A pooled simulator could not be reused.
        const SIMULATOR_REUSE_FAILED = 1 << 10;
    }
}

const ALL_PASSED_NAME: &str = "all-passed";
const ALL_PASSED_DESCRIPTION: &str = "all tests passed";

impl BpExitStatus {
    /// No failures were recorded and the run succeeded.
    pub const ALL_PASSED: Self = Self::empty();

    /// Every flag along with its name and description, in bit order.
    const FLAG_INFO: [(Self, &'static str, &'static str); 11] = [
        (Self::TESTS_FAILED, "tests-failed", "tests failed"),
        (
            Self::SIMULATOR_CREATION_FAILED,
            "simulator-creation-failed",
            "simulator creation failed",
        ),
        (
            Self::INSTALL_APP_FAILED,
            "install-app-failed",
            "app install failed",
        ),
        (Self::INTERRUPTED, "interrupted", "interrupted"),
        (
            Self::SIMULATOR_CRASHED,
            "simulator-crashed",
            "simulator crashed",
        ),
        (
            Self::LAUNCH_APP_FAILED,
            "launch-app-failed",
            "app launch failed",
        ),
        (Self::TEST_TIMEOUT, "test-timeout", "test timeout"),
        (Self::APP_CRASHED, "app-crashed", "app crashed"),
        (
            Self::SIMULATOR_DELETED,
            "simulator-deleted",
            "simulator deleted",
        ),
        (
            Self::UNINSTALL_APP_FAILED,
            "uninstall-app-failed",
            "app uninstall failed",
        ),
        (
            Self::SIMULATOR_REUSE_FAILED,
            "simulator-reuse-failed",
            "simulator reuse failed",
        ),
    ];

    /// The flags that fit in an 8-bit process exit code.
    const EXIT_CODE_MASK: Self = Self::from_bits_truncate(0xff);

    /// Flags above bit 7, and the low flag each one is reported as in an exit code.
    const EXIT_CODE_FOLDS: [(Self, Self); 3] = [
        (Self::SIMULATOR_DELETED, Self::SIMULATOR_CRASHED),
        (Self::UNINSTALL_APP_FAILED, Self::INSTALL_APP_FAILED),
        (Self::SIMULATOR_REUSE_FAILED, Self::SIMULATOR_CREATION_FAILED),
    ];

    /// Flags in decreasing order of significance, used by
    /// [`most_significant`](Self::most_significant).
    ///
    /// An interruption explains everything after it, and environment failures explain the
    /// application and test failures that follow from them.
    const PRIORITY: [Self; 11] = [
        Self::INTERRUPTED,
        Self::SIMULATOR_CREATION_FAILED,
        Self::SIMULATOR_REUSE_FAILED,
        Self::SIMULATOR_CRASHED,
        Self::SIMULATOR_DELETED,
        Self::INSTALL_APP_FAILED,
        Self::LAUNCH_APP_FAILED,
        Self::APP_CRASHED,
        Self::TEST_TIMEOUT,
        Self::TESTS_FAILED,
        Self::UNINSTALL_APP_FAILED,
    ];

    /// Combines two statuses, keeping every flag set in either of them.
    ///
    /// This is a plain union: it is commutative, associative and idempotent, and
    /// [`ALL_PASSED`](Self::ALL_PASSED) is its identity.
    #[inline]
    pub const fn combine(self, other: Self) -> Self {
        self.union(other)
    }

    /// Returns true if every bit of `flag` is set in `self`.
    ///
    /// [`ALL_PASSED`](Self::ALL_PASSED) has no bits, so `has(ALL_PASSED)` is always false. Use
    /// [`is_all_passed`](Self::is_all_passed) to check for success.
    #[inline]
    pub const fn has(self, flag: Self) -> bool {
        !flag.is_empty() && self.contains(flag)
    }

    /// Returns true if no failure flags are set.
    #[inline]
    pub const fn is_all_passed(self) -> bool {
        self.known_flags().is_empty()
    }

    /// Returns this status with any bits outside the vocabulary cleared.
    ///
    /// Conversions reject unknown bits, so they can only appear through bitflags'
    /// `from_bits_retain`. Every consumer of the vocabulary (formatting, exit codes, the
    /// execution tracker) reads statuses through this method and ignores such bits.
    #[inline]
    pub const fn known_flags(self) -> Self {
        self.intersection(Self::all())
    }

    /// Returns true if bits outside the vocabulary are set.
    #[inline]
    pub const fn has_unknown_bits(self) -> bool {
        self.bits() & !Self::all().bits() != 0
    }

    /// Converts a process exit code into a status.
    ///
    /// Returns an error if the code is negative or has bits outside the known vocabulary.
    pub fn from_code(code: i32) -> Result<Self, InvalidExitStatus> {
        let bits = u32::try_from(code).map_err(|_| InvalidExitStatus::negative(code))?;
        Self::try_from(bits)
    }

    /// Looks up a single flag (or `all-passed`) by its kebab-case name.
    pub fn from_status_name(name: &str) -> Result<Self, InvalidExitStatus> {
        if name == ALL_PASSED_NAME {
            return Ok(Self::ALL_PASSED);
        }
        Self::FLAG_INFO
            .iter()
            .find(|(_, flag_name, _)| *flag_name == name)
            .map(|(flag, _, _)| *flag)
            .ok_or_else(|| InvalidExitStatus::unknown_name(name))
    }

    /// Returns the kebab-case name of this status, if it is a single flag or
    /// [`ALL_PASSED`](Self::ALL_PASSED).
    pub fn name(self) -> Option<&'static str> {
        if self.is_all_passed() {
            return Some(ALL_PASSED_NAME);
        }
        Self::info(self).map(|(_, name, _)| name)
    }

    /// Returns a human-readable description of this status, if it is a single flag or
    /// [`ALL_PASSED`](Self::ALL_PASSED).
    ///
    /// For combined values, use [`string_from_exit_status`] or [`display`](Self::display).
    pub fn description(self) -> Option<&'static str> {
        if self.is_all_passed() {
            return Some(ALL_PASSED_DESCRIPTION);
        }
        Self::info(self).map(|(_, _, description)| description)
    }

    /// Iterates over the individual flags set in this status, in bit order.
    pub fn flags(self) -> impl Iterator<Item = Self> {
        Self::FLAG_INFO
            .into_iter()
            .map(|(flag, _, _)| flag)
            .filter(move |flag| self.contains(*flag))
    }

    /// Iterates over the names of the individual flags set in this status, in bit order.
    pub fn flag_names(self) -> impl Iterator<Item = &'static str> {
        Self::FLAG_INFO
            .into_iter()
            .filter(move |(flag, _, _)| self.contains(*flag))
            .map(|(_, name, _)| name)
    }

    /// Iterates over every name accepted by [`from_status_name`](Self::from_status_name).
    pub fn known_names() -> impl Iterator<Item = &'static str> {
        std::iter::once(ALL_PASSED_NAME).chain(Self::FLAG_INFO.into_iter().map(|(_, name, _)| name))
    }

    /// Returns the number of failure flags set.
    pub fn failure_count(self) -> usize {
        self.flags().count()
    }

    /// Returns the single most significant flag set in this status, or `None` for
    /// [`ALL_PASSED`](Self::ALL_PASSED).
    pub fn most_significant(self) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|flag| self.contains(*flag))
    }

    /// Returns a value that renders this status using the given format.
    pub fn display(self, format: StatusFormat) -> DisplayExitStatus {
        DisplayExitStatus {
            status: self,
            format,
        }
    }

    /// Maps this status to a process exit code.
    ///
    /// The result is always in `0..=255`, and is `0` only for [`ALL_PASSED`](Self::ALL_PASSED).
    /// See [`ExitCodeMode::Bitmask`] for how the flags above bit 7 are folded.
    pub fn process_exit_code(self, mode: ExitCodeMode) -> i32 {
        match mode {
            ExitCodeMode::Bitmask => {
                let status = self.known_flags();
                let folded = Self::EXIT_CODE_FOLDS
                    .into_iter()
                    .filter(|(high, _)| status.contains(*high))
                    .fold(status.intersection(Self::EXIT_CODE_MASK), |acc, (_, low)| {
                        acc.union(low)
                    });
                folded.bits() as i32
            }
            ExitCodeMode::Binary => i32::from(!self.is_all_passed()),
        }
    }

    /// Returns a machine-readable summary of this status.
    pub fn summary(self) -> ExitStatusSummary {
        ExitStatusSummary {
            status: self,
            flags: self.flag_names().map(str::to_owned).collect(),
            description: string_from_exit_status(self),
        }
    }

    fn info(flag: Self) -> Option<(Self, &'static str, &'static str)> {
        Self::FLAG_INFO.into_iter().find(|(f, _, _)| *f == flag)
    }
}

/// Renders a status as human-readable text.
///
/// [`ALL_PASSED`](BpExitStatus::ALL_PASSED) renders as `all tests passed`. Any other status
/// renders as the description of each set flag, in bit order, separated by `, `. For example,
/// `APP_CRASHED | TEST_TIMEOUT` renders as `test timeout, app crashed`.
///
/// The output is meant for people and logs; it is not meant to be parsed back.
pub fn string_from_exit_status(status: BpExitStatus) -> String {
    status.display(StatusFormat::List).to_string()
}

impl fmt::Display for BpExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(StatusFormat::List), f)
    }
}

impl fmt::Debug for BpExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_passed() {
            return f.write_str("BpExitStatus(ALL_PASSED)");
        }
        f.write_str("BpExitStatus(")?;
        bitflags::parser::to_writer(self, &mut *f)?;
        f.write_str(")")
    }
}

/// Parses a status from either a decimal exit code or a list of flag names.
///
/// Names are kebab-case (`app-crashed`) and may be separated by `|` or `,`. The name
/// `all-passed` stands for the empty set.
impl FromStr for BpExitStatus {
    type Err = InvalidExitStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Self::from_code(code);
        }

        let mut parts = s
            .split(['|', ','])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .peekable();
        if parts.peek().is_none() {
            return Err(InvalidExitStatus::unknown_name(s));
        }
        parts.try_fold(Self::ALL_PASSED, |acc, part| {
            Ok(acc.combine(Self::from_status_name(part)?))
        })
    }
}

impl TryFrom<u32> for BpExitStatus {
    type Error = InvalidExitStatus;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
            .ok_or_else(|| InvalidExitStatus::unknown_bits(bits & !Self::all().bits()))
    }
}

impl TryFrom<i32> for BpExitStatus {
    type Error = InvalidExitStatus;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<BpExitStatus> for u32 {
    fn from(status: BpExitStatus) -> Self {
        status.bits()
    }
}

/// Renders a [`BpExitStatus`] in a chosen [`StatusFormat`].
///
/// Returned by [`BpExitStatus::display`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayExitStatus {
    status: BpExitStatus,
    format: StatusFormat,
}

impl fmt::Display for DisplayExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.known_flags();
        if status.is_all_passed() {
            return f.write_str(ALL_PASSED_DESCRIPTION);
        }

        match self.format {
            StatusFormat::List => {
                for (i, (_, _, description)) in BpExitStatus::FLAG_INFO
                    .iter()
                    .filter(|(flag, _, _)| status.contains(*flag))
                    .enumerate()
                {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(description)?;
                }
            }
            StatusFormat::Priority => {
                if let Some(description) = status
                    .most_significant()
                    .and_then(BpExitStatus::description)
                {
                    f.write_str(description)?;
                    let rest = status.failure_count() - 1;
                    if rest > 0 {
                        write!(f, " (+{rest} more)")?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// How a combined status is rendered as text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFormat {
    /// Every set flag, in bit order, separated by `, `.
    #[default]
    List,

    /// The most significant flag, followed by a count of the remaining flags.
    Priority,
}

/// How a status is mapped to a process exit code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitCodeMode {
    /// The numeric value of the status, limited to 8 bits, is the exit code.
    ///
    /// Parent processes on Unix only see the low 8 bits of an exit code, so the three flags
    /// above bit 7 are folded into the closest low flag:
    ///
    /// | Flag | Reported as |
    /// |---|---|
    /// | `SIMULATOR_DELETED` (256) | `SIMULATOR_CRASHED` (16) |
    /// | `UNINSTALL_APP_FAILED` (512) | `INSTALL_APP_FAILED` (4) |
    /// | `SIMULATOR_REUSE_FAILED` (1024) | `SIMULATOR_CREATION_FAILED` (2) |
    ///
    /// A failing status therefore never maps to `0`, on any platform. The exact set of flags is
    /// available through [`BpExitStatus::summary`].
    #[default]
    Bitmask,

    /// `0` if all tests passed, `1` otherwise.
    Binary,
}

/// A machine-readable summary of a [`BpExitStatus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExitStatusSummary {
    /// The status, serialized as its numeric code.
    #[serde(rename = "code")]
    pub status: BpExitStatus,

    /// The names of the set flags, in bit order.
    pub flags: Vec<String>,

    /// The rendered description, as produced by [`string_from_exit_status`].
    pub description: String,
}

#[cfg(any(test, feature = "proptest1"))]
mod proptest_impls {
    use super::BpExitStatus;
    use proptest::prelude::*;

    impl Arbitrary for BpExitStatus {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            // The known bits are contiguous from bit 0, so every value in this range is valid.
            (0..=BpExitStatus::all().bits())
                .prop_map(BpExitStatus::from_bits_truncate)
                .boxed()
        }
    }
}
