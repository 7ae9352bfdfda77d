// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Exit-status vocabulary for the bp parallel test runner.
//!
//! Every execution attempt finishes with a [`BpExitStatus`]: a set of independent failure flags
//! accumulated while the attempt ran. The empty set, [`BpExitStatus::ALL_PASSED`], means the run
//! succeeded. The numeric value of a status is stable and doubles as the process exit code, so
//! scripts can test for individual failures with a bitwise AND.
//!
//! This crate also provides the text rendering of statuses ([`string_from_exit_status`]) and a
//! machine-readable summary ([`ExitStatusSummary`]).

mod errors;
mod exit_codes;

pub use errors::*;
pub use exit_codes::*;
