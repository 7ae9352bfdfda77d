// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for the bp parallel test runner.
//!
//! Simulator management and test supervision record what they observe into an
//! [`ExecutionTracker`](tracker::ExecutionTracker). Everything downstream (reporting, retry
//! decisions, the process exit code) reads that state through the
//! [`ExecutionObserver`](observer::ExecutionObserver) interface, and renders the accumulated
//! [`BpExitStatus`](bp_metadata::BpExitStatus) with a [`StatusReporter`](reporter::StatusReporter).

pub mod config;
pub mod errors;
pub mod observer;
pub mod reporter;
pub mod tracker;
