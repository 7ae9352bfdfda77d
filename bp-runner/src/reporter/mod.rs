// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of execution attempt outcomes.
//!
//! The main structure in this module is [`StatusReporter`], which renders an
//! [`ExecutionObserver`](crate::observer::ExecutionObserver)'s state as a single line of text and
//! maps it to a process exit code.

mod helpers;
mod imp;

pub use imp::*;
