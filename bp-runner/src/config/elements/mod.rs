// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Individual sections of the bp configuration.

mod execution;
mod exit_code;
mod report;

pub use execution::*;
pub use exit_code::*;
pub use report::*;
