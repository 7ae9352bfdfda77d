// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Deserialize;
use std::time::Duration;

/// Type for the `[execution]` config section.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionConfig {
    /// Time budget for a single execution attempt.
    #[serde(default, with = "humantime_serde")]
    pub(crate) test_timeout: Option<Duration>,
}
