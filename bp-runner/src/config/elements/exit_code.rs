// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bp_metadata::ExitCodeMode;
use serde::Deserialize;

/// Type for the `[exit-code]` config section.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ExitCodeConfig {
    pub(crate) mode: ExitCodeMode,
}
