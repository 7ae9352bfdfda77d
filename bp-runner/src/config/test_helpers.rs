// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test helpers for configuration.

use crate::config::BpConfig;
use camino_tempfile::Utf8TempDir;
use camino_tempfile_ext::prelude::*;
use std::error::Error;

pub(in crate::config) fn write_config(temp_dir: &Utf8TempDir, config_contents: &str) {
    temp_dir
        .child(BpConfig::CONFIG_PATH)
        .write_str(config_contents)
        .expect("error writing config file");
}

/// Renders an error and all of its sources, separated by `: `.
pub(in crate::config) fn error_chain(error: &dyn Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        out.push_str(": ");
        out.push_str(&err.to_string());
        source = err.source();
    }
    out
}
