// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for bp.
//!
//! Configuration is read from an embedded default file, with the user's `.config/bp.toml` (or an
//! explicitly provided file) layered on top. Unknown keys are reported through
//! [`ConfigWarnings`] rather than failing the parse.

mod config_impl;
mod elements;
#[cfg(test)]
mod test_helpers;

pub use config_impl::*;
pub use elements::*;
