// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::BpExitStatus;
use itertools::Itertools;
use thiserror::Error;

/// An error returned when an integer or string does not describe a valid [`BpExitStatus`].
///
/// Statuses are a closed vocabulary: bits or names outside of it are always rejected, never
/// silently dropped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid exit status: {kind}")]
pub struct InvalidExitStatus {
    kind: InvalidExitStatusKind,
}

impl InvalidExitStatus {
    pub(crate) fn negative(code: i32) -> Self {
        Self {
            kind: InvalidExitStatusKind::Negative { code },
        }
    }

    pub(crate) fn unknown_bits(bits: u32) -> Self {
        Self {
            kind: InvalidExitStatusKind::UnknownBits { bits },
        }
    }

    pub(crate) fn unknown_name(name: impl Into<String>) -> Self {
        Self {
            kind: InvalidExitStatusKind::UnknownName { name: name.into() },
        }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &InvalidExitStatusKind {
        &self.kind
    }
}

/// The kind of [`InvalidExitStatus`] error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidExitStatusKind {
    /// A negative exit code was provided.
    #[error("exit code {code} is negative")]
    Negative {
        /// The code that was provided.
        code: i32,
    },

    /// The value contained bits that do not correspond to any known flag.
    #[error("unknown status bits {bits:#x}")]
    UnknownBits {
        /// The unknown bits, with all known bits masked out.
        bits: u32,
    },

    /// A flag name was not recognized.
    #[error(
        "unknown status name `{name}` (known names: {})",
        BpExitStatus::known_names().join(", "),
    )]
    UnknownName {
        /// The name that was provided.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_lists_known_names() {
        let err = InvalidExitStatus::unknown_name("app-exploded");
        let message = err.to_string();
        assert!(
            message.starts_with("invalid exit status: unknown status name `app-exploded`"),
            "unexpected message: {message}"
        );
        assert!(message.contains("all-passed"), "message: {message}");
        assert!(message.contains("simulator-reuse-failed"), "message: {message}");
    }

    #[test]
    fn unknown_bits_are_hex() {
        let err = InvalidExitStatus::unknown_bits(0x800);
        assert_eq!(err.to_string(), "invalid exit status: unknown status bits 0x800");
        assert_eq!(
            err.kind(),
            &InvalidExitStatusKind::UnknownBits { bits: 0x800 }
        );
    }
}
