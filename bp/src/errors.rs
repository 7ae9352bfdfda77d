// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use bp_metadata::InvalidExitStatus;
use bp_runner::errors::ConfigParseError;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Exit codes used by the `bp` binary for its own failures.
///
/// These are distinct from the status codes that `bp explain --exit` produces: those are the
/// [`BpExitStatus`](bp_metadata::BpExitStatus) values themselves.
pub enum BpCliExitCode {}

impl BpCliExitCode {
    /// The command line or configuration was invalid.
    pub const SETUP_ERROR: i32 = 96;

    /// A status given on the command line could not be interpreted.
    pub const INVALID_STATUS: i32 = 97;

    /// Writing output failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error that `bp` reports to the user.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("invalid exit status")]
    InvalidExitStatus {
        input: String,
        #[source]
        err: InvalidExitStatus,
    },
    #[error("error serializing output")]
    SerializeError {
        #[source]
        err: serde_json::Error,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn current_dir_failed(err: std::io::Error) -> Self {
        Self::CurrentDirFailed { err }
    }

    pub(crate) fn current_dir_invalid_utf8(path: std::path::PathBuf) -> Self {
        Self::CurrentDirInvalidUtf8 { path }
    }

    pub(crate) fn invalid_exit_status(input: impl Into<String>, err: InvalidExitStatus) -> Self {
        Self::InvalidExitStatus {
            input: input.into(),
            err,
        }
    }

    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. } => BpCliExitCode::SETUP_ERROR,
            Self::InvalidExitStatus { .. } => BpCliExitCode::INVALID_STATUS,
            Self::SerializeError { .. } | Self::WriteOutputError { .. } => {
                BpCliExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse bp config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::InvalidExitStatus { input, err } => {
                error!(
                    "could not interpret `{}` as a bp exit status",
                    input.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::SerializeError { err } => {
                error!("failed to serialize output");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_metadata::BpExitStatus;

    #[test]
    fn exit_codes_distinguish_failure_kinds() {
        let invalid = BpExitStatus::from_code(-1).expect_err("negative codes are invalid");
        let err = ExpectedError::invalid_exit_status("-1", invalid);
        assert_eq!(err.process_exit_code(), BpCliExitCode::INVALID_STATUS);

        let err = ExpectedError::write_output(std::io::Error::other("broken pipe"));
        assert_eq!(err.process_exit_code(), BpCliExitCode::WRITE_OUTPUT_ERROR);

        let err = ExpectedError::current_dir_failed(std::io::Error::other("gone"));
        assert_eq!(err.process_exit_code(), BpCliExitCode::SETUP_ERROR);
    }

    #[test]
    fn invalid_status_keeps_source() {
        let invalid: InvalidExitStatus = "bogus"
            .parse::<BpExitStatus>()
            .expect_err("unknown names are invalid");
        let err = ExpectedError::invalid_exit_status("bogus", invalid);
        let source = err.source().expect("source is set").to_string();
        assert!(
            source.contains("unknown status name `bogus`"),
            "source: {source}"
        );
    }
}
