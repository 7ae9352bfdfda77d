// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::helpers::Styles;
use crate::{
    config::BpConfig,
    observer::{ExecutionObserver, ExecutionSnapshot},
};
use bp_metadata::{BpExitStatus, ExitCodeMode, StatusFormat};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use tracing::debug;

/// Status reporter builder.
#[derive(Clone, Debug, Default)]
pub struct StatusReporterBuilder {
    status_format: StatusFormat,
    exit_code_mode: ExitCodeMode,
    colorize: bool,
}

impl StatusReporterBuilder {
    /// Creates a builder with the settings from the given config.
    pub fn from_config(config: &BpConfig) -> Self {
        Self {
            status_format: config.status_format(),
            exit_code_mode: config.exit_code_mode(),
            colorize: false,
        }
    }

    /// Sets how combined statuses are rendered.
    pub fn set_status_format(&mut self, status_format: StatusFormat) -> &mut Self {
        self.status_format = status_format;
        self
    }

    /// Sets how statuses map to process exit codes.
    pub fn set_exit_code_mode(&mut self, exit_code_mode: ExitCodeMode) -> &mut Self {
        self.exit_code_mode = exit_code_mode;
        self
    }

    /// Sets whether output is colorized.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Creates a new status reporter.
    pub fn build(&self) -> StatusReporter {
        let mut styles = Styles::default();
        if self.colorize {
            styles.colorize();
        }
        StatusReporter {
            status_format: self.status_format,
            exit_code_mode: self.exit_code_mode,
            styles,
        }
    }
}

/// Renders the state of an execution attempt and maps it to a process exit code.
#[derive(Clone, Debug)]
pub struct StatusReporter {
    status_format: StatusFormat,
    exit_code_mode: ExitCodeMode,
    styles: Styles,
}

impl StatusReporter {
    /// Writes the final line for `observer` to `writer`, and returns the process exit code.
    ///
    /// If the attempt is not complete yet, the line shows how far it got and the failures
    /// recorded so far.
    pub fn report(
        &self,
        observer: &dyn ExecutionObserver,
        writer: &mut dyn Write,
    ) -> io::Result<i32> {
        let snapshot = observer.snapshot();
        if !snapshot.execution_complete {
            debug!(stage = %snapshot.stage(), "reporting status of an incomplete execution");
        }
        self.write_status(&snapshot, writer)?;
        Ok(self.exit_code(snapshot.exit_status))
    }

    /// Writes a single status line for `snapshot` to `writer`.
    pub fn write_status(
        &self,
        snapshot: &ExecutionSnapshot,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let status = snapshot.exit_status;
        let description = status.display(self.status_format);

        if !snapshot.execution_complete {
            writeln!(
                writer,
                "{:>12} {}; so far: {description}",
                "RUNNING".style(self.styles.running),
                snapshot.stage(),
            )
        } else if status.is_all_passed() {
            writeln!(writer, "{:>12} {description}", "PASS".style(self.styles.pass))
        } else {
            writeln!(
                writer,
                "{:>12} {description} (exit status {})",
                "FAIL".style(self.styles.fail),
                self.exit_code(status).style(self.styles.count),
            )
        }
    }

    /// Maps `status` to a process exit code, using the configured mode.
    pub fn exit_code(&self, status: BpExitStatus) -> i32 {
        status.process_exit_code(self.exit_code_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ExecutionTracker;
    use pretty_assertions::assert_eq;

    fn report_to_string(
        reporter: &StatusReporter,
        observer: &dyn ExecutionObserver,
    ) -> (String, i32) {
        let mut out = Vec::new();
        let code = reporter
            .report(observer, &mut out)
            .expect("writing to a Vec succeeds");
        (String::from_utf8(out).expect("output is UTF-8"), code)
    }

    #[test]
    fn reports_passing_run() {
        let tracker = ExecutionTracker::new();
        tracker.record_tests_started();
        tracker.mark_complete();

        let reporter = StatusReporterBuilder::default().build();
        let (out, code) = report_to_string(&reporter, &tracker);
        assert_eq!(out, "        PASS all tests passed\n");
        assert_eq!(code, 0);
    }

    #[test]
    fn reports_every_failure() {
        let tracker = ExecutionTracker::new();
        tracker.record_tests_started();
        tracker.record_failure(BpExitStatus::APP_CRASHED);
        tracker.record_failure(BpExitStatus::TEST_TIMEOUT);
        tracker.mark_complete();

        let reporter = StatusReporterBuilder::default().build();
        let (out, code) = report_to_string(&reporter, &tracker);
        assert_eq!(
            out,
            "        FAIL test timeout, app crashed (exit status 192)\n"
        );
        assert_eq!(code, 192);
    }

    #[test]
    fn priority_and_binary_modes() {
        let tracker = ExecutionTracker::new();
        tracker.record_failure(BpExitStatus::TESTS_FAILED | BpExitStatus::SIMULATOR_CRASHED);
        tracker.mark_complete();

        let reporter = StatusReporterBuilder::default()
            .set_status_format(StatusFormat::Priority)
            .set_exit_code_mode(ExitCodeMode::Binary)
            .build();
        let (out, code) = report_to_string(&reporter, &tracker);
        assert_eq!(out, "        FAIL simulator crashed (+1 more) (exit status 1)\n");
        assert_eq!(code, 1);
    }

    #[test]
    fn reports_incomplete_run() {
        let tracker = ExecutionTracker::new();
        tracker.record_application_launched();
        tracker.record_failure(BpExitStatus::TESTS_FAILED);

        let reporter = StatusReporterBuilder::default().build();
        let (out, code) = report_to_string(&reporter, &tracker);
        assert_eq!(
            out,
            "     RUNNING launched, tests not started; so far: tests failed\n"
        );
        assert_eq!(code, 1);
    }

    #[test]
    fn builder_from_config() {
        let config = BpConfig::default_config();
        let reporter = StatusReporterBuilder::from_config(&config).build();
        assert_eq!(reporter.status_format, StatusFormat::List);
        assert_eq!(reporter.exit_code_mode, ExitCodeMode::Bitmask);
        assert_eq!(reporter.exit_code(BpExitStatus::SIMULATOR_REUSE_FAILED), 2);
    }

    #[test]
    fn colorized_output_keeps_text() {
        let tracker = ExecutionTracker::new();
        tracker.record_failure(BpExitStatus::INTERRUPTED);
        tracker.mark_complete();

        let reporter = StatusReporterBuilder::default().set_colorize(true).build();
        let (out, _) = report_to_string(&reporter, &tracker);
        assert!(out.contains("\u{1b}["), "output is colorized: {out:?}");
        assert!(out.contains("interrupted"), "output: {out:?}");
    }
}
