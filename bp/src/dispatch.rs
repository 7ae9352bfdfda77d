// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and dispatch.

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter},
};
use bp_metadata::{BpExitStatus, ExitStatusSummary, StatusFormat};
use bp_runner::{config::BpConfig, observer::ExecutionSnapshot, reporter::StatusReporterBuilder};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::{OwoColorize, Style};
use std::io::Write;
use tracing::debug;

/// Inspect exit statuses reported by the bp test runner.
///
/// A bp exit status is a set of failure flags. Each flag is a single bit, so a status can be
/// given either as its numeric exit code or as flag names joined by `|` or `,`.
#[derive(Debug, Parser)]
#[command(
    name = "bp",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct BpApp {
    /// Config file [default: .config/bp.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH", env = "BP_CONFIG_FILE")]
    config_file: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl BpApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Explain(opts) => {
                let config = load_config(self.config_file.as_deref())?;
                opts.exec(&config, output, output_writer)
            }
            Command::List(opts) => opts.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Describe the combination of one or more exit statuses
    ///
    /// Every status given is combined into one before it is described, so `bp explain 1 128` and
    /// `bp explain tests-failed,app-crashed` print the same thing.
    Explain(ExplainOpts),

    /// List every flag an exit status can contain
    List(ListOpts),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// Human-readable text
    #[default]
    Human,
    /// Machine-readable JSON
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StatusFormatOpt {
    /// Every flag that is set, in bit order
    List,
    /// The most significant flag, and how many others are set
    Priority,
}

impl From<StatusFormatOpt> for StatusFormat {
    fn from(opt: StatusFormatOpt) -> Self {
        match opt {
            StatusFormatOpt::List => StatusFormat::List,
            StatusFormatOpt::Priority => StatusFormat::Priority,
        }
    }
}

#[derive(Debug, Args)]
struct ExplainOpts {
    /// Exit statuses: decimal codes, or flag names joined by `|` or `,`
    #[arg(required = true, value_name = "STATUS", allow_negative_numbers = true)]
    statuses: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormat,

    /// How to render the combined status [default: from config]
    #[arg(long, value_enum, value_name = "FMT")]
    status_format: Option<StatusFormatOpt>,

    /// Exit with the process exit code the combined status maps to
    #[arg(long)]
    exit: bool,
}

impl ExplainOpts {
    fn exec(
        self,
        config: &BpConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let status = parse_statuses(&self.statuses)?;
        debug!(?status, "combined {} statuses", self.statuses.len());

        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                let mut builder = StatusReporterBuilder::from_config(config);
                if let Some(status_format) = self.status_format {
                    builder.set_status_format(status_format.into());
                }
                builder.set_colorize(output.color.should_colorize(supports_color::Stream::Stdout));
                let reporter = builder.build();

                let snapshot = ExecutionSnapshot {
                    execution_complete: true,
                    application_launched: false,
                    tests_started: false,
                    exit_status: status,
                };
                reporter
                    .write_status(&snapshot, &mut writer)
                    .map_err(ExpectedError::write_output)?;

                if output.verbose {
                    for flag in status.flags() {
                        write_flag_row(&mut writer, flag).map_err(ExpectedError::write_output)?;
                    }
                }
            }
            MessageFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &status.summary())
                    .map_err(|err| ExpectedError::SerializeError { err })?;
                writeln!(writer).map_err(ExpectedError::write_output)?;
            }
        }
        writer.flush().map_err(ExpectedError::write_output)?;

        if !self.exit {
            return Ok(0);
        }

        Ok(status.process_exit_code(config.exit_code_mode()))
    }
}

#[derive(Debug, Args)]
struct ListOpts {
    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormat,
}

impl ListOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                let heading = if output.color.should_colorize(supports_color::Stream::Stdout) {
                    Style::new().bold()
                } else {
                    Style::new()
                };
                writeln!(
                    writer,
                    "{:>3}  {:>5}  {:<25}  {}",
                    "BIT".style(heading),
                    "VALUE".style(heading),
                    "NAME".style(heading),
                    "DESCRIPTION".style(heading),
                )
                .map_err(ExpectedError::write_output)?;
                write_flag_row(&mut writer, BpExitStatus::ALL_PASSED)
                    .map_err(ExpectedError::write_output)?;
                for flag in BpExitStatus::all().flags() {
                    write_flag_row(&mut writer, flag).map_err(ExpectedError::write_output)?;
                }
            }
            MessageFormat::Json => {
                let summaries: Vec<ExitStatusSummary> = std::iter::once(BpExitStatus::ALL_PASSED)
                    .chain(BpExitStatus::all().flags())
                    .map(BpExitStatus::summary)
                    .collect();
                serde_json::to_writer_pretty(&mut writer, &summaries)
                    .map_err(|err| ExpectedError::SerializeError { err })?;
                writeln!(writer).map_err(ExpectedError::write_output)?;
            }
        }
        writer.flush().map_err(ExpectedError::write_output)?;
        Ok(0)
    }
}

fn load_config(config_file: Option<&Utf8Path>) -> Result<BpConfig> {
    let current_dir = std::env::current_dir().map_err(ExpectedError::current_dir_failed)?;
    let current_dir = Utf8PathBuf::try_from(current_dir)
        .map_err(|err| ExpectedError::current_dir_invalid_utf8(err.into_path_buf()))?;
    let config = BpConfig::from_sources(&current_dir, config_file)?;
    if let Some(config_file) = config.config_file() {
        debug!("read config from `{config_file}`");
    }
    Ok(config)
}

fn parse_statuses(inputs: &[String]) -> Result<BpExitStatus> {
    inputs
        .iter()
        .try_fold(BpExitStatus::ALL_PASSED, |acc, input| {
            let status: BpExitStatus = input
                .parse()
                .map_err(|err| ExpectedError::invalid_exit_status(input.as_str(), err))?;
            Ok(acc.combine(status))
        })
}

/// Writes one row of the flag table. `flag` is either a single flag or `ALL_PASSED`.
fn write_flag_row(writer: &mut dyn Write, flag: BpExitStatus) -> std::io::Result<()> {
    let bit = if flag.is_all_passed() {
        "-".to_owned()
    } else {
        flag.bits().trailing_zeros().to_string()
    };
    writeln!(
        writer,
        "{bit:>3}  {:>5}  {:<25}  {}",
        flag.bits(),
        flag.name().unwrap_or_default(),
        flag.description().unwrap_or_default(),
    )
}
