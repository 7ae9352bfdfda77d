// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ExecutionConfig, ExitCodeConfig, ReportConfig};
use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use bp_metadata::{ExitCodeMode, StatusFormat};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Trait for handling configuration warnings.
///
/// This allows for different warning handling strategies, such as logging warnings (the default
/// behavior) or collecting them for testing purposes.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        workspace_root: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        workspace_root: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file
                .strip_prefix(workspace_root)
                .unwrap_or(config_file),
        )
    }
}

/// Overall configuration for bp.
///
/// This is the root data structure for bp configuration. Most runners would start off by reading
/// the configuration at the start of a run with [`from_sources`](Self::from_sources).
#[derive(Clone, Debug)]
pub struct BpConfig {
    config_file: Option<Utf8PathBuf>,
    inner: BpConfigDeserialize,
}

impl BpConfig {
    /// The default location of the config within the path: `.config/bp.toml`, used to read the
    /// config from the given directory.
    pub const CONFIG_PATH: &'static str = ".config/bp.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the bp config from the given file, or if not specified from `.config/bp.toml` in
    /// the workspace root.
    ///
    /// An explicitly specified file must exist. The default location is optional: if nothing is
    /// there, the default config is used.
    ///
    /// Unknown keys are logged as warnings.
    pub fn from_sources(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(workspace_root, config_file, &mut DefaultConfigWarnings)
    }

    /// Like [`from_sources`](Self::from_sources), but with a custom handler for warnings.
    pub fn from_sources_with_warnings(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml).required(true),
            ),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, workspace_root, &unknown);
        }

        let config_file = config_file.exists().then_some(config_file);
        Ok(Self { config_file, inner })
    }

    /// Returns the default config, without reading any files.
    pub fn default_config() -> Self {
        let (inner, unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .unwrap_or_else(|err| panic!("default config is always valid: {err}"));

        // The default config is embedded in the binary, so it must not contain any unknown keys.
        assert!(
            unknown.is_empty(),
            "unknown config keys in default config: {unknown:?}"
        );

        Self {
            config_file: None,
            inner,
        }
    }

    /// Returns the config file that was read, if any.
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Returns how combined exit statuses are rendered.
    pub fn status_format(&self) -> StatusFormat {
        self.inner.report.status_format
    }

    /// Returns how exit statuses map to process exit codes.
    pub fn exit_code_mode(&self) -> ExitCodeMode {
        self.inner.exit_code.mode
    }

    /// Returns the time budget for an execution attempt, if one is configured.
    pub fn test_timeout(&self) -> Option<Duration> {
        self.inner.execution.test_timeout
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(BpConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: BpConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. Drop the key
                // from the config error so it is only shown once.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BpConfigDeserialize {
    #[serde(default)]
    report: ReportConfig,
    #[serde(default)]
    exit_code: ExitCodeConfig,
    #[serde(default)]
    execution: ExecutionConfig,
}
