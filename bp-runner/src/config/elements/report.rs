// Copyright (c) The bp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use bp_metadata::StatusFormat;
use serde::Deserialize;

/// Type for the `[report]` config section.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// How combined exit statuses are rendered.
    pub(crate) status_format: StatusFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BpConfig, test_helpers::*};
    use camino_tempfile::tempdir;
    use indoc::indoc;
    use test_case::test_case;

    #[test_case(
        "",
        Ok(StatusFormat::List)

        ; "empty config is expected to use the hardcoded values"
    )]
    #[test_case(
        indoc! {r#"
            [report]
            status-format = "priority"
        "#},
        Ok(StatusFormat::Priority)

        ; "priority format"
    )]
    #[test_case(
        indoc! {r#"
            [report]
            status-format = "everything"
        "#},
        Err("unknown variant `everything`, expected `list` or `priority`")

        ; "unknown format"
    )]
    fn status_format_from_config(config_contents: &str, expected: Result<StatusFormat, &str>) {
        let workspace_dir = tempdir().unwrap();
        write_config(&workspace_dir, config_contents);

        let config_result = BpConfig::from_sources(workspace_dir.path(), None);

        match expected {
            Ok(expected) => {
                let config = config_result.expect("config file should parse");
                assert_eq!(config.status_format(), expected);
            }
            Err(expected_err_str) => {
                let err_str = error_chain(&config_result.unwrap_err());
                assert!(
                    err_str.contains(expected_err_str),
                    "expected error string not found: {err_str}",
                )
            }
        }
    }
}
