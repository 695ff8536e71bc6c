// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use delegate_metadata::{ClassNameParseError, DelegateExitCode};
use delegate_runner::errors::{ConfigParseError, WriteReportError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::{error, info};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are short placeholders; errors are meant to be printed with
// display_to_stderr.

/// An expected error: a problem with the setup or the run, not a bug in `delegate-test`.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirNotUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("invalid test class name")]
    ClassNameParseError {
        #[from]
        err: ClassNameParseError,
    },
    #[error("error setting up signal handler")]
    SignalHandlerSetupError {
        #[source]
        err: ctrlc::Error,
    },
    #[error("error writing JUnit report")]
    WriteReportError {
        #[from]
        err: WriteReportError,
    },
    #[error("test run failed")]
    TestRunFailed { class_name: String, failures: usize },
    #[error("test run stopped by user")]
    StoppedByUser,
}

impl ExpectedError {
    pub(crate) fn current_dir_invalid(err: std::io::Error) -> Self {
        Self::CurrentDirInvalid { err }
    }

    pub(crate) fn current_dir_not_utf8(path: std::path::PathBuf) -> Self {
        Self::CurrentDirNotUtf8 { path }
    }

    pub(crate) fn signal_handler_setup_error(err: ctrlc::Error) -> Self {
        Self::SignalHandlerSetupError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirNotUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ClassNameParseError { .. }
            | Self::SignalHandlerSetupError { .. } => DelegateExitCode::SETUP_ERROR,
            Self::WriteReportError { .. } => DelegateExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed { .. } => DelegateExitCode::TEST_RUN_FAILED,
            Self::StoppedByUser => DelegateExitCode::STOPPED_BY_USER,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirInvalid { err } => {
                error!("could not read the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirNotUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                match err.config_file() {
                    Some(config_file) => error!(
                        "failed to parse delegate config at `{}`",
                        config_file.style(styles.bold)
                    ),
                    None => error!("failed to parse delegate config"),
                }
                err.source()
            }
            Self::ClassNameParseError { err } => {
                error!("{err}");
                None
            }
            Self::SignalHandlerSetupError { err } => {
                error!("error setting up signal handler");
                Some(err as &dyn Error)
            }
            Self::WriteReportError { err } => {
                error!("failed to write JUnit report");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed {
                class_name,
                failures,
            } => {
                error!(
                    "{} {} in {}",
                    failures.style(styles.failure),
                    if *failures == 1 { "failure" } else { "failures" },
                    class_name.style(styles.bold),
                );
                None
            }
            Self::StoppedByUser => {
                info!("test run stopped by user");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ExpectedError::StoppedByUser, 130 ; "stopped")]
    #[test_case(ExpectedError::TestRunFailed { class_name: "it.Foo".to_owned(), failures: 2 }, 100 ; "failed")]
    #[test_case(
        ExpectedError::ClassNameParseError { err: "it..Foo".parse::<delegate_metadata::TestClassName>().unwrap_err() },
        96 ;
        "bad class name"
    )]
    fn test_process_exit_code(error: ExpectedError, expected: i32) {
        assert_eq!(error.process_exit_code(), expected);
    }
}
