// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the delegate runner.

use crate::config::RunnerConfig;
use camino::Utf8PathBuf;
use delegate_metadata::{OutcomeConflict, TestClassName, adapters::ValueKind};
use http::StatusCode;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error(
    "failed to parse delegate config{}",
    .config_file.as_ref().map(|f| format!(" at `{f}`")).unwrap_or_default()
)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: config::ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: config::ConfigError) -> Self {
        Self { config_file, err }
    }

    /// The config file that failed to parse, if the error is tied to one.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

/// The runner is set up incorrectly. No network call is made when this occurs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// No base URL was configured, or it was blank.
    #[error(
        "missing base URL for the remote test runner; set `base-url` in `{}`, or the `{}` or `{}` \
         environment variable",
        RunnerConfig::CONFIG_PATH,
        RunnerConfig::BASE_URL_ENV,
        RunnerConfig::LEGACY_BASE_URL_ENV
    )]
    MissingBaseUrl,

    /// The test class isn't in the namespace that delegated classes must live in.
    #[error(
        "the class [{class_name}] is set up to run remotely but it is not in the '{required}.' package\n\
         Please move the class into the '{required}.' package or stop running it remotely"
    )]
    WrongNamespace {
        /// The offending class.
        class_name: TestClassName,

        /// The required top-level namespace.
        required: String,
    },
}

/// An error that occurred while talking to the remote test endpoint.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The remote endpoint answered with a status of 300 or above.
    #[error(
        "could not find resource for test [{url}]; status: {} - {message}",
        .status.as_u16()
    )]
    Status {
        /// The resource URL.
        url: String,

        /// The response status.
        status: StatusCode,

        /// The response body, or the status reason if the body was empty.
        message: String,
    },

    /// The request could not be completed.
    #[error("request to [{url}] failed")]
    Request {
        /// The resource URL.
        url: String,

        /// The underlying error.
        #[source]
        err: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The response body could not be read.
    #[error("failed to read response body from [{url}]")]
    Body {
        /// The resource URL.
        url: String,

        /// The underlying error.
        #[source]
        err: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// An error that occurred while decoding a remote result payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("remote test result is not valid JSON")]
    Syntax(#[source] serde_json::Error),

    /// The payload contains a value kind that the codec has no adapter for.
    #[error("field `{field}` holds a {kind} value, but no adapter is registered for it")]
    NoAdapter {
        /// The field name.
        field: String,

        /// The declared kind of the field.
        kind: ValueKind,
    },

    /// The payload is JSON but doesn't have the shape of a test result.
    #[error("remote test result has an unexpected shape")]
    Shape(#[source] serde_json::Error),

    /// A method appears in more than one partition.
    #[error("remote test result has conflicting outcomes")]
    Conflict(#[from] OutcomeConflict),
}

/// An error that occurred while encoding a test result.
#[derive(Debug, Error)]
#[error("failed to encode test result")]
pub struct EncodeError {
    #[from]
    inner: serde_json::Error,
}

/// A local assumption did not hold, so the class is skipped rather than failed.
#[derive(Clone, Debug, Error)]
#[error("assumption violated: {message}")]
pub struct AssumptionViolated {
    message: String,
}

impl AssumptionViolated {
    /// Creates a new assumption violation with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message describing the assumption.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A stop was requested while the run was in progress.
///
/// This is never turned into a notification: it aborts the run and is returned to the caller.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("test run stopped by user")]
pub struct StoppedByUser;

/// An error that occurred while delegating a test class.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DelegationError {
    /// The runner is set up incorrectly.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The remote endpoint could not be reached or returned an error status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A local assumption did not hold.
    #[error(transparent)]
    AssumptionViolated(#[from] AssumptionViolated),

    /// A stop was requested.
    #[error(transparent)]
    Stopped(#[from] StoppedByUser),
}

impl DelegationError {
    /// Returns a short description of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration error",
            Self::Transport(_) => "transport error",
            Self::Decode(_) => "decode error",
            Self::AssumptionViolated(_) => "assumption violated",
            Self::Stopped(_) => "stopped by user",
        }
    }
}

/// An error that occurred while writing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An error occurred while operating on the file system.
    #[error("error writing to path `{file}`")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to `{file}`")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}
