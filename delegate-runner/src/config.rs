// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for delegated runs.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. the built-in defaults in [`RunnerConfig::DEFAULT_CONFIG`];
//! 2. a TOML file, `.config/delegate.toml` by default;
//! 3. `DELEGATE_*` environment variables;
//! 4. explicit overrides such as command-line flags, applied through the setters.
//!
//! The legacy `baseurl` variable is consulted only if no other layer sets a base URL.

use crate::errors::{ConfigParseError, ConfigurationError};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use delegate_metadata::TestClassName;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

/// Configuration for a [`DelegatingRunner`](crate::runner::DelegatingRunner).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunnerConfig {
    base_url: Option<String>,
    read_timeout: Duration,
    required_namespace: String,
}

impl RunnerConfig {
    /// The default location of the config file, relative to the working directory.
    pub const CONFIG_PATH: &'static str = ".config/delegate.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The environment variable that sets the base URL.
    pub const BASE_URL_ENV: &'static str = "DELEGATE_BASE_URL";

    /// The environment variable that sets the read timeout.
    pub const READ_TIMEOUT_ENV: &'static str = "DELEGATE_READ_TIMEOUT";

    /// The environment variable that sets the required namespace.
    pub const REQUIRED_NAMESPACE_ENV: &'static str = "DELEGATE_REQUIRED_NAMESPACE";

    /// The older variable name for the base URL, used as a last resort.
    pub const LEGACY_BASE_URL_ENV: &'static str = "baseurl";

    /// The path under the base URL that test classes are appended to.
    pub const RUN_TEST_PATH: &'static str = "rest/atlassiantestrunner/1.0/runtest";

    /// The read timeout used if none is configured.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// The namespace delegated classes must live in if none is configured.
    pub const DEFAULT_NAMESPACE: &'static str = "it";

    /// Creates a config with the given base URL and default settings otherwise.
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            required_namespace: Self::DEFAULT_NAMESPACE.to_owned(),
        }
    }

    /// Reads the config from the process environment and, if present, the config file.
    ///
    /// If `config_file` is `None`, `.config/delegate.toml` under `root` is read if it exists.
    pub fn from_sources(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_env(root, config_file, std::env::vars())
    }

    /// Reads the config with the given environment instead of the process environment.
    pub fn from_sources_with_env(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigParseError> {
        let env: HashMap<String, String> = env.into_iter().collect();

        let mut builder = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml));

        let file_path = match config_file {
            Some(file) => {
                builder = builder.add_source(File::new(file.as_str(), FileFormat::Toml));
                Some(file.to_owned())
            }
            None => {
                let file = Self::default_config_file(root);
                builder = builder
                    .add_source(File::new(file.as_str(), FileFormat::Toml).required(false));
                file.exists().then_some(file)
            }
        };

        for (key, var) in [
            ("base-url", Self::BASE_URL_ENV),
            ("read-timeout", Self::READ_TIMEOUT_ENV),
            ("required-namespace", Self::REQUIRED_NAMESPACE_ENV),
        ] {
            if let Some(value) = env.get(var) {
                builder = builder
                    .set_override(key, value.as_str())
                    .map_err(|err| ConfigParseError::new(None, err))?;
            }
        }

        let deserialized: RunnerConfigDeserialize = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(file_path.clone(), err))?;

        let base_url = deserialized
            .base_url
            .or_else(|| env.get(Self::LEGACY_BASE_URL_ENV).cloned());

        tracing::debug!(
            config_file = ?file_path,
            has_base_url = base_url.is_some(),
            "read delegate config"
        );

        Ok(Self {
            base_url,
            read_timeout: deserialized.read_timeout,
            required_namespace: deserialized.required_namespace,
        })
    }

    /// Overrides the base URL.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the read timeout.
    pub fn set_read_timeout(&mut self, read_timeout: Duration) -> &mut Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Overrides the required namespace.
    pub fn set_required_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.required_namespace = namespace.into();
        self
    }

    /// Returns the base URL, or `None` if it is unset or blank.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .filter(|base_url| !base_url.trim().is_empty())
    }

    /// Returns the read timeout for the remote call.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the namespace that delegated classes must live in.
    pub fn required_namespace(&self) -> &str {
        &self.required_namespace
    }

    /// Returns the URL of the remote resource that runs `class_name`.
    pub fn resource_url(&self, class_name: &TestClassName) -> Result<String, ConfigurationError> {
        let base_url = self
            .base_url()
            .ok_or(ConfigurationError::MissingBaseUrl)?
            .trim();
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url);
        Ok(format!("{base_url}/{}/{class_name}", Self::RUN_TEST_PATH))
    }

    /// Returns the path to the config file under `root`.
    pub fn default_config_file(root: &Utf8Path) -> Utf8PathBuf {
        root.join(Self::CONFIG_PATH)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunnerConfigDeserialize {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(with = "humantime_serde")]
    read_timeout: Duration,
    required_namespace: String,
}
