// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use delegate_metadata::{DelegateExitCode, TestClassName};
use delegate_runner::{
    config::RunnerConfig,
    errors::StoppedByUser,
    notifier::RunNotifier,
    reporter::{JsonLinesListener, JunitListener, PrintlnRunListener},
    runner::{DelegatingRunner, execute},
};
use owo_colors::OwoColorize;
use std::time::Duration;
use tracing::{debug, info};

/// Run test classes on a remote test service.
///
/// Each class is executed by the remote side in a single request; its outcomes are reported here
/// as if the tests had run locally.
#[derive(Debug, Parser)]
#[command(version, name = "delegate-test", styles = clap_styles::style())]
pub struct DelegateApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl DelegateApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        match self.command {
            Command::Run(opts) => opts.exec(&self.config_opts, output),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Delegate one test class and report its outcomes
    Run(RunOpts),
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: .config/delegate.toml]
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Base URL of the remote host, e.g. http://localhost:2990/jira
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// How long to wait for the remote run to finish, e.g. "10m"
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    read_timeout: Option<Duration>,

    /// Top-level package that delegated classes must live in
    #[arg(long, global = true, value_name = "NAMESPACE")]
    required_namespace: Option<String>,
}

impl ConfigOpts {
    /// Reads the config from its sources, then applies command-line overrides.
    fn make_config(&self, root: &Utf8Path) -> Result<RunnerConfig> {
        let mut config = RunnerConfig::from_sources(root, self.config_file.as_deref())?;
        if let Some(base_url) = &self.base_url {
            config.set_base_url(base_url.clone());
        }
        if let Some(read_timeout) = self.read_timeout {
            config.set_read_timeout(read_timeout);
        }
        if let Some(namespace) = &self.required_namespace {
            config.set_required_namespace(namespace.clone());
        }
        Ok(config)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// One line per notable event
    #[default]
    Human,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Fully-qualified name of the test class, e.g. it.jira.IssueOperatorTest
    #[arg(value_name = "CLASS")]
    class_name: String,

    /// Write a JUnit XML report to this path
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,

    /// Format of the events written to stdout
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,
}

impl RunOpts {
    fn exec(self, config_opts: &ConfigOpts, output: OutputContext) -> Result<i32> {
        let styles = output.stderr_styles();
        let class_name: TestClassName = self.class_name.parse()?;
        let root = current_dir()?;
        let config = config_opts.make_config(&root)?;
        debug!(?config, verbose = output.verbose, "resolved config");

        let runner = DelegatingRunner::new(class_name.clone(), config);

        // Declared before the notifier, which borrows it.
        let mut junit = self.junit.map(JunitListener::new);

        let outcome = {
            let mut notifier = RunNotifier::new();
            let stop = notifier.stop_handle();
            ctrlc::set_handler(move || stop.please_stop())
                .map_err(ExpectedError::signal_handler_setup_error)?;

            match self.message_format {
                MessageFormat::Human => {
                    notifier.add_listener(PrintlnRunListener::stdout());
                }
                MessageFormat::Json => {
                    notifier.add_listener(JsonLinesListener::stdout());
                }
            }
            if let Some(junit) = &mut junit {
                notifier.add_listener(junit);
            }

            execute(&runner, &mut notifier)
        };

        let result = match outcome {
            Ok(result) => result,
            Err(StoppedByUser) => return Err(ExpectedError::StoppedByUser),
        };

        if let Some(junit) = junit {
            let path = junit.path().to_owned();
            junit.finish()?;
            info!("wrote JUnit report to {}", path.style(styles.bold));
        }

        info!(
            "{}: {} run, {} failed, {} ignored in {:.3}s",
            class_name.style(styles.bold),
            result.run_count,
            result.failure_count,
            result.ignore_count,
            result.run_time.as_secs_f64(),
        );

        if result.was_successful() {
            Ok(DelegateExitCode::OK)
        } else {
            Err(ExpectedError::TestRunFailed {
                class_name: class_name.to_string(),
                failures: result.failure_count,
            })
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(ExpectedError::current_dir_invalid)?;
    Utf8PathBuf::from_path_buf(dir).map_err(ExpectedError::current_dir_not_utf8)
}
