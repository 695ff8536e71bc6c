// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delegating runner.
//!
//! A [`DelegatingRunner`] stands in for a test class that is really executed by a remote
//! service. It fetches the remote result for the class in one blocking request and replays it
//! as notifications, so a host sees the remote tests as if they had run locally.

use crate::{
    codec::Codec,
    config::RunnerConfig,
    errors::{AssumptionViolated, ConfigurationError, DelegationError, StoppedByUser},
    helpers::cause_from_error,
    http::{RemoteRequest, Transport, UreqTransport},
    notifier::{Description, Failure, RunNotifier, RunResult},
};
use delegate_metadata::{FailureCause, MethodOutcome, TestClassName, TestOutcome, TestOutcomeSet};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};

/// A local check run before any request is made.
///
/// Returning an error skips the whole class: it is reported as ignored rather than failed.
pub type Assumption =
    Box<dyn Fn(&TestClassName) -> Result<(), AssumptionViolated> + Send + Sync + 'static>;

/// Runs one test class remotely and replays the outcome.
pub struct DelegatingRunner {
    class_name: TestClassName,
    description: Description,
    config: RunnerConfig,
    transport: Arc<dyn Transport>,
    codec: Arc<Codec>,
    assumptions: Vec<Assumption>,
}

impl DelegatingRunner {
    /// Creates a runner for `class_name`.
    ///
    /// Nothing is validated here: a misconfigured runner reports its problem when it is run.
    pub fn new(class_name: TestClassName, config: RunnerConfig) -> Self {
        Self {
            description: Description::for_class(&class_name),
            class_name,
            config,
            transport: Arc::new(UreqTransport),
            codec: Codec::shared(),
            assumptions: Vec::new(),
        }
    }

    /// Uses `transport` instead of the default HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Uses `codec` instead of the shared codec.
    pub fn with_codec(mut self, codec: Arc<Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Adds a local assumption. Assumptions are checked in the order they were added.
    pub fn assume(
        mut self,
        assumption: impl Fn(&TestClassName) -> Result<(), AssumptionViolated> + Send + Sync + 'static,
    ) -> Self {
        self.assumptions.push(Box::new(assumption));
        self
    }

    /// The class being delegated.
    pub fn class_name(&self) -> &TestClassName {
        &self.class_name
    }

    /// The suite description for the class.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// The config this runner uses.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The URL of the remote resource for the class.
    pub fn resource_url(&self) -> Result<String, ConfigurationError> {
        self.config.resource_url(&self.class_name)
    }

    /// Fetches and decodes the remote result without producing notifications.
    ///
    /// Assumptions are not checked.
    pub fn delegate(&self) -> Result<TestOutcomeSet, DelegationError> {
        self.check_namespace()?;
        self.fetch()
    }

    /// Runs the class remotely and reports every outcome through `notifier`.
    ///
    /// Problems with the delegation itself are reported as a single failure of the class. Only
    /// a stop request is returned as an error.
    pub fn run(&self, notifier: &mut RunNotifier<'_>) -> Result<(), StoppedByUser> {
        let outcomes = self
            .check_namespace()
            .and_then(|()| self.check_assumptions())
            .and_then(|()| Self::check_stop(notifier))
            .and_then(|()| self.fetch());

        match outcomes {
            Ok(outcomes) => self.replay(&outcomes, notifier),
            Err(DelegationError::Stopped(stopped)) => Err(stopped),
            Err(DelegationError::AssumptionViolated(violation)) => {
                info!(
                    class_name = %self.class_name,
                    message = violation.message(),
                    "skipping class"
                );
                notifier.fire_test_ignored(&self.description)
            }
            Err(error) => {
                warn!(class_name = %self.class_name, %error, "delegation failed");
                notifier.fire_test_failure(Failure::new(
                    self.description.clone(),
                    cause_from_error(&error),
                ))
            }
        }
    }

    fn check_namespace(&self) -> Result<(), DelegationError> {
        let required = self.config.required_namespace();
        if required.is_empty() || self.class_name.top_level_namespace() == required {
            Ok(())
        } else {
            Err(ConfigurationError::WrongNamespace {
                class_name: self.class_name.clone(),
                required: required.to_owned(),
            }
            .into())
        }
    }

    fn check_assumptions(&self) -> Result<(), DelegationError> {
        for assumption in &self.assumptions {
            assumption(&self.class_name)?;
        }
        Ok(())
    }

    /// A stop requested before the request is sent skips the request altogether.
    fn check_stop(notifier: &RunNotifier<'_>) -> Result<(), DelegationError> {
        if notifier.is_stop_requested() {
            debug!("stop requested, not sending request");
            Err(StoppedByUser.into())
        } else {
            Ok(())
        }
    }

    fn fetch(&self) -> Result<TestOutcomeSet, DelegationError> {
        let url = self.resource_url()?;
        debug!(%url, "delegating test class");
        let request = RemoteRequest {
            url,
            read_timeout: self.config.read_timeout(),
        };
        let body = self.transport.get(&request)?.into_body(&request.url)?;
        Ok(self.codec.decode(&body)?)
    }

    fn replay(
        &self,
        outcomes: &TestOutcomeSet,
        notifier: &mut RunNotifier<'_>,
    ) -> Result<(), StoppedByUser> {
        if outcomes.is_empty() {
            let message = format!("No tests found in class [{}]", self.class_name);
            warn!(class_name = %self.class_name, "remote run reported no tests");
            return notifier.fire_test_failure(Failure::new(
                Description::suite(message.clone()),
                FailureCause {
                    message: Some(message),
                    ..FailureCause::default()
                },
            ));
        }

        for MethodOutcome { method, outcome } in outcomes {
            let mut test =
                notifier.test_notifier(Description::for_method(&self.class_name, method.clone()));
            match outcome {
                TestOutcome::Passed => {
                    test.fire_started()?;
                    test.fire_finished();
                }
                TestOutcome::Ignored => test.fire_ignored()?,
                TestOutcome::Failed(cause) => test.add_failure(cause.clone())?,
            }
        }

        info!(
            class_name = %self.class_name,
            passed = outcomes.passed().count(),
            ignored = outcomes.ignored().count(),
            failed = outcomes.failed().count(),
            "replayed remote test results"
        );
        Ok(())
    }
}

impl fmt::Debug for DelegatingRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingRunner")
            .field("class_name", &self.class_name)
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("codec", &self.codec)
            .field("assumptions", &self.assumptions.len())
            .finish()
    }
}

/// Runs `runner` as a complete run: run started, the runner's notifications, run finished.
pub fn execute(
    runner: &DelegatingRunner,
    notifier: &mut RunNotifier<'_>,
) -> Result<RunResult, StoppedByUser> {
    notifier.fire_run_started(runner.description());
    runner.run(notifier)?;
    Ok(notifier.fire_run_finished())
}
