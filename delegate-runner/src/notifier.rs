// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifications produced while delegating a test class.
//!
//! A [`DelegatingRunner`](crate::runner::DelegatingRunner) reports everything it learns through
//! a [`RunNotifier`], which forwards each [`NotificationEvent`] to the registered
//! [`RunListener`]s and keeps a running [`RunResult`].

use crate::errors::StoppedByUser;
use chrono::{DateTime, FixedOffset, Local};
use delegate_metadata::{FailureCause, TestClassName};
use serde::Serialize;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Describes a test or a suite of tests.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Description {
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<TestClassName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
}

impl Description {
    /// A suite with the given display name and no class behind it.
    pub fn suite(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            class_name: None,
            method: None,
        }
    }

    /// The suite description for a test class.
    pub fn for_class(class_name: &TestClassName) -> Self {
        Self {
            display_name: class_name.to_string(),
            class_name: Some(class_name.clone()),
            method: None,
        }
    }

    /// The description of one test method, displayed as `method(class)`.
    pub fn for_method(class_name: &TestClassName, method: impl Into<String>) -> Self {
        let method = method.into();
        Self {
            display_name: format!("{method}({class_name})"),
            class_name: Some(class_name.clone()),
            method: Some(method),
        }
    }

    /// The human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The class this description refers to, if any.
    pub fn class_name(&self) -> Option<&TestClassName> {
        self.class_name.as_ref()
    }

    /// The method name, if this describes a single test.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns true if this describes a single test rather than a suite.
    pub fn is_test(&self) -> bool {
        self.method.is_some()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// A failed test or suite, and why it failed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Failure {
    /// What failed.
    pub description: Description,

    /// Why it failed.
    pub cause: FailureCause,
}

impl Failure {
    /// Creates a new failure.
    pub fn new(description: Description, cause: FailureCause) -> Self {
        Self { description, cause }
    }

    /// The message of the outermost cause, if there is one.
    pub fn message(&self) -> Option<&str> {
        self.cause.message.as_deref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.cause)
    }
}

/// A notification event.
///
/// Events are produced by a [`RunNotifier`] and consumed by [`RunListener`]s.
#[derive(Clone, Debug, Serialize)]
pub struct NotificationEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of the run.
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,

    /// The kind of event this is.
    #[serde(flatten)]
    pub kind: NotificationKind,
}

/// The kind of notification event this is.
///
/// Forms part of [`NotificationEvent`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum NotificationKind {
    /// The run started.
    RunStarted {
        /// The suite being run.
        description: Description,
    },

    /// The run finished.
    RunFinished {
        /// The accumulated result.
        result: RunResult,
    },

    /// A test started.
    TestStarted {
        /// The test.
        description: Description,
    },

    /// A test finished. Failed tests may not be reported as started or finished.
    TestFinished {
        /// The test.
        description: Description,
    },

    /// A test or suite was ignored.
    TestIgnored {
        /// The test or suite.
        description: Description,
    },

    /// A test or suite failed.
    TestFailure {
        /// The failure.
        failure: Failure,
    },
}

/// The accumulated outcome of a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunResult {
    /// When the run started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the run took. Zero until the run finishes.
    #[serde(with = "humantime_serde")]
    pub run_time: Duration,

    /// The number of tests that started.
    pub started_count: usize,

    /// The number of tests that finished.
    pub run_count: usize,

    /// The number of failures.
    pub failure_count: usize,

    /// The number of ignored tests or suites.
    pub ignore_count: usize,

    /// Every failure, in the order reported.
    pub failures: Vec<Failure>,
}

impl RunResult {
    fn new(start_time: DateTime<FixedOffset>) -> Self {
        Self {
            start_time,
            run_time: Duration::ZERO,
            started_count: 0,
            run_count: 0,
            failure_count: 0,
            ignore_count: 0,
            failures: Vec::new(),
        }
    }

    /// Returns true if nothing failed.
    pub fn was_successful(&self) -> bool {
        self.failure_count == 0
    }

    fn record(&mut self, kind: &NotificationKind) {
        match kind {
            NotificationKind::TestStarted { .. } => self.started_count += 1,
            NotificationKind::TestFinished { .. } => self.run_count += 1,
            NotificationKind::TestIgnored { .. } => self.ignore_count += 1,
            NotificationKind::TestFailure { failure } => {
                self.failure_count += 1;
                self.failures.push(failure.clone());
            }
            NotificationKind::RunStarted { .. } | NotificationKind::RunFinished { .. } => {}
        }
    }
}

/// Receives notification events.
pub trait RunListener {
    /// Called once per event, in the order events are fired.
    fn on_event(&mut self, event: &NotificationEvent);
}

/// Records every event.
impl RunListener for Vec<NotificationEvent> {
    fn on_event(&mut self, event: &NotificationEvent) {
        self.push(event.clone());
    }
}

impl<L: RunListener + ?Sized> RunListener for &mut L {
    fn on_event(&mut self, event: &NotificationEvent) {
        (**self).on_event(event);
    }
}

impl<L: RunListener + ?Sized> RunListener for Box<L> {
    fn on_event(&mut self, event: &NotificationEvent) {
        (**self).on_event(event);
    }
}

/// Requests that a run stop at its next per-test notification.
///
/// Cloning a handle shares the underlying flag. Handles can be sent to other threads, for
/// example a signal handler.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Asks the run to stop.
    pub fn please_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns true if a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Forwards notification events to listeners and accumulates a [`RunResult`].
pub struct RunNotifier<'a> {
    listeners: Vec<Box<dyn RunListener + 'a>>,
    stop: StopHandle,
    start_instant: Instant,
    result: RunResult,
}

impl<'a> RunNotifier<'a> {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            stop: StopHandle::default(),
            start_instant: Instant::now(),
            result: RunResult::new(Local::now().fixed_offset()),
        }
    }

    /// Adds a listener. Listeners see events in the order they were added.
    pub fn add_listener(&mut self, listener: impl RunListener + 'a) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Returns a handle that can request a stop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns true if a stop was requested through any of this notifier's handles.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// The result accumulated so far.
    pub fn result(&self) -> &RunResult {
        &self.result
    }

    /// Announces the start of a run and resets the accumulated result.
    pub fn fire_run_started(&mut self, description: &Description) {
        self.start_instant = Instant::now();
        self.result = RunResult::new(Local::now().fixed_offset());
        self.fire(NotificationKind::RunStarted {
            description: description.clone(),
        });
    }

    /// Announces the end of a run and returns its result.
    pub fn fire_run_finished(&mut self) -> RunResult {
        self.result.run_time = self.start_instant.elapsed();
        let result = self.result.clone();
        self.fire(NotificationKind::RunFinished {
            result: result.clone(),
        });
        result
    }

    /// Announces that a test started.
    pub fn fire_test_started(&mut self, description: &Description) -> Result<(), StoppedByUser> {
        self.check_stop()?;
        self.fire(NotificationKind::TestStarted {
            description: description.clone(),
        });
        Ok(())
    }

    /// Announces that a test finished.
    pub fn fire_test_finished(&mut self, description: &Description) {
        self.fire(NotificationKind::TestFinished {
            description: description.clone(),
        });
    }

    /// Announces that a test or suite was ignored.
    pub fn fire_test_ignored(&mut self, description: &Description) -> Result<(), StoppedByUser> {
        self.check_stop()?;
        self.fire(NotificationKind::TestIgnored {
            description: description.clone(),
        });
        Ok(())
    }

    /// Announces a failure.
    pub fn fire_test_failure(&mut self, failure: Failure) -> Result<(), StoppedByUser> {
        self.check_stop()?;
        self.fire(NotificationKind::TestFailure { failure });
        Ok(())
    }

    /// Returns a notifier bound to one description.
    pub fn test_notifier<'n>(&'n mut self, description: Description) -> TestNotifier<'n, 'a> {
        TestNotifier {
            notifier: self,
            description,
        }
    }

    fn check_stop(&self) -> Result<(), StoppedByUser> {
        if self.is_stop_requested() {
            Err(StoppedByUser)
        } else {
            Ok(())
        }
    }

    fn fire(&mut self, kind: NotificationKind) {
        self.result.record(&kind);
        let event = NotificationEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: self.start_instant.elapsed(),
            kind,
        };
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }
}

impl Default for RunNotifier<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunNotifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunNotifier")
            .field("listeners", &self.listeners.len())
            .field("stop", &self.stop)
            .field("result", &self.result)
            .finish()
    }
}

/// A [`RunNotifier`] bound to a single description.
#[derive(Debug)]
pub struct TestNotifier<'n, 'a> {
    notifier: &'n mut RunNotifier<'a>,
    description: Description,
}

impl TestNotifier<'_, '_> {
    /// The bound description.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Announces that the test started.
    pub fn fire_started(&mut self) -> Result<(), StoppedByUser> {
        self.notifier.fire_test_started(&self.description)
    }

    /// Announces that the test finished.
    pub fn fire_finished(&mut self) {
        self.notifier.fire_test_finished(&self.description);
    }

    /// Announces that the test was ignored.
    pub fn fire_ignored(&mut self) -> Result<(), StoppedByUser> {
        self.notifier.fire_test_ignored(&self.description)
    }

    /// Announces that the test failed with `cause`.
    pub fn add_failure(&mut self, cause: FailureCause) -> Result<(), StoppedByUser> {
        self.notifier
            .fire_test_failure(Failure::new(self.description.clone(), cause))
    }
}
