// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from notification events.

use crate::{
    errors::WriteReportError,
    notifier::{Description, NotificationEvent, NotificationKind, RunListener, RunResult},
};
use camino::{Utf8Path, Utf8PathBuf};
use delegate_metadata::FailureCause;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::{collections::HashMap, fmt::Write as _, fs::File, time::Duration};
use tracing::debug;

/// The report name used if none is given.
pub const DEFAULT_REPORT_NAME: &str = "delegate-run";

/// Collects outcomes into a JUnit XML report, written to a file when the run finishes.
///
/// Each class gets its own test suite. Failures that aren't tied to a class, such as "no tests
/// found", get a suite named after their description.
#[derive(Debug)]
pub struct JunitListener {
    path: Utf8PathBuf,
    report_name: String,
    test_suites: IndexMap<String, TestSuite>,
    started: HashMap<String, Duration>,
    error: Option<WriteReportError>,
}

impl JunitListener {
    /// Creates a listener that writes to `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            report_name: DEFAULT_REPORT_NAME.to_owned(),
            test_suites: IndexMap::new(),
            started: HashMap::new(),
            error: None,
        }
    }

    /// Sets the name of the report.
    pub fn set_report_name(&mut self, report_name: impl Into<String>) -> &mut Self {
        self.report_name = report_name.into();
        self
    }

    /// The path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the error from writing the report, if any.
    ///
    /// Call this after the run has finished.
    pub fn finish(self) -> Result<(), WriteReportError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn add_test_case(
        &mut self,
        description: &Description,
        status: TestCaseStatus,
        time: Option<Duration>,
    ) {
        let suite_name = match description.class_name() {
            Some(class_name) => class_name.to_string(),
            None => description.display_name().to_owned(),
        };
        let mut testcase = TestCase::new(
            description.method().unwrap_or(description.display_name()),
            status,
        );
        testcase.set_classname(suite_name.clone());
        if let Some(time) = time {
            testcase.set_time(time);
        }
        self.test_suites
            .entry(suite_name.clone())
            .or_insert_with(|| TestSuite::new(suite_name))
            .add_test_case(testcase);
    }

    fn write_report(&mut self, result: &RunResult) -> Result<(), WriteReportError> {
        let mut report = Report::new(self.report_name.clone());
        report
            .set_timestamp(result.start_time)
            .set_time(result.run_time)
            .add_test_suites(self.test_suites.drain(..).map(|(_, testsuite)| testsuite));

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
                file: dir.to_path_buf(),
                error,
            })?;
        }
        let f = File::create(&self.path).map_err(|error| WriteReportError::Fs {
            file: self.path.clone(),
            error,
        })?;
        report
            .serialize(f)
            .map_err(|error| WriteReportError::Junit {
                file: self.path.clone(),
                error,
            })?;
        debug!(path = %self.path, "wrote JUnit report");
        Ok(())
    }
}

impl RunListener for JunitListener {
    fn on_event(&mut self, event: &NotificationEvent) {
        match &event.kind {
            NotificationKind::RunStarted { .. } => {}
            NotificationKind::TestStarted { description } => {
                self.started
                    .insert(description.display_name().to_owned(), event.elapsed);
            }
            NotificationKind::TestFinished { description } => {
                let time = self
                    .started
                    .remove(description.display_name())
                    .map(|start| event.elapsed.saturating_sub(start));
                self.add_test_case(description, TestCaseStatus::success(), time);
            }
            NotificationKind::TestIgnored { description } => {
                self.add_test_case(description, TestCaseStatus::skipped(), None);
            }
            NotificationKind::TestFailure { failure } => {
                let mut testcase_status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                if let Some(message) = &failure.cause.message {
                    testcase_status.set_message(message.clone());
                }
                if let Some(ty) = &failure.cause.exception_type {
                    testcase_status.set_type(ty.clone());
                }
                testcase_status.set_description(render_cause(&failure.cause));
                let time = self
                    .started
                    .remove(failure.description.display_name())
                    .map(|start| event.elapsed.saturating_sub(start));
                self.add_test_case(&failure.description, testcase_status, time);
            }
            NotificationKind::RunFinished { result } => {
                if let Err(error) = self.write_report(result) {
                    self.error = Some(error);
                }
            }
        }
    }
}

/// Renders a cause chain with its stack frames, outermost cause first.
fn render_cause(cause: &FailureCause) -> String {
    let mut out = String::new();
    for (idx, cause) in cause.chain().enumerate() {
        if idx > 0 {
            out.push_str("caused by: ");
        }
        let _ = writeln!(out, "{cause}");
        for frame in &cause.stack_trace {
            let _ = writeln!(out, "    {frame}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RunNotifier;
    use camino_tempfile::Utf8TempDir;
    use delegate_metadata::{StackFrame, TestClassName};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_cause() {
        let mut inner = FailureCause::new("java.io.IOException", "disk full");
        inner.stack_trace.push(StackFrame {
            declaring_class: "it.Store".to_owned(),
            method_name: "save".to_owned(),
            file_name: Some("Store.kt".to_owned()),
            line_number: 7,
        });
        let cause = FailureCause::new("java.lang.IllegalStateException", "cannot save")
            .with_cause(inner);
        assert_eq!(
            render_cause(&cause),
            indoc! {"
                java.lang.IllegalStateException: cannot save
                caused by: java.io.IOException: disk full
                    at it.Store.save(Store.kt:7)
            "}
        );
    }

    #[test]
    fn test_write_report() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("nested/junit.xml");
        let class: TestClassName = "it.SmokeTest".parse().unwrap();

        let mut listener = JunitListener::new(&path);
        {
            let mut notifier = RunNotifier::new();
            notifier.add_listener(&mut listener);
            notifier.fire_run_started(&Description::for_class(&class));

            let works = Description::for_method(&class, "works");
            notifier.fire_test_started(&works).unwrap();
            notifier.fire_test_finished(&works);
            notifier
                .fire_test_ignored(&Description::for_method(&class, "skipped"))
                .unwrap();
            notifier
                .test_notifier(Description::for_method(&class, "breaks"))
                .add_failure(FailureCause::new(
                    "java.lang.AssertionError",
                    "expected 1 but was 2",
                ))
                .unwrap();
            notifier.fire_run_finished();
        }
        listener.finish().unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"<testsuite name="it.SmokeTest" tests="3""#), "{xml}");
        assert!(xml.contains(r#"<testcase name="works" classname="it.SmokeTest""#), "{xml}");
        assert!(xml.contains(r#"<testcase name="skipped" classname="it.SmokeTest""#), "{xml}");
        assert!(xml.contains("<skipped"), "{xml}");
        assert!(
            xml.contains(
                r#"<failure message="expected 1 but was 2" type="java.lang.AssertionError">"#
            ),
            "{xml}"
        );
    }

    #[test]
    fn test_suite_failure_without_class() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("junit.xml");
        let mut listener = JunitListener::new(&path);
        listener.set_report_name("smoke");
        {
            let mut notifier = RunNotifier::new();
            notifier.add_listener(&mut listener);
            notifier
                .test_notifier(Description::suite("No tests found in class [it.Empty]"))
                .add_failure(FailureCause {
                    message: Some("No tests found in class [it.Empty]".to_owned()),
                    ..FailureCause::default()
                })
                .unwrap();
            notifier.fire_run_finished();
        }
        listener.finish().unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"<testsuites name="smoke""#), "{xml}");
        assert!(
            xml.contains(r#"<testsuite name="No tests found in class [it.Empty]""#),
            "{xml}"
        );
    }

    #[test]
    fn test_unwritable_path() {
        let dir = Utf8TempDir::new().unwrap();
        // The directory itself can't be opened as a file.
        let mut listener = JunitListener::new(dir.path());
        {
            let mut notifier = RunNotifier::new();
            notifier.add_listener(&mut listener);
            notifier.fire_run_finished();
        }
        let err = listener.finish().unwrap_err();
        assert!(matches!(err, WriteReportError::Fs { .. }), "{err}");
    }
}
