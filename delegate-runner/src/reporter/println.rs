// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::notifier::{NotificationEvent, NotificationKind, RunListener};
use std::io::{self, Stdout, Write};
use tracing::debug;

/// Prints one line per run start, run end, failure and ignored test.
///
/// Test starts and finishes are not printed. Write errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct PrintlnRunListener<W> {
    writer: W,
}

impl PrintlnRunListener<Stdout> {
    /// Creates a listener that prints to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PrintlnRunListener<W> {
    /// Creates a listener that prints to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line_for(kind: &NotificationKind) -> Option<String> {
        match kind {
            NotificationKind::RunStarted { description } => {
                Some(description.display_name().to_owned())
            }
            NotificationKind::RunFinished { result } => {
                Some(format!("finished with success:{}", result.was_successful()))
            }
            NotificationKind::TestFailure { failure } => {
                Some(failure.description.display_name().to_owned())
            }
            NotificationKind::TestIgnored { description } => {
                Some(description.display_name().to_owned())
            }
            NotificationKind::TestStarted { .. } | NotificationKind::TestFinished { .. } => None,
        }
    }
}

impl<W: Write> RunListener for PrintlnRunListener<W> {
    fn on_event(&mut self, event: &NotificationEvent) {
        let Some(line) = Self::line_for(&event.kind) else {
            return;
        };
        if let Err(error) = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush()) {
            debug!(%error, "failed to write run notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{Description, RunNotifier};
    use delegate_metadata::{FailureCause, TestClassName};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output() {
        let class: TestClassName = "it.SmokeTest".parse().unwrap();
        let mut listener = PrintlnRunListener::new(Vec::new());
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
                .add_failure(FailureCause::new("java.lang.AssertionError", "boom"))
                .unwrap();
            notifier.fire_run_finished();
        }

        let output = String::from_utf8(listener.into_inner()).unwrap();
        assert_eq!(
            output,
            indoc! {"
                it.SmokeTest
                skipped(it.SmokeTest)
                breaks(it.SmokeTest)
                finished with success:false
            "}
        );
    }

    #[test]
    fn test_successful_run() {
        let class: TestClassName = "it.SmokeTest".parse().unwrap();
        let mut listener = PrintlnRunListener::new(Vec::new());
        {
            let mut notifier = RunNotifier::new();
            notifier.add_listener(&mut listener);
            notifier.fire_run_started(&Description::for_class(&class));
            notifier.fire_run_finished();
        }
        let output = String::from_utf8(listener.into_inner()).unwrap();
        assert_eq!(output, "it.SmokeTest\nfinished with success:true\n");
    }

    #[derive(Debug)]
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("broken pipe"))
        }
    }

    #[test]
    fn test_write_errors_are_ignored() {
        let mut notifier = RunNotifier::new();
        notifier.add_listener(PrintlnRunListener::new(BrokenWriter));
        notifier.fire_run_started(&Description::suite("suite"));
        let result = notifier.fire_run_finished();
        assert!(result.was_successful());
    }
}
