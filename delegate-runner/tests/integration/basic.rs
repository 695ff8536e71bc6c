// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use delegate_metadata::{FailureCause, OutcomeKind, TestOutcome, TestOutcomeSet};
use delegate_runner::{
    codec::Codec,
    config::RunnerConfig,
    errors::{AssumptionViolated, DelegationError, StoppedByUser, TransportError},
    http::{Transport, UreqTransport},
    notifier::{Description, NotificationKind, RunNotifier},
    reporter::PrintlnRunListener,
    runner::{DelegatingRunner, execute},
};
use http::StatusCode;
use indoc::indoc;
use maplit::{btreemap, btreeset};
use pretty_assertions::assert_eq;
use std::{sync::Arc, time::Duration};
use test_case::test_case;

fn failures(events: &[NotificationKind]) -> Vec<(&str, &FailureCause)> {
    events
        .iter()
        .filter_map(|kind| match kind {
            NotificationKind::TestFailure { failure } => {
                Some((failure.description.display_name(), &failure.cause))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_mixed_outcomes() -> Result<()> {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner("it.jira.IssueOperatorTest", &transport);
    let events = collect_events(&runner);

    let class = runner.class_name();
    let expected_passed = ["createsIssue", "updatesSummary"];
    for method in expected_passed {
        let description = Description::for_method(class, method);
        let started = events.iter().position(|kind| {
            kind == &NotificationKind::TestStarted {
                description: description.clone(),
            }
        });
        let finished = events.iter().position(|kind| {
            kind == &NotificationKind::TestFinished {
                description: description.clone(),
            }
        });
        match (started, finished) {
            (Some(started), Some(finished)) => {
                ensure!(started < finished, "{method} started before it finished")
            }
            other => panic!("{method}: expected started and finished, got {other:?}"),
        }
    }

    assert!(events.contains(&NotificationKind::TestIgnored {
        description: Description::for_method(class, "deletesIssue"),
    }));

    let failures = failures(&events);
    assert_eq!(failures.len(), 1);
    let (name, cause) = failures[0];
    assert_eq!(name, "transitionsIssue(it.jira.IssueOperatorTest)");
    assert_eq!(cause.exception_type.as_deref(), Some("java.lang.AssertionError"));
    assert_eq!(
        cause.message.as_deref(),
        Some("expected status Done but was In Progress")
    );
    assert_eq!(cause.stack_trace[0].line_number, 58);

    // Two started, two finished, one ignored, one failure.
    assert_eq!(events.len(), 6);

    assert_eq!(transport.calls(), 1);
    let requests = transport.requests();
    assert_eq!(
        requests[0].url,
        "http://localhost:2990/jira/rest/atlassiantestrunner/1.0/runtest/it.jira.IssueOperatorTest"
    );
    assert_eq!(requests[0].read_timeout, Duration::from_secs(30 * 60));
    Ok(())
}

#[test]
fn test_empty_result() {
    let transport = FakeTransport::ok(EMPTY);
    let runner = runner("it.jira.EmptyTest", &transport);
    let events = collect_events(&runner);

    assert_eq!(events.len(), 1, "exactly one notification: {events:?}");
    let failures = failures(&events);
    assert_eq!(failures[0].0, "No tests found in class [it.jira.EmptyTest]");
    assert_eq!(
        failures[0].1.message.as_deref(),
        Some("No tests found in class [it.jira.EmptyTest]")
    );
}

#[test]
fn test_ignored_only() {
    let transport = FakeTransport::ok(IGNORED_ONLY);
    let runner = runner("it.jira.DisabledTest", &transport);
    let events = collect_events(&runner);

    let class = runner.class_name();
    assert_eq!(
        events,
        vec![
            NotificationKind::TestIgnored {
                description: Description::for_method(class, "firstDisabled"),
            },
            NotificationKind::TestIgnored {
                description: Description::for_method(class, "secondDisabled"),
            },
        ]
    );
}

#[test]
fn test_not_found() {
    let transport = FakeTransport::with_status(StatusCode::NOT_FOUND, "");
    let runner = runner("it.jira.MissingTest", &transport);
    let url = runner.resource_url().unwrap();

    let err = runner.delegate().unwrap_err();
    match &err {
        DelegationError::Transport(TransportError::Status {
            status, message, ..
        }) => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {other}"),
    }

    let events = collect_events(&runner);
    assert_eq!(events.len(), 1, "exactly one notification: {events:?}");
    let failures = failures(&events);
    assert_eq!(failures[0].0, "it.jira.MissingTest");
    let message = failures[0].1.message.as_deref().unwrap();
    assert!(message.contains(&url), "{message}");
    assert!(message.contains("404"), "{message}");
    assert!(message.to_lowercase().contains("not found"), "{message}");
    assert_eq!(transport.calls(), 2);
}

#[test]
fn test_not_found_with_body() {
    let transport = FakeTransport::with_status(StatusCode::NOT_FOUND, "not found");
    let runner = runner("it.jira.MissingTest", &transport);
    let url = runner.resource_url().unwrap();

    let err = runner.delegate().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("could not find resource for test [{url}]; status: 404 - not found")
    );
}

#[test_case(None ; "unset")]
#[test_case(Some("   ") ; "blank")]
fn test_missing_base_url(base_url: Option<&str>) {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner_with_config(
        "it.jira.IssueOperatorTest",
        RunnerConfig::new(base_url.map(ToOwned::to_owned)),
        &transport,
    );
    let events = collect_events(&runner);

    assert_eq!(transport.calls(), 0, "no request without a base URL");
    let failures = failures(&events);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].1.exception_type.as_deref(),
        Some("configuration error")
    );
    assert!(
        failures[0]
            .1
            .message
            .as_deref()
            .is_some_and(|m| m.contains("missing base URL"))
    );
}

#[test]
fn test_wrong_namespace() {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner("com.example.IssueOperatorTest", &transport);
    let events = collect_events(&runner);

    assert_eq!(transport.calls(), 0, "no request outside the namespace");
    let failures = failures(&events);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "com.example.IssueOperatorTest");
    assert_eq!(
        failures[0].1.message.as_deref(),
        Some(indoc! {"
            the class [com.example.IssueOperatorTest] is set up to run remotely but it is not in the 'it.' package
            Please move the class into the 'it.' package or stop running it remotely"
        })
    );

    // A different namespace can be configured.
    let mut config = RunnerConfig::new(Some(BASE_URL.to_owned()));
    config.set_required_namespace("com");
    let runner = runner_with_config("com.example.IssueOperatorTest", config, &transport);
    collect_events(&runner);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn test_assumption_violated() {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner("it.jira.IssueOperatorTest", &transport)
        .assume(|_| Ok(()))
        .assume(|class_name| {
            Err(AssumptionViolated::new(format!(
                "{} needs a running instance",
                class_name.simple_name()
            )))
        });
    let events = collect_events(&runner);

    assert_eq!(transport.calls(), 0);
    assert_eq!(
        events,
        vec![NotificationKind::TestIgnored {
            description: runner.description().clone(),
        }]
    );
}

#[test]
fn test_decode_error() {
    let transport = FakeTransport::ok(r#"{"passedMethods": ["a"]"#);
    let runner = runner("it.jira.BrokenTest", &transport);
    let events = collect_events(&runner);

    let failures = failures(&events);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.exception_type.as_deref(), Some("decode error"));
    assert!(failures[0].1.cause.is_some(), "parser error is nested");
}

#[test]
fn test_conflicting_outcomes() {
    let transport =
        FakeTransport::ok(r#"{"passedMethods": ["a"], "ignoredMethods": ["a"], "failedMethods": {}}"#);
    let runner = runner("it.jira.ConflictTest", &transport);
    let err = runner.delegate().unwrap_err();
    assert!(
        err.to_string().contains("conflicting outcomes"),
        "{err}"
    );
}

#[test]
fn test_stop_request() {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner("it.jira.IssueOperatorTest", &transport);

    let mut events = Vec::new();
    let mut notifier = RunNotifier::new();
    notifier.add_listener(&mut events);
    notifier.stop_handle().please_stop();

    assert_eq!(execute(&runner, &mut notifier), Err(StoppedByUser));
    drop(notifier);
    assert_eq!(events.len(), 1, "only the run start is reported");
    assert!(matches!(events[0].kind, NotificationKind::RunStarted { .. }));
    assert_eq!(transport.calls(), 0, "no request after a stop");
}

#[test]
fn test_execute() {
    let transport = FakeTransport::ok(MIXED);
    let runner = runner("it.jira.IssueOperatorTest", &transport);

    let mut output = PrintlnRunListener::new(Vec::new());
    let result = {
        let mut notifier = RunNotifier::new();
        notifier.add_listener(&mut output);
        execute(&runner, &mut notifier).unwrap()
    };

    assert_eq!(result.started_count, 2);
    assert_eq!(result.run_count, 2);
    assert_eq!(result.ignore_count, 1);
    assert_eq!(result.failure_count, 1);
    assert!(!result.was_successful());

    let output = String::from_utf8(output.into_inner()).unwrap();
    let mut lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.first(), Some(&"it.jira.IssueOperatorTest"));
    assert_eq!(lines.last(), Some(&"finished with success:false"));
    lines.sort_unstable();
    assert_eq!(
        lines,
        vec![
            "deletesIssue(it.jira.IssueOperatorTest)",
            "finished with success:false",
            "it.jira.IssueOperatorTest",
            "transitionsIssue(it.jira.IssueOperatorTest)",
        ]
    );
}

#[test]
fn test_round_trip_through_runner() {
    let codec = Codec::shared();
    let outcomes = TestOutcomeSet::from_outcomes([
        ("first", TestOutcome::Passed),
        ("second", TestOutcome::Ignored),
        (
            "third",
            TestOutcome::Failed(FailureCause::new("java.lang.AssertionError", "nope")),
        ),
    ])
    .unwrap();
    let payload = codec
        .encode(&outcomes, Some("it.jira.RoundTripTest"))
        .unwrap();

    let transport = FakeTransport::ok(payload);
    let runner = runner("it.jira.RoundTripTest", &transport).with_codec(codec);
    let decoded = runner.delegate().unwrap();
    assert_eq!(
        decoded.partitions(),
        btreemap! {
            OutcomeKind::Passed => btreeset! {"first"},
            OutcomeKind::Ignored => btreeset! {"second"},
            OutcomeKind::Failed => btreeset! {"third"},
        }
    );
}

#[test]
fn test_over_http() {
    let (base_url, server) = serve_once("200 OK", IGNORED_ONLY);
    let runner = DelegatingRunner::new(
        "it.jira.DisabledTest".parse().unwrap(),
        RunnerConfig::new(Some(format!("{base_url}/"))),
    );
    let outcomes = runner.delegate().unwrap();
    assert_eq!(
        outcomes.ignored().collect::<Vec<_>>(),
        vec!["firstDisabled", "secondDisabled"]
    );

    let head = server.join().unwrap();
    let request_line = head.lines().next().unwrap();
    assert_eq!(
        request_line,
        "GET /jira/rest/atlassiantestrunner/1.0/runtest/it.jira.DisabledTest HTTP/1.1"
    );
    assert!(
        head.lines()
            .any(|line| line.eq_ignore_ascii_case("accept: application/json")),
        "{head}"
    );
}

#[test]
fn test_over_http_error_status() {
    let (base_url, server) = serve_once("500 Internal Server Error", "remote runner crashed");
    let request = delegate_runner::http::RemoteRequest {
        url: format!("{base_url}/rest/atlassiantestrunner/1.0/runtest/it.jira.CrashTest"),
        read_timeout: Duration::from_secs(10),
    };
    let response = UreqTransport.get(&request).unwrap();
    server.join().unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let err = response.into_body(&request.url).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "could not find resource for test [{}]; status: 500 - remote runner crashed",
            request.url
        )
    );
}

#[test]
fn test_shared_transport_is_reused() {
    let transport = FakeTransport::ok(MIXED);
    let shared: Arc<dyn Transport> = transport.clone();
    for _ in 0..3 {
        let runner = DelegatingRunner::new(
            "it.jira.IssueOperatorTest".parse().unwrap(),
            RunnerConfig::new(Some(BASE_URL.to_owned())),
        )
        .with_transport(shared.clone());
        runner.delegate().unwrap();
    }
    assert_eq!(transport.calls(), 3);
}
