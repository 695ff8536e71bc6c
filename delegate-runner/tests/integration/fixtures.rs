// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use delegate_runner::{
    config::RunnerConfig,
    errors::TransportError,
    http::{HttpResponse, RemoteRequest, Transport},
    notifier::{NotificationEvent, NotificationKind, RunNotifier},
    runner::DelegatingRunner,
};
use http::StatusCode;
use std::{
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

pub(crate) static MIXED: &str = include_str!("../fixtures/mixed.json");
pub(crate) static EMPTY: &str = include_str!("../fixtures/empty.json");
pub(crate) static IGNORED_ONLY: &str = include_str!("../fixtures/ignored-only.json");

pub(crate) const BASE_URL: &str = "http://localhost:2990/jira";

/// A transport that serves a canned response and records what it was asked for.
#[derive(Debug)]
pub(crate) struct FakeTransport {
    status: StatusCode,
    body: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<RemoteRequest>>,
}

impl FakeTransport {
    pub(crate) fn ok(body: impl Into<String>) -> Arc<Self> {
        Self::with_status(StatusCode::OK, body)
    }

    pub(crate) fn with_status(status: StatusCode, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.into(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, request: &RemoteRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(HttpResponse::new(self.status, self.body.clone()))
    }
}

pub(crate) fn runner(class_name: &str, transport: &Arc<FakeTransport>) -> DelegatingRunner {
    runner_with_config(
        class_name,
        RunnerConfig::new(Some(BASE_URL.to_owned())),
        transport,
    )
}

pub(crate) fn runner_with_config(
    class_name: &str,
    config: RunnerConfig,
    transport: &Arc<FakeTransport>,
) -> DelegatingRunner {
    DelegatingRunner::new(class_name.parse().unwrap(), config).with_transport(transport.clone())
}

/// Runs `runner` without run-level events and returns what it fired.
pub(crate) fn collect_events(runner: &DelegatingRunner) -> Vec<NotificationKind> {
    let mut events: Vec<NotificationEvent> = Vec::new();
    {
        let mut notifier = RunNotifier::new();
        notifier.add_listener(&mut events);
        runner.run(&mut notifier).unwrap();
    }
    events.into_iter().map(|event| event.kind).collect()
}

/// Serves one HTTP response on a local port.
///
/// Returns the base URL and a handle that yields the raw request head once the exchange is done.
pub(crate) fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            head.push_str(&line);
        }
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        head
    });

    (format!("http://{addr}/jira"), handle)
}
