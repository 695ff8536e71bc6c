// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching remote test results over HTTP.
//!
//! The runner talks to the remote endpoint through the [`Transport`] trait, so tests can swap in
//! a fake. [`UreqTransport`] is the real implementation.

use crate::{errors::TransportError, helpers::truncate_message};
use http::StatusCode;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// The media type requested from the remote endpoint.
pub const ACCEPT_JSON: &str = "application/json";

/// A single GET request for a remote test result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteRequest {
    /// The resource URL.
    pub url: String,

    /// How long to wait for the response, including the body.
    pub read_timeout: Duration,
}

/// A response from the remote endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpResponse {
    /// The response status.
    pub status: StatusCode,

    /// The response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a new response.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the body if the status is below 300, otherwise a [`TransportError::Status`].
    pub fn into_body(self, url: &str) -> Result<String, TransportError> {
        if self.status.as_u16() < 300 {
            return Ok(self.body);
        }
        let message = self.status_message();
        Err(TransportError::Status {
            url: url.to_owned(),
            status: self.status,
            message,
        })
    }

    /// The message reported for a failed response: the body if there is one, otherwise the
    /// canonical reason for the status.
    pub fn status_message(&self) -> String {
        let body = self.body.trim();
        if body.is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_owned()
        } else {
            truncate_message(body)
        }
    }
}

/// Something that can run a [`RemoteRequest`].
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Performs the request.
    ///
    /// A response with any status is returned as `Ok`; only failures to complete the exchange
    /// are errors.
    fn get(&self, request: &RemoteRequest) -> Result<HttpResponse, TransportError>;
}

/// A blocking [`Transport`] backed by `ureq`.
///
/// An agent is built per request since the read timeout is part of the agent's config.
#[derive(Clone, Copy, Debug, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(read_timeout: Duration) -> Agent {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_recv_response(Some(read_timeout))
            .timeout_recv_body(Some(read_timeout))
            .build();
        Agent::new_with_config(config)
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &RemoteRequest) -> Result<HttpResponse, TransportError> {
        debug!(url = %request.url, read_timeout = ?request.read_timeout, "sending request");
        let mut response = Self::agent(request.read_timeout)
            .get(&request.url)
            .header("Accept", ACCEPT_JSON)
            .call()
            .map_err(|err| TransportError::Request {
                url: request.url.clone(),
                err: Box::new(err),
            })?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| TransportError::Body {
                url: request.url.clone(),
                err: Box::new(err),
            })?;
        debug!(url = %request.url, %status, "received response");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const URL: &str = "http://localhost:2990/jira/rest/atlassiantestrunner/1.0/runtest/it.Foo";

    #[test_case(200 ; "ok")]
    #[test_case(204 ; "no content")]
    #[test_case(299 ; "upper bound")]
    fn test_success_status(code: u16) {
        let response = HttpResponse::new(StatusCode::from_u16(code).unwrap(), "{}");
        assert_eq!(response.into_body(URL).unwrap(), "{}");
    }

    #[test_case(300, "", "Multiple Choices" ; "redirect without body")]
    #[test_case(404, "", "Not Found" ; "not found without body")]
    #[test_case(404, "  class not found  \n", "class not found" ; "body is trimmed")]
    #[test_case(500, "boom", "boom" ; "server error")]
    fn test_error_status(code: u16, body: &str, expected_message: &str) {
        let response = HttpResponse::new(StatusCode::from_u16(code).unwrap(), body);
        let err = response.into_body(URL).unwrap_err();
        match &err {
            TransportError::Status {
                url,
                status,
                message,
            } => {
                assert_eq!(url, URL);
                assert_eq!(status.as_u16(), code);
                assert_eq!(message, expected_message);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            format!("could not find resource for test [{URL}]; status: {code} - {expected_message}")
        );
    }

    #[test]
    fn test_unreachable_host() {
        // Port 9 (discard) is reserved and nothing should be listening on it locally.
        let request = RemoteRequest {
            url: "http://127.0.0.1:9/rest/atlassiantestrunner/1.0/runtest/it.Foo".to_owned(),
            read_timeout: Duration::from_secs(5),
        };
        let err = UreqTransport.get(&request).unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }), "{err}");
    }
}
