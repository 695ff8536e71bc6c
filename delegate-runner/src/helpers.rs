// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for delegate-runner.

use crate::errors::DelegationError;
use delegate_metadata::FailureCause;
use std::error::Error;

/// The longest message taken from a remote response body, in characters.
pub(crate) const MAX_MESSAGE_CHARS: usize = 1024;

/// Truncates `message` to [`MAX_MESSAGE_CHARS`] characters, marking the cut with an ellipsis.
pub(crate) fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => format!("{}…", &message[..idx]),
        None => message.to_owned(),
    }
}

/// Converts a delegation error into the cause reported on the suite description.
///
/// The outermost cause carries the error category as its type. Each `source` in the error chain
/// becomes a nested cause.
pub(crate) fn cause_from_error(error: &DelegationError) -> FailureCause {
    let mut sources = Vec::new();
    let mut next = error.source();
    while let Some(source) = next {
        sources.push(source.to_string());
        next = source.source();
    }

    let nested = sources.into_iter().rev().fold(None, |inner, message| {
        Some(FailureCause {
            exception_type: None,
            message: Some(message),
            stack_trace: Vec::new(),
            cause: inner.map(Box::new),
        })
    });

    FailureCause {
        exception_type: Some(error.kind().to_owned()),
        message: Some(error.to_string()),
        stack_trace: Vec::new(),
        cause: nested.map(Box::new),
    }
}
