// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::OutcomeKind;
use thiserror::Error;

/// An error returned while parsing a [`TestClassName`](crate::TestClassName).
#[derive(Clone, Debug, Error)]
#[error("invalid test class name `{input}`: {reason}")]
pub struct ClassNameParseError {
    input: String,
    reason: &'static str,
}

impl ClassNameParseError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }

    /// The input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// A method was given more than one outcome.
///
/// The remote side is expected to place each method in exactly one partition. A payload that
/// lists a method as, say, both passed and failed is rejected rather than replayed twice.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("method `{method}` is listed as both {first} and {second}")]
pub struct OutcomeConflict {
    /// The method name.
    pub method: String,

    /// The partition the method was first seen in.
    pub first: OutcomeKind,

    /// The partition the method was seen in again.
    pub second: OutcomeKind,
}
