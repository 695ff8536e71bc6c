// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::OutcomeConflict,
    representation::{RemoteFailure, TestResultDetail},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// The cause of a failed test, as reported by the remote side.
///
/// This mirrors an exception: a type, an optional message, the frames it was thrown from, and an
/// optional nested cause.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureCause {
    /// The fully-qualified type of the exception, if known.
    #[serde(
        rename = "type",
        alias = "class",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exception_type: Option<String>,

    /// The exception message.
    #[serde(alias = "detailMessage", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The stack frames, innermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<StackFrame>,

    /// The exception that caused this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FailureCause>>,
}

impl FailureCause {
    /// Creates a new cause with the given type and message.
    pub fn new(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception_type: Some(exception_type.into()),
            message: Some(message.into()),
            stack_trace: Vec::new(),
            cause: None,
        }
    }

    /// Sets the nested cause.
    pub fn with_cause(mut self, cause: FailureCause) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates over this cause and all nested causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &FailureCause> {
        std::iter::successors(Some(self), |cause| cause.cause.as_deref())
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.exception_type, &self.message) {
            (Some(ty), Some(message)) => write!(f, "{ty}: {message}"),
            (Some(ty), None) => f.write_str(ty),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("(no message)"),
        }
    }
}

/// A single stack frame in a [`FailureCause`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// The class that declares the method.
    pub declaring_class: String,

    /// The method name.
    pub method_name: String,

    /// The source file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// The line number. Negative values mean unknown or native.
    #[serde(default)]
    pub line_number: i32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}.{}", self.declaring_class, self.method_name)?;
        match (&self.file_name, self.line_number) {
            (Some(file), line) if line >= 0 => write!(f, "({file}:{line})"),
            (Some(file), _) => write!(f, "({file})"),
            (None, _) => f.write_str("(Unknown Source)"),
        }
    }
}

/// The partition a method was reported in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum OutcomeKind {
    /// The method passed.
    Passed,

    /// The method was ignored.
    Ignored,

    /// The method failed.
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Passed => f.write_str("passed"),
            OutcomeKind::Ignored => f.write_str("ignored"),
            OutcomeKind::Failed => f.write_str("failed"),
        }
    }
}

/// The outcome of a single remotely executed test method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestOutcome {
    /// The method passed.
    Passed,

    /// The method was ignored.
    Ignored,

    /// The method failed with the given cause.
    Failed(FailureCause),
}

impl TestOutcome {
    /// Returns the partition this outcome belongs to.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            TestOutcome::Passed => OutcomeKind::Passed,
            TestOutcome::Ignored => OutcomeKind::Ignored,
            TestOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }
}

/// A method name together with its outcome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodOutcome {
    /// The test method name.
    pub method: String,

    /// What happened to it.
    pub outcome: TestOutcome,
}

/// The outcomes of every method in one remotely executed test class.
///
/// Each method appears exactly once. A `TestOutcomeSet` is built from one decoded payload and is
/// not modified afterwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestOutcomeSet {
    outcomes: Vec<MethodOutcome>,
}

impl TestOutcomeSet {
    /// Builds a set from method outcomes, rejecting methods that appear more than once.
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = (impl Into<String>, TestOutcome)>,
    ) -> Result<Self, OutcomeConflict> {
        let mut seen: BTreeMap<String, OutcomeKind> = BTreeMap::new();
        let mut out = Vec::new();
        for (method, outcome) in outcomes {
            let method = method.into();
            let kind = outcome.kind();
            if let Some(first) = seen.insert(method.clone(), kind) {
                return Err(OutcomeConflict {
                    method,
                    first,
                    second: kind,
                });
            }
            out.push(MethodOutcome { method, outcome });
        }
        Ok(Self { outcomes: out })
    }

    /// Builds a set from the wire representation.
    ///
    /// Passed methods come first, then ignored, then failed. The passed and ignored partitions
    /// are sets: a name repeated within one of them counts once. A name that appears in two
    /// partitions is a conflict.
    pub fn from_detail(detail: TestResultDetail) -> Result<Self, OutcomeConflict> {
        let passed = distinct(detail.passed_methods).map(|method| (method, TestOutcome::Passed));
        let ignored =
            distinct(detail.ignored_methods).map(|method| (method, TestOutcome::Ignored));
        let failed = detail
            .failed_methods
            .into_iter()
            .map(|(method, failure)| (method, TestOutcome::Failed(failure.cause)));
        Self::from_outcomes(passed.chain(ignored).chain(failed))
    }

    /// Converts this set back into the wire representation.
    pub fn to_detail(&self, classname: Option<&str>) -> TestResultDetail {
        let mut detail = TestResultDetail {
            classname: classname.map(ToOwned::to_owned),
            test_result: None,
            passed_methods: Vec::new(),
            ignored_methods: Vec::new(),
            failed_methods: BTreeMap::new(),
        };
        for MethodOutcome { method, outcome } in &self.outcomes {
            match outcome {
                TestOutcome::Passed => detail.passed_methods.push(method.clone()),
                TestOutcome::Ignored => detail.ignored_methods.push(method.clone()),
                TestOutcome::Failed(cause) => {
                    detail.failed_methods.insert(
                        method.clone(),
                        RemoteFailure {
                            description: None,
                            cause: cause.clone(),
                        },
                    );
                }
            }
        }
        detail
    }

    /// Iterates over all method outcomes.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MethodOutcome> {
        self.outcomes.iter()
    }

    /// Iterates over the names of passed methods.
    pub fn passed(&self) -> impl Iterator<Item = &str> {
        self.names_of(OutcomeKind::Passed)
    }

    /// Iterates over the names of ignored methods.
    pub fn ignored(&self) -> impl Iterator<Item = &str> {
        self.names_of(OutcomeKind::Ignored)
    }

    /// Iterates over failed methods and their causes.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &FailureCause)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            TestOutcome::Failed(cause) => Some((o.method.as_str(), cause)),
            TestOutcome::Passed | TestOutcome::Ignored => None,
        })
    }

    /// Returns the method names in each partition.
    pub fn partitions(&self) -> BTreeMap<OutcomeKind, BTreeSet<&str>> {
        let mut partitions: BTreeMap<OutcomeKind, BTreeSet<&str>> = BTreeMap::new();
        for o in &self.outcomes {
            partitions
                .entry(o.outcome.kind())
                .or_default()
                .insert(o.method.as_str());
        }
        partitions
    }

    /// The number of methods across all partitions.
    pub fn total_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the remote side reported no methods at all.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn names_of(&self, kind: OutcomeKind) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(move |o| o.outcome.kind() == kind)
            .map(|o| o.method.as_str())
    }
}

/// Yields each name once, in first-seen order.
fn distinct(names: Vec<String>) -> impl Iterator<Item = String> {
    let mut seen = BTreeSet::new();
    names.into_iter().filter(move |name| seen.insert(name.clone()))
}

impl<'a> IntoIterator for &'a TestOutcomeSet {
    type Item = &'a MethodOutcome;
    type IntoIter = std::slice::Iter<'a, MethodOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}
