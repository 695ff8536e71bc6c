// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON shape of a remote test result.

use crate::{
    FailureCause,
    adapters::{self, Annotation, ClassLiteral},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI32, AtomicI64},
};

/// The result payload returned by the remote test endpoint for one class.
///
/// The three method partitions are required: a payload without them is not a test result.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultDetail {
    /// The class the remote side ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classname: Option<String>,

    /// The remote runner's own summary, if it sent one.
    #[serde(default, with = "adapters::maybe")]
    pub test_result: Option<RunSummary>,

    /// Methods that passed.
    pub passed_methods: Vec<String>,

    /// Methods that were ignored.
    pub ignored_methods: Vec<String>,

    /// Methods that failed, keyed by method name. A method name may appear only once.
    #[serde(deserialize_with = "adapters::unique_keys::deserialize")]
    pub failed_methods: BTreeMap<String, RemoteFailure>,
}

/// A single failure reported by the remote side.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RemoteFailure {
    /// The remote description of the failed test.
    #[serde(
        alias = "fDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<RemoteDescription>,

    /// Why it failed.
    #[serde(alias = "fThrownException")]
    pub cause: FailureCause,
}

/// The remote side's description of a test or suite.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RemoteDescription {
    /// The human-readable name.
    #[serde(rename = "fDisplayName", alias = "displayName", default)]
    pub display_name: String,

    /// Annotations on the test method or class.
    #[serde(
        rename = "fAnnotations",
        alias = "annotations",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub annotations: Vec<Annotation>,

    /// The test class, if the description refers to one.
    #[serde(
        rename = "fTestClass",
        alias = "testClass",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub test_class: Option<ClassLiteral>,

    /// Child descriptions, for suites.
    #[serde(
        rename = "fChildren",
        alias = "children",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<RemoteDescription>,
}

/// The remote runner's summary of the run.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// The number of tests run.
    #[serde(default, with = "adapters::atomic_i32")]
    pub count: AtomicI32,

    /// The number of tests ignored.
    #[serde(default, with = "adapters::atomic_i32")]
    pub ignore_count: AtomicI32,

    /// The run time, in milliseconds.
    #[serde(default, with = "adapters::atomic_i64")]
    pub run_time: AtomicI64,

    /// The start time, in milliseconds since the epoch.
    #[serde(default, with = "adapters::atomic_i64")]
    pub start_time: AtomicI64,

    /// Failures as seen by the remote runner.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RemoteFailure>,
}
