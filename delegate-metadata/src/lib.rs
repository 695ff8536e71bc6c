// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the results of remotely delegated test runs.
//!
//! A delegated run asks a remote service to execute one test class and gets back a single JSON
//! payload, modeled here as [`TestResultDetail`]. The payload is turned into a
//! [`TestOutcomeSet`]: one entry per test method, each either passed, ignored or failed.

pub mod adapters;
mod class_name;
mod errors;
mod exit_codes;
mod outcome;
mod representation;

pub use class_name::*;
pub use errors::*;
pub use exit_codes::*;
pub use outcome::*;
pub use representation::*;
