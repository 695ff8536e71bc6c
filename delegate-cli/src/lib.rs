// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run test classes on a remote test service from the command line.
//!
//! The binary is `delegate-test`. Run `delegate-test run --help` for usage.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::ExpectedError;
#[doc(hidden)]
pub use output::{Color, OutputContext, StderrStyles};
