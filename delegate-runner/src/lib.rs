// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for delegating test classes to a remote test service.
//!
//! The basic flow is:
//!
//! 1. build a [`RunnerConfig`](config::RunnerConfig), usually with
//!    [`RunnerConfig::from_sources`](config::RunnerConfig::from_sources);
//! 2. create a [`DelegatingRunner`](runner::DelegatingRunner) for a class;
//! 3. attach listeners from [`reporter`] to a [`RunNotifier`](notifier::RunNotifier) and call
//!    [`execute`](runner::execute).

pub mod codec;
pub mod config;
pub mod errors;
mod helpers;
pub mod http;
pub mod notifier;
pub mod reporter;
pub mod runner;
