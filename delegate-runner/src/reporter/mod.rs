// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of a delegated run in human and machine-readable formats.
//!
//! Every reporter here is a [`RunListener`](crate::notifier::RunListener) and is attached to a
//! [`RunNotifier`](crate::notifier::RunNotifier).

mod junit;
mod println;
mod structured;

pub use junit::*;
pub use println::*;
pub use structured::*;
