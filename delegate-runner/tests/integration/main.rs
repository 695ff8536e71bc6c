// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the delegating runner.

mod basic;
mod fixtures;
