// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for abuse simulation against the export service.
//!
//! Drives the rate limiter, URL validator and HTML sanitizer with hostile
//! traffic patterns and records what got through.

pub mod attacks;
pub mod generators;
pub mod metrics;
