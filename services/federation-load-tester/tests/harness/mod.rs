// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the federation load tester.
//!
//! `scripted` provides an in-process transport with canned replies and
//! call counters; `sut` runs a small federation server over real HTTP.

#![allow(dead_code)]

pub mod scripted;
pub mod sut;
