// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared fixtures and payload generators for the comment board tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod generators;
