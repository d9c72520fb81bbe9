// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the smishing evaluation harness
//!
//! This crate provides the label vocabulary that is shared across the
//! provider adapters, the harness and the command line tool.

pub mod label;

pub use label::{Label, UnknownLabel};
