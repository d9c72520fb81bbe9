// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end of the smishing evaluation harness
//!
//! `smishing-eval run` evaluates one or more models against a prompt catalog
//! and a labelled dataset, prints per-prompt metrics and writes a CSV result
//! file. `smishing-eval metrics` recomputes metrics from such a file.
//!
//! ```text
//! smishing-eval run \
//!     --dataset data/dataset.json \
//!     --prompts prompts/prompts.yaml \
//!     --model ollama:gemma3n:e2b \
//!     --model openai:gpt-4o-mini
//!
//! smishing-eval metrics --input results/gemma3n_e2b_results_20250101_120000.csv --group-by model-prompt
//! ```

pub mod args;
pub mod commands;
pub mod config;
pub mod output;
pub mod signal;

pub use args::{Cli, Commands, MetricsArgs, RunArgs};
pub use config::EvalConfig;
