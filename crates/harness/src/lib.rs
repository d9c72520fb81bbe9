// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Evaluation harness for LLM-based SMS phishing classification
//!
//! This crate runs a fixed matrix of models x prompts x labelled SMS messages,
//! parses each model answer into a label, and aggregates the results into
//! confusion-matrix metrics. Everything provider-specific lives behind the
//! [`model_client::ModelClient`] trait.
//!
//! # Architecture
//!
//! - [`parser`]: label and explanation extraction from free-form responses
//! - [`retry`]: exponential backoff around model calls, cancellable waits
//! - [`trial`]: one (model, prompt, item) evaluation, never fails
//! - [`runner`]: matrix enumeration, bounded concurrency, cancellation
//! - [`metrics`]: TP/TN/FP/FN, accuracy, F1 and rates, grouped by key
//! - [`store`]: CSV result files
//! - [`catalog`]: dataset and prompt catalog loading
//! - [`trace`]: optional per-trial event sinks
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use harness::{Dataset, Experiment, PromptCatalog, RunOptions};
//! use model_client::{ModelClient, ProviderError};
//! use tokio_util::sync::CancellationToken;
//!
//! struct AlwaysBenign;
//!
//! impl ModelClient for AlwaysBenign {
//!     fn model_name(&self) -> &str {
//!         "always-benign"
//!     }
//!
//!     async fn invoke(&self, _prompt: &str) -> Result<String, ProviderError> {
//!         Ok("##Classification: 'benign'".to_string())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = Dataset::from_file("data/dataset.json").await?;
//! let prompts = PromptCatalog::from_file("prompts/prompts.yaml").await?;
//!
//! let experiment = Experiment::new(
//!     vec![AlwaysBenign],
//!     prompts.into_prompts(),
//!     dataset.into_items(),
//!     RunOptions::default(),
//! )?;
//!
//! let report = experiment.run(CancellationToken::new()).await;
//! report.persist("results/always_benign_results.csv")?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod retry;
pub mod runner;
pub mod store;
pub mod trace;
pub mod trial;
pub mod types;

// Re-export main types for convenience
pub use catalog::{Dataset, PromptCatalog};
pub use error::{HarnessError, HarnessResult};
pub use metrics::{
    GroupBy, MetricsSummary, RunSummary, compute_grouped_metrics, compute_metrics,
    compute_metrics_for,
};
pub use parser::{DEFAULT_EXPLANATION, parse_classification, parse_explanation};
pub use retry::{RetryError, RetryPolicy};
pub use runner::{Experiment, ExperimentReport, Progress, RunOptions, run_experiment};
pub use shared_types::Label;
pub use store::{ResultStore, default_results_path};
pub use trace::{JsonLinesSink, LogSink, TraceSink, TrialEvent};
pub use trial::TrialExecutor;
pub use types::{DatasetItem, PromptDefinition, TrialKey, TrialRecord};
