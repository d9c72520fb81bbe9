// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Experiment orchestration
//!
//! An [`Experiment`] runs every (model, prompt, item) cell once, models in the
//! outer loop and dataset items in the inner loop. Cells can overlap up to
//! [`RunOptions::concurrency`], but records always come back in enumeration
//! order.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    num::NonZeroUsize,
    path::Path,
    pin::pin,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt, future, stream};
use model_client::ModelClient;
use serde::Serialize;
use shared_types::Label;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{HarnessError, HarnessResult},
    metrics::{GroupBy, MetricsSummary, RunSummary, compute_metrics_for},
    retry::RetryPolicy,
    store::ResultStore,
    trace::TraceSink,
    trial::TrialExecutor,
    types::{DatasetItem, PromptDefinition, TrialRecord},
};

/// Upper bound on in-flight cells
pub const MAX_CONCURRENCY: usize = 64;

/// Execution settings for a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Retry policy applied to every model call
    pub retry: RetryPolicy,
    /// Maximum number of cells in flight
    pub concurrency: NonZeroUsize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            concurrency: NonZeroUsize::MIN,
        }
    }
}

impl RunOptions {
    /// Create run options
    ///
    /// # Errors
    ///
    /// Returns a setup error if `concurrency` is outside `1..=64`
    pub fn new(retry: RetryPolicy, concurrency: usize) -> HarnessResult<Self> {
        let concurrency = NonZeroUsize::new(concurrency)
            .filter(|n| n.get() <= MAX_CONCURRENCY)
            .ok_or_else(|| {
                HarnessError::setup(format!(
                    "Invalid concurrency: {concurrency} (must be 1-{MAX_CONCURRENCY})"
                ))
            })?;
        Ok(Self { retry, concurrency })
    }
}

/// Progress notification sent after each finished cell
#[derive(Debug)]
pub struct Progress<'a> {
    /// Cells finished so far, this one included
    pub current: usize,
    /// Cells in the full matrix
    pub total: usize,
    /// The record just produced
    pub record: &'a TrialRecord,
}

type ProgressCallback = Box<dyn Fn(&Progress<'_>) + Send + Sync>;

/// A validated models x prompts x dataset matrix
pub struct Experiment<M> {
    models: Vec<M>,
    prompts: Vec<PromptDefinition>,
    dataset: Vec<DatasetItem>,
    options: RunOptions,
    trace_sink: Option<Arc<dyn TraceSink>>,
    progress: Option<ProgressCallback>,
}

impl<M> fmt::Debug for Experiment<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("models", &self.models.len())
            .field("prompts", &self.prompts.len())
            .field("dataset", &self.dataset.len())
            .field("options", &self.options)
            .field("trace_sink", &self.trace_sink)
            .finish_non_exhaustive()
    }
}

impl<M: ModelClient> Experiment<M> {
    /// Create a new experiment
    ///
    /// # Errors
    ///
    /// Returns a setup error if models, prompts or dataset are empty, or if a
    /// model name, prompt name or item id repeats
    pub fn new(
        models: Vec<M>,
        prompts: Vec<PromptDefinition>,
        dataset: Vec<DatasetItem>,
        options: RunOptions,
    ) -> HarnessResult<Self> {
        ensure_unique("model name", models.iter().map(ModelClient::model_name))?;
        ensure_unique("prompt name", prompts.iter().map(PromptDefinition::name))?;
        ensure_unique("dataset item id", dataset.iter().map(DatasetItem::id))?;

        Ok(Self {
            models,
            prompts,
            dataset,
            options,
            trace_sink: None,
            progress: None,
        })
    }

    /// Send a trace event for every trial to `sink`
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Call `callback` after every finished cell
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Number of cells in the matrix
    pub fn total_trials(&self) -> usize {
        self.models.len() * self.prompts.len() * self.dataset.len()
    }

    /// Run the matrix until done or until `cancel` fires
    ///
    /// Cancellation stops new cells from starting. Cells already running
    /// finish, and their records are kept in the report.
    pub async fn run(&self, cancel: CancellationToken) -> ExperimentReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = self.total_trials();

        info!(
            run_id = %run_id,
            models = self.models.len(),
            prompts = self.prompts.len(),
            items = self.dataset.len(),
            total,
            concurrency = self.options.concurrency.get(),
            "Starting experiment"
        );

        let mut executor = TrialExecutor::new(self.options.retry.clone(), cancel.clone());
        if let Some(sink) = &self.trace_sink {
            executor = executor.with_trace_sink(run_id, sink.clone());
        }
        let executor = &executor;

        let cells = self.models.iter().flat_map(|model| {
            self.prompts.iter().flat_map(move |prompt| {
                self.dataset.iter().map(move |item| (model, prompt, item))
            })
        });

        let schedule = cancel.clone();
        let mut trials = pin!(
            stream::iter(cells)
                .take_while(move |_| future::ready(!schedule.is_cancelled()))
                .map(move |(model, prompt, item)| executor.run_trial(model, prompt, item))
                .buffered(self.options.concurrency.get())
        );

        let mut records = Vec::with_capacity(total);
        while let Some(record) = trials.next().await {
            let current = records.len() + 1;
            info!(
                current,
                total,
                model = %record.model_name(),
                prompt = %record.prompt_name(),
                item = %record.item_id(),
                predicted = %record.predicted(),
                "Progress"
            );
            if let Some(progress) = &self.progress {
                progress(&Progress {
                    current,
                    total,
                    record: &record,
                });
            }
            records.push(record);
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                run_id = %run_id,
                completed = records.len(),
                total,
                "Experiment cancelled, keeping completed trials"
            );
        }

        let report = ExperimentReport::from_records(run_id, records, cancelled, started_at, Utc::now());
        info!(run_id = %run_id, summary = %report.summary, "Experiment finished");
        report
    }
}

fn ensure_unique<'a>(kind: &str, names: impl ExactSizeIterator<Item = &'a str>) -> HarnessResult<()> {
    if names.len() == 0 {
        return Err(HarnessError::setup(format!("No {kind}s given")));
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(HarnessError::setup(format!("Duplicate {kind} '{name}'")));
        }
    }
    Ok(())
}

/// Records and metrics of a finished (or cancelled) run
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// One record per finished cell, in enumeration order
    pub records: Vec<TrialRecord>,
    /// Correct/incorrect/error/unclassified counts
    pub summary: RunSummary,
    /// Metrics over every record
    pub overall: MetricsSummary,
    /// Metrics per prompt
    pub by_prompt: BTreeMap<String, MetricsSummary>,
    /// Metrics per model
    pub by_model: BTreeMap<String, MetricsSummary>,
    /// Metrics per (model, prompt) pair
    pub by_model_and_prompt: BTreeMap<String, MetricsSummary>,
    /// Whether cancellation cut the run short
    pub cancelled: bool,
    /// Run start time
    pub started_at: DateTime<Utc>,
    /// Run end time
    pub finished_at: DateTime<Utc>,
}

impl ExperimentReport {
    /// Compute the summaries for `records`
    pub fn from_records(
        run_id: Uuid,
        records: Vec<TrialRecord>,
        cancelled: bool,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            summary: RunSummary::from_records(&records),
            overall: compute_metrics_for("overall", &records, Label::POSITIVE, Label::NEGATIVE),
            by_prompt: GroupBy::Prompt.compute(&records),
            by_model: GroupBy::Model.compute(&records),
            by_model_and_prompt: GroupBy::ModelAndPrompt.compute(&records),
            records,
            cancelled,
            started_at,
            finished_at,
        }
    }

    /// Write the records to a CSV result file
    ///
    /// The report is left untouched on failure so the write can be retried.
    pub fn persist(&self, path: impl AsRef<Path>) -> HarnessResult<()> {
        ResultStore::write(&self.records, path)
    }
}

/// Run every model against every prompt and item with default options
pub async fn run_experiment<M: ModelClient>(
    models: Vec<M>,
    prompts: Vec<PromptDefinition>,
    dataset: Vec<DatasetItem>,
) -> HarnessResult<Vec<TrialRecord>> {
    let experiment = Experiment::new(models, prompts, dataset, RunOptions::default())?;
    Ok(experiment.run(CancellationToken::new()).await.records)
}

#[cfg(test)]
mod tests {
    use model_client::ProviderError;

    use super::*;

    #[derive(Debug)]
    struct NamedModel(&'static str);

    impl ModelClient for NamedModel {
        fn model_name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("##Classification: 'benign'".to_string())
        }
    }

    fn prompts() -> Vec<PromptDefinition> {
        vec![PromptDefinition::new("p1", "{sms_text}", "").unwrap()]
    }

    fn dataset() -> Vec<DatasetItem> {
        vec![
            DatasetItem::new("1", "Win a prize", Label::Smishing).unwrap(),
            DatasetItem::new("2", "See you at 5", Label::Benign).unwrap(),
        ]
    }

    #[test]
    fn setup_validation() {
        let empty_models: Vec<NamedModel> = Vec::new();
        let error = Experiment::new(empty_models, prompts(), dataset(), RunOptions::default())
            .unwrap_err();
        assert!(error.is_setup_error());
        assert!(error.to_string().contains("No model names given"));

        let error = Experiment::new(vec![NamedModel("m")], vec![], dataset(), RunOptions::default())
            .unwrap_err();
        assert!(error.is_setup_error());

        let error = Experiment::new(vec![NamedModel("m")], prompts(), vec![], RunOptions::default())
            .unwrap_err();
        assert!(error.is_setup_error());

        let error = Experiment::new(
            vec![NamedModel("m"), NamedModel("m")],
            prompts(),
            dataset(),
            RunOptions::default(),
        )
        .unwrap_err();
        assert!(error.to_string().contains("Duplicate model name 'm'"));

        let mut items = dataset();
        items.push(DatasetItem::new("1", "again", Label::Benign).unwrap());
        let error =
            Experiment::new(vec![NamedModel("m")], prompts(), items, RunOptions::default())
                .unwrap_err();
        assert!(error.to_string().contains("Duplicate dataset item id '1'"));
    }

    #[test]
    fn run_options_bounds() {
        assert!(RunOptions::new(RetryPolicy::default(), 0).is_err());
        assert!(RunOptions::new(RetryPolicy::default(), MAX_CONCURRENCY + 1).is_err());
        assert_eq!(
            RunOptions::new(RetryPolicy::default(), 4)
                .unwrap()
                .concurrency
                .get(),
            4
        );
        assert_eq!(RunOptions::default().concurrency.get(), 1);
    }

    #[test]
    fn total_trials_is_matrix_size() {
        let experiment = Experiment::new(
            vec![NamedModel("a"), NamedModel("b")],
            prompts(),
            dataset(),
            RunOptions::default(),
        )
        .unwrap();
        assert_eq!(experiment.total_trials(), 4);
    }

    #[tokio::test]
    async fn report_summaries() {
        let records = run_experiment(vec![NamedModel("a")], prompts(), dataset())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);

        let now = Utc::now();
        let report = ExperimentReport::from_records(Uuid::new_v4(), records, false, now, now);
        assert_eq!(report.summary.correct, 1);
        assert_eq!(report.summary.incorrect, 1);
        assert_eq!(report.overall.group_key, "overall");
        assert_eq!(report.overall.false_negative, 1);
        assert_eq!(report.by_prompt.len(), 1);
        assert_eq!(report.by_model["a"].sample_count, 2);
        assert!(report.by_model_and_prompt.contains_key("a / p1"));
    }
}
