// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classification metrics
//!
//! Confusion-matrix counts and derived rates over a set of trial records.
//! Records predicted as `ERROR` or `UNCLASSIFIED` are excluded from the
//! matrix and counted separately. Every ratio is 0.0 when its denominator is
//! zero.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Serialize;
use shared_types::Label;

use crate::{error::HarnessError, types::TrialRecord};

/// Metrics for one group of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Group this summary covers (empty for ungrouped)
    pub group_key: String,
    /// Positive predicted, positive expected
    pub true_positive: usize,
    /// Negative predicted, negative expected
    pub true_negative: usize,
    /// Positive predicted, negative expected
    pub false_positive: usize,
    /// Negative predicted, positive expected
    pub false_negative: usize,
    /// `(TP + TN) / sample_count`
    pub accuracy: f64,
    /// `2TP / (2TP + FP + FN)`
    pub f1: f64,
    /// `TP / (TP + FN)`
    pub true_positive_rate: f64,
    /// `TN / (TN + FP)`
    pub true_negative_rate: f64,
    /// `FP / (FP + TN)`
    pub false_positive_rate: f64,
    /// `FN / (FN + TP)`
    pub false_negative_rate: f64,
    /// Records inside the confusion matrix
    pub sample_count: usize,
    /// All records in the group
    pub total_records: usize,
    /// Records predicted as `ERROR`
    pub error_count: usize,
    /// Records predicted as `UNCLASSIFIED`
    pub unclassified_count: usize,
    /// `total_records - sample_count`
    pub excluded_count: usize,
}

/// Compute metrics over `records` with the given positive and negative labels
pub fn compute_metrics(records: &[TrialRecord], positive: Label, negative: Label) -> MetricsSummary {
    compute_metrics_for(String::new(), records.iter(), positive, negative)
}

/// Compute metrics over `records`, tagging the summary with `group_key`
pub fn compute_metrics_for<'a>(
    group_key: impl Into<String>,
    records: impl IntoIterator<Item = &'a TrialRecord>,
    positive: Label,
    negative: Label,
) -> MetricsSummary {
    let (mut tp, mut tn, mut fp, mut fn_) = (0, 0, 0, 0);
    let (mut total, mut errors, mut unclassified) = (0, 0, 0);

    for record in records {
        total += 1;
        let (expected, predicted) = (record.ground_truth(), record.predicted());
        match predicted {
            Label::Error => errors += 1,
            Label::Unclassified => unclassified += 1,
            _ => {}
        }

        let known = |label: Label| label == positive || label == negative;
        if !known(expected) || !known(predicted) {
            continue;
        }

        match (expected == positive, predicted == positive) {
            (true, true) => tp += 1,
            (false, false) => tn += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
        }
    }

    let sample_count = tp + tn + fp + fn_;
    MetricsSummary {
        group_key: group_key.into(),
        true_positive: tp,
        true_negative: tn,
        false_positive: fp,
        false_negative: fn_,
        accuracy: ratio(tp + tn, sample_count),
        f1: ratio(2 * tp, 2 * tp + fp + fn_),
        true_positive_rate: ratio(tp, tp + fn_),
        true_negative_rate: ratio(tn, tn + fp),
        false_positive_rate: ratio(fp, fp + tn),
        false_negative_rate: ratio(fn_, fn_ + tp),
        sample_count,
        total_records: total,
        error_count: errors,
        unclassified_count: unclassified,
        excluded_count: total - sample_count,
    }
}

/// Compute smishing/benign metrics per group
pub fn compute_grouped_metrics<F>(records: &[TrialRecord], key_fn: F) -> BTreeMap<String, MetricsSummary>
where
    F: Fn(&TrialRecord) -> String,
{
    let mut groups: BTreeMap<String, Vec<&TrialRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let summary =
                compute_metrics_for(key.clone(), members, Label::POSITIVE, Label::NEGATIVE);
            (key, summary)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Standard grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    /// One group per prompt
    Prompt,
    /// One group per model
    Model,
    /// One group per (model, prompt) pair
    ModelAndPrompt,
}

impl GroupBy {
    /// Group key of `record`
    pub fn key(self, record: &TrialRecord) -> String {
        match self {
            GroupBy::Prompt => record.prompt_name().to_string(),
            GroupBy::Model => record.model_name().to_string(),
            GroupBy::ModelAndPrompt => {
                format!("{} / {}", record.model_name(), record.prompt_name())
            }
        }
    }

    /// Compute metrics grouped by this key
    pub fn compute(self, records: &[TrialRecord]) -> BTreeMap<String, MetricsSummary> {
        compute_grouped_metrics(records, |record| self.key(record))
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupBy::Prompt => "prompt",
            GroupBy::Model => "model",
            GroupBy::ModelAndPrompt => "model-prompt",
        })
    }
}

impl FromStr for GroupBy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(GroupBy::Prompt),
            "model" => Ok(GroupBy::Model),
            "model-prompt" | "model_prompt" => Ok(GroupBy::ModelAndPrompt),
            other => Err(HarnessError::validation(format!(
                "Unknown grouping '{other}' (expected prompt, model or model-prompt)"
            ))),
        }
    }
}

/// Correct/incorrect/error/unclassified counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// All records
    pub total: usize,
    /// Records whose prediction matched
    pub correct: usize,
    /// Classified records whose prediction did not match
    pub incorrect: usize,
    /// Records predicted as `ERROR`
    pub errors: usize,
    /// Records predicted as `UNCLASSIFIED`
    pub unclassified: usize,
}

impl RunSummary {
    /// Tally `records`
    pub fn from_records(records: &[TrialRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.predicted() {
                Label::Error => summary.errors += 1,
                Label::Unclassified => summary.unclassified += 1,
                _ if record.is_correct() => summary.correct += 1,
                _ => summary.incorrect += 1,
            }
            summary
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trials: {} correct, {} incorrect, {} errors, {} unclassified",
            self.total, self.correct, self.incorrect, self.errors, self.unclassified
        )
    }
}
