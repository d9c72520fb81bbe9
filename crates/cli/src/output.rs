// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Plain-text rendering of run results

use std::{collections::BTreeMap, fmt::Write};

use harness::{ExperimentReport, MetricsSummary, RunSummary, TrialRecord};

/// One progress line, e.g. `[3/12] gpt-4o prompt_01 #17: smishing (correct)`
pub fn progress_line(current: usize, total: usize, record: &TrialRecord) -> String {
    let verdict = if record.is_correct() {
        "correct"
    } else if record.predicted().is_classification() {
        "incorrect"
    } else {
        "excluded"
    };
    format!(
        "[{current}/{total}] {} {} #{}: {} ({verdict})",
        record.model_name(),
        record.prompt_name(),
        record.item_id(),
        record.predicted()
    )
}

/// Metrics table, one row per group
pub fn metrics_table(title: &str, groups: &BTreeMap<String, MetricsSummary>) -> String {
    let width = groups
        .keys()
        .map(String::len)
        .chain([title.len()])
        .max()
        .unwrap_or_default();

    let mut table = String::new();
    let _ = writeln!(
        table,
        "{title:<width$}  {:>5} {:>5} {:>5} {:>5}  {:>8} {:>8} {:>6} {:>6} {:>6} {:>6}  {:>7}",
        "TP", "TN", "FP", "FN", "accuracy", "f1", "TPR", "TNR", "FPR", "FNR", "n/total"
    );
    for (key, metrics) in groups {
        let _ = writeln!(
            table,
            "{key:<width$}  {:>5} {:>5} {:>5} {:>5}  {:>8.3} {:>8.3} {:>6.3} {:>6.3} {:>6.3} {:>6.3}  {:>7}",
            metrics.true_positive,
            metrics.true_negative,
            metrics.false_positive,
            metrics.false_negative,
            metrics.accuracy,
            metrics.f1,
            metrics.true_positive_rate,
            metrics.true_negative_rate,
            metrics.false_positive_rate,
            metrics.false_negative_rate,
            format!("{}/{}", metrics.sample_count, metrics.total_records),
        );
    }
    table
}

/// Summary line followed by the per-prompt and per-model tables
pub fn report(report: &ExperimentReport) -> String {
    let mut out = summary_line(&report.summary, report.cancelled);
    out.push('\n');
    out.push('\n');
    out.push_str(&metrics_table("prompt", &report.by_prompt));
    if report.by_model.len() > 1 {
        out.push('\n');
        out.push_str(&metrics_table("model", &report.by_model));
    }
    out
}

fn summary_line(summary: &RunSummary, cancelled: bool) -> String {
    if cancelled {
        format!("{summary} (cancelled, partial results)")
    } else {
        summary.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use harness::{DatasetItem, GroupBy, Label};
    use uuid::Uuid;

    use super::*;

    fn records() -> Vec<TrialRecord> {
        let spam = DatasetItem::new("1", "Verify your account now", Label::Smishing).unwrap();
        let ham = DatasetItem::new("2", "See you at lunch", Label::Benign).unwrap();
        let now = Utc::now();
        vec![
            TrialRecord::completed("gpt-4o", "prompt_01", &spam, Label::Smishing, "link", now),
            TrialRecord::completed("gpt-4o", "prompt_01", &ham, Label::Smishing, "odd", now),
            TrialRecord::completed("gpt-4o", "prompt_02", &spam, Label::Unclassified, "", now),
            TrialRecord::failed("gpt-4o", "prompt_02", &ham, "HTTP 503", now),
        ]
    }

    #[test]
    fn progress_verdicts() {
        let records = records();
        assert_eq!(
            progress_line(1, 4, &records[0]),
            "[1/4] gpt-4o prompt_01 #1: smishing (correct)"
        );
        assert!(progress_line(2, 4, &records[1]).ends_with("(incorrect)"));
        assert!(progress_line(3, 4, &records[2]).ends_with("unclassified (excluded)"));
        assert!(progress_line(4, 4, &records[3]).ends_with("ERROR (excluded)"));
    }

    #[test]
    fn table_has_a_row_per_group() {
        let table = metrics_table("prompt", &GroupBy::Prompt.compute(&records()));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("prompt"));
        assert!(lines[0].contains("accuracy"));
        assert!(lines[1].starts_with("prompt_01"));
        assert!(lines[1].contains("0.500"));
        assert!(lines[1].ends_with("2/2"));
        assert!(lines[2].ends_with("0/2"));
    }

    #[test]
    fn report_marks_cancelled_runs() {
        let now = Utc::now();
        let report = ExperimentReport::from_records(Uuid::new_v4(), records(), true, now, now);
        let text = super::report(&report);

        assert!(text.starts_with(
            "4 trials: 1 correct, 1 incorrect, 1 errors, 1 unclassified (cancelled, partial results)"
        ));
        assert!(text.contains("prompt_02"));
        assert!(!text.contains("\nmodel "));
    }
}
