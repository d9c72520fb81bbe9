// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Subcommand implementations

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use harness::{
    Dataset, Experiment, ExperimentReport, JsonLinesSink, Label, PromptCatalog, ResultStore,
    compute_metrics_for, default_results_path,
};
use model_client::ModelClient;
use providers::ProviderClient;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    args::{MetricsArgs, RunArgs},
    config::EvalConfig,
    output,
};

/// Where a finished run went
#[derive(Debug)]
pub struct RunOutcome {
    /// The run's records and metrics
    pub report: ExperimentReport,
    /// Result file that was written
    pub results_path: PathBuf,
}

/// Execute the `run` command until done or until `cancel` fires
///
/// Setup problems (unreadable inputs, unknown prompts, misconfigured
/// providers) fail before any model is called. A run that was cancelled still
/// writes its partial results.
pub async fn run(
    args: &RunArgs,
    config: &EvalConfig,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    let options = config
        .run_options(args.concurrency)
        .context("invalid run options")?;

    let dataset = Dataset::from_file(&args.dataset).await?;
    let prompts = PromptCatalog::from_file(&args.prompts)
        .await?
        .select(args.prompt_names.as_slice())?;

    let settings = config.provider_settings();
    let models = args
        .models
        .iter()
        .map(|selector| {
            settings
                .build(selector)
                .with_context(|| format!("failed to configure model {selector}"))
        })
        .collect::<Result<Vec<ProviderClient>>>()?;

    let results_path = match &args.output {
        Some(path) => path.clone(),
        None => {
            let dir = args.output_dir.as_ref().unwrap_or(&config.run.output_dir);
            default_results_path(dir, &results_prefix(&models))
        }
    };

    let mut experiment = Experiment::new(
        models,
        prompts.into_prompts(),
        dataset.into_items(),
        options,
    )?
    .with_progress(|progress| {
        println!(
            "{}",
            output::progress_line(progress.current, progress.total, progress.record)
        );
    });
    if let Some(trace_file) = &args.trace_file {
        let sink = JsonLinesSink::open(trace_file)
            .with_context(|| format!("failed to open trace file {}", trace_file.display()))?;
        experiment = experiment.with_trace_sink(Arc::new(sink));
    }

    let report = experiment.run(cancel).await;
    println!("\n{}", output::report(&report));

    if let Err(e) = report.persist(&results_path) {
        error!(error = %e, path = %results_path.display(), "Failed to save results");
        return Err(e).context("results were computed but could not be saved");
    }
    info!(path = %results_path.display(), records = report.records.len(), "Results saved");
    println!("Results saved to {}", results_path.display());

    Ok(RunOutcome {
        report,
        results_path,
    })
}

/// Execute the `metrics` command and return the rendered output
pub fn metrics(args: &MetricsArgs) -> Result<String> {
    let records = ResultStore::read(&args.input)
        .with_context(|| format!("failed to read results from {}", args.input.display()))?;

    let groups = args.group_by.compute(&records);
    let overall = compute_metrics_for("overall", &records, Label::POSITIVE, Label::NEGATIVE);

    if args.json {
        let document = json!({
            "group_by": args.group_by.to_string(),
            "overall": overall,
            "groups": groups,
        });
        return Ok(serde_json::to_string_pretty(&document)?);
    }

    let mut text = output::metrics_table(&args.group_by.to_string(), &groups);
    text.push('\n');
    text.push_str(&output::metrics_table(
        "overall",
        &[("overall".to_string(), overall)].into_iter().collect(),
    ));
    Ok(text)
}

/// File name prefix: the model name for single-model runs
fn results_prefix(models: &[ProviderClient]) -> String {
    match models {
        [model] => sanitize(model.model_name()),
        _ => "experiment".to_string(),
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
