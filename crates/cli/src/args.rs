// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use harness::GroupBy;
use providers::ModelSelector;

/// Evaluate LLMs as SMS phishing classifiers
#[derive(Parser, Debug)]
#[command(name = "smishing-eval")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run models x prompts x dataset and write a result file
    Run(RunArgs),

    /// Recompute metrics from an existing result file
    Metrics(MetricsArgs),
}

/// Arguments of the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Labelled dataset (JSON array)
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Prompt catalog (YAML or JSON)
    #[arg(short, long)]
    pub prompts: PathBuf,

    /// Prompt names to run (repeatable, default: all)
    #[arg(long = "prompt", value_name = "NAME")]
    pub prompt_names: Vec<String>,

    /// Model as provider:model, e.g. ollama:gemma3n:e2b (repeatable)
    #[arg(short, long = "model", value_name = "PROVIDER:MODEL", required = true)]
    pub models: Vec<ModelSelector>,

    /// Result file path
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for a timestamped result file (default from configuration)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Trials in flight at once (default from configuration)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Append one JSON line per trial to this file
    #[arg(long)]
    pub trace_file: Option<PathBuf>,
}

/// Arguments of the `metrics` command
#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Result file written by `run`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Grouping key: prompt, model or model-prompt
    #[arg(short, long, default_value = "prompt")]
    pub group_by: GroupBy,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use providers::ProviderKind;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from([
            "smishing-eval",
            "run",
            "--dataset",
            "data/dataset.json",
            "--prompts",
            "prompts/prompts.yaml",
            "--model",
            "ollama:gemma3n:e2b",
            "-m",
            "openai:gpt-4o",
            "--prompt",
            "prompt_01",
            "--concurrency",
            "4",
        ])
        .unwrap();

        assert!(!cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.models.len(), 2);
        assert_eq!(args.models[0].provider(), ProviderKind::Ollama);
        assert_eq!(args.models[0].model(), "gemma3n:e2b");
        assert_eq!(args.prompt_names, vec!["prompt_01"]);
        assert_eq!(args.concurrency, Some(4));
        assert!(args.output.is_none());
    }

    #[test]
    fn run_requires_a_valid_model() {
        let missing = Cli::try_parse_from([
            "smishing-eval",
            "run",
            "--dataset",
            "d.json",
            "--prompts",
            "p.yaml",
        ]);
        assert!(missing.is_err());

        let invalid = Cli::try_parse_from([
            "smishing-eval",
            "run",
            "--dataset",
            "d.json",
            "--prompts",
            "p.yaml",
            "--model",
            "mistral",
        ]);
        assert!(invalid.is_err());
    }

    #[test]
    fn output_and_output_dir_conflict() {
        let result = Cli::try_parse_from([
            "smishing-eval",
            "run",
            "-d",
            "d.json",
            "-p",
            "p.yaml",
            "-m",
            "ollama:llama3",
            "--output",
            "out.csv",
            "--output-dir",
            "results",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_metrics() {
        let cli =
            Cli::try_parse_from(["smishing-eval", "-v", "metrics", "--input", "results.csv"])
                .unwrap();
        assert!(cli.verbose);
        let Commands::Metrics(args) = cli.command else {
            panic!("expected metrics command");
        };
        assert_eq!(args.group_by, GroupBy::Prompt);
        assert!(!args.json);

        let cli = Cli::try_parse_from([
            "smishing-eval",
            "metrics",
            "-i",
            "results.csv",
            "--group-by",
            "model-prompt",
            "--json",
        ])
        .unwrap();
        let Commands::Metrics(args) = cli.command else {
            panic!("expected metrics command");
        };
        assert_eq!(args.group_by, GroupBy::ModelAndPrompt);
        assert!(args.json);
    }
}
