// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-trial trace events
//!
//! A [`TraceSink`] receives one [`TrialEvent`] per finished trial, for
//! observability systems that want the raw model output next to a score.
//! Sinks are optional; a failing sink is logged and otherwise ignored.

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};

/// Structured record of one trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialEvent {
    /// Run this trial belongs to
    pub run_id: Uuid,
    /// Model name
    pub model_name: String,
    /// Prompt name
    pub prompt_name: String,
    /// Dataset item id
    pub item_id: String,
    /// Rendered prompt sent to the model
    pub input_text: String,
    /// Raw model output, or the failure description
    pub output_text: String,
    /// 1.0 when the prediction was correct, else 0.0
    pub score: f64,
}

/// Destination for trial events
pub trait TraceSink: Send + Sync + std::fmt::Debug {
    /// Record one event
    fn record(&self, event: &TrialEvent) -> HarnessResult<()>;
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "Writing trial traces");
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Get the trace file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonLinesSink {
    fn record(&self, event: &TrialEvent) -> HarnessResult<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| HarnessError::io("trace writer lock poisoned"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

/// Emits events through `tracing` on the `trial_trace` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&self, event: &TrialEvent) -> HarnessResult<()> {
        info!(
            target: "trial_trace",
            run_id = %event.run_id,
            model = %event.model_name,
            prompt = %event.prompt_name,
            item = %event.item_id,
            score = event.score,
            output = %event.output_text,
            "Trial trace"
        );
        Ok(())
    }
}
