// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Single-trial execution
//!
//! The executor renders the prompt, calls the model under the retry policy,
//! parses the response and builds the [`TrialRecord`]. It has no error path:
//! a call that still fails after retrying becomes an `ERROR` record.

use std::sync::Arc;

use chrono::Utc;
use model_client::ModelClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    parser::{parse_classification, parse_explanation},
    retry::RetryPolicy,
    trace::{TraceSink, TrialEvent},
    types::{DatasetItem, PromptDefinition, TrialRecord},
};

/// Runs trials under one retry policy and cancellation token
#[derive(Debug, Clone)]
pub struct TrialExecutor {
    retry: RetryPolicy,
    cancel: CancellationToken,
    trace: Option<(Uuid, Arc<dyn TraceSink>)>,
}

impl TrialExecutor {
    /// Create a new executor
    pub fn new(retry: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            retry,
            cancel,
            trace: None,
        }
    }

    /// Send a [`TrialEvent`] tagged with `run_id` to `sink` after every trial
    #[must_use]
    pub fn with_trace_sink(mut self, run_id: Uuid, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some((run_id, sink));
        self
    }

    /// Run one (model, prompt, item) trial
    #[instrument(
        skip_all,
        fields(model = %model.model_name(), prompt = %prompt.name(), item = %item.id())
    )]
    pub async fn run_trial<M: ModelClient>(
        &self,
        model: &M,
        prompt: &PromptDefinition,
        item: &DatasetItem,
    ) -> TrialRecord {
        let rendered = prompt.render(item.text());
        let prompt_text = rendered.as_str();

        let outcome = self
            .retry
            .run(&self.cancel, move || model.invoke(prompt_text))
            .await;
        let timestamp = Utc::now();

        let (record, output_text) = match outcome {
            Ok(response) => {
                let record = TrialRecord::completed(
                    model.model_name(),
                    prompt.name(),
                    item,
                    parse_classification(&response),
                    parse_explanation(&response),
                    timestamp,
                );
                (record, response)
            }
            Err(error) => {
                warn!(attempts = error.attempts(), error = %error, "Model call failed");
                let record =
                    TrialRecord::failed(model.model_name(), prompt.name(), item, &error, timestamp);
                (record, error.to_string())
            }
        };

        info!(
            predicted = %record.predicted(),
            expected = %record.ground_truth(),
            correct = record.is_correct(),
            "Trial finished"
        );

        self.emit_trace(&record, rendered, output_text);
        record
    }

    fn emit_trace(&self, record: &TrialRecord, input_text: String, output_text: String) {
        let Some((run_id, sink)) = &self.trace else {
            return;
        };

        let event = TrialEvent {
            run_id: *run_id,
            model_name: record.model_name().to_string(),
            prompt_name: record.prompt_name().to_string(),
            item_id: record.item_id().to_string(),
            input_text,
            output_text,
            score: if record.is_correct() { 1.0 } else { 0.0 },
        };

        if let Err(error) = sink.record(&event) {
            warn!(error = %error, "Trace sink rejected event, continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    use model_client::ProviderError;
    use shared_types::Label;

    use super::*;
    use crate::error::{HarnessError, HarnessResult};

    #[derive(Debug)]
    struct FixedModel(&'static str);

    impl ModelClient for FixedModel {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn invoke(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug, Default)]
    struct FailingModel {
        calls: AtomicU32,
    }

    impl ModelClient for FailingModel {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn invoke(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::rate_limited("quota exhausted"))
        }
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        events: Mutex<Vec<TrialEvent>>,
    }

    impl TraceSink for RecordingSink {
        fn record(&self, event: &TrialEvent) -> HarnessResult<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct BrokenSink;

    impl TraceSink for BrokenSink {
        fn record(&self, _event: &TrialEvent) -> HarnessResult<()> {
            Err(HarnessError::io("collector offline"))
        }
    }

    fn prompt() -> PromptDefinition {
        PromptDefinition::new("prompt_01", "Classify this SMS: {sms_text}", "").unwrap()
    }

    fn item() -> DatasetItem {
        DatasetItem::new("1", "Click here to verify your bank account", Label::Smishing).unwrap()
    }

    fn executor(max_attempts: u32) -> TrialExecutor {
        let retry = RetryPolicy::new(max_attempts, Duration::from_secs(1), 2.0).unwrap();
        TrialExecutor::new(retry, CancellationToken::new())
    }

    #[tokio::test]
    async fn classified_response() {
        let model = FixedModel("##Classification: 'smishing'\n##Explanation: suspicious link");
        let record = executor(3).run_trial(&model, &prompt(), &item()).await;

        assert_eq!(record.model_name(), "fixed");
        assert_eq!(record.prompt_name(), "prompt_01");
        assert_eq!(record.item_id(), "1");
        assert_eq!(record.input_text(), "Click here to verify your bank account");
        assert_eq!(record.predicted(), Label::Smishing);
        assert_eq!(record.explanation(), "suspicious link");
        assert!(record.is_correct());
    }

    #[tokio::test]
    async fn unparsable_response_is_unclassified() {
        let model = FixedModel("I am not sure what this is.");
        let record = executor(3).run_trial(&model, &prompt(), &item()).await;

        assert_eq!(record.predicted(), Label::Unclassified);
        assert_eq!(record.explanation(), "No explanation provided");
        assert!(!record.is_correct());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_become_error_record() {
        let model = FailingModel::default();
        let record = executor(3).run_trial(&model, &prompt(), &item()).await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.predicted(), Label::Error);
        assert!(record.explanation().starts_with("Error: "));
        assert!(record.explanation().contains("quota exhausted"));
        assert!(!record.is_correct());
    }

    #[tokio::test]
    async fn trace_events_carry_output_and_score() {
        let sink = Arc::new(RecordingSink::default());
        let run_id = Uuid::new_v4();
        let executor = executor(1).with_trace_sink(run_id, sink.clone());

        let model = FixedModel("##Classification: 'benign'");
        let record = executor.run_trial(&model, &prompt(), &item()).await;
        assert!(!record.is_correct());

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].run_id, run_id);
        assert_eq!(
            events[0].input_text,
            "Classify this SMS: Click here to verify your bank account"
        );
        assert_eq!(events[0].output_text, "##Classification: 'benign'");
        assert!(events[0].score.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn broken_sink_does_not_affect_record() {
        let executor = executor(1).with_trace_sink(Uuid::new_v4(), Arc::new(BrokenSink));
        let model = FixedModel("##Classification: 'smishing'");

        let record = executor.run_trial(&model, &prompt(), &item()).await;
        assert!(record.is_correct());
    }
}
