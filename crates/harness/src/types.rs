// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Domain models for evaluation runs
//!
//! Dataset items and prompt definitions validate themselves on construction,
//! so a run never starts with an item lacking a usable ground truth or a
//! prompt that would send the model a template without the message in it.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use shared_types::Label;

use crate::error::{HarnessError, HarnessResult};

/// One labelled SMS message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDatasetItem")]
pub struct DatasetItem {
    id: String,
    text: String,
    #[serde(rename = "label")]
    ground_truth: Label,
}

impl DatasetItem {
    /// Create a new dataset item
    ///
    /// # Errors
    ///
    /// Returns a validation error if the id is empty or the ground truth is
    /// a sentinel rather than a classification label
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        ground_truth: Label,
    ) -> HarnessResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(HarnessError::validation("Dataset item id cannot be empty"));
        }
        if !ground_truth.is_classification() {
            return Err(HarnessError::validation(format!(
                "Dataset item {id} has ground truth '{ground_truth}', expected smishing or benign"
            )));
        }
        Ok(Self {
            id,
            text: text.into(),
            ground_truth,
        })
    }

    /// Get the item id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the message text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the ground truth label
    pub fn ground_truth(&self) -> Label {
        self.ground_truth
    }
}

/// Dataset ids show up both as JSON numbers and as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Integer(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Integer(id) => write!(f, "{id}"),
            RawId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Deserialize)]
struct RawDatasetItem {
    #[serde(alias = "sms_id")]
    id: RawId,
    #[serde(alias = "sms_text")]
    text: String,
    #[serde(alias = "class")]
    label: Label,
}

impl TryFrom<RawDatasetItem> for DatasetItem {
    type Error = HarnessError;

    fn try_from(raw: RawDatasetItem) -> Result<Self, Self::Error> {
        DatasetItem::new(raw.id.to_string(), raw.text, raw.label)
    }
}

/// A named prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDefinition {
    name: String,
    template: String,
    description: String,
}

impl PromptDefinition {
    /// Substitution slot replaced by the message text
    pub const SLOT: &'static str = "{sms_text}";

    /// Create a new prompt definition
    ///
    /// # Errors
    ///
    /// Returns a setup error if the name is empty or the template has no
    /// `{sms_text}` slot
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        description: impl Into<String>,
    ) -> HarnessResult<Self> {
        let name = name.into();
        let template = template.into();
        if name.trim().is_empty() {
            return Err(HarnessError::setup("Prompt name cannot be empty"));
        }
        if !template.contains(Self::SLOT) {
            return Err(HarnessError::setup(format!(
                "Prompt '{name}' has no {} slot",
                Self::SLOT
            )));
        }
        Ok(Self {
            name,
            template,
            description: description.into(),
        })
    }

    /// Get the prompt name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the raw template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Get the description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Substitute the message text into the template
    pub fn render(&self, text: &str) -> String {
        self.template.replace(Self::SLOT, text)
    }
}

/// Identity of one cell in the model x prompt x item matrix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrialKey {
    /// Model name
    pub model_name: String,
    /// Prompt name
    pub prompt_name: String,
    /// Dataset item id
    pub item_id: String,
}

impl fmt::Display for TrialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.model_name, self.prompt_name, self.item_id)
    }
}

/// Outcome of a single trial
///
/// Field order and names follow the result file columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    model_name: String,
    #[serde(with = "timestamp_format")]
    timestamp: DateTime<Utc>,
    prompt_name: String,
    #[serde(rename = "sms_id")]
    item_id: String,
    #[serde(rename = "sms_text")]
    input_text: String,
    #[serde(rename = "original_classification")]
    ground_truth: Label,
    #[serde(rename = "model_classification")]
    predicted: Label,
    explanation: String,
    #[serde(with = "flag_format")]
    is_correct: bool,
}

impl TrialRecord {
    /// Record a trial that produced a model response
    pub fn completed(
        model_name: impl Into<String>,
        prompt_name: impl Into<String>,
        item: &DatasetItem,
        predicted: Label,
        explanation: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            timestamp,
            prompt_name: prompt_name.into(),
            item_id: item.id().to_string(),
            input_text: item.text().to_string(),
            ground_truth: item.ground_truth(),
            predicted,
            explanation: explanation.into(),
            is_correct: predicted.is_classification() && predicted == item.ground_truth(),
        }
    }

    /// Record a trial whose model call failed
    pub fn failed(
        model_name: impl Into<String>,
        prompt_name: impl Into<String>,
        item: &DatasetItem,
        failure: impl fmt::Display,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::completed(
            model_name,
            prompt_name,
            item,
            Label::Error,
            format!("Error: {failure}"),
            timestamp,
        )
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the prompt name
    pub fn prompt_name(&self) -> &str {
        &self.prompt_name
    }

    /// Get the dataset item id
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Get the message text
    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    /// Get the ground truth label
    pub fn ground_truth(&self) -> Label {
        self.ground_truth
    }

    /// Get the predicted label
    pub fn predicted(&self) -> Label {
        self.predicted
    }

    /// Get the explanation
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Get the completion time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the prediction matched the ground truth
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    /// Key identifying this record's cell
    pub fn key(&self) -> TrialKey {
        TrialKey {
            model_name: self.model_name.clone(),
            prompt_name: self.prompt_name.clone(),
            item_id: self.item_id.clone(),
        }
    }
}

/// RFC 3339 timestamps; naive timestamps from older files are taken as UTC
mod timestamp_format {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, SecondsFormat, Serializer, Utc, de};

    pub(super) fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Ok(timestamp.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

/// `true`/`false` on write, any casing on read
mod flag_format {
    use super::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *flag { "true" } else { "false" })
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean '{other}'"))),
        }
    }
}
