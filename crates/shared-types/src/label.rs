// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classification labels and sentinel outcomes

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Outcome label for a single classified message
///
/// `Smishing` and `Benign` form the fixed classification label set. The two
/// remaining variants are sentinels: `Unclassified` when a response carried no
/// recognizable label, `Error` when the model could not be reached at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    /// SMS phishing attempt (positive class)
    Smishing,
    /// Legitimate message (negative class)
    Benign,
    /// Model answered but no label could be extracted
    Unclassified,
    /// The model call failed after all retries
    Error,
}

/// Error returned when a token is not part of the label vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown label '{0}'")]
pub struct UnknownLabel(pub String);

impl Label {
    /// Positive class used by the metrics aggregator
    pub const POSITIVE: Label = Label::Smishing;
    /// Negative class used by the metrics aggregator
    pub const NEGATIVE: Label = Label::Benign;

    /// Token used in result files and model responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Smishing => "smishing",
            Label::Benign => "benign",
            Label::Unclassified => "unclassified",
            Label::Error => "ERROR",
        }
    }

    /// Check if the label is one of the classification labels
    pub fn is_classification(&self) -> bool {
        matches!(self, Label::Smishing | Label::Benign)
    }

    /// Check if the label is a sentinel (`Unclassified` or `Error`)
    pub fn is_sentinel(&self) -> bool {
        !self.is_classification()
    }

    /// Check if the label is the positive class
    pub fn is_smishing(&self) -> bool {
        matches!(self, Label::Smishing)
    }

    /// Check if the label marks an unparsable response
    pub fn is_unclassified(&self) -> bool {
        matches!(self, Label::Unclassified)
    }

    /// Check if the label marks a failed model call
    pub fn is_error(&self) -> bool {
        matches!(self, Label::Error)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let token = token.trim_matches(|c| c == '\'' || c == '"');
        match token.to_ascii_lowercase().as_str() {
            "smishing" => Ok(Label::Smishing),
            "benign" => Ok(Label::Benign),
            "unclassified" => Ok(Label::Unclassified),
            "error" => Ok(Label::Error),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
