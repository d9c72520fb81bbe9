// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsing
//!
//! Models answer in free text. The prompts ask for two markers:
//!
//! ```text
//! ##Classification: 'smishing'
//! ##Explanation: The SMS contains a suspicious link.
//! ```
//!
//! A missing or garbled classification marker is a normal outcome and maps to
//! [`Label::Unclassified`].

use std::sync::LazyLock;

use regex::Regex;
use shared_types::Label;

/// Explanation used when the response carries none
pub const DEFAULT_EXPLANATION: &str = "No explanation provided";

// Patterns are static, compiled once
static CLASSIFICATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)##Classification:\s*['"]?(smishing|benign)['"]?"#)
        .expect("classification regex is valid")
});

static EXPLANATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)##Explanation:\s*(.+)").expect("explanation regex is valid")
});

/// Extract the classification label from a model response
pub fn parse_classification(response: &str) -> Label {
    CLASSIFICATION_REGEX
        .captures(response)
        .and_then(|captures| captures.get(1))
        .and_then(|token| token.as_str().parse().ok())
        .unwrap_or(Label::Unclassified)
}

/// Extract the explanation from a model response
///
/// Everything after the first `##Explanation:` marker is kept, line breaks
/// included.
pub fn parse_explanation(response: &str) -> String {
    EXPLANATION_REGEX
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|explanation| explanation.as_str().trim())
        .filter(|explanation| !explanation.is_empty())
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string()
}
