// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Dataset and prompt catalog loading
//!
//! Datasets are JSON arrays of labelled messages. Prompt catalogs are YAML or
//! JSON maps from prompt name to template, e.g.
//!
//! ```yaml
//! prompt_01:
//!   description: Without format example
//!   prompt: |
//!     Classify the following SMS as 'smishing' or 'benign':
//!     {sms_text}
//!     ##Classification: 'smishing' or 'benign'
//!     ##Explanation: ...
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    error::{HarnessError, HarnessResult},
    types::{DatasetItem, PromptDefinition},
};

/// An ordered, non-empty set of dataset items with unique ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    items: Vec<DatasetItem>,
}

impl Dataset {
    /// Build a dataset from items
    ///
    /// # Errors
    ///
    /// Returns a setup error if `items` is empty or contains a repeated id
    pub fn new(items: Vec<DatasetItem>) -> HarnessResult<Self> {
        if items.is_empty() {
            return Err(HarnessError::setup("Dataset is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = items.iter().find(|item| !seen.insert(item.id())) {
            return Err(HarnessError::setup(format!(
                "Duplicate dataset item id '{}'",
                duplicate.id()
            )));
        }
        Ok(Self { items })
    }

    /// Load a dataset from a JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading dataset");

        let content = fs::read_to_string(path).await.map_err(|e| {
            HarnessError::setup(format!("Failed to read dataset {}: {e}", path.display()))
        })?;
        let dataset = Self::from_json(&content).map_err(|e| {
            HarnessError::setup(format!("Invalid dataset {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), items = dataset.len(), "Loaded dataset");
        Ok(dataset)
    }

    /// Parse a dataset from JSON text
    pub fn from_json(content: &str) -> HarnessResult<Self> {
        let items: Vec<DatasetItem> = serde_json::from_str(content)?;
        Self::new(items)
    }

    /// Get the items in file order
    pub fn items(&self) -> &[DatasetItem] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the dataset has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the items
    pub fn into_items(self) -> Vec<DatasetItem> {
        self.items
    }
}

#[derive(Deserialize)]
struct PromptEntry {
    #[serde(alias = "template")]
    prompt: String,
    #[serde(default)]
    description: String,
}

/// Prompt definitions keyed by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCatalog {
    prompts: BTreeMap<String, PromptDefinition>,
}

impl PromptCatalog {
    /// Build a catalog from prompt definitions
    ///
    /// # Errors
    ///
    /// Returns a setup error if there are no prompts or a name repeats
    pub fn new(prompts: impl IntoIterator<Item = PromptDefinition>) -> HarnessResult<Self> {
        let mut catalog = BTreeMap::new();
        for prompt in prompts {
            let name = prompt.name().to_string();
            if catalog.insert(name.clone(), prompt).is_some() {
                return Err(HarnessError::setup(format!("Duplicate prompt name '{name}'")));
            }
        }
        if catalog.is_empty() {
            return Err(HarnessError::setup("Prompt catalog is empty"));
        }
        Ok(Self { prompts: catalog })
    }

    /// Load a catalog from a YAML (`.yaml`/`.yml`) or JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading prompt catalog");

        let content = fs::read_to_string(path).await.map_err(|e| {
            HarnessError::setup(format!("Failed to read prompts {}: {e}", path.display()))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let catalog = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .map_err(|e| HarnessError::setup(format!("Invalid prompts {}: {e}", path.display())))?;

        info!(path = %path.display(), prompts = catalog.len(), "Loaded prompt catalog");
        Ok(catalog)
    }

    /// Parse a catalog from YAML text
    pub fn from_yaml(content: &str) -> HarnessResult<Self> {
        let entries: BTreeMap<String, PromptEntry> = serde_yaml::from_str(content)?;
        Self::from_entries(entries)
    }

    /// Parse a catalog from JSON text
    pub fn from_json(content: &str) -> HarnessResult<Self> {
        let entries: BTreeMap<String, PromptEntry> = serde_json::from_str(content)?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: BTreeMap<String, PromptEntry>) -> HarnessResult<Self> {
        let prompts = entries
            .into_iter()
            .map(|(name, entry)| PromptDefinition::new(name, entry.prompt, entry.description))
            .collect::<HarnessResult<Vec<_>>>()?;
        Self::new(prompts)
    }

    /// Narrow the catalog to `names`; an empty list keeps every prompt
    ///
    /// # Errors
    ///
    /// Returns a setup error naming the first unknown prompt
    pub fn select<S: AsRef<str>>(self, names: &[S]) -> HarnessResult<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        let mut prompts = self.prompts;
        let selected = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                prompts
                    .remove(name)
                    .ok_or_else(|| HarnessError::setup(format!("Unknown prompt '{name}'")))
            })
            .collect::<HarnessResult<Vec<_>>>()?;
        Self::new(selected)
    }

    /// Look up a prompt by name
    pub fn get(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    /// Number of prompts
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether the catalog has no prompts
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Iterate prompts in name order
    pub fn iter(&self) -> impl Iterator<Item = &PromptDefinition> {
        self.prompts.values()
    }

    /// Take the prompts in name order
    pub fn into_prompts(self) -> Vec<PromptDefinition> {
        self.prompts.into_values().collect()
    }
}
