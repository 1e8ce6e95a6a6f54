//! Feature metadata: which columns are continuous and which are categorical
//!
//! Every transform returns an updated copy of the metadata next to the updated
//! table. The lists only ever grow during a pipeline run and are never
//! deduplicated: running a transform twice registers its columns twice.

use crate::types::DATE;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// A table together with its feature metadata, as returned by every transform
pub type Transformed = (DataFrame, FeatureMetadata);

/// Ordered continuous and categorical column names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    continuous: Vec<String>,
    categorical: Vec<String>,
}

impl FeatureMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuous column names in registration order
    pub fn continuous(&self) -> &[String] {
        &self.continuous
    }

    /// Categorical column names in registration order
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Register a continuous column
    pub fn with_continuous(mut self, name: impl Into<String>) -> Self {
        self.continuous.push(name.into());
        self
    }

    /// Register a categorical column
    pub fn with_categorical(mut self, name: impl Into<String>) -> Self {
        self.categorical.push(name.into());
        self
    }

    /// Register every merged column as continuous except the join key
    pub fn with_merged_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.continuous.extend(
            names
                .into_iter()
                .filter(|name| name.as_ref() != DATE)
                .map(|name| name.as_ref().to_string()),
        );
        self
    }

    /// Number of times a name was registered in either list
    pub fn occurrences(&self, name: &str) -> usize {
        self.continuous
            .iter()
            .chain(self.categorical.iter())
            .filter(|n| n.as_str() == name)
            .count()
    }

    /// Total number of registered names
    pub fn len(&self) -> usize {
        self.continuous.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into the `(continuous, categorical)` lists handed to model training
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.continuous, self.categorical)
    }
}
