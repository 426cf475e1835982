//! Label map loading
//!
//! `label_map.json` maps category name to output index:
//!
//! ```json
//! { "카드발급": 0, "카드해지": 1, "대출상담": 2 }
//! ```
//!
//! Indices must cover `0..N` exactly once.

use std::collections::HashMap;
use std::path::Path;

use crate::ClassifierError;

/// Category names in model output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::LabelMap(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ClassifierError> {
        let map: HashMap<String, usize> = serde_json::from_str(content)
            .map_err(|e| ClassifierError::LabelMap(format!("invalid label map: {}", e)))?;
        Self::from_index_map(map)
    }

    /// Build from a name → index map, rejecting gaps and duplicate indices
    pub fn from_index_map(map: HashMap<String, usize>) -> Result<Self, ClassifierError> {
        if map.is_empty() {
            return Err(ClassifierError::LabelMap("label map is empty".to_string()));
        }

        let n = map.len();
        let mut slots: Vec<Option<String>> = vec![None; n];

        for (name, index) in map {
            if index >= n {
                return Err(ClassifierError::LabelMap(format!(
                    "index {} for '{}' out of range 0..{}",
                    index, name, n
                )));
            }
            if let Some(existing) = &slots[index] {
                return Err(ClassifierError::LabelMap(format!(
                    "index {} assigned to both '{}' and '{}'",
                    index, existing, name
                )));
            }
            slots[index] = Some(name);
        }

        // n distinct in-range indices over n slots fill every slot
        let labels = slots.into_iter().flatten().collect();
        Ok(Self { labels })
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
