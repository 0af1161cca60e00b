use std::io::Read;
use std::path::Path;

use super::ImportError;
use crate::portfolio::{ProviderError, RubricProvider};
use crate::rubric::{Rubric, RubricContext};

/// Validated rubrics held in memory, usually loaded from a JSON array.
#[derive(Debug, Clone, Default)]
pub struct RubricCatalog {
    rubrics: Vec<Rubric>,
}

impl RubricCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        let rubrics: Vec<Rubric> = serde_json::from_reader(reader)?;
        Self::from_rubrics(rubrics)
    }

    pub fn from_rubrics(rubrics: Vec<Rubric>) -> Result<Self, ImportError> {
        for rubric in &rubrics {
            rubric.validate().map_err(|source| ImportError::Rubric {
                indicator_id: rubric.indicator_id.clone(),
                source,
            })?;
        }
        Ok(Self { rubrics })
    }

    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

impl RubricProvider for RubricCatalog {
    fn load_rubrics(&self, context: &RubricContext) -> Result<Vec<Rubric>, ProviderError> {
        let matching: Vec<Rubric> = self
            .rubrics
            .iter()
            .filter(|rubric| context.matches(rubric))
            .cloned()
            .collect();

        if matching.is_empty() {
            return Err(ProviderError::NoRubricsFound {
                context: context.clone(),
            });
        }
        Ok(matching)
    }
}
