//! Model registry - static catalog of generation providers

pub mod catalog;
pub mod types;

pub use types::{ModelDescriptor, ModelKind, ParameterKind, ParameterSpec};

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, Result};

/// Read-only catalog of the models this gateway can invoke
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

#[derive(Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Build a registry, rejecting duplicate or ambiguous identifiers
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self> {
        let registry = Self { models };
        registry.validate()?;
        Ok(registry)
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        Self {
            models: catalog::builtin_models(),
        }
    }

    /// Load a catalog from a YAML file with a top-level `models` list
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let file: CatalogFile = serde_yaml::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("Invalid model catalog: {}", e)))?;
        info!(path = ?path.as_ref(), models = file.models.len(), "Loaded model catalog");
        Self::new(file.models)
    }

    /// Every invocation identifier (ids and edit ids) must resolve to exactly one model
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.is_empty() {
                return Err(AppError::Internal("Model id cannot be empty".to_string()));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(AppError::Internal(format!("Duplicate model id '{}'", model.id)));
            }
        }
        for model in &self.models {
            if let Some(edit_id) = &model.edit_id {
                if !seen.insert(edit_id.as_str()) {
                    return Err(AppError::Internal(format!(
                        "Edit id '{}' of model '{}' collides with another identifier",
                        edit_id, model.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Resolve either a base id or an edit id to its model
    pub fn find_by_invocation_id(&self, invocation_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.answers_to(invocation_id))
    }

    /// Resolve a list of ids, failing on the first unknown one
    pub fn resolve_all(&self, ids: &[String]) -> Result<Vec<ModelDescriptor>> {
        ids.iter()
            .map(|id| {
                self.find_by_id(id)
                    .cloned()
                    .ok_or_else(|| AppError::ModelNotFound(id.clone()))
            })
            .collect()
    }

    pub fn all(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
