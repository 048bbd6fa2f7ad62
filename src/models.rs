//! Model Registry
//!
//! Immutable display-name to model-id mapping. Built-in defaults, configured extras and
//! the live listing are combined with [`ModelRegistry::merge`], which returns a new value
//! instead of mutating a shared map. Each entry carries its [`ModelKind`], decided once
//! when the entry is created.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

/// Request shape a model is served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `:predict`, one call returning `sampleCount` images
    ImageBatch,
    /// `:generateContent`, one call per requested image
    Conversational,
}

impl ModelKind {
    const IMAGE_BATCH_MARKER: &'static str = "imagen";

    pub fn for_model_id(model_id: &str) -> Self {
        if model_id
            .to_ascii_lowercase()
            .contains(Self::IMAGE_BATCH_MARKER)
        {
            ModelKind::ImageBatch
        } else {
            ModelKind::Conversational
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ModelKind::ImageBatch => "image_batch",
            ModelKind::Conversational => "conversational",
        }
    }
}

/// A model identifier paired with its kind, ready for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub id: String,
    pub kind: ModelKind,
}

impl ResolvedModel {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let kind = ModelKind::for_model_id(&id);
        Self { id, kind }
    }

    pub fn with_kind(id: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub display_name: String,
    pub id: String,
    pub kind: ModelKind,
}

impl ModelEntry {
    pub fn new(display_name: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: display_name.into(),
            kind: ModelKind::for_model_id(&id),
            id,
        }
    }

    pub fn resolved(&self) -> ResolvedModel {
        ResolvedModel::with_kind(self.id.clone(), self.kind)
    }
}

/// `GET {base}/models` response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<ListedModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedModel {
    pub name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
}

impl ModelRegistry {
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        Self::default().merge(&Self { entries })
    }

    /// Models available without contacting the API.
    pub fn defaults() -> Self {
        Self::new(vec![
            ModelEntry::new("Nano Banana Pro", "models/gemini-3-pro-image-preview"),
            ModelEntry::new("Nano Banana", "models/gemini-2.5-flash-image"),
            ModelEntry::new("Imagen 3", "models/imagen-3.0-generate-001"),
            ModelEntry::new("Imagen 3 Fast", "models/imagen-3.0-fast-generate-001"),
        ])
    }

    /// Keep only image-capable models from a live listing.
    pub fn from_listing(listing: &ModelListResponse) -> Self {
        let entries = listing
            .models
            .iter()
            .filter(|model| {
                let name = model.name.to_ascii_lowercase();
                name.contains("imagen") || name.contains("-image-")
            })
            .map(|model| {
                let display_name = model
                    .display_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| {
                        model
                            .name
                            .rsplit('/')
                            .next()
                            .unwrap_or(&model.name)
                            .to_string()
                    });
                ModelEntry::new(display_name, model.name.clone())
            })
            .collect();
        Self::new(entries)
    }

    /// Combine two registries. Entries in `other` replace same-named entries in place;
    /// new names are appended in `other`'s order.
    pub fn merge(&self, other: &ModelRegistry) -> ModelRegistry {
        let mut entries = self.entries.clone();
        for entry in &other.entries {
            match entries
                .iter_mut()
                .find(|existing| existing.display_name == entry.display_name)
            {
                Some(existing) => *existing = entry.clone(),
                None => entries.push(entry.clone()),
            }
        }
        ModelRegistry { entries }
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, display_name: &str) -> Option<&ModelEntry> {
        self.entries
            .iter()
            .find(|entry| entry.display_name == display_name)
    }

    /// Resolve a display name or a model id. Unknown names are used as raw ids.
    pub fn resolve(&self, name: &str) -> Result<ResolvedModel, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Model name cannot be empty".to_string(),
            ));
        }
        let entry = self
            .get(name)
            .or_else(|| self.entries.iter().find(|entry| entry.id == name));
        Ok(match entry {
            Some(entry) => entry.resolved(),
            None => ResolvedModel::new(name),
        })
    }
}
