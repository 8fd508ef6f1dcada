use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::model::{InferenceModel, ModelLoader};
use crate::config::ModelPaths;

/// Files below this size are almost always an un-fetched Git LFS pointer.
const LFS_POINTER_THRESHOLD: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    Authenticity,
    #[serde(rename = "style_effnet")]
    StyleEffNet,
    #[serde(rename = "style_convnext")]
    StyleConvNext,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 3] = [
        ModelSlot::Authenticity,
        ModelSlot::StyleEffNet,
        ModelSlot::StyleConvNext,
    ];

    fn index(self) -> usize {
        match self {
            ModelSlot::Authenticity => 0,
            ModelSlot::StyleEffNet => 1,
            ModelSlot::StyleConvNext => 2,
        }
    }

    fn path(self, paths: &ModelPaths) -> &Path {
        match self {
            ModelSlot::Authenticity => &paths.authenticity,
            ModelSlot::StyleEffNet => &paths.style_effnet,
            ModelSlot::StyleConvNext => &paths.style_convnext,
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelSlot::Authenticity => "Authenticity",
            ModelSlot::StyleEffNet => "EfficientNet style",
            ModelSlot::StyleConvNext => "ConvNeXt style",
        };
        f.write_str(name)
    }
}

/// Why a slot stayed empty at startup. Each cause points at a different fix:
/// a missing or empty file is a deployment/transfer problem, a deserialize
/// failure is a format or runtime version mismatch.
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
    #[error("model not found at {}", path.display())]
    Missing { path: PathBuf, parent_exists: bool },
    #[error("model file {} is empty", path.display())]
    Empty { path: PathBuf },
    #[error("failed to load model from {}: {reason}", path.display())]
    Deserialize { path: PathBuf, reason: String },
}

pub enum SlotState {
    Present(Box<dyn InferenceModel>),
    Absent(LoadFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub slot: ModelSlot,
    pub path: PathBuf,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Model handles, loaded once at startup and read-only afterwards.
pub struct ModelRegistry {
    paths: ModelPaths,
    slots: [SlotState; 3],
}

impl ModelRegistry {
    /// Attempts every slot independently. Never fails; absent slots carry
    /// the reason they could not be loaded.
    pub fn load(paths: &ModelPaths, loader: &dyn ModelLoader) -> Self {
        log::info!("Starting model loading...");
        let slots = ModelSlot::ALL.map(|slot| load_slot(slot, slot.path(paths), loader));
        let registry = Self {
            paths: paths.clone(),
            slots,
        };

        log::info!(
            "Model loading complete. Available models: Authenticity={}, EfficientNet={}, ConvNeXt={}",
            registry.is_present(ModelSlot::Authenticity),
            registry.is_present(ModelSlot::StyleEffNet),
            registry.is_present(ModelSlot::StyleConvNext),
        );
        registry.log_remediation_hint();
        registry
    }

    pub fn from_states(paths: ModelPaths, slots: [SlotState; 3]) -> Self {
        Self { paths, slots }
    }

    pub fn is_present(&self, slot: ModelSlot) -> bool {
        matches!(self.slots[slot.index()], SlotState::Present(_))
    }

    pub fn model(&self, slot: ModelSlot) -> Option<&dyn InferenceModel> {
        match &self.slots[slot.index()] {
            SlotState::Present(model) => Some(model.as_ref()),
            SlotState::Absent(_) => None,
        }
    }

    pub fn failure(&self, slot: ModelSlot) -> Option<&LoadFailure> {
        match &self.slots[slot.index()] {
            SlotState::Present(_) => None,
            SlotState::Absent(failure) => Some(failure),
        }
    }

    pub fn loaded_count(&self) -> usize {
        ModelSlot::ALL.iter().filter(|slot| self.is_present(**slot)).count()
    }

    pub fn status(&self) -> Vec<SlotStatus> {
        ModelSlot::ALL
            .iter()
            .map(|slot| SlotStatus {
                slot: *slot,
                path: slot.path(&self.paths).to_path_buf(),
                loaded: self.is_present(*slot),
                error: self.failure(*slot).map(|f| f.to_string()),
            })
            .collect()
    }

    fn log_remediation_hint(&self) {
        let style_a = self.is_present(ModelSlot::StyleEffNet);
        let style_b = self.is_present(ModelSlot::StyleConvNext);
        if self.loaded_count() == 0 {
            log::warn!("No models loaded: check the model files were fetched (git lfs pull) and are readable");
        } else if style_a != style_b {
            log::warn!("Style analysis needs both EfficientNet and ConvNeXt models; only one is loaded");
        }
    }
}

fn load_slot(slot: ModelSlot, path: &Path, loader: &dyn ModelLoader) -> SlotState {
    match try_load(slot, path, loader) {
        Ok(model) => {
            log::info!("{} model loaded successfully", slot);
            SlotState::Present(model)
        }
        Err(failure) => {
            log::error!("{} model unavailable: {}", slot, failure);
            SlotState::Absent(failure)
        }
    }
}

fn try_load(
    slot: ModelSlot,
    path: &Path,
    loader: &dyn ModelLoader,
) -> Result<Box<dyn InferenceModel>, LoadFailure> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            let parent_exists = path
                .parent()
                .map(|p| p.as_os_str().is_empty() || p.exists())
                .unwrap_or(false);
            if !parent_exists {
                log::warn!("Parent directory of {} does not exist", path.display());
            }
            return Err(LoadFailure::Missing {
                path: path.to_path_buf(),
                parent_exists,
            });
        }
    };

    let size = metadata.len();
    log::info!(
        "Loading {} model from {} ({:.2} MB)",
        slot,
        path.display(),
        size as f64 / (1024.0 * 1024.0)
    );
    if size == 0 {
        return Err(LoadFailure::Empty {
            path: path.to_path_buf(),
        });
    }
    if size < LFS_POINTER_THRESHOLD {
        log::warn!(
            "{} model file is only {} bytes, likely a Git LFS pointer",
            slot,
            size
        );
    }

    loader.load(path).map_err(|e| LoadFailure::Deserialize {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
