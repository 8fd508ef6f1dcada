//! TorchScript backend.
//!
//! Artifacts are channels-last exports: they take the `[1, H, W, 3]` float
//! batch built by `preprocess` as-is, with no NCHW permute. Every tch call
//! here goes through the fallible `f_*` API so a bad artifact surfaces as an
//! `InferenceError` for its branch instead of a panic.

use std::path::Path;
use std::sync::Mutex;

use tch::{CModule, Device, Kind, Tensor};

use super::model::{InferenceError, InferenceModel, ModelLoader};
use super::preprocess::PreprocessedTensor;

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// TorchScript artifact. `CModule` is not `Sync`, so forward passes on one
/// module are serialized.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl InferenceModel for TorchModel {
    fn predict(&self, input: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|d| *d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Preprocessing("tensor is not contiguous".into()))?;
        let tensor = Tensor::f_from_slice(data)?
            .f_view(shape.as_slice())?
            .f_to_device(self.device)?;

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
            module.forward_ts(&[&tensor])?
        };

        let output_flat = output
            .f_to_kind(Kind::Float)?
            .f_to_device(Device::Cpu)?
            .f_view([-1])?;
        let output_vec: Vec<f32> = Vec::<f32>::try_from(&output_flat)?;
        Ok(output_vec)
    }
}

pub struct TorchScriptLoader {
    device: Device,
}

impl TorchScriptLoader {
    pub fn new() -> Self {
        Self {
            device: Device::cuda_if_available(),
        }
    }
}

impl Default for TorchScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader for TorchScriptLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceModel>, InferenceError> {
        let mut module = CModule::load_on_device(path, self.device)?;
        module.set_eval();
        log::debug!("Loaded TorchScript module {} on {:?}", path.display(), self.device);
        Ok(Box::new(TorchModel {
            module: Mutex::new(module),
            device: self.device,
        }))
    }
}
