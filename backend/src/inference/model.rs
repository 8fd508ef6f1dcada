use std::path::Path;

use super::preprocess::PreprocessedTensor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Unexpected model output: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// A loaded artifact that maps a preprocessed batch of one image to the
/// flattened output row for that image.
pub trait InferenceModel: Send + Sync {
    fn predict(&self, input: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError>;
}

pub trait ModelLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceModel>, InferenceError>;
}

/// Loader used when the binary is built without an inference runtime.
pub struct UnsupportedLoader;

impl ModelLoader for UnsupportedLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceModel>, InferenceError> {
        Err(InferenceError::Model(format!(
            "no inference runtime compiled in, cannot deserialize {} (rebuild with --features torch)",
            path.display()
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::fs;

    /// Returns the same output row for every input.
    pub struct FixedOutput(pub Vec<f32>);

    impl InferenceModel for FixedOutput {
        fn predict(&self, _input: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    /// Always fails at predict time.
    pub struct Broken;

    impl InferenceModel for Broken {
        fn predict(&self, _input: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Model("forward pass failed".into()))
        }
    }

    /// Serializes calls behind a lock and rejects channels-last input the way
    /// a channels-first runtime does, returning the error instead of panicking.
    pub struct ChannelsFirstOnly {
        pub lock: std::sync::Mutex<()>,
    }

    impl InferenceModel for ChannelsFirstOnly {
        fn predict(&self, input: &PreprocessedTensor) -> Result<Vec<f32>, InferenceError> {
            let _guard = self
                .lock
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
            match input.shape() {
                [1, 3, _, _] => Ok(vec![0.5]),
                shape => Err(InferenceError::Model(format!(
                    "expected input[1, 3, H, W], got {:?}",
                    shape
                ))),
            }
        }
    }

    /// Reads model files as comma separated floats; anything else is corrupt.
    pub struct TextLoader;

    impl ModelLoader for TextLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn InferenceModel>, InferenceError> {
            let contents = fs::read_to_string(path).map_err(|e| InferenceError::Model(e.to_string()))?;
            let values = contents
                .trim()
                .split(',')
                .map(|v| v.trim().parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| InferenceError::Model(format!("corrupt artifact: {e}")))?;
            Ok(Box::new(FixedOutput(values)))
        }
    }
}
