pub mod model;
pub mod preprocess;
pub mod registry;
#[cfg(feature = "torch")]
pub mod torch;

pub use model::{InferenceError, InferenceModel, ModelLoader};
pub use preprocess::PreprocessedTensor;
pub use registry::{ModelRegistry, ModelSlot};
