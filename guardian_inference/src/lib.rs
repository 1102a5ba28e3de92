mod model_service;
mod model_store;
mod ort_service;

pub mod config;
pub mod preprocess;
pub mod verdict;

pub use model_service::{InferenceError, ModelService};
pub use model_store::{ModelLoadError, ModelLoader, ModelStore};
pub use ort_service::{OrtModelLoader, OrtModelService};
pub use preprocess::{decode_upload, prepare, PreprocessError, IMG_SIZE};
pub use verdict::{render, Label, Verdict};
