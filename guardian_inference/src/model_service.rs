use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Input tensor shape {actual:?} does not match the expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Inference failed: {0}")]
    Runtime(String),
    #[error("Model returned an empty output")]
    EmptyOutput,
}

/// A loaded classifier producing the malignant-class probability for one
/// preprocessed image.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError>;
}
