use crate::{
    model_service::{InferenceError, ModelService},
    model_store::{ModelLoadError, ModelLoader},
    preprocess::IMG_SIZE,
};
use ndarray::Array4;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{path::Path, sync::Mutex};

pub struct OrtModelService {
    session: Mutex<Session>,
    output_name: String,
}

impl OrtModelService {
    pub fn new(model_path: &Path) -> Result<Self, ort::Error> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ort::Error::new("model declares no outputs"))?;

        tracing::info!(
            "Created ONNX session for {:?} reading output {}",
            model_path,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

fn expected_shape() -> Vec<usize> {
    let size = IMG_SIZE as usize;
    vec![1, size, size, 3]
}

fn check_input_shape(input: &Array4<f32>) -> Result<(), InferenceError> {
    let expected = expected_shape();
    if input.shape() != expected.as_slice() {
        return Err(InferenceError::ShapeMismatch {
            expected,
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

/// The classifier has a single sigmoid unit, so the score is `output[0][0]`.
fn first_score(data: &[f32]) -> Result<f32, InferenceError> {
    data.first().copied().ok_or(InferenceError::EmptyOutput)
}

impl ModelService for OrtModelService {
    fn predict(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        check_input_shape(input)?;

        let input_view = input.as_standard_layout();
        let tensor_ref = TensorRef::from_array_view(input_view.view())
            .map_err(|e| InferenceError::Runtime(format!("failed to build tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session mutex poisoned: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let (_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("failed to extract tensor: {}", e)))?;

        let score = first_score(data)?;
        tracing::debug!("Model score {:.4}", score);

        Ok(score)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrtModelLoader;

impl ModelLoader for OrtModelLoader {
    type Model = OrtModelService;

    fn load(&self, path: &Path) -> Result<OrtModelService, ModelLoadError> {
        OrtModelService::new(path).map_err(|e| ModelLoadError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn test_expected_shape() {
        assert_eq!(expected_shape(), vec![1, 128, 128, 3]);
    }

    #[test]
    fn test_check_input_shape_rejects_other_sizes() {
        let input = Array4::<f32>::zeros((1, 224, 224, 3));

        match check_input_shape(&input) {
            Err(InferenceError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![1, 128, 128, 3]);
                assert_eq!(actual, vec![1, 224, 224, 3]);
            }
            other => panic!("expected a shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_check_input_shape_accepts_permuted_layout() {
        let channels_first = Array4::<f32>::from_shape_fn((1, 3, 128, 128), |(_, c, y, x)| {
            (c * 10_000 + y * 100 + x) as f32
        });
        let input = channels_first.permuted_axes([0, 2, 3, 1]);

        assert!(!input.is_standard_layout());
        assert!(check_input_shape(&input).is_ok());

        let contiguous = input.as_standard_layout();
        assert!(contiguous.is_standard_layout());
        assert_eq!(contiguous[[0, 5, 7, 2]], 20_507.0);
        assert_eq!(contiguous, input);
    }

    #[test]
    fn test_first_score() {
        assert_eq!(first_score(&[0.73, 0.1]).unwrap(), 0.73);
        assert!(matches!(first_score(&[]), Err(InferenceError::EmptyOutput)));
    }

    #[test]
    fn test_corrupt_model_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"this is not a protobuf graph").unwrap();

        let result = OrtModelLoader.load(&path);

        assert!(matches!(result, Err(ModelLoadError::Invalid { .. })));
    }

    #[test]
    fn test_predict_with_constant_model() {
        let model = OrtModelLoader
            .load(&fixture("constant_score.onnx"))
            .unwrap();

        let dark = Array4::<f32>::zeros((1, 128, 128, 3));
        let bright = Array4::<f32>::from_elem((1, 128, 128, 3), 255.0);

        assert!((model.predict(&dark).unwrap() - 0.73).abs() < 1e-6);
        assert!((model.predict(&bright).unwrap() - 0.73).abs() < 1e-6);
        assert!(matches!(
            model.predict(&Array4::zeros((1, 224, 224, 3))),
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }
}
