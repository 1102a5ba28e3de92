use crate::{config::ModelConfig, model_service::ModelService};
use once_cell::sync::OnceCell;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Could not load model {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

pub trait ModelLoader: Send + Sync + 'static {
    type Model: ModelService;

    fn load(&self, path: &Path) -> Result<Self::Model, ModelLoadError>;
}

/// Owns the model artifact location and the single loaded handle.
///
/// Built once at startup and handed to whoever needs the model. A failed load
/// is not remembered, so a later `initialize` tries the file again.
pub struct ModelStore<L: ModelLoader> {
    loader: L,
    path: PathBuf,
    model: OnceCell<Arc<L::Model>>,
}

impl<L: ModelLoader> ModelStore<L> {
    pub fn new(loader: L, model_config: &ModelConfig) -> Self {
        Self {
            loader,
            path: model_config.get_path(),
            model: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn initialize(&self) -> Result<Arc<L::Model>, ModelLoadError> {
        self.model
            .get_or_try_init(|| {
                if !self.path.exists() {
                    return Err(ModelLoadError::NotFound(self.path.clone()));
                }

                tracing::info!("Loading model from {:?}", self.path);
                let model = self.loader.load(&self.path)?;
                tracing::info!("Model loaded from {:?}", self.path);

                Ok(Arc::new(model))
            })
            .cloned()
    }
}
