use crate::{
    config::Config,
    server::{HttpServer, ModelStatus, SharedState},
    telemetry::Metrics,
};
use guardian_inference::{ModelLoader, ModelStore, OrtModelLoader};
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

/// Loads the model once and turns a failure into a page-level error instead
/// of aborting startup.
pub fn load_model<L: ModelLoader>(model_store: &ModelStore<L>) -> ModelStatus {
    match model_store.initialize() {
        Ok(model) => ModelStatus::Loaded(model),
        Err(e) => {
            tracing::error!("Could not load the model: {}", e);
            ModelStatus::Unavailable(e.to_string())
        }
    }
}

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let model_store = ModelStore::new(OrtModelLoader, &config.model);
    let model = load_model(&model_store);

    let metrics = Arc::new(Metrics::new()?);
    let state = SharedState::new(model, config.presentation.clone(), metrics)?;
    let server = HttpServer::new(state, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
