use crate::{
    config::{PresentationConfig, ServerConfig},
    page::Pages,
    routes::api_routes,
    telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use guardian_inference::ModelService;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

/// Outcome of the startup model load, fixed for the process lifetime.
#[derive(Clone)]
pub enum ModelStatus {
    Loaded(Arc<dyn ModelService>),
    Unavailable(String),
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Loaded(_) => "loaded",
            ModelStatus::Unavailable(_) => "unavailable",
        }
    }
}

#[derive(Clone)]
pub struct SharedState {
    pub model: ModelStatus,
    pub presentation: PresentationConfig,
    pub metrics: Arc<Metrics>,
    pub pages: Arc<Pages>,
}

impl SharedState {
    pub fn new(
        model: ModelStatus,
        presentation: PresentationConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            model,
            presentation,
            metrics,
            pages: Arc::new(Pages::new()?),
        })
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: SharedState, config: &ServerConfig) -> anyhow::Result<Self> {
        let addr = config.get_address();
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let router = api_routes(state).layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        mut shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await.ok();
                })
                .await?;
            Ok(())
        });

        Ok(server_handle)
    }
}
