use crate::config::AssessConfig;
use crate::error::AppError;
use crate::handlers;
use crate::services::classifier::{BrightnessClassifier, LeafClassifier, OnnxClassifier};
use crate::services::heatmap::HeatmapRenderer;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider, GeminiVisionProvider};
use crate::services::providers::{TextProvider, VisionProvider};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Upload size cap for /api/predict.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state. All handles are immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: AssessConfig,
    pub classifier: Arc<dyn LeafClassifier>,
    pub vision_provider: Arc<dyn VisionProvider>,
    pub text_provider: Arc<dyn TextProvider>,
    pub heatmap: HeatmapRenderer,
}

/// Build the API router. Exposed so tests can mount mock providers.
pub fn app_router(state: AppState) -> Router {
    let static_dir = state.config.static_files.dir.clone();

    Router::new()
        .route("/", get(handlers::health))
        .route("/api/predict", post(handlers::predict))
        .route(
            "/api/calculate_compensation",
            post(handlers::calculate_compensation),
        )
        .route("/api/get_recommendation", post(handlers::get_recommendation))
        .nest_service("/api/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Select the classification strategy at startup: the real ONNX model when it
/// loads, otherwise the brightness-heuristic demo predictor.
pub fn select_classifier(model_path: &Path) -> Arc<dyn LeafClassifier> {
    match OnnxClassifier::load(model_path) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            tracing::warn!(
                path = %model_path.display(),
                error = %e,
                "Classifier unavailable, serving demo predictions"
            );
            Arc::new(BrightnessClassifier)
        }
    }
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: AssessConfig) -> Result<Self, AppError> {
        let classifier = select_classifier(Path::new(&config.classifier.model_path));

        let vision_provider: Arc<dyn VisionProvider> =
            Arc::new(GeminiVisionProvider::new(GeminiConfig {
                api_key: config.gemini.api_key.clone(),
                model: config.gemini.vision_model.clone(),
            }));
        let text_provider: Arc<dyn TextProvider> =
            Arc::new(GeminiTextProvider::new(GeminiConfig {
                api_key: config.gemini.api_key.clone(),
                model: config.gemini.text_model.clone(),
            }));

        if config.gemini.api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY not set; fallback and recommendations will fail");
        } else {
            tracing::info!(
                text_model = %config.gemini.text_model,
                vision_model = %config.gemini.vision_model,
                "Initialized Gemini providers"
            );
        }

        let heatmap = HeatmapRenderer::new(&config.static_files.dir).map_err(|e| {
            tracing::error!(
                "Failed to initialize static dir {}: {}",
                config.static_files.dir,
                e
            );
            AppError::InternalError(anyhow::Error::new(e))
        })?;

        let state = AppState {
            config: config.clone(),
            classifier,
            vision_provider,
            text_provider,
            heatmap,
        };

        let app = app_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
