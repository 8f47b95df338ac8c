use std::sync::Arc;

use vidtally_detect::annotate::LabelFont;
use vidtally_detect::ObjectDetector;
use vidtally_pipeline::PipelineSettings;

use crate::config::ServerConfig;
use crate::runs::RunRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Loaded once at startup and shared by every detection pass.
    pub detector: Arc<dyn ObjectDetector>,
    pub font: Option<Arc<LabelFont>>,
    pub settings: Arc<PipelineSettings>,
    pub runs: Arc<RunRegistry>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        detector: Arc<dyn ObjectDetector>,
        font: Option<Arc<LabelFont>>,
    ) -> Self {
        let settings = Arc::new(config.pipeline_settings());
        let runs = Arc::new(RunRegistry::new(config.data_dir.clone(), config.max_runs));
        Self {
            config: Arc::new(config),
            detector,
            font,
            settings,
            runs,
        }
    }
}
