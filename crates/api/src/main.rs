use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidtally_api::config::{LogFormat, ServerConfig};
use vidtally_api::detector::{load_detector, load_font};
use vidtally_api::router::build_app_router;
use vidtally_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vidtally_api=debug,vidtally_pipeline=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        host = %config.host,
        port = %config.port,
        data_dir = %config.data_dir.display(),
        sample_fps = config.sample_fps,
        output_fps = config.output_fps,
        auto_process = config.auto_process,
        "Loaded server configuration"
    );

    // --- Detector ---
    let detector = load_detector(&config.detector).expect("Failed to load detector");
    let font = load_font(&config.detector).expect("Failed to load label font");
    tracing::info!(
        detector = detector.name(),
        classes = detector.class_names().len(),
        captions = font.is_some(),
        "Detector ready"
    );

    // --- Working storage ---
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .expect("Failed to create DATA_DIR");

    // --- App state ---
    let state = AppState::new(config.clone(), detector, font);

    if !state.settings.ffmpeg.is_available().await {
        tracing::warn!(
            ffmpeg = %config.ffmpeg_bin.display(),
            "ffmpeg is not runnable; uploads will fail at frame extraction"
        );
    }

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
