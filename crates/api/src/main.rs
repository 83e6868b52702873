use std::net::SocketAddr;
use std::sync::Arc;

use imprint_api::config::ServerConfig;
use imprint_api::router::build_app_router;
use imprint_api::state::AppState;
use imprint_api::storage::LocalFileStore;
use imprint_core::tax::TaxCipher;
use imprint_mail::{EmailConfig, LogMailer, Mailer, SmtpMailer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imprint_api=debug,imprint_mail=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = imprint_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    imprint_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    imprint_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- File storage ---
    let file_store = LocalFileStore::new(config.storage_root.clone());
    tokio::fs::create_dir_all(file_store.root())
        .await
        .expect("Failed to create storage root");
    tracing::info!(root = %file_store.root().display(), "Local file store ready");

    // --- Email ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email_config) => {
            let smtp = SmtpMailer::new(&email_config).expect("Failed to build SMTP transport");
            tracing::info!(host = %email_config.smtp_host, "SMTP mailer configured");
            Arc::new(smtp)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; outgoing email will only be logged");
            Arc::new(LogMailer)
        }
    };

    // --- Tax identifier encryption ---
    let tax_cipher =
        TaxCipher::from_base64(&config.tax_encryption_key).expect("Invalid TAX_ENCRYPTION_KEY");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        file_store: Arc::new(file_store),
        mailer,
        tax_cipher: Arc::new(tax_cipher),
    };

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

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
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
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
