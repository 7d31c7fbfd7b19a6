use mailflow_server::{
    app::{AppState, router},
    config::ServerConfig,
    store::{MemoryStore, MemoryTemplateStore, PgWorkflowStore, WorkflowStore},
};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Loaded configuration");

    let store: Arc<dyn WorkflowStore> = match &config.database_url {
        Some(url) => {
            let pool = match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
            {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database");
                    return ExitCode::FAILURE;
                }
            };

            tracing::info!("Running database migrations...");
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::error!(error = %e, "Failed to run migrations");
                return ExitCode::FAILURE;
            }
            Arc::new(PgWorkflowStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, workflows are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(
        AppState::new(store, config.layout.into())
            .with_templates(Arc::new(MemoryTemplateStore::with_samples())),
    );
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.bind_addr, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("listening on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
