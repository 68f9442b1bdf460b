//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        MemoryDocumentStore, MemoryIdentity, PgDocumentStore, PgIdentityAdapter, TracingMailer,
    },
    config::{Config, ConfigError},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use memory_wall_core::ports::{DocumentStore, IdentityService, MailService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let mailer: Arc<dyn MailService> = Arc::new(TracingMailer);
    let (identity, store): (Arc<dyn IdentityService>, Arc<dyn DocumentStore>) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let store = PgDocumentStore::new(db_pool.clone());
                info!("Running database migrations...");
                store.run_migrations().await?;
                info!("Database migrations complete.");
                (
                    Arc::new(PgIdentityAdapter::new(
                        db_pool,
                        mailer,
                        &config.public_base_url,
                    )),
                    Arc::new(store),
                )
            }
            None => {
                warn!("DATABASE_URL is not set; accounts and thoughts are kept in memory only.");
                (
                    Arc::new(MemoryIdentity::new(mailer, &config.public_base_url)),
                    Arc::new(MemoryDocumentStore::new()),
                )
            }
        };

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(identity, store, config.clone())?);

    // --- 4. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
