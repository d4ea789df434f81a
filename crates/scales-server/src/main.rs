use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    response::{Html, IntoResponse},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use scales_api::auth::{AppState, AppStateInner};
use scales_api::maintenance;
use scales_api::schema::{ScalesSchema, build_schema};
use scales_api::storage::Storage;
use scales_api::token::TokenService;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scales=debug,tower_http=debug".into()),
        )
        .init();

    // Config; the signing secret is loaded once here and injected into the
    // token service, never read from the environment again.
    let jwt_secret = std::env::var("SCALES_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: SCALES_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("SCALES_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SCALES_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("SCALES_DB_PATH")
        .unwrap_or_else(|_| "scales.db".into())
        .into();
    let uploads_dir: PathBuf = std::env::var("SCALES_UPLOADS_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let token_ttl_secs: i64 = std::env::var("SCALES_TOKEN_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600); // 1 hour
    let reconcile_interval_secs: u64 = std::env::var("SCALES_RECONCILE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);

    // Init database and storage
    let db = scales_db::Database::open(&db_path)?;
    let storage = Storage::new(uploads_dir.clone()).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        tokens: TokenService::new(&jwt_secret, token_ttl_secs),
    });

    // Background orphan reconciliation
    tokio::spawn(maintenance::run_reconcile_loop(
        state.clone(),
        reconcile_interval_secs,
    ));

    let schema = build_schema(state);

    // Uploaded payloads stay retrievable by stored name
    let app = Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(&uploads_dir))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // matches the 50 MB upload limit
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(schema);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Scales server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn graphql_handler(
    State(schema): State<ScalesSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health() -> &'static str {
    "ok"
}
