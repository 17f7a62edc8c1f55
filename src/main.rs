use axum::Router;
use axum::http::{HeaderValue, Method, header};
use internlog::core::auth::{AuthApiState, AuthGate, AuthService, JwtService, auth_api_router};
use internlog::core::comments::{CommentApiState, comment_api_router};
use internlog::core::config::Config;
use internlog::core::db::repositories::{
    CommentRepository, ProfileRepository, RecordRepository, RefreshTokenRepository, UserRepository,
};
use internlog::core::db::{DbConfig, create_pool_with_migrations, health_check};
use internlog::core::llm_api::{LlmApiState, LlmConfig, llm_api_router};
use internlog::core::profile::{ProfileApiState, profile_api_router};
use internlog::core::records::{RecordApiState, record_api_router};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, jwt_secret={}, openai_api_key={}, owner_email={}",
        config.has_database(),
        config.has_jwt_secret(),
        config.has_openai_api_key(),
        config.has_owner_email()
    );

    // Connect to PostgreSQL and apply pending migrations
    let db_config = DbConfig {
        database_url: config.database_url_or_panic().to_string(),
        ..Default::default()
    };
    let pool = create_pool_with_migrations(&db_config)
        .await
        .expect("Failed to connect to database");
    health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connected, migrations applied");

    let jwt = JwtService::from_env().expect("JWT_SECRET environment variable is not set");

    // Repositories share the pool via cheap clones
    let users = UserRepository::new(pool.clone());
    let refresh_tokens = RefreshTokenRepository::new(pool.clone());
    let profiles = ProfileRepository::new(pool.clone());
    let records = RecordRepository::new(pool.clone());
    let comments = CommentRepository::new(pool.clone());

    let auth_service = AuthService::new(
        users.clone(),
        refresh_tokens,
        profiles.clone(),
        jwt.clone(),
        config.owner_email.clone(),
    );
    let gate = AuthGate::new(jwt, users.clone());

    // Shared HTTP client for the LLM proxy; upstream calls are capped at 30s
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let auth_api = auth_api_router(AuthApiState {
        auth_service,
        gate: gate.clone(),
    });
    let record_api = record_api_router(RecordApiState {
        records: records.clone(),
        gate: gate.clone(),
    });
    let profile_api = profile_api_router(ProfileApiState {
        profiles,
        users,
        gate: gate.clone(),
    });
    let comment_api = comment_api_router(CommentApiState {
        comments,
        records,
        gate: gate.clone(),
    });
    let llm_api = llm_api_router(LlmApiState {
        config: LlmConfig::from_env(),
        http,
        gate,
    });

    // CORS with explicit origins; credentialed requests forbid wildcards
    let origins: Vec<HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Build the main application router: API routes first, then the static
    // frontend as the fallback
    let app = Router::new()
        .merge(auth_api)
        .merge(record_api)
        .merge(profile_api)
        .merge(comment_api)
        .merge(llm_api)
        .route("/health", axum::routing::get(health_handler))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(cors)
        // Add compression with Brotli priority (best compression for web)
        .layer(
            CompressionLayer::new()
                .br(true) // Brotli - best compression ratio
                .gzip(true) // Gzip - wide support fallback
                .quality(CompressionLevel::Best),
        );

    // Run our app with hyper
    tracing::info!("listening on http://{}", &config.server_addr);
    tracing::info!("static frontend served from {}", &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

/// GET /health
/// Liveness probe for deployment checks
async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
