use std::net::SocketAddr;
use std::sync::Arc;
use territory_scoring_api::config::Config;
use territory_scoring_api::context::ScoringContext;
use territory_scoring_api::handlers::{self, AppState};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration and the scoring artifacts, then serves the
/// router. Any artifact problem aborts startup before the listener is bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "territory_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let scoring = ScoringContext::from_config(&config)?;
    tracing::info!(
        "✅ Scoring context ready ({} variant, {} features, strict schema: {})",
        scoring.schema().variant.as_str(),
        scoring.schema().feature_count(),
        scoring.strict_schema()
    );

    // Configure rate limiter per client IP
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );

    let scoring_routes = handlers::limited_scoring_routes(config.request_body_limit_bytes)
        .layer(GovernorLayer {
            config: governor_conf,
        });

    let addr = format!("0.0.0.0:{}", config.port);
    let app = handlers::app(AppState::new(scoring, config), scoring_routes);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
