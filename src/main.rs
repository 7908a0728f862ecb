use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use painpoint_core::config::Config;
use painpoint_core::handlers;
use painpoint_core::models;
use painpoint_core::services::{
    self, AnalysesRepo, EventEmitter, EventsRepo, HttpAnalyzer, HttpNewsSource, Intake, LogsRepo,
    PainPointsRepo, ResultsRepo, SearchesRepo, StaleRecoveryTask, StatusReader, Subscriber, UsageRepo,
    Worker,
};
use painpoint_core::utils::ScheduledExecutor;
use painpoint_core::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::search::create_search,
        handlers::search::get_status,
        handlers::events::stream,
    ),
    components(schemas(
        models::SearchRequest,
        models::SourceTag,
        models::TimeRange,
        models::SortBy,
        models::SearchStatus,
        models::SearchResult,
        models::PainPoint,
        models::PainPointQuote,
        models::AiAnalysis,
        models::ProblemCluster,
        models::ProductIdea,
        models::SearchEvent,
        models::Phase,
        models::EventType,
        handlers::search::CreateSearchResponse,
        handlers::search::SearchStatusResponse,
    )),
    tags((name = "search", description = "Pain point search intake, status, and event stream"))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("painpoint.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("painpoint starting up");
    tracing::info!("configuration loaded successfully");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.url)
        .await?;
    tracing::info!("database pool created");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("migrations applied");

    let redis_conn = services::init_redis_connection(&config.redis.url).await?;
    let cache = services::RedisCache::new(redis_conn, Duration::from_secs(config.redis.default_ttl_secs));
    tracing::info!("redis connection established");

    let searches_repo = Arc::new(SearchesRepo::new(pool.clone()));
    let results_repo = Arc::new(ResultsRepo::new(pool.clone()));
    let pain_points_repo = Arc::new(PainPointsRepo::new(pool.clone()));
    let analyses_repo = Arc::new(AnalysesRepo::new(pool.clone()));
    let usage_repo = Arc::new(UsageRepo::new(pool.clone()));
    let logs_repo = Arc::new(LogsRepo::new(pool.clone()));
    let events_repo = Arc::new(EventsRepo::new(pool.clone()));

    let event_emitter = EventEmitter::new(Arc::clone(&events_repo));

    let news_source = Arc::new(HttpNewsSource::new(
        config.news_source.base_url.clone(),
        Duration::from_secs(config.news_source.timeout_secs),
    ));

    let analyzer = Arc::new(HttpAnalyzer::new(
        config.analyzer.api_base.clone(),
        config.analyzer.api_key.clone(),
        config.analyzer.model.clone(),
        config.analyzer.max_tokens,
        config.analyzer.temperature,
        Duration::from_secs(config.analyzer.timeout_secs),
    ));

    let worker_config: services::WorkerConfig = (&config.worker).into();

    let worker = Arc::new(Worker::new(
        news_source,
        analyzer,
        Arc::clone(&searches_repo),
        Arc::clone(&results_repo),
        Arc::clone(&pain_points_repo),
        Arc::clone(&analyses_repo),
        Arc::clone(&usage_repo),
        Arc::clone(&logs_repo),
        event_emitter.clone(),
        cache.clone(),
        worker_config,
    ));

    let scheduler_config: services::SchedulerConfig = (&config.scheduler).into();

    let dispatch_task = Arc::new(services::DispatchTask::new(
        Arc::clone(&searches_repo),
        Arc::clone(&worker),
        &scheduler_config,
    ));
    let dispatch_executor = ScheduledExecutor::new("search-dispatch", scheduler_config.dispatch_interval);
    tokio::spawn(async move {
        dispatch_executor.start(dispatch_task).await;
    });
    tracing::info!(
        interval_secs = config.scheduler.dispatch_interval_secs,
        "search dispatch scheduler started"
    );

    let stale_recovery_task =
        Arc::new(StaleRecoveryTask::new(Arc::clone(&searches_repo), &scheduler_config));
    let recovery_executor = ScheduledExecutor::new("stale-recovery", scheduler_config.recovery_interval);
    tokio::spawn(async move {
        recovery_executor.start(stale_recovery_task).await;
    });
    tracing::info!(
        interval_secs = config.scheduler.recovery_interval_secs,
        "stale recovery scheduler started"
    );

    let intake = Arc::new(Intake::new(cache.clone(), Arc::clone(&searches_repo)));
    let status_reader = Arc::new(StatusReader::new(cache.clone(), Arc::clone(&searches_repo)));
    let subscriber = Arc::new(Subscriber::new(events_repo, pain_points_repo, event_emitter));

    let app_state = AppState { db: pool, cache, intake, status_reader, subscriber };

    let app = Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/search", axum::routing::post(handlers::search::create_search))
        .route("/search-status", get(handlers::search::get_status))
        .route("/search-events", get(handlers::events::stream))
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server listening on http://{}", addr);
    tracing::info!("API documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn ready_check() -> &'static str {
    "READY"
}
