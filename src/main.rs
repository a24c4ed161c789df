use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use parfum_api::{
    api::{create_router, AppState},
    config::Config,
    db,
    events::BroadcastEventBus,
    ports::MemberReadPort,
    search::SearchEngineClient,
    services::{
        spawn_event_handlers, PreferenceAnalysisService, PreferenceCache, RecommendationService,
        SurveyService, TaskPool, VoteService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Storage and search adapters
    let db_pool = db::create_pool(&config.database_url).await?;
    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = db::Cache::new(redis_client).await;

    let reviews = Arc::new(db::PgReviewRepository::new(db_pool.clone()));
    let catalog = Arc::new(db::PgCatalogRepository::new(db_pool.clone()));
    let members = Arc::new(db::PgMemberRepository::new(db_pool.clone()));
    let vote_repo = Arc::new(db::PgVoteRepository::new(db_pool));
    let search = Arc::new(SearchEngineClient::new(
        config.search_url.clone(),
        config.search_index.clone(),
    ));

    let profile_store = Arc::new(db::RedisProfileStore::new(cache.clone()));
    let aggregate_store = Arc::new(db::RedisAggregateStore::new(cache));

    // Background scheduling and events, owned here and cancelled at shutdown
    let (tasks, task_pool_handle) = TaskPool::new();
    let bus = BroadcastEventBus::new(256);

    // Core services
    let builder =
        PreferenceAnalysisService::new(reviews.clone(), catalog.clone());
    let profiles = Arc::new(PreferenceCache::new(profile_store, builder));

    let recommendations = Arc::new(RecommendationService::new(
        Arc::clone(&profiles),
        search.clone(),
        catalog.clone(),
        members.clone(),
        Arc::new(bus.clone()),
        tasks.clone(),
    ));
    let votes = Arc::new(VoteService::new(
        vote_repo.clone(),
        vote_repo,
        aggregate_store,
        Arc::new(bus.clone()),
        tasks.clone(),
    ));
    let survey = Arc::new(SurveyService::new(catalog, search));

    // Warm every reviewing member's profile off the request path
    {
        let members = members.clone();
        let profiles = Arc::clone(&profiles);
        tasks.spawn("startup-profile-sweep", async move {
            let member_ids = members.member_ids_with_reviews().await?;
            profiles.refresh_all(member_ids).await;
            Ok(())
        });
    }

    let event_handlers = spawn_event_handlers(&bus, Arc::clone(&profiles), tasks);

    // HTTP surface
    let state = AppState::new(recommendations, votes, survey, profiles);
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    event_handlers.shutdown().await;
    task_pool_handle.shutdown().await;
    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
