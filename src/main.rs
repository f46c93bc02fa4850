use std::sync::Arc;
use std::time::Duration;

use emojimise::cache::HttpCache;
use emojimise::compositor::Compositor;
use emojimise::config::Config;
use emojimise::detector::HttpFaceDetector;
use emojimise::fetcher::HttpFetcher;
use emojimise::queue::RedisQueue;
use emojimise::router::Router;
use emojimise::rpc::{self, AppState};
use emojimise::state::set_state;
use emojimise::worker::Worker;
use emojimise::{Method, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    emojimise::tracing::init_tracing(&config.log_level);

    let cache: Arc<dyn emojimise::cache::Cache> = Arc::new(HttpCache::new(
        config.cache_address.clone(),
        Duration::from_secs(config.fetch_timeout_secs),
    ));
    let detector: Arc<dyn emojimise::detector::FaceDetector> = Arc::new(HttpFaceDetector::new(
        config.facebox_address.clone(),
        Duration::from_secs(config.detector_timeout_secs),
    ));
    let fetcher: Arc<dyn emojimise::fetcher::Fetcher> = Arc::new(HttpFetcher::new(
        Duration::from_secs(config.fetch_timeout_secs),
        config.fetch_max_bytes,
    ));
    let compositor = Arc::new(Compositor::load(&config.emoji_dir)?);
    let queue: Arc<RedisQueue> = Arc::new(RedisQueue::new(
        &config.queue_addr,
        &config.queue_password,
        config.queue_db,
        Duration::from_secs(config.queue_item_ttl_secs),
    )?);

    let pop_rx = queue.spawn_pop_loop(Duration::from_millis(config.pop_error_delay_ms));
    let worker = Arc::new(Worker {
        cache: cache.clone(),
        fetcher,
        detector,
        compositor,
    });
    tokio::spawn(worker.run(pop_rx));

    let app_state = AppState {
        cache,
        queue: queue as Arc<dyn emojimise::queue::Queue>,
    };
    set_state(app_state);

    let mut router = Router::new();
    router.route(Method::POST, "/v1/check", rpc::check);
    router.route(Method::POST, "/v1/create", rpc::create);
    router.route(Method::POST, "/v1/query", rpc::query);
    router.route(Method::GET, "/health", rpc::health);

    let mut health_router = Router::new();
    health_router.route(Method::GET, "/health", rpc::health);

    let rpc_listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let health_listener = tokio::net::TcpListener::bind(&config.health_addr).await?;

    tokio::select! {
        _ = serve(rpc_listener, router) => {}
        _ = serve(health_listener, health_router) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, stopping RPC surface");
        }
    }

    Ok(())
}
