//! `proxima-web`, the dashboard HTTP server binary (spec.md §6): a
//! standalone binary that builds its dependencies then hands off to a
//! long-running `axum::serve`.

use log::info;
use proxima::config::CONFIG;
use proxima::store::ConfigStore;
use proxima::web_api;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    info!("proxima-web: starting dashboard server (db_uri={})", CONFIG.db_uri);
    let store: Arc<dyn ConfigStore> = if CONFIG.db_uri.starts_with("postgres://") || CONFIG.db_uri.starts_with("postgresql://") {
        Arc::new(proxima::store::PostgresConfigStore::connect(&CONFIG.db_uri).await)
    } else {
        Arc::new(proxima::store::InMemoryConfigStore::new())
    };
    let app = web_api::router(store);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
    info!("proxima-web: listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
