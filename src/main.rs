use asns_server::config::Config;
use asns_server::coordinator::Coordinator;
use asns_server::kv::Stores;
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    log::info!("opening database at {}", config.db_path.display());
    let stores = Stores::open(&config.db_path)?;

    let coordinator = Arc::new(Coordinator::new(stores));
    log::info!("running startup reconciliation");
    coordinator.reconcile()?;

    let app = asns_server::http::router(coordinator);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}
