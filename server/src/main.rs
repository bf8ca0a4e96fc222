use std::{env, error::Error, sync::Arc, time::Duration};

use log::info;
use tokio::net::TcpListener;

use server::{CacheDir, IndexHandle, ModelSynchronizer, ServingFront, serve, sync};
use store::MySqlStore;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "9090";
const DEFAULT_DATABASE_URL: &str = "mysql://root@localhost:3306/gspace";
const DEFAULT_MODELS_DIR: &str = "./models";
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let models_dir = env::var("MODELS_DIR").unwrap_or_else(|_| DEFAULT_MODELS_DIR.to_string());
    let period = env::var("UPDATE_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);

    let store = MySqlStore::connect(&db_url).await?;
    let cache = CacheDir::open(&models_dir)?;
    let synchronizer = ModelSynchronizer::new(store, cache);

    let handle = Arc::new(IndexHandle::new());

    let (index, report) = synchronizer.load().await?;
    info!("initial synchronization: {report}");
    handle.publish(index);

    let refresh = tokio::spawn(sync::run_refresh_loop(
        synchronizer,
        handle.clone(),
        Duration::from_secs(period),
    ));

    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    info!("serving on {}", listener.local_addr()?);

    let front = ServingFront::new(handle);

    tokio::select! {
        result = serve::serve(listener, front) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    refresh.abort();
    Ok(())
}
