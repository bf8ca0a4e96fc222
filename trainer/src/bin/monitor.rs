use std::{env, error::Error, io};

use log::{info, warn};
use tokio::{net::TcpListener, signal};

use store::MySqlStore;
use trainer::{Coordinator, monitor, registry::WireCoordinator};
use wire::specs::registry::ServiceNode;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "9092";
const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:2181";
const DEFAULT_DATABASE_URL: &str = "mysql://root@localhost:3306/gspace";
const DEFAULT_MONITOR_PATH: &str = "/services/monitor";

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

async fn accept_loop(listener: TcpListener, store: MySqlStore) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let store = store.clone();

        tokio::spawn(async move {
            let (rx, tx) = stream.into_split();
            if let Err(e) = monitor::handle_conn(&store, rx, tx).await {
                warn!("monitor connection from {peer} ended: {e}");
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let host = var_or("HOST", DEFAULT_HOST);
    let port: u16 = var_or("PORT", DEFAULT_PORT).parse()?;
    let coordinator_addr = var_or("COORDINATOR_ADDR", DEFAULT_COORDINATOR_ADDR);
    let db_url = var_or("DATABASE_URL", DEFAULT_DATABASE_URL);
    let monitor_path = var_or("MONITOR_PATH", DEFAULT_MONITOR_PATH);

    let store = MySqlStore::connect(&db_url).await?;

    let coordinator = WireCoordinator::new(coordinator_addr);
    let node = ServiceNode {
        host: host.clone(),
        port,
        gpu: false,
        available: true,
    };
    let path = coordinator
        .create_ephemeral(&format!("{monitor_path}/service"), &node)
        .await?;
    info!("monitor registered at {path}");

    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    info!("monitor listening on {}", listener.local_addr()?);

    tokio::select! {
        result = accept_loop(listener, store) => result?,
        _ = signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}
