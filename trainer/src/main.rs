use std::{env, error::Error, path::PathBuf};

use log::info;
use tokio::{net::TcpStream, signal};

use store::MySqlStore;
use trainer::{
    QueueConsumer, Registrar, Reporter,
    job::CommandRoutine,
    registry::WireCoordinator,
    runner::JobRunner,
};
use wire::specs::registry::ServiceNode;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "9091";
const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:5670";
const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:2181";
const DEFAULT_DATABASE_URL: &str = "mysql://root@localhost:3306/gspace";
const DEFAULT_BENCHMARKS_DIR: &str = "./benchmarks/gspace";
const DEFAULT_CHECKPOINT_DIR: &str = "./checkpoint/gspace";
const DEFAULT_TRAIN_SERVICE_PATH: &str = "/services/train";
const DEFAULT_MONITOR_PATH: &str = "/services/monitor";
const DEFAULT_TRAIN_CMD: &str = "./bin/train_model.sh";

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let host = var_or("HOST", DEFAULT_HOST);
    let port: u16 = var_or("PORT", DEFAULT_PORT).parse()?;
    let broker_addr = var_or("BROKER_ADDR", DEFAULT_BROKER_ADDR);
    let coordinator_addr = var_or("COORDINATOR_ADDR", DEFAULT_COORDINATOR_ADDR);
    let db_url = var_or("DATABASE_URL", DEFAULT_DATABASE_URL);
    let benchmarks_root = PathBuf::from(var_or("BENCHMARKS_DIR", DEFAULT_BENCHMARKS_DIR));
    let checkpoints_root = PathBuf::from(var_or("CHECKPOINT_DIR", DEFAULT_CHECKPOINT_DIR));
    let service_path = var_or("TRAIN_SERVICE_PATH", DEFAULT_TRAIN_SERVICE_PATH);
    let monitor_path = var_or("MONITOR_PATH", DEFAULT_MONITOR_PATH);
    let train_cmd = var_or("TRAIN_CMD", DEFAULT_TRAIN_CMD);
    let gpu = var_or("GPU", "false").parse().unwrap_or(false);

    let store = MySqlStore::connect(&db_url).await?;

    let coordinator = WireCoordinator::new(coordinator_addr.clone());
    let registrar = Registrar::new(
        coordinator,
        service_path,
        ServiceNode {
            host,
            port,
            gpu,
            available: true,
        },
    );
    registrar.register().await?;

    let reporter =
        Reporter::discover(&WireCoordinator::new(coordinator_addr), &monitor_path).await?;

    let runner = JobRunner::new(
        registrar,
        reporter,
        store,
        CommandRoutine::new(train_cmd),
        benchmarks_root,
        checkpoints_root,
        gpu,
    );
    let consumer = QueueConsumer::new(runner);

    let stream = TcpStream::connect(&broker_addr).await?;
    let (rx, tx) = stream.into_split();
    info!("consuming jobs from broker at {broker_addr}");

    tokio::select! {
        result = consumer.consume_link(rx, tx) => {
            result?;
            info!("broker link closed");
        }
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
