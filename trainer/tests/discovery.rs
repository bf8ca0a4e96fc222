//! Registrar, reporter and monitor flows over the in-memory coordinator.

use store::{CallLog, MemoryStore};
use trainer::{Coordinator, MemCoordinator, Registrar, Reporter, TrainErr, monitor};
use wire::specs::registry::{ReportBody, ServiceNode};

fn train_node() -> ServiceNode {
    ServiceNode {
        host: "10.0.0.3".into(),
        port: 9091,
        gpu: true,
        available: true,
    }
}

#[tokio::test]
async fn test_register_then_toggle_availability() {
    let coordinator = MemCoordinator::new();
    let registrar = Registrar::new(coordinator, "/services/train", train_node());

    registrar.register().await.unwrap();

    registrar.set_availability(false).await.unwrap();
    let nodes = registrar_children(&registrar).await;
    assert_eq!(nodes.len(), 1);
    assert!(!nodes[0].available);

    registrar.set_availability(true).await.unwrap();
    let nodes = registrar_children(&registrar).await;
    assert!(nodes[0].available);
}

async fn registrar_children(registrar: &Registrar<MemCoordinator>) -> Vec<ServiceNode> {
    registrar
        .coordinator()
        .children("/services/train")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_availability_before_registration_is_an_error() {
    let registrar = Registrar::new(MemCoordinator::new(), "/services/train", train_node());

    let result = registrar.set_availability(false).await;
    assert!(matches!(result, Err(TrainErr::NotRegistered)));
}

#[tokio::test]
async fn test_sequence_suffixed_paths_keep_registrations_apart() {
    let coordinator = MemCoordinator::new();

    let first = coordinator
        .create_ephemeral("/services/train/service", &train_node())
        .await
        .unwrap();
    let second = coordinator
        .create_ephemeral("/services/train/service", &train_node())
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(
        coordinator.children("/services/train").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_reporter_discovers_monitors_once() {
    let coordinator = MemCoordinator::new();
    coordinator
        .create_ephemeral(
            "/services/monitor/service",
            &ServiceNode {
                host: "10.0.0.9".into(),
                port: 9092,
                gpu: false,
                available: true,
            },
        )
        .await
        .unwrap();

    let reporter = Reporter::discover(&coordinator, "/services/monitor")
        .await
        .unwrap();

    // A monitor registered later is invisible to this reporter; only a
    // report attempt with zero monitors fails.
    drop(reporter);

    let empty = Reporter::discover(&coordinator, "/services/other")
        .await
        .unwrap();
    let result = empty
        .report(&ReportBody {
            uid: 7,
            service: "/services/train".into(),
            timestamp: "1700000000".into(),
            duration: "12.50".into(),
            info: "{}".into(),
        })
        .await;
    assert!(matches!(result, Err(TrainErr::NoMonitor)));
}

#[tokio::test]
async fn test_report_lands_in_monitor_log() {
    let log = MemoryStore::new();

    let (reporter_end, monitor_end) = tokio::io::duplex(4096);
    let (mon_rx, mon_tx) = tokio::io::split(monitor_end);
    let serving = tokio::spawn(async move {
        let log = log;
        monitor::handle_conn(&log, mon_rx, mon_tx).await.unwrap();
        log
    });

    let report = ReportBody {
        uid: 7,
        service: "/services/train".into(),
        timestamp: "1700000000".into(),
        duration: "12.50".into(),
        info: r#"{"gpu":true}"#.into(),
    };

    let (rx, tx) = tokio::io::split(reporter_end);
    Reporter::report_over(rx, tx, &report).await.unwrap();

    let log = serving.await.unwrap();
    assert_eq!(log.query(7).await.unwrap(), [report]);
}
