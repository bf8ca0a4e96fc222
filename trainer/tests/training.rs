//! Consumer settlement semantics and the end-to-end job path.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;

use store::{ArtifactStore, MemoryStore};
use trainer::{
    Delivery, JobHandler, QueueConsumer, Result as TrainResult, Settlement, TrainErr, TrainJob,
    TrainRoutine,
};
use wire::{
    msg::Msg,
    specs::queue::{JobSpec, QueueMsg},
};

struct MemDelivery {
    payload: Vec<u8>,
    redelivered: bool,
    settled: Arc<Mutex<Vec<Settlement>>>,
}

impl MemDelivery {
    fn new(payload: &[u8], redelivered: bool) -> (Self, Arc<Mutex<Vec<Settlement>>>) {
        let settled = Arc::new(Mutex::new(Vec::new()));
        let delivery = Self {
            payload: payload.to_vec(),
            redelivered,
            settled: settled.clone(),
        };

        (delivery, settled)
    }
}

#[async_trait]
impl Delivery for MemDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn ack(self: Box<Self>) -> io::Result<()> {
        self.settled.lock().push(Settlement::Acked);
        Ok(())
    }

    async fn nack(self: Box<Self>, requeue: bool) -> io::Result<()> {
        self.settled.lock().push(Settlement::Nacked { requeue });
        Ok(())
    }
}

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl JobHandler for CountingHandler {
    async fn run(&self, _spec: &JobSpec) -> TrainResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            Err(TrainErr::Routine("synthetic failure".into()))
        } else {
            Ok(())
        }
    }
}

fn job_payload() -> Vec<u8> {
    let spec = JobSpec {
        train_triples: vec![("a".into(), "b".into(), "likes".into())],
        model_name: "transe".into(),
        gid: 1,
        uuid: "f35a7da8".into(),
        uid: 42,
    };

    serde_json::to_vec(&spec).unwrap()
}

#[tokio::test]
async fn test_malformed_payload_nacked_without_invoking_handler() {
    let consumer = QueueConsumer::new(CountingHandler::default());
    let (delivery, settled) = MemDelivery::new(b"not a job", false);

    let settlement = consumer.process(Box::new(delivery)).await.unwrap();

    assert_eq!(settlement, Settlement::Nacked { requeue: false });
    assert_eq!(*settled.lock(), [Settlement::Nacked { requeue: false }]);
    assert_eq!(consumer.handler().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_acks_exactly_once() {
    let consumer = QueueConsumer::new(CountingHandler::default());
    let (delivery, settled) = MemDelivery::new(&job_payload(), false);

    let settlement = consumer.process(Box::new(delivery)).await.unwrap();

    assert_eq!(settlement, Settlement::Acked);
    assert_eq!(*settled.lock(), [Settlement::Acked]);
    assert_eq!(consumer.handler().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_requeues_first_delivery_only() {
    let consumer = QueueConsumer::new(CountingHandler {
        fail: true,
        ..Default::default()
    });

    let (fresh, settled) = MemDelivery::new(&job_payload(), false);
    let settlement = consumer.process(Box::new(fresh)).await.unwrap();
    assert_eq!(settlement, Settlement::Nacked { requeue: true });
    assert_eq!(*settled.lock(), [Settlement::Nacked { requeue: true }]);

    // Second attempt goes to dead-lettering instead of looping forever.
    let (redelivered, settled) = MemDelivery::new(&job_payload(), true);
    let settlement = consumer.process(Box::new(redelivered)).await.unwrap();
    assert_eq!(settlement, Settlement::Nacked { requeue: false });
    assert_eq!(*settled.lock(), [Settlement::Nacked { requeue: false }]);

    assert_eq!(consumer.handler().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_broker_link_settles_in_order() {
    let consumer = Arc::new(QueueConsumer::new(CountingHandler::default()));

    let (broker, trainer_end) = tokio::io::duplex(4096);
    let (rx, tx) = tokio::io::split(trainer_end);
    let link = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.consume_link(rx, tx).await })
    };

    let (rx, tx) = tokio::io::split(broker);
    let (mut rx, mut tx) = wire::channel(rx, tx);

    tx.send(&Msg::Queue(QueueMsg::Job {
        tag: 1,
        payload: String::from_utf8(job_payload()).unwrap(),
        redelivered: false,
    }))
    .await
    .unwrap();
    assert!(matches!(
        rx.recv().await.unwrap(),
        Msg::Queue(QueueMsg::Ack { tag: 1 })
    ));

    tx.send(&Msg::Queue(QueueMsg::Job {
        tag: 2,
        payload: "garbage".into(),
        redelivered: false,
    }))
    .await
    .unwrap();
    assert!(matches!(
        rx.recv().await.unwrap(),
        Msg::Queue(QueueMsg::Nack {
            tag: 2,
            requeue: false
        })
    ));

    drop(rx);
    drop(tx);
    assert!(link.await.unwrap().is_ok());
    assert_eq!(consumer.handler().calls.load(Ordering::SeqCst), 1);
}

/// Emits zeroed 2-dimensional embedding tables sized to the prepared id
/// maps, standing in for the real gradient-descent collaborator.
struct ZeroRoutine;

impl TrainRoutine for ZeroRoutine {
    fn run(&self, benchmark_dir: &Path, checkpoint_dir: &Path) -> TrainResult<PathBuf> {
        let count_of = |file: &str| -> usize {
            let text = fs::read_to_string(benchmark_dir.join(file)).unwrap();
            text.lines().next().unwrap().trim().parse().unwrap()
        };

        let entities = count_of("entity2id.txt");
        let relations = count_of("relation2id.txt");

        let params = serde_json::json!({
            "ent_embeddings.weight": vec![0.0f32; entities * 2],
            "rel_embeddings.weight": vec![0.0f32; relations * 2],
        });

        let path = checkpoint_dir.join("param.json");
        fs::write(&path, params.to_string())?;
        Ok(path)
    }
}

#[tokio::test]
async fn test_job_run_uploads_complete_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let spec = JobSpec {
        train_triples: (0..20)
            .map(|i| (format!("e{i}"), format!("e{}", i + 1), "likes".to_string()))
            .collect(),
        model_name: "transe".into(),
        gid: 3,
        uuid: "f35a7da8".into(),
        uid: 42,
    };

    let job = TrainJob::new(
        spec,
        &dir.path().join("benchmarks"),
        &dir.path().join("checkpoint"),
    );
    job.run(&ZeroRoutine, &store).await.unwrap();

    // The uploaded artifact is available and complete.
    let inventory = store.inventory().await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].gid, 3);
    assert_eq!(inventory[0].model, "transe");

    let row = store.fetch(3, "transe").await.unwrap();
    let (params, entity2id, relation2id) = row.complete().unwrap();
    assert!(params.contains("ent_embeddings.weight"));
    assert_eq!(predictor::IdMap::parse(entity2id).unwrap().len(), 21);
    assert_eq!(predictor::IdMap::parse(relation2id).unwrap().len(), 1);
}
