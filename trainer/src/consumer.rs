//! The job-queue consumer state machine.

use std::io;

use async_trait::async_trait;
use log::{info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use wire::{
    msg::Msg,
    specs::queue::{JobSpec, QueueMsg},
};

use crate::error::{Result, TrainErr};

/// One unsettled broker delivery.
///
/// `ack` and `nack` consume the delivery, so every delivery is settled
/// exactly once.
#[async_trait]
pub trait Delivery: Send {
    /// The opaque payload bytes as published on the queue.
    fn payload(&self) -> &[u8];

    /// Whether the broker has delivered this message before.
    fn redelivered(&self) -> bool;

    async fn ack(self: Box<Self>) -> io::Result<()>;

    async fn nack(self: Box<Self>, requeue: bool) -> io::Result<()>;
}

/// The per-job processing routine the consumer drives.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, spec: &JobSpec) -> Result<()>;
}

/// How one delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Nacked { requeue: bool },
}

/// Drives one handler over a stream of deliveries, one at a time.
pub struct QueueConsumer<H> {
    handler: H,
}

impl<H: JobHandler> QueueConsumer<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Processes a single delivery to settlement.
    ///
    /// An unparseable payload is nacked without requeue and the handler
    /// is never invoked. A handler failure is nacked with
    /// `requeue = !redelivered`, so a job is retried once and then left
    /// to the broker's dead-letter handling. Success acks.
    ///
    /// # Returns
    /// The settlement applied, or the transport error that prevented
    /// settling.
    pub async fn process(&self, delivery: Box<dyn Delivery>) -> io::Result<Settlement> {
        let spec: JobSpec = match serde_json::from_slice(delivery.payload()) {
            Ok(spec) => spec,
            Err(e) => {
                let e = TrainErr::MalformedPayload(e);
                warn!("dropping delivery: {e}");
                delivery.nack(false).await?;
                return Ok(Settlement::Nacked { requeue: false });
            }
        };

        let redelivered = delivery.redelivered();
        info!(
            "running job {} for ({}, {}), {} triples",
            spec.uuid,
            spec.gid,
            spec.model_name,
            spec.train_triples.len()
        );

        match self.handler.run(&spec).await {
            Ok(()) => {
                delivery.ack().await?;
                info!("acked job {}", spec.uuid);
                Ok(Settlement::Acked)
            }
            Err(e) => {
                let requeue = !redelivered;
                warn!("job {} failed (requeue: {requeue}): {e}", spec.uuid);
                delivery.nack(requeue).await?;
                Ok(Settlement::Nacked { requeue })
            }
        }
    }

    /// Consumes a framed broker link until it closes.
    ///
    /// Jobs are processed strictly in order; the next delivery is not
    /// taken until the previous one is settled.
    pub async fn consume_link<R, W>(&self, rx: R, tx: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (mut rx, mut tx) = wire::channel(rx, tx);
        let (settle_tx, mut settle_rx) = mpsc::unbounded_channel();

        loop {
            let msg: Msg = match rx.recv().await {
                Ok(msg) => msg,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            };

            let Msg::Queue(QueueMsg::Job {
                tag,
                payload,
                redelivered,
            }) = msg
            else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "broker links only carry job deliveries",
                ));
            };

            let delivery = WireDelivery {
                tag,
                payload,
                redelivered,
                settlements: settle_tx.clone(),
            };
            self.process(Box::new(delivery)).await?;

            // Processing is serial, so the settlement is ready here.
            while let Ok(settlement) = settle_rx.try_recv() {
                tx.send(&Msg::Queue(settlement)).await?;
            }
        }
    }
}

/// A delivery received over the framed broker link.
struct WireDelivery {
    tag: u64,
    payload: String,
    redelivered: bool,
    settlements: mpsc::UnboundedSender<QueueMsg>,
}

impl WireDelivery {
    fn settle(self, msg: QueueMsg) -> io::Result<()> {
        self.settlements
            .send(msg)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "broker link closed"))
    }
}

#[async_trait]
impl Delivery for WireDelivery {
    fn payload(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn ack(self: Box<Self>) -> io::Result<()> {
        let tag = self.tag;
        self.settle(QueueMsg::Ack { tag })
    }

    async fn nack(self: Box<Self>, requeue: bool) -> io::Result<()> {
        let tag = self.tag;
        self.settle(QueueMsg::Nack { tag, requeue })
    }
}
