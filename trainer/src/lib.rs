pub mod consumer;
pub mod error;
pub mod job;
pub mod monitor;
pub mod registry;
pub mod runner;

pub use consumer::{Delivery, JobHandler, QueueConsumer, Settlement};
pub use error::{Result, TrainErr};
pub use job::{TrainJob, TrainRoutine};
pub use registry::{Coordinator, MemCoordinator, Registrar, Reporter};
pub use runner::JobRunner;
