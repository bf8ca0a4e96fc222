use std::{
    path::PathBuf,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use log::warn;
use serde_json::json;

use store::ArtifactStore;
use wire::specs::{queue::JobSpec, registry::ReportBody};

use crate::{
    consumer::JobHandler,
    error::Result,
    job::{TrainJob, TrainRoutine},
    registry::{Coordinator, Registrar, Reporter},
};

/// Wraps job execution with availability toggling and call reporting.
pub struct JobRunner<C, S, T> {
    registrar: Registrar<C>,
    reporter: Reporter,
    store: S,
    routine: T,
    benchmarks_root: PathBuf,
    checkpoints_root: PathBuf,
    gpu: bool,
}

impl<C, S, T> JobRunner<C, S, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registrar: Registrar<C>,
        reporter: Reporter,
        store: S,
        routine: T,
        benchmarks_root: PathBuf,
        checkpoints_root: PathBuf,
        gpu: bool,
    ) -> Self {
        Self {
            registrar,
            reporter,
            store,
            routine,
            benchmarks_root,
            checkpoints_root,
            gpu,
        }
    }
}

#[async_trait]
impl<C, S, T> JobHandler for JobRunner<C, S, T>
where
    C: Coordinator,
    S: ArtifactStore,
    T: TrainRoutine,
{
    /// Runs one job: node busy, timed execution, node available again,
    /// then a duration report for the monitor.
    async fn run(&self, spec: &JobSpec) -> Result<()> {
        self.registrar.set_availability(false).await?;

        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let clock = Instant::now();

        let result = TrainJob::new(spec.clone(), &self.benchmarks_root, &self.checkpoints_root)
            .run(&self.routine, &self.store)
            .await;

        let elapsed = clock.elapsed();

        // The node goes back to available even when the job failed; the
        // broker decides about redelivery, not the registry.
        self.registrar.set_availability(true).await?;
        result?;

        let report = ReportBody {
            uid: spec.uid,
            service: self.registrar.service_path().to_string(),
            timestamp: started.as_secs().to_string(),
            duration: format!("{:.2}", elapsed.as_secs_f64()),
            info: json!({ "gpu": self.gpu }).to_string(),
        };

        if let Err(e) = self.reporter.report(&report).await {
            warn!("call report for job {} not delivered: {e}", spec.uuid);
        }

        Ok(())
    }
}
