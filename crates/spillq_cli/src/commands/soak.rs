//! Soak command implementation.

use super::{CliError, CliResult, Codec};
use spillq_core::{
    BatchPersister, CborFilePersister, JsonFilePersister, QueueConfig, SpillQueue,
};
use spillq_testkit::{run_producers_consumer, Payload, StressConfig, StressTestResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for a soak run.
#[derive(Debug, Clone)]
pub struct SoakOptions {
    /// Directory under which the spill directory is created.
    pub root: PathBuf,
    /// Number of producer threads.
    pub producers: usize,
    /// Elements pushed by each producer.
    pub per_producer: usize,
    /// Queue heap capacity.
    pub heap_capacity: usize,
    /// Queue page size.
    pub page_size: usize,
    /// Largest consumer batch.
    pub max_batch: usize,
    /// Payload body length in bytes.
    pub payload_size: usize,
    /// Spill file encoding.
    pub codec: Codec,
    /// Monitor interval in seconds.
    pub monitor_secs: Option<u64>,
}

impl SoakOptions {
    fn queue_config(&self) -> QueueConfig {
        let total = self.producers.saturating_mul(self.per_producer);
        let config = QueueConfig::new("soak")
            .capacity(total.max(self.heap_capacity))
            .heap_capacity(self.heap_capacity)
            .page_size(self.page_size)
            .disk_root(&self.root);
        match self.monitor_secs {
            Some(secs) => config.monitor_interval(Some(Duration::from_secs(secs))),
            None => config,
        }
    }

    fn stress_config(&self) -> StressConfig {
        StressConfig {
            producers: self.producers,
            per_producer: self.per_producer,
            max_batch: self.max_batch,
            payload_size: self.payload_size,
            deadline: Duration::from_secs(3_600),
        }
    }
}

/// Runs the soak command.
pub fn run(options: &SoakOptions) -> CliResult<()> {
    let result = soak(options)?;
    result.print_summary("soak");

    if result.is_clean() {
        Ok(())
    } else {
        Err(CliError::SoakFailed(format!(
            "produced {}, consumed {}, duplicates {}, out of order {}, errors {:?}",
            result.produced, result.consumed, result.duplicates, result.out_of_order, result.errors
        )))
    }
}

/// Opens the queue, runs the workload and returns the verification result.
fn soak(options: &SoakOptions) -> CliResult<StressTestResult> {
    let persister: Arc<dyn BatchPersister<Payload>> = match options.codec {
        Codec::Json => Arc::new(JsonFilePersister::new()),
        Codec::Cbor => Arc::new(CborFilePersister::new()),
    };
    let queue = Arc::new(SpillQueue::with_shared_persister(
        options.queue_config(),
        persister,
    )?);
    tracing::info!(queue = ?queue, codec = ?options.codec, "soak started");

    let result = run_producers_consumer(Arc::clone(&queue), &options.stress_config());

    println!("{}", queue.summary());
    Ok(result)
}
