//! Background ingestion queue.
//!
//! Submitting a layer flips its network to DEPLOYING right away and hands the
//! features to a single worker thread, which writes them in batches and
//! finishes with DEPLOYED or FAILED. Callers poll the network status.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{error, info, warn};

use super::config::IngestConfig;
use crate::model::{DataStatus, LineFeature};
use crate::{Error, NetworkId, NetworkStore};

struct IngestJob {
    network: NetworkId,
    features: Vec<LineFeature>,
}

/// Single-writer ingestion worker shared by every network
pub struct IngestQueue {
    store: Arc<dyn NetworkStore>,
    sender: Option<Sender<IngestJob>>,
    worker: Option<JoinHandle<()>>,
}

impl IngestQueue {
    /// Starts the worker thread
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if the thread cannot be spawned.
    pub fn spawn(store: Arc<dyn NetworkStore>, config: IngestConfig) -> Result<Self, Error> {
        let (sender, receiver) = mpsc::channel::<IngestJob>();
        let worker_store = Arc::clone(&store);

        let worker = thread::Builder::new()
            .name("catchment-ingest".to_string())
            .spawn(move || {
                for job in receiver {
                    run_job(worker_store.as_ref(), job, config);
                }
            })?;

        Ok(Self {
            store,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Marks the network DEPLOYING and queues its features.
    ///
    /// # Errors
    ///
    /// Fails when the network is unknown or the worker has stopped; in the
    /// latter case the network is marked FAILED.
    pub fn submit(&self, network: NetworkId, features: Vec<LineFeature>) -> Result<(), Error> {
        self.store.set_data_status(network, DataStatus::Deploying)?;

        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(IngestJob { network, features }).is_ok());
        if !sent {
            self.store.set_data_status(network, DataStatus::Failed)?;
            return Err(Error::StorageFailure(format!(
                "ingest worker is not running, {network} not queued"
            )));
        }
        Ok(())
    }

    /// Drains the queue and joins the worker
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Ingest worker terminated abnormally");
            }
        }
    }
}

impl Drop for IngestQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_job(store: &dyn NetworkStore, job: IngestJob, config: IngestConfig) {
    let network = job.network;
    let status = match catch_unwind(AssertUnwindSafe(|| write_batches(store, job, config))) {
        Ok(Ok(written)) => {
            info!("Ingested {written} edges into {network}");
            DataStatus::Deployed
        }
        Ok(Err(e)) => {
            warn!("Ingestion into {network} failed: {e}");
            DataStatus::Failed
        }
        Err(_) => {
            error!("Ingestion into {network} panicked");
            DataStatus::Failed
        }
    };

    if let Err(e) = store.set_data_status(network, status) {
        warn!("Could not record {status:?} for {network}: {e}");
    }
}

fn write_batches(
    store: &dyn NetworkStore,
    job: IngestJob,
    config: IngestConfig,
) -> Result<usize, Error> {
    let mut written = 0;
    let batches = job.features.into_iter().chunks(config.batch_size.max(1));
    for batch in &batches {
        written += store.append_edges(job.network, batch.collect())?.len();
    }
    Ok(written)
}

/// Polls the network until ingestion reaches a terminal status or `timeout`
/// elapses, returning the last observed status.
///
/// # Errors
///
/// Propagates storage errors, e.g. an unknown network.
pub fn await_deployment(
    store: &dyn NetworkStore,
    network: NetworkId,
    timeout: Duration,
) -> Result<DataStatus, Error> {
    let deadline = Instant::now() + timeout;
    loop {
        let status = store.network(network)?.data_status;
        if status.is_terminal() || Instant::now() >= deadline {
            return Ok(status);
        }
        thread::sleep(Duration::from_millis(5));
    }
}
