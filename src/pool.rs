//! Fixed-size fan-out/fan-in worker pool.
//!
//! `N` workers share one bounded job queue. Each worker pulls a job, runs it,
//! and pushes the output into a shared unbounded outcome channel. A barrier
//! task joins every worker and only then drops the last outcome sender, so the
//! outcome channel closes exactly once and never before all workers exited.

use crate::error::{ScanError, ScanResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// `workers` is clamped to at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Starts the workers on `jobs`.
    ///
    /// Workers exit when the job queue is closed and drained, or when
    /// `cancel` fires (an in-flight job is then abandoned and yields no output).
    pub fn spawn<J, O, F, Fut>(
        &self,
        jobs: mpsc::Receiver<J>,
        work: F,
        cancel: CancellationToken,
    ) -> PoolHandle<O>
    where
        J: Send + 'static,
        O: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let jobs = Arc::new(Mutex::new(jobs));
        let work = Arc::new(work);
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let mut set = JoinSet::new();
        for worker_id in 0..self.workers {
            let jobs = jobs.clone();
            let work = work.clone();
            let out_tx = out_tx.clone();
            let cancel = cancel.clone();
            set.spawn(worker_loop(worker_id, jobs, work, out_tx, cancel));
        }

        let workers = self.workers;
        let barrier = tokio::spawn(async move {
            let mut completed = 0u64;
            let mut failure = None;
            while let Some(res) = set.join_next().await {
                match res {
                    Ok(n) => completed += n,
                    Err(e) => {
                        if failure.is_none() {
                            failure = Some(ScanError::from(e));
                        }
                    }
                }
            }
            debug!(workers, completed, "all workers exited");
            // Last sender: closes the outcome channel.
            drop(out_tx);
            match failure {
                Some(e) => Err(e),
                None => Ok(completed),
            }
        });

        PoolHandle {
            outcomes: out_rx,
            barrier,
        }
    }
}

async fn worker_loop<J, O, F, Fut>(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<J>>>,
    work: Arc<F>,
    out_tx: mpsc::UnboundedSender<O>,
    cancel: CancellationToken,
) -> u64
where
    F: Fn(J) -> Fut,
    Fut: Future<Output = O>,
{
    let mut done = 0u64;
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = async {
                let mut rx = jobs.lock().await;
                rx.recv().await
            } => job,
        };
        let Some(job) = job else {
            break;
        };

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            output = (*work)(job) => output,
        };
        if out_tx.send(output).is_err() {
            // Nobody is listening any more.
            break;
        }
        done += 1;
    }
    trace!(worker_id, done, "worker exiting");
    done
}

/// Running pool: the fan-in side plus the join barrier.
pub struct PoolHandle<O> {
    outcomes: mpsc::UnboundedReceiver<O>,
    barrier: JoinHandle<ScanResult<u64>>,
}

impl<O> PoolHandle<O> {
    /// Fan-in side; yields `None` once every worker has exited and all
    /// outputs were taken.
    pub fn outcomes(&mut self) -> &mut mpsc::UnboundedReceiver<O> {
        &mut self.outcomes
    }

    /// Waits for the barrier. Returns how many jobs completed with an output.
    pub async fn join(self) -> ScanResult<u64> {
        self.barrier.await?
    }
}
