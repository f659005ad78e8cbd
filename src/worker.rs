//! Single-task background executor.
//!
//! Units of work are boxed futures drained from an unbounded queue by one
//! tokio task, strictly one after another. `shutdown_now` abandons the unit in
//! flight at its next await point and discards everything still queued.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

type Unit = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Cloneable handle for submitting units to a [`Worker`].
#[derive(Clone)]
pub struct Spawner {
    tx: mpsc::UnboundedSender<Unit>,
}

impl Spawner {
    /// Queues `unit` behind everything already submitted.
    pub fn submit<F>(&self, unit: F) -> Result<(), WorkerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx.send(Box::pin(unit)).map_err(|_| WorkerError::Closed)
    }
}

pub struct Worker {
    spawner: Spawner,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts the worker loop on the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_loop(rx, shutdown.clone()));
        Self {
            spawner: Spawner { tx },
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// Stops the loop without waiting for it.
    pub fn shutdown_now(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the loop to exit. Call after [`shutdown_now`](Self::shutdown_now).
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "worker loop ended abnormally");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_loop(mut rx: mpsc::UnboundedReceiver<Unit>, shutdown: CancellationToken) {
    loop {
        let unit = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            unit = rx.recv() => match unit {
                Some(unit) => unit,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::debug!("worker shut down with a unit in flight");
                break;
            }
            _ = unit => {}
        }
    }

    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        tracing::debug!(discarded, "dropped queued units on shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runs_units_in_submission_order() {
        let worker = Worker::spawn();
        let spawner = worker.spawner();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        for i in 0..5 {
            let seen = seen.clone();
            spawner
                .submit(async move {
                    // Later units sleep less; order must still hold.
                    tokio::time::sleep(Duration::from_millis(10 - 2 * i)).await;
                    seen.lock().unwrap().push(i);
                })
                .unwrap();
        }
        spawner
            .submit(async move {
                let _ = done_tx.send(());
            })
            .unwrap();

        done_rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn unit_can_submit_follow_up_unit() {
        let worker = Worker::spawn();
        let spawner = worker.spawner();
        let (done_tx, done_rx) = oneshot::channel();

        let inner = spawner.clone();
        spawner
            .submit(async move {
                inner
                    .submit(async move {
                        let _ = done_tx.send("follow-up ran");
                    })
                    .unwrap();
            })
            .unwrap();

        assert_eq!(done_rx.await.unwrap(), "follow-up ran");
    }

    #[tokio::test]
    async fn shutdown_drops_in_flight_and_queued_units() {
        let worker = Worker::spawn();
        let spawner = worker.spawner();
        let ran = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = oneshot::channel();

        let first = ran.clone();
        spawner
            .submit(async move {
                let _ = started_tx.send(());
                tokio::time::sleep(Duration::from_secs(60)).await;
                first.lock().unwrap().push("first");
            })
            .unwrap();
        let second = ran.clone();
        spawner
            .submit(async move {
                second.lock().unwrap().push("second");
            })
            .unwrap();

        started_rx.await.unwrap();
        worker.shutdown_now();
        tokio::time::timeout(Duration::from_secs(5), worker.join())
            .await
            .expect("worker should stop promptly");

        assert!(ran.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails() {
        let worker = Worker::spawn();
        let spawner = worker.spawner();
        worker.shutdown_now();
        worker.join().await;

        let err = spawner.submit(async {}).unwrap_err();
        assert!(matches!(err, WorkerError::Closed));
    }

    #[tokio::test]
    async fn dropping_worker_stops_loop() {
        let worker = Worker::spawn();
        let spawner = worker.spawner();
        drop(worker);

        // The loop observes the token and releases the receiver.
        tokio::time::timeout(Duration::from_secs(5), async {
            while spawner.submit(async {}).is_ok() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("receiver should close after drop");
    }
}
