//! Bounded worker pool with per-transaction serialization.
//!
//! Two guarantees:
//!
//! - at most `size` jobs run at once,
//! - jobs for the same transaction never overlap.
//!
//! Background jobs go through [`WorkerPool::try_spawn`], which drops the
//! job when one for the same id is already queued or running. Operator
//! overrides use [`WorkerPool::run_exclusive`], which waits its turn.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{watch, Mutex, Notify, Semaphore};
use tracing::debug;

use crate::domain::TransactionId;

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    locks: Arc<DashMap<TransactionId, Arc<Mutex<()>>>>,
    in_flight: Arc<DashMap<TransactionId, ()>>,
    idle: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
}

impl WorkerPool {
    /// A pool running at most `size` jobs at once.
    ///
    /// Spawned jobs are dropped mid-flight once `shutdown` turns `true`.
    #[must_use]
    pub fn new(size: usize, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            locks: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            idle: Arc::new(Notify::new()),
            shutdown,
        }
    }

    /// Queue `job` for `id` unless a job for `id` is already pending.
    ///
    /// Returns whether the job was queued.
    pub fn try_spawn<F>(&self, id: TransactionId, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.in_flight.insert(id, ()).is_some() {
            debug!(transaction_id = %id, "Job already in flight, skipping");
            return false;
        }

        let pool = self.clone();
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if !*shutdown.borrow() {
                tokio::select! {
                    () = pool.run_exclusive(id, job) => {}
                    _ = wait_for_shutdown(&mut shutdown) => {
                        debug!(transaction_id = %id, "Job cancelled by shutdown");
                    }
                }
            }
            pool.in_flight.remove(&id);
            pool.idle.notify_waiters();
        });
        true
    }

    /// Run `job` once no other job for `id` is running and a worker is free.
    pub async fn run_exclusive<F, T>(&self, id: TransactionId, job: F) -> T
    where
        F: Future<Output = T>,
    {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            // The semaphore is never closed.
            let _permit = self.permits.acquire().await.ok();
            job.await
        };
        self.locks
            .remove_if(&id, |_, entry| Arc::strong_count(entry) <= 2);
        result
    }

    /// Whether a background job for `id` is queued or running.
    #[must_use]
    pub fn is_in_flight(&self, id: &TransactionId) -> bool {
        self.in_flight.contains_key(id)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait until no background job is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// Resolve once `shutdown` turns `true`.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone: nobody can request shutdown any more.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pool(size: usize) -> (WorkerPool, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (WorkerPool::new(size, rx), tx)
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_spawn_is_skipped_while_in_flight() {
        let (pool, _shutdown) = pool(4);
        let id = TransactionId::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        assert!(pool.try_spawn(id, async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = runs.clone();
        assert!(!pool.try_spawn(id, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(pool.is_in_flight(&id));

        pool.wait_idle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!pool.is_in_flight(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_for_one_id_never_overlap() {
        let (pool, _shutdown) = pool(4);
        let id = TransactionId::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let spawned = pool.clone();
        let (a, m) = (active.clone(), max_seen.clone());
        spawned.try_spawn(id, async move {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            a.fetch_sub(1, Ordering::SeqCst);
        });
        let (a, m) = (active.clone(), max_seen.clone());
        pool.run_exclusive(id, async move {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            a.fetch_sub(1, Ordering::SeqCst);
        })
        .await;
        pool.wait_idle().await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_size_bounds_parallelism() {
        let (pool, _shutdown) = pool(2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let (a, m) = (active.clone(), max_seen.clone());
            pool.try_spawn(TransactionId::new(), async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                a.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.wait_idle().await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_jobs() {
        let (pool, shutdown) = pool(1);
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        pool.try_spawn(TransactionId::new(), async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        shutdown.send(true).unwrap();
        pool.wait_idle().await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(pool.in_flight(), 0);
    }
}
