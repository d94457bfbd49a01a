//! Bounded worker pool for large flat collections
//!
//! `N` logical workers drain one shared queue. They are futures polled
//! together on the caller's task, not spawned threads; concurrency here means
//! overlapping I/O waits.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::error::{AggregateError, InstallError, Result};

/// Drains a queue of items with a fixed number of workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
    fail_fast: bool,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            fail_fast: false,
        }
    }

    /// Abort the whole batch on the first item error instead of collecting
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Run `work` once per item.
    ///
    /// Fail-fast returns the first error and drops the in-flight items.
    /// Best-effort keeps draining after a failure and returns
    /// [`InstallError::Aggregate`] with every failure at the end. Cancellation
    /// always stops the batch immediately. Items are never re-queued.
    pub async fn run<I, F, Fut>(&self, items: Vec<I>, work: F) -> Result<()>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if items.is_empty() {
            return Ok(());
        }

        let workers = self.concurrency.min(items.len());
        let queue = Mutex::new(VecDeque::from(items));
        let errors = Mutex::new(Vec::new());
        debug!(workers, fail_fast = self.fail_fast, "starting worker pool");

        let fail_fast = self.fail_fast;
        let (queue_ref, errors_ref, work) = (&queue, &errors, &work);
        let workers = (0..workers).map(move |_| async move {
            loop {
                let item = queue_ref
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(item) = item else { break };

                match work(item).await {
                    Ok(()) => {}
                    Err(e) if fail_fast || e.is_cancelled() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "item failed, continuing with the rest");
                        errors_ref
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(e);
                    }
                }
            }
            Ok::<(), InstallError>(())
        });

        try_join_all(workers).await?;

        let errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(errors).into())
        }
    }
}
