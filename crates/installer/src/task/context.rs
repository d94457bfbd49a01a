//! Task definitions and the handle work functions use to talk to their node

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::node::{Pausable, TaskNode};
use crate::error::{InstallError, Result};

type WorkFn<T> = Box<dyn FnOnce(TaskContext) -> BoxFuture<'static, Result<T>> + Send>;

/// A unit of work that has not started yet.
///
/// A task is inert until it is handed to a [`TaskRunner`](super::TaskRunner)
/// or to [`TaskContext::execute`] from inside another task's work.
pub struct Task<T> {
    name: String,
    params: BTreeMap<String, String>,
    work: WorkFn<T>,
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Task<T> {
    /// Create a task from its name and work function
    pub fn create<F, Fut>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
            work: Box::new(move |ctx| work(ctx).boxed()),
        }
    }

    /// Attach a diagnostic parameter (shown in events and snapshots)
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Drive the work inside `node` and settle the node's terminal state.
    ///
    /// Cancellation of the node's token wins over the work: the work future
    /// is dropped at its current suspension point, which closes any
    /// connection or file handle it holds.
    pub(crate) async fn run(self, node: TaskNode) -> Result<T> {
        node.start();
        let unsettled = UnsettledGuard::new(node.clone());
        let token = node.cancellation_token();
        let work = (self.work)(TaskContext { node: node.clone() });

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(InstallError::Cancelled {
                task: node.path().to_string(),
            }),
            result = work => result.map_err(|e| e.within_task(node.path())),
        };

        unsettled.disarm();
        match &outcome {
            Ok(_) => node.succeed(),
            Err(e) if e.is_cancelled() => node.mark_cancelled(),
            Err(e) => node.fail(e),
        }
        outcome
    }
}

/// Marks a node's subtree cancelled when its `run` future is dropped before
/// settling, e.g. a sibling of a failed fail-fast batch item.
struct UnsettledGuard {
    node: Option<TaskNode>,
}

impl UnsettledGuard {
    fn new(node: TaskNode) -> Self {
        Self { node: Some(node) }
    }

    fn disarm(mut self) {
        self.node = None;
    }
}

impl Drop for UnsettledGuard {
    fn drop(&mut self) {
        if let Some(node) = self.node.take() {
            node.mark_cancelled();
        }
    }
}

/// Handle given to a task's work function.
#[derive(Clone, Debug)]
pub struct TaskContext {
    node: TaskNode,
}

impl TaskContext {
    /// Report this task's own progress.
    ///
    /// `total` of `None` means the size is not known yet; such a task gives
    /// its parent no credit until it finishes.
    pub fn update(&self, current: u64, total: impl Into<Option<u64>>) {
        self.node.update(current, total.into(), None);
    }

    pub fn update_with_message(
        &self,
        current: u64,
        total: impl Into<Option<u64>>,
        message: impl Into<String>,
    ) {
        self.node.update(current, total.into(), Some(message.into()));
    }

    /// Register the pause hook of whatever is moving bytes for this task.
    /// Pass `None` once that transfer is over.
    pub fn set_pausable(&self, hook: Option<Arc<dyn Pausable>>) {
        self.node.set_pausable(hook);
    }

    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled()
    }

    /// Token that fires when this task (or an ancestor) is cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.node.cancellation_token()
    }

    pub fn node(&self) -> &TaskNode {
        &self.node
    }

    /// Run `task` as a child occupying `weight` units of this task's total.
    ///
    /// The child's error is returned as is; propagate it with `?` or catch it
    /// to keep going.
    pub async fn execute<T: Send + 'static>(&self, task: Task<T>, weight: u64) -> Result<T> {
        let child = self.node.spawn_child(&task.name, task.params.clone(), weight);
        task.run(child).await
    }
}
