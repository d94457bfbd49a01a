//! Root task execution

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use super::context::Task;
use super::events::{IntoTaskCallback, TaskCallback, TaskReporter};
use super::node::{TaskNode, TreeShared};
use super::state::{TaskProgress, TaskSnapshot, TaskState};
use crate::error::{InstallError, Result};

/// Executes root tasks and wires their events to a callback.
#[derive(Clone, Default)]
pub struct TaskRunner {
    callback: Option<TaskCallback>,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event of every tree this runner executes
    pub fn with_callback(mut self, callback: TaskCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_reporter<R: TaskReporter + 'static>(self, reporter: R) -> Self {
        self.with_callback(reporter.into_callback())
    }

    fn root_node<T>(&self, task: &Task<T>) -> TaskNode
    where
        T: Send + 'static,
    {
        let shared = Arc::new(TreeShared::new(self.callback.clone()));
        TaskNode::root(task.name(), task.params().clone(), shared)
    }

    /// Spawn `task` on the current tokio runtime and return a handle for
    /// observing, pausing or cancelling it.
    pub fn execute<T: Send + 'static>(&self, task: Task<T>) -> TaskHandle<T> {
        let root = self.root_node(&task);
        let span = tracing::info_span!("task", name = task.name());
        let join = tokio::spawn(task.run(root.clone()).instrument(span));
        TaskHandle { root, join }
    }

    /// Run `task` to completion on the calling future
    pub async fn run<T: Send + 'static>(&self, task: Task<T>) -> Result<T> {
        let root = self.root_node(&task);
        task.run(root).await
    }
}

/// Handle to a spawned root task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    root: TaskNode,
    join: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn root(&self) -> &TaskNode {
        &self.root
    }

    pub fn cancel(&self) {
        self.root.cancel();
    }

    pub fn pause(&self) {
        self.root.pause();
    }

    pub fn resume(&self) {
        self.root.resume();
    }

    pub fn state(&self) -> TaskState {
        self.root.state()
    }

    pub fn progress(&self) -> TaskProgress {
        self.root.progress()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.root.snapshot()
    }

    /// Wait for the root task and return its result
    pub async fn wait(self) -> Result<T> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                self.root.mark_cancelled();
                Err(InstallError::Cancelled {
                    task: self.root.path().to_string(),
                })
            }
            Err(e) => {
                let reason = panic_reason(e.into_panic());
                let error = InstallError::TaskPanicked {
                    task: self.root.path().to_string(),
                    reason,
                };
                self.root.fail(&error);
                Err(error)
            }
        }
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
