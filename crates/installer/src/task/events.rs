//! Task tree events and reporters

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::state::TaskProgress;

/// Callback receiving every event of a task tree
pub type TaskCallback = Arc<dyn Fn(TaskEvent) + Send + Sync>;

/// Events emitted by task nodes.
///
/// `path` is the dotted chain of task names from the root
/// (`install.installVersion.json`), so a consumer can follow any depth.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Started {
        id: u64,
        path: String,
        params: BTreeMap<String, String>,
    },
    Progress {
        id: u64,
        path: String,
        progress: TaskProgress,
    },
    Paused {
        id: u64,
        path: String,
    },
    Resumed {
        id: u64,
        path: String,
    },
    Succeeded {
        id: u64,
        path: String,
    },
    Failed {
        id: u64,
        path: String,
        error: String,
    },
    Cancelled {
        id: u64,
        path: String,
    },
}

impl TaskEvent {
    pub fn path(&self) -> &str {
        match self {
            TaskEvent::Started { path, .. }
            | TaskEvent::Progress { path, .. }
            | TaskEvent::Paused { path, .. }
            | TaskEvent::Resumed { path, .. }
            | TaskEvent::Succeeded { path, .. }
            | TaskEvent::Failed { path, .. }
            | TaskEvent::Cancelled { path, .. } => path,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            TaskEvent::Started { id, .. }
            | TaskEvent::Progress { id, .. }
            | TaskEvent::Paused { id, .. }
            | TaskEvent::Resumed { id, .. }
            | TaskEvent::Succeeded { id, .. }
            | TaskEvent::Failed { id, .. }
            | TaskEvent::Cancelled { id, .. } => *id,
        }
    }
}

/// Trait for task reporting with more granular control
pub trait TaskReporter: Send + Sync {
    fn on_started(&self, _path: &str, _params: &BTreeMap<String, String>) {}
    fn on_progress(&self, _path: &str, _progress: &TaskProgress) {}
    fn on_paused(&self, _path: &str) {}
    fn on_resumed(&self, _path: &str) {}
    fn on_succeeded(&self, _path: &str) {}
    fn on_failed(&self, _path: &str, _error: &str) {}
    fn on_cancelled(&self, _path: &str) {}
}

/// Extension trait to convert a TaskReporter into a TaskCallback
pub trait IntoTaskCallback {
    fn into_callback(self) -> TaskCallback;
}

impl<T: TaskReporter + 'static> IntoTaskCallback for T {
    fn into_callback(self) -> TaskCallback {
        Arc::new(move |event| match event {
            TaskEvent::Started { path, params, .. } => self.on_started(&path, &params),
            TaskEvent::Progress { path, progress, .. } => self.on_progress(&path, &progress),
            TaskEvent::Paused { path, .. } => self.on_paused(&path),
            TaskEvent::Resumed { path, .. } => self.on_resumed(&path),
            TaskEvent::Succeeded { path, .. } => self.on_succeeded(&path),
            TaskEvent::Failed { path, error, .. } => self.on_failed(&path, &error),
            TaskEvent::Cancelled { path, .. } => self.on_cancelled(&path),
        })
    }
}

/// Reporter that forwards lifecycle events to `tracing`.
///
/// Progress is deliberately not logged; at asset granularity it would flood
/// the output.
#[derive(Debug, Default)]
pub struct LogReporter;

impl TaskReporter for LogReporter {
    fn on_started(&self, path: &str, params: &BTreeMap<String, String>) {
        debug!(task = path, ?params, "task started");
    }

    fn on_succeeded(&self, path: &str) {
        debug!(task = path, "task succeeded");
    }

    fn on_failed(&self, path: &str, error: &str) {
        warn!(task = path, error, "task failed");
    }

    fn on_cancelled(&self, path: &str) {
        debug!(task = path, "task cancelled");
    }
}

/// Reporter that does nothing
#[derive(Debug, Default)]
pub struct NullReporter;

impl TaskReporter for NullReporter {}

/// Composite reporter that forwards events to multiple reporters
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn TaskReporter>>,
}

impl std::fmt::Debug for CompositeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeReporter")
            .field("reporters_count", &self.reporters.len())
            .finish()
    }
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reporter<R: TaskReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl TaskReporter for CompositeReporter {
    fn on_started(&self, path: &str, params: &BTreeMap<String, String>) {
        for reporter in &self.reporters {
            reporter.on_started(path, params);
        }
    }

    fn on_progress(&self, path: &str, progress: &TaskProgress) {
        for reporter in &self.reporters {
            reporter.on_progress(path, progress);
        }
    }

    fn on_paused(&self, path: &str) {
        for reporter in &self.reporters {
            reporter.on_paused(path);
        }
    }

    fn on_resumed(&self, path: &str) {
        for reporter in &self.reporters {
            reporter.on_resumed(path);
        }
    }

    fn on_succeeded(&self, path: &str) {
        for reporter in &self.reporters {
            reporter.on_succeeded(path);
        }
    }

    fn on_failed(&self, path: &str, error: &str) {
        for reporter in &self.reporters {
            reporter.on_failed(path, error);
        }
    }

    fn on_cancelled(&self, path: &str) {
        for reporter in &self.reporters {
            reporter.on_cancelled(path);
        }
    }
}
