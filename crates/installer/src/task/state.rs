//! Task state machine and progress snapshots

use std::collections::BTreeMap;

/// Lifecycle of a task node.
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal: a node in one of them
/// ignores every later progress update and state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Idle,
    Running,
    Paused,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, TaskState::Running | TaskState::Paused)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Paused => "paused",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Progress counters of one node.
///
/// `total == None` means the size is not known yet (a byte stream before its
/// headers arrive). Once `total` is known, `current <= total` holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskProgress {
    pub current: u64,
    pub total: Option<u64>,
    pub message: Option<String>,
}

impl TaskProgress {
    /// Completed fraction in `0.0..=1.0`, if the total is known and non-zero
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.current as f64 / total as f64),
            _ => None,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

/// Point-in-time copy of a node and its subtree, for polling consumers.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub state: TaskState,
    pub progress: TaskProgress,
    pub weight: u64,
    pub error: Option<String>,
    pub children: Vec<TaskSnapshot>,
}

impl TaskSnapshot {
    /// Depth-first search for the first node with this name
    pub fn find(&self, name: &str) -> Option<&TaskSnapshot> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Count nodes in this subtree matching a predicate
    pub fn count(&self, predicate: &dyn Fn(&TaskSnapshot) -> bool) -> usize {
        let own = usize::from(predicate(self));
        own + self.children.iter().map(|c| c.count(predicate)).sum::<usize>()
    }
}
