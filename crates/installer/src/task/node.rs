//! Task nodes: identity, state, progress and weighted aggregation
//!
//! A node owns its progress counters. When a parent runs a child with a
//! weight, the child's `0..=total` progress is rescaled onto `weight` units
//! of the parent's total and added to the parent's `current` as the child
//! reports. The parent never needs to know the child's internal size, and the
//! child never needs to know where it sits in the tree.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio_util::sync::CancellationToken;

use super::events::{TaskCallback, TaskEvent};
use super::state::{TaskProgress, TaskSnapshot, TaskState};
use crate::error::InstallError;

/// Hooks a running transfer registers so the tree can throttle it.
///
/// Pausing is advisory: it stops byte movement without ending the task.
pub trait Pausable: Send + Sync {
    fn pause(&self);
    fn resume(&self);
}

/// State shared by every node of one tree
pub(crate) struct TreeShared {
    next_id: AtomicU64,
    callback: Option<TaskCallback>,
}

impl TreeShared {
    pub(crate) fn new(callback: Option<TaskCallback>) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callback,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn emit(&self, event: TaskEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

struct NodeState {
    status: TaskState,
    progress: TaskProgress,
    /// Units of the parent's total already credited by this node
    reported: u64,
    children: Vec<TaskNode>,
    pausable: Option<Arc<dyn Pausable>>,
    error: Option<String>,
}

struct NodeInner {
    id: u64,
    name: String,
    path: String,
    params: BTreeMap<String, String>,
    weight: u64,
    parent: Option<Weak<NodeInner>>,
    token: CancellationToken,
    shared: Arc<TreeShared>,
    state: Mutex<NodeState>,
}

/// A handle to one node of a running (or finished) task tree.
///
/// Cloning is cheap; every clone observes the same node.
#[derive(Clone)]
pub struct TaskNode {
    inner: Arc<NodeInner>,
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}

impl TaskNode {
    pub(crate) fn root(
        name: &str,
        params: BTreeMap<String, String>,
        shared: Arc<TreeShared>,
    ) -> Self {
        Self::build(name.to_string(), name.to_string(), params, 0, None, CancellationToken::new(), shared)
    }

    fn build(
        name: String,
        path: String,
        params: BTreeMap<String, String>,
        weight: u64,
        parent: Option<Weak<NodeInner>>,
        token: CancellationToken,
        shared: Arc<TreeShared>,
    ) -> Self {
        let id = shared.next_id();
        Self {
            inner: Arc::new(NodeInner {
                id,
                name,
                path,
                params,
                weight,
                parent,
                token,
                shared,
                state: Mutex::new(NodeState {
                    status: TaskState::Idle,
                    progress: TaskProgress::default(),
                    reported: 0,
                    children: Vec::new(),
                    pausable: None,
                    error: None,
                }),
            }),
        }
    }

    /// Create and attach a child occupying `weight` units of this node's total
    pub(crate) fn spawn_child(
        &self,
        name: &str,
        params: BTreeMap<String, String>,
        weight: u64,
    ) -> TaskNode {
        let child = Self::build(
            name.to_string(),
            format!("{}.{}", self.inner.path, name),
            params,
            weight,
            Some(Arc::downgrade(&self.inner)),
            self.inner.token.child_token(),
            self.inner.shared.clone(),
        );
        self.lock().children.push(child.clone());
        child
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TaskEvent) {
        self.inner.shared.emit(event);
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.inner.params
    }

    /// Units of the parent's total this node occupies
    pub fn weight(&self) -> u64 {
        self.inner.weight
    }

    pub fn state(&self) -> TaskState {
        self.lock().status
    }

    pub fn progress(&self) -> TaskProgress {
        self.lock().progress.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn children(&self) -> Vec<TaskNode> {
        self.lock().children.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let (state, progress, error, children) = {
            let st = self.lock();
            (st.status, st.progress.clone(), st.error.clone(), st.children.clone())
        };
        TaskSnapshot {
            id: self.inner.id,
            name: self.inner.name.clone(),
            path: self.inner.path.clone(),
            params: self.inner.params.clone(),
            state,
            progress,
            weight: self.inner.weight,
            error,
            children: children.iter().map(TaskNode::snapshot).collect(),
        }
    }

    /// Request cancellation of this node and everything below it.
    ///
    /// The running work observes it at its next suspension point; the node
    /// and its active descendants then end up `Cancelled`.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    /// Pause every active node in this subtree that registered a pause hook.
    /// Nodes without a hook ignore the request.
    pub fn pause(&self) {
        let (hook, children) = {
            let mut st = self.lock();
            let hook = match (st.status, &st.pausable) {
                (TaskState::Running, Some(hook)) => Some(hook.clone()),
                _ => None,
            };
            if hook.is_some() {
                st.status = TaskState::Paused;
            }
            (hook, st.children.clone())
        };
        if let Some(hook) = hook {
            hook.pause();
            self.emit(TaskEvent::Paused {
                id: self.inner.id,
                path: self.inner.path.clone(),
            });
        }
        for child in children {
            child.pause();
        }
    }

    pub fn resume(&self) {
        let (hook, children) = {
            let mut st = self.lock();
            let hook = match (st.status, &st.pausable) {
                (TaskState::Paused, Some(hook)) => Some(hook.clone()),
                _ => None,
            };
            if st.status == TaskState::Paused {
                st.status = TaskState::Running;
            }
            (hook, st.children.clone())
        };
        if let Some(hook) = hook {
            hook.resume();
            self.emit(TaskEvent::Resumed {
                id: self.inner.id,
                path: self.inner.path.clone(),
            });
        }
        for child in children {
            child.resume();
        }
    }

    /// Register (or clear) the pause hook of the code running in this node
    pub(crate) fn set_pausable(&self, hook: Option<Arc<dyn Pausable>>) {
        let pause_now = {
            let mut st = self.lock();
            st.pausable = hook.clone();
            match (&hook, st.status) {
                // a new transfer started while the node was paused
                (Some(hook), TaskState::Paused) => Some(hook.clone()),
                (None, TaskState::Paused) => {
                    st.status = TaskState::Running;
                    None
                }
                _ => None,
            }
        };
        if let Some(hook) = pause_now {
            hook.pause();
        }
    }

    pub(crate) fn start(&self) {
        {
            let mut st = self.lock();
            if st.status != TaskState::Idle {
                return;
            }
            st.status = TaskState::Running;
        }
        self.emit(TaskEvent::Started {
            id: self.inner.id,
            path: self.inner.path.clone(),
            params: self.inner.params.clone(),
        });
    }

    /// Set this node's own counters
    pub(crate) fn update(&self, current: u64, total: Option<u64>, message: Option<String>) {
        let (progress, delta) = {
            let mut st = self.lock();
            if st.status.is_terminal() {
                return;
            }
            st.progress.total = total;
            st.progress.current = clamp(current, total);
            if message.is_some() {
                st.progress.message = message;
            }
            let delta = self.take_delta(&mut st, false);
            (st.progress.clone(), delta)
        };
        self.emit(TaskEvent::Progress {
            id: self.inner.id,
            path: self.inner.path.clone(),
            progress,
        });
        self.propagate(delta);
    }

    /// Credit `delta` units reported by a child
    fn advance(&self, delta: u64) {
        let (progress, own_delta) = {
            let mut st = self.lock();
            if st.status.is_terminal() {
                return;
            }
            let current = st.progress.current.saturating_add(delta);
            st.progress.current = clamp(current, st.progress.total);
            let own_delta = self.take_delta(&mut st, false);
            (st.progress.clone(), own_delta)
        };
        self.emit(TaskEvent::Progress {
            id: self.inner.id,
            path: self.inner.path.clone(),
            progress,
        });
        self.propagate(own_delta);
    }

    /// How many of the parent's units this node has earned so far
    fn contribution(&self, st: &NodeState, finished: bool) -> u64 {
        let weight = self.inner.weight;
        if finished {
            return weight;
        }
        match st.progress.total {
            Some(total) if total > 0 => {
                let scaled = weight as u128 * st.progress.current as u128 / total as u128;
                (scaled as u64).min(weight)
            }
            _ => 0,
        }
    }

    /// Credit toward the parent is monotonic: a transfer restarting on the
    /// next mirror never takes units back from its ancestors.
    fn take_delta(&self, st: &mut NodeState, finished: bool) -> u64 {
        let earned = self.contribution(st, finished);
        let delta = earned.saturating_sub(st.reported);
        st.reported = st.reported.max(earned);
        delta
    }

    fn propagate(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        if let Some(parent) = self.inner.parent.as_ref().and_then(Weak::upgrade) {
            TaskNode { inner: parent }.advance(delta);
        }
    }

    pub(crate) fn succeed(&self) {
        let delta = {
            let mut st = self.lock();
            if st.status.is_terminal() {
                return;
            }
            st.status = TaskState::Succeeded;
            if let Some(total) = st.progress.total {
                st.progress.current = total;
            }
            st.pausable = None;
            self.take_delta(&mut st, true)
        };
        self.emit(TaskEvent::Succeeded {
            id: self.inner.id,
            path: self.inner.path.clone(),
        });
        self.propagate(delta);
    }

    pub(crate) fn fail(&self, error: &InstallError) {
        let message = error.to_string();
        {
            let mut st = self.lock();
            if st.status.is_terminal() {
                return;
            }
            st.status = TaskState::Failed;
            st.error = Some(message.clone());
            st.pausable = None;
        }
        self.emit(TaskEvent::Failed {
            id: self.inner.id,
            path: self.inner.path.clone(),
            error: message,
        });
    }

    /// Move this node and every non-terminal descendant to `Cancelled`
    pub(crate) fn mark_cancelled(&self) {
        let (changed, children) = {
            let mut st = self.lock();
            let changed = !st.status.is_terminal();
            if changed {
                st.status = TaskState::Cancelled;
                st.pausable = None;
            }
            (changed, st.children.clone())
        };
        if changed {
            self.emit(TaskEvent::Cancelled {
                id: self.inner.id,
                path: self.inner.path.clone(),
            });
        }
        for child in children {
            child.mark_cancelled();
        }
    }
}

fn clamp(current: u64, total: Option<u64>) -> u64 {
    match total {
        Some(total) => current.min(total),
        None => current,
    }
}
