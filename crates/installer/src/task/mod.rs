//! Hierarchical task engine
//!
//! A [`Task`] is a named unit of async work. Running it creates a
//! [`TaskNode`] that tracks state and progress; work running inside a node
//! can run child tasks with a weight, and the child's progress is folded into
//! the parent's. Cancellation, pause and resume flow down the tree; progress
//! and failures flow up.
//!
//! ```ignore
//! let task = Task::create("install", |ctx| async move {
//!     ctx.update(0, 100);
//!     ctx.execute(fetch_descriptor(), 40).await?;
//!     ctx.execute(fetch_archive(), 60).await?;
//!     Ok(())
//! });
//! TaskRunner::new().with_reporter(LogReporter).run(task).await?;
//! ```

mod context;
mod events;
mod node;
mod runner;
mod state;

pub use context::{Task, TaskContext};
pub use events::{
    CompositeReporter, IntoTaskCallback, LogReporter, NullReporter, TaskCallback, TaskEvent,
    TaskReporter,
};
pub use node::{Pausable, TaskNode};
pub use runner::{TaskHandle, TaskRunner};
pub use state::{TaskProgress, TaskSnapshot, TaskState};
