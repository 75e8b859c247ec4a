//! Tasks and task queues
//!
//! A [`TaskQueue`] is the ordered list of named units of work for one export
//! run. Queues are assembled with a [`TaskQueueBuilder`] and cannot change
//! once built: the runner consumes them as-is.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use crate::error::{Result, RunError};

/// A zero-argument unit of work
///
/// Implementations either complete or return an error; the runner never
/// retries a failed action.
#[async_trait]
pub trait TaskAction: Send + Sync {
    /// Execute the work
    async fn run(&self) -> Result<()>;
}

/// [`TaskAction`] backed by a closure that returns a future
pub struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self) -> Result<()> {
        (self.0)().await
    }
}

/// Adapt an async closure into a [`TaskAction`]
///
/// ```
/// use quick_export::task::{from_fn, TaskAction};
///
/// # #[tokio::main]
/// # async fn main() -> quick_export::Result<()> {
/// let action = from_fn(|| async { Ok(()) });
/// action.run().await?;
/// # Ok(())
/// # }
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnAction(f)
}

/// One named unit of work within a run
pub struct Task {
    name: String,
    ordinal: usize,
    action: Box<dyn TaskAction>,
}

impl Task {
    /// Name shown to the user while the task runs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position in the queue
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Execute the task body
    pub async fn run(&self) -> Result<()> {
        self.action.run().await
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

/// Immutable, non-empty, ordered sequence of tasks
#[derive(Debug)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    /// Start building a queue
    pub fn builder() -> TaskQueueBuilder {
        TaskQueueBuilder::default()
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false for a built queue
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task at the given position
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Tasks in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Task names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::name).collect()
    }
}

/// Builder for [`TaskQueue`]
#[derive(Debug, Default)]
pub struct TaskQueueBuilder {
    tasks: Vec<Task>,
    names: HashSet<String>,
}

impl TaskQueueBuilder {
    /// Append a task; names must be unique within a queue
    pub fn push(
        &mut self,
        name: impl Into<String>,
        action: impl TaskAction + 'static,
    ) -> Result<&mut Self> {
        self.push_boxed(name.into(), Box::new(action))
    }

    /// Append an already boxed action
    pub fn push_boxed(&mut self, name: String, action: Box<dyn TaskAction>) -> Result<&mut Self> {
        if !self.names.insert(name.clone()) {
            return Err(RunError::DuplicateTask { name }.into());
        }
        let ordinal = self.tasks.len();
        self.tasks.push(Task {
            name,
            ordinal,
            action,
        });
        Ok(self)
    }

    /// Finish the queue; an empty queue is rejected
    pub fn build(self) -> Result<TaskQueue> {
        if self.tasks.is_empty() {
            return Err(RunError::EmptyQueue.into());
        }
        Ok(TaskQueue { tasks: self.tasks })
    }
}
