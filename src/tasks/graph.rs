//! Task registration.
//!
//! # Responsibilities
//! - Store task bodies behind one type-erased interface
//! - Record each task's prerequisites
//! - Hand out typed handles that narrow results back to the output type
//!
//! # Design Decisions
//! - A prerequisite is a [`TaskRef`], which only registration creates, so a
//!   task can only depend on tasks registered before it. Cycles cannot be
//!   expressed and need no runtime check
//! - The graph is built with `&mut self` and then shared as
//!   `Arc<TaskGraph>`; it never changes while requests run

use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::tasks::ctx::Ctx;
use crate::tasks::error::{BoxError, TaskError};

/// A task output with its concrete type erased.
pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Position of a task in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Untyped reference to a registered task, usable as a prerequisite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub(crate) graph: u64,
    pub(crate) id: TaskId,
}

impl TaskRef {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

/// Body of a task as seen by the executor.
pub(crate) trait ErasedTask: Send + Sync {
    fn execute(&self, ctx: Ctx) -> BoxFuture<'static, Result<ErasedValue, BoxError>>;
}

struct FnTask<F, O> {
    body: F,
    _output: PhantomData<fn() -> O>,
}

impl<F, Fut, O> ErasedTask for FnTask<F, O>
where
    F: Fn(Ctx) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
    O: Send + Sync + 'static,
{
    fn execute(&self, ctx: Ctx) -> BoxFuture<'static, Result<ErasedValue, BoxError>> {
        (self.body)(ctx)
            .map(|result| result.map(|value| Arc::new(value) as ErasedValue))
            .boxed()
    }
}

pub(crate) struct TaskNode {
    pub(crate) prerequisites: Vec<TaskId>,
    pub(crate) body: Box<dyn ErasedTask>,
}

/// Registry of tasks and their prerequisites.
pub struct TaskGraph {
    id: u64,
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Register a task whose body runs after every prerequisite succeeded.
    ///
    /// # Panics
    /// If a prerequisite was registered in another graph.
    pub fn register<O, F, Fut>(&mut self, prerequisites: &[TaskRef], body: F) -> TaskHandle<O>
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
        O: Clone + Send + Sync + 'static,
    {
        let mut ids = Vec::with_capacity(prerequisites.len());
        for prerequisite in prerequisites {
            assert_eq!(
                prerequisite.graph, self.id,
                "{} belongs to another task graph",
                prerequisite.id
            );
            if !ids.contains(&prerequisite.id) {
                ids.push(prerequisite.id);
            }
        }

        let id = TaskId(self.nodes.len());
        tracing::debug!(task = %id, prerequisites = ids.len(), output = type_name::<O>(), "Task registered");
        self.nodes.push(TaskNode {
            prerequisites: ids,
            body: Box::new(FnTask {
                body,
                _output: PhantomData,
            }),
        });

        TaskHandle {
            task: TaskRef { graph: self.id, id },
            _output: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id.0]
    }

    /// Ids of the declared prerequisites of `task`.
    pub fn prerequisites(&self, task: TaskRef) -> Option<&[TaskId]> {
        if task.graph != self.id {
            return None;
        }
        self.nodes.get(task.id.0).map(|n| n.prerequisites.as_slice())
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("id", &self.id)
            .field("tasks", &self.nodes.len())
            .finish()
    }
}

/// Typed handle to a registered task.
pub struct TaskHandle<O> {
    task: TaskRef,
    _output: PhantomData<fn() -> O>,
}

impl<O> Clone for TaskHandle<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for TaskHandle<O> {}

impl<O> fmt::Debug for TaskHandle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task", &self.task.id)
            .field("output", &type_name::<O>())
            .finish()
    }
}

impl<O: Clone + Send + Sync + 'static> TaskHandle<O> {
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Untyped reference for use as a prerequisite.
    pub fn erase(&self) -> TaskRef {
        self.task
    }

    /// Run the task in `ctx` (at most once) and return its value.
    pub async fn get(&self, ctx: &Ctx) -> Result<O, TaskError> {
        let value = ctx.run(self.task).await?;
        value
            .downcast_ref::<O>()
            .cloned()
            .ok_or(TaskError::TypeMismatch {
                task: self.task.id,
                expected: type_name::<O>(),
            })
    }
}

impl<O> From<TaskHandle<O>> for TaskRef {
    fn from(handle: TaskHandle<O>) -> Self {
        handle.task
    }
}

impl<O> From<&TaskHandle<O>> for TaskRef {
    fn from(handle: &TaskHandle<O>) -> Self {
        handle.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut graph = TaskGraph::new();
        let a = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(1u32) });
        let b = graph.register(&[a.erase(), a.erase()], |_ctx| async { Ok::<_, BoxError>(2u32) });
        assert_eq!(a.id(), TaskId(0));
        assert_eq!(b.id(), TaskId(1));
        assert_eq!(graph.len(), 2);
        // duplicate prerequisites collapse
        assert_eq!(graph.prerequisites(b.erase()), Some(&[TaskId(0)][..]));
    }

    #[test]
    #[should_panic(expected = "belongs to another task graph")]
    fn test_foreign_prerequisite_panics() {
        let mut other = TaskGraph::new();
        let foreign = other.register(&[], |_ctx| async { Ok::<_, BoxError>(()) });
        let mut graph = TaskGraph::new();
        graph.register(&[foreign.erase()], |_ctx| async { Ok::<_, BoxError>(()) });
    }

    #[test]
    fn test_prerequisites_of_foreign_ref() {
        let mut other = TaskGraph::new();
        let foreign = other.register(&[], |_ctx| async { Ok::<_, BoxError>(()) });
        let graph = TaskGraph::new();
        assert!(graph.prerequisites(foreign.erase()).is_none());
    }
}
