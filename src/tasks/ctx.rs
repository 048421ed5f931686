//! Per-request execution context.
//!
//! # Responsibilities
//! - Own one lazily created result slot per task
//! - Run each task at most once, however many callers ask for it
//! - Run prerequisites concurrently before a task body
//! - Scope cancellation and deadlines to one request
//!
//! # Execution
//! ```text
//! handle.get(ctx)
//!     → run(task): first caller spawns execute(task) into the task's slot;
//!       every caller awaits the shared slot or the ctx interruption
//!     → execute(task): spawn run(p) for each prerequisite, wait for all
//!     → any prerequisite failed?  → Prerequisite error, body skipped
//!     → ctx cancelled / expired?  → Cancelled / DeadlineExceeded, body skipped
//!     → spawn body, race it against the ctx interruption
//! ```
//!
//! # Design Decisions
//! - Executions are spawned, so a caller giving up never aborts the work
//!   other callers are waiting on, and never causes a second run
//! - Cancellation is cooperative: it wakes waiters and prevents new bodies
//!   from starting, but a body already running is left to finish detached
//! - A Ctx is created per request and dropped with it; results never
//!   outlive the request

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::http::request::RequestInfo;
use crate::observability::metrics;
use crate::tasks::error::{Interruption, TaskError};
use crate::tasks::graph::{ErasedValue, TaskGraph, TaskId, TaskRef};

pub(crate) type TaskOutcome = Result<ErasedValue, TaskError>;
type Gate = Shared<BoxFuture<'static, TaskOutcome>>;

/// Request-scoped owner of task results and cancellation.
///
/// Cheap to clone; clones share results and cancellation.
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<CtxInner>,
}

struct CtxInner {
    graph: Arc<TaskGraph>,
    results: Mutex<HashMap<TaskId, Gate>>,
    settled: Mutex<HashSet<TaskId>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    request: RequestInfo,
}

/// Builder for [`Ctx`].
#[derive(Debug)]
pub struct CtxBuilder {
    graph: Arc<TaskGraph>,
    request: RequestInfo,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl CtxBuilder {
    /// Request metadata visible to task bodies.
    pub fn request(mut self, request: RequestInfo) -> Self {
        self.request = request;
        self
    }

    /// Share an existing token instead of creating a fresh one.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Deadline relative to `build()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Ctx {
        Ctx {
            inner: Arc::new(CtxInner {
                graph: self.graph,
                results: Mutex::new(HashMap::new()),
                settled: Mutex::new(HashSet::new()),
                cancel: self.cancel.unwrap_or_default(),
                deadline: self.timeout.map(|t| Instant::now() + t),
                request: self.request,
            }),
        }
    }
}

impl Ctx {
    /// A context with no deadline and default request metadata.
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        Self::builder(graph).build()
    }

    pub fn builder(graph: Arc<TaskGraph>) -> CtxBuilder {
        CtxBuilder {
            graph,
            request: RequestInfo::default(),
            cancel: None,
            timeout: None,
        }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.inner.request
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.inner.graph
    }

    /// Cancel every pending and future task in this context.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// The interruption currently in effect, if any.
    pub fn interruption(&self) -> Option<Interruption> {
        if self.inner.cancel.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interruption().is_some()
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn interrupted(&self) -> Interruption {
        match self.inner.deadline {
            Some(deadline) => tokio::select! {
                _ = self.inner.cancel.cancelled() => Interruption::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interruption::DeadlineExceeded,
            },
            None => {
                self.inner.cancel.cancelled().await;
                Interruption::Cancelled
            }
        }
    }

    /// True once `task` has settled in this context, whether or not any
    /// caller is still waiting for it.
    pub fn is_resolved(&self, task: impl Into<TaskRef>) -> bool {
        let task = task.into();
        if task.graph != self.inner.graph.id() {
            return false;
        }
        self.inner
            .settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&task.id)
    }

    /// Run a batch of tasks concurrently and wait for all of them.
    ///
    /// Returns the first failure in input order, after every task settled.
    pub async fn run_many(&self, tasks: &[TaskRef]) -> Result<(), TaskError> {
        let pending = tasks.iter().map(|&task| {
            let ctx = self.clone();
            tokio::spawn(async move { ctx.run(task).await })
        });
        let settled = join_all(pending).await;

        let mut first_error = None;
        for (task, joined) in tasks.iter().zip(settled) {
            let outcome = joined.unwrap_or_else(|_| Err(TaskError::Panicked { task: task.id }));
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run `task` at most once in this context and return its outcome.
    pub(crate) async fn run(&self, task: TaskRef) -> TaskOutcome {
        if task.graph != self.inner.graph.id() {
            return Err(TaskError::ForeignTask { task: task.id });
        }

        let gate = self.gate(task.id);
        if let Some(outcome) = gate.peek() {
            return outcome.clone();
        }

        // a settled result wins over an interruption that raced it
        tokio::select! {
            biased;
            outcome = gate => outcome,
            interruption = self.interrupted() => Err(interruption.into_error(task.id)),
        }
    }

    /// The shared completion gate for `id`, spawning its execution on
    /// first use.
    fn gate(&self, id: TaskId) -> Gate {
        let mut results = self.inner.results.lock().unwrap_or_else(PoisonError::into_inner);
        results
            .entry(id)
            .or_insert_with(|| {
                let ctx = self.clone();
                let execution = tokio::spawn(async move {
                    let outcome = ctx.clone().execute(id).await;
                    ctx.inner
                        .settled
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(id);
                    outcome
                });
                async move {
                    execution
                        .await
                        .unwrap_or_else(|_| Err(TaskError::Panicked { task: id }))
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    fn execute(self, id: TaskId) -> BoxFuture<'static, TaskOutcome> {
        async move {
            let graph = self.inner.graph.clone();
            let node = graph.node(id);
            tracing::trace!(task = %id, prerequisites = node.prerequisites.len(), "Task starting");

            if !node.prerequisites.is_empty() {
                let pending: Vec<_> = node
                    .prerequisites
                    .iter()
                    .map(|&prerequisite| {
                        let ctx = self.clone();
                        let task = TaskRef { graph: graph.id(), id: prerequisite };
                        tokio::spawn(async move { ctx.run(task).await })
                    })
                    .collect();
                let settled = join_all(pending).await;

                let failed = node.prerequisites.iter().zip(settled).find_map(|(&p, joined)| {
                    match joined.unwrap_or_else(|_| Err(TaskError::Panicked { task: p })) {
                        Ok(_) => None,
                        Err(err) => Some((p, err)),
                    }
                });
                if let Some((prerequisite, cause)) = failed {
                    if cause.is_cancellation() {
                        if let Some(interruption) = self.interruption() {
                            return Err(interruption.into_error(id));
                        }
                    }
                    tracing::warn!(task = %id, prerequisite = %prerequisite, error = %cause, "Prerequisite failed, skipping task");
                    metrics::record_task("skipped");
                    return Err(TaskError::Prerequisite {
                        task: id,
                        prerequisite,
                        cause: Arc::new(cause),
                    });
                }
            }

            if let Some(interruption) = self.interruption() {
                metrics::record_task("interrupted");
                return Err(interruption.into_error(id));
            }

            let body = tokio::spawn(node.body.execute(self.clone()));
            let outcome = tokio::select! {
                joined = body => match joined {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(error)) => Err(TaskError::Failed { task: id, error: Arc::from(error) }),
                    Err(_) => Err(TaskError::Panicked { task: id }),
                },
                interruption = self.interrupted() => Err(interruption.into_error(id)),
            };

            match &outcome {
                Ok(_) => {
                    tracing::debug!(task = %id, "Task completed");
                    metrics::record_task("ok");
                }
                Err(err) if err.is_cancellation() => {
                    tracing::debug!(task = %id, error = %err, "Task interrupted");
                    metrics::record_task("interrupted");
                }
                Err(err) => {
                    tracing::warn!(task = %id, error = %err, "Task failed");
                    metrics::record_task("failed");
                }
            }
            outcome
        }
        .boxed()
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("graph", &self.inner.graph)
            .field("request", &self.inner.request)
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::error::BoxError;
    use crate::tasks::graph::TaskHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test]
    async fn test_get_returns_value() {
        let mut graph = TaskGraph::new();
        let answer = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(42u64) });
        let ctx = Ctx::new(Arc::new(graph));
        assert_eq!(answer.get(&ctx).await.unwrap(), 42);
        assert!(ctx.is_resolved(answer));
    }

    #[tokio::test]
    async fn test_memoized_within_ctx_not_across() {
        let mut graph = TaskGraph::new();
        let calls = counter();
        let c = calls.clone();
        let task = graph.register(&[], move |_ctx| {
            let c = c.clone();
            async move { Ok::<_, BoxError>(c.fetch_add(1, Ordering::SeqCst)) }
        });
        let graph = Arc::new(graph);

        let ctx = Ctx::new(graph.clone());
        assert_eq!(task.get(&ctx).await.unwrap(), 0);
        assert_eq!(task.get(&ctx).await.unwrap(), 0);

        let other = Ctx::new(graph);
        assert_eq!(task.get(&other).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_prerequisite_failure_propagates() {
        let mut graph = TaskGraph::new();
        let failing = graph.register(&[], |_ctx| async { Err::<u8, BoxError>("db down".into()) });
        let ran = counter();
        let r = ran.clone();
        let dependent = graph.register(&[failing.erase()], move |_ctx| {
            let r = r.clone();
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }
        });
        let independent = graph.register(&[], |_ctx| async { Ok::<_, BoxError>("fine") });
        let ctx = Ctx::new(Arc::new(graph));

        let err = dependent.get(&ctx).await.unwrap_err();
        match &err {
            TaskError::Prerequisite { task, prerequisite, .. } => {
                assert_eq!(*task, dependent.id());
                assert_eq!(*prerequisite, failing.id());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root_cause(), TaskError::Failed { .. }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(independent.get(&ctx).await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_runs_body() {
        let mut graph = TaskGraph::new();
        let calls = counter();
        let c = calls.clone();
        let task = graph.register(&[], move |_ctx| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }
        });
        let ctx = Ctx::new(Arc::new(graph));
        ctx.cancel();

        let err = task.get(&ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::Cancelled { .. }));
        assert!(err.is_cancellation());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_body() {
        let mut graph = TaskGraph::new();
        let slow = graph.register(&[], |_ctx| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, BoxError>(())
        });
        let ctx = Ctx::builder(Arc::new(graph))
            .timeout(Duration::from_millis(20))
            .build();

        let err = slow.get(&ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::DeadlineExceeded { .. }));
        assert_eq!(ctx.interruption(), Some(Interruption::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_panicking_body_is_isolated() {
        let mut graph = TaskGraph::new();
        let bad = graph.register(&[], |_ctx| async {
            if true {
                panic!("loader bug");
            }
            Ok::<u8, BoxError>(0)
        });
        let good = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(7u8) });
        let ctx = Ctx::new(Arc::new(graph));

        assert!(matches!(bad.get(&ctx).await, Err(TaskError::Panicked { .. })));
        assert_eq!(good.get(&ctx).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_foreign_task_is_rejected() {
        let mut other = TaskGraph::new();
        let foreign = other.register(&[], |_ctx| async { Ok::<_, BoxError>(()) });
        let ctx = Ctx::new(Arc::new(TaskGraph::new()));
        assert!(matches!(foreign.get(&ctx).await, Err(TaskError::ForeignTask { .. })));
    }

    #[tokio::test]
    async fn test_run_many_reports_first_failure() {
        let mut graph = TaskGraph::new();
        let ok = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(1) });
        let bad = graph.register(&[], |_ctx| async { Err::<i32, BoxError>("nope".into()) });
        let ctx = Ctx::new(Arc::new(graph));

        assert!(ctx.run_many(&[ok.erase()]).await.is_ok());
        let err = ctx.run_many(&[ok.erase(), bad.erase()]).await.unwrap_err();
        assert_eq!(err.task(), bad.id());
        assert!(ctx.is_resolved(ok));
        assert!(ctx.is_resolved(bad));
    }

    fn quick_task(graph: &mut TaskGraph) -> TaskHandle<u32> {
        graph.register(&[], |_ctx| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, BoxError>(3)
        })
    }

    #[tokio::test]
    async fn test_settled_result_wins_over_later_cancel() {
        let mut graph = TaskGraph::new();
        let quick = quick_task(&mut graph);
        let graph = Arc::new(graph);

        for _ in 0..16 {
            let ctx = Ctx::new(graph.clone());
            // start the task, then walk away before it finishes
            let _ = tokio::time::timeout(Duration::ZERO, quick.get(&ctx)).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.cancel();
            assert_eq!(quick.get(&ctx).await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_resolved_without_a_waiter() {
        let mut graph = TaskGraph::new();
        let quick = quick_task(&mut graph);
        let ctx = Ctx::new(Arc::new(graph));

        let _ = tokio::time::timeout(Duration::ZERO, quick.get(&ctx)).await;
        assert!(!ctx.is_resolved(quick));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ctx.is_resolved(quick));
    }

    #[tokio::test]
    async fn test_body_reads_request_and_prerequisites() {
        let mut graph = TaskGraph::new();
        let base = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(10u32) });
        let derived = graph.register(&[base.erase()], move |ctx| async move {
            let base = base.get(&ctx).await?;
            Ok::<_, BoxError>(format!("{} {}", ctx.request().path, base + 1))
        });
        let ctx = Ctx::builder(Arc::new(graph))
            .request(RequestInfo::new(axum::http::Method::GET, "/users/1"))
            .build();

        assert_eq!(derived.get(&ctx).await.unwrap(), "/users/1 11");
    }
}
