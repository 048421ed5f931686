//! Task graph execution across concurrent requesters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nestroute::tasks::{BoxError, Ctx, TaskError, TaskGraph, TaskHandle};

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

struct Diamond {
    graph: Arc<TaskGraph>,
    b: TaskHandle<u32>,
    c: TaskHandle<u32>,
    d: TaskHandle<u32>,
}

/// A; B←A; C←A; D←B,C
fn diamond(a_calls: Arc<AtomicUsize>, fail_a: bool) -> Diamond {
    let mut graph = TaskGraph::new();
    let a: TaskHandle<u32> = graph.register(&[], move |_ctx| {
        let calls = a_calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if fail_a {
                Err::<u32, BoxError>("a exploded".into())
            } else {
                Ok(1)
            }
        }
    });
    let b = graph.register(&[a.erase()], move |ctx: Ctx| async move {
        Ok::<_, BoxError>(a.get(&ctx).await? + 10)
    });
    let c = graph.register(&[a.erase()], move |ctx: Ctx| async move {
        Ok::<_, BoxError>(a.get(&ctx).await? + 100)
    });
    let d = graph.register(&[b.erase(), c.erase()], move |ctx: Ctx| async move {
        Ok::<_, BoxError>(b.get(&ctx).await? + c.get(&ctx).await?)
    });
    Diamond {
        graph: Arc::new(graph),
        b,
        c,
        d,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_diamond_runs_shared_prerequisite_once() {
    let calls = counter();
    let g = diamond(calls.clone(), false);
    let ctx = Ctx::new(g.graph.clone());
    let (hb, hc, hd) = (g.b, g.c, g.d);

    let (b, c, d) = tokio::join!(
        tokio::spawn({
            let ctx = ctx.clone();
            async move { hb.get(&ctx).await }
        }),
        tokio::spawn({
            let ctx = ctx.clone();
            async move { hc.get(&ctx).await }
        }),
        tokio::spawn({
            let ctx = ctx.clone();
            async move { hd.get(&ctx).await }
        }),
    );

    assert_eq!(b.unwrap().unwrap(), 11);
    assert_eq!(c.unwrap().unwrap(), 101);
    assert_eq!(d.unwrap().unwrap(), 112);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_ctx_runs_its_own_diamond() {
    let calls = counter();
    let g = diamond(calls.clone(), false);

    let requests = (0..8).map(|_| {
        let ctx = Ctx::new(g.graph.clone());
        let d = g.d;
        tokio::spawn(async move { d.get(&ctx).await })
    });
    for joined in futures_util::future::join_all(requests).await {
        assert_eq!(joined.unwrap().unwrap(), 112);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_failure_propagates_through_diamond() {
    let calls = counter();
    let g = diamond(calls.clone(), true);
    let ctx = Ctx::new(g.graph.clone());

    let err = g.d.get(&ctx).await.unwrap_err();
    assert!(matches!(err, TaskError::Prerequisite { .. }));
    assert!(matches!(err.root_cause(), TaskError::Failed { .. }));
    assert!(!err.is_cancellation());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_independent_branch_survives_sibling_failure() {
    let mut graph = TaskGraph::new();
    let broken = graph.register(&[], |_ctx| async { Err::<u8, BoxError>("nope".into()) });
    let healthy = graph.register(&[], |_ctx| async { Ok::<_, BoxError>(7u8) });
    let ctx = Ctx::new(Arc::new(graph));

    let (broken, healthy) = tokio::join!(broken.get(&ctx), healthy.get(&ctx));
    assert!(matches!(broken, Err(TaskError::Failed { .. })));
    assert_eq!(healthy.unwrap(), 7);
}

#[tokio::test]
async fn test_cancel_before_start_never_runs_body() {
    let calls = counter();
    let g = diamond(calls.clone(), false);
    let ctx = Ctx::new(g.graph.clone());
    ctx.cancel();

    let err = g.d.get(&ctx).await.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_releases_waiters_of_running_task() {
    let mut graph = TaskGraph::new();
    let slow = graph.register(&[], |_ctx| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, BoxError>(())
    });
    let ctx = Ctx::new(Arc::new(graph));

    let waiter = tokio::spawn({
        let ctx = ctx.clone();
        async move { slow.get(&ctx).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter released")
        .unwrap();
    assert!(matches!(result, Err(TaskError::Cancelled { .. })));
}

#[tokio::test]
async fn test_deadline_is_distinct_from_cancel() {
    let mut graph = TaskGraph::new();
    let slow = graph.register(&[], |_ctx| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, BoxError>(())
    });
    let ctx = Ctx::builder(Arc::new(graph))
        .timeout(Duration::from_millis(30))
        .build();

    let err = slow.get(&ctx).await.unwrap_err();
    assert!(matches!(err, TaskError::DeadlineExceeded { .. }));
    assert!(err.is_cancellation());
}
