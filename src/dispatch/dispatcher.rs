//! Per-request orchestration of matches, tasks and handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::dispatch::builder::DispatcherBuilder;
use crate::dispatch::error::DispatchError;
use crate::dispatch::handler::{BoxedHandler, Route, RouteCtx};
use crate::http::request::RequestInfo;
use crate::routing::{Match, MatchSummary, Matcher, MatcherOptions};
use crate::tasks::{Ctx, TaskGraph, TaskRef};

/// Result of a successful API dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub route: MatchSummary,
    pub data: Value,
}

/// Outcome of one loader in a page dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct LoaderSlot {
    #[serde(flatten)]
    pub route: MatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a page dispatch: one slot per nested match.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub matches: Vec<LoaderSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splat_values: Option<Vec<String>>,
}

impl PageResponse {
    pub fn has_errors(&self) -> bool {
        self.matches.iter().any(|slot| slot.error.is_some())
    }
}

/// Immutable route table plus task graph, shared by every request.
pub struct Dispatcher {
    pub(crate) tasks: Arc<TaskGraph>,
    pub(crate) middleware: Vec<TaskRef>,
    pub(crate) api: Matcher,
    pub(crate) api_routes: HashMap<String, Vec<(Method, Route)>>,
    pub(crate) pages: Matcher,
    pub(crate) loaders: HashMap<String, Option<Route>>,
    pub(crate) request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn builder(options: MatcherOptions) -> DispatcherBuilder {
        DispatcherBuilder::new(options)
    }

    pub fn tasks(&self) -> &Arc<TaskGraph> {
        &self.tasks
    }

    pub fn api_matcher(&self) -> &Matcher {
        &self.api
    }

    pub fn page_matcher(&self) -> &Matcher {
        &self.pages
    }

    /// A fresh context for one request.
    pub fn new_ctx(&self, request: RequestInfo, cancel: CancellationToken) -> Ctx {
        let mut builder = Ctx::builder(self.tasks.clone())
            .request(request)
            .cancellation(cancel);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Resolve the best API match and run its handler.
    pub async fn dispatch_api(
        &self,
        request: RequestInfo,
        cancel: CancellationToken,
    ) -> Result<ApiResponse, DispatchError> {
        let found = self
            .api
            .find_best_match(&request.path)
            .ok_or_else(|| DispatchError::NotFound { path: request.path.clone() })?;
        let routes = self
            .api_routes
            .get(found.pattern.normalized())
            .ok_or_else(|| DispatchError::NotFound { path: request.path.clone() })?;
        let route = select_method(routes, &request.method)
            .ok_or_else(|| DispatchError::MethodNotAllowed {
                method: request.method.clone(),
                pattern: found.pattern.source().to_string(),
                allowed: routes.iter().map(|(m, _)| m.clone()).collect(),
            })?
            .clone();

        tracing::debug!(
            request_id = %request.request_id(),
            method = %request.method,
            path = %request.path,
            pattern = %found.pattern,
            "API route matched"
        );

        let ctx = self.new_ctx(request, cancel);
        let prerequisites: Vec<TaskRef> = self
            .middleware
            .iter()
            .chain(route.prerequisites.iter())
            .copied()
            .collect();
        ctx.run_many(&prerequisites)
            .await
            .map_err(DispatchError::Prerequisite)?;

        let summary = MatchSummary::from(&found);
        let data = run_handler(&ctx, &route.handler, found).await?;
        Ok(ApiResponse { route: summary, data })
    }

    /// Resolve the nested matches for a page and run their loaders
    /// concurrently. A failing loader only fails its own slot.
    pub async fn dispatch_page(
        &self,
        request: RequestInfo,
        cancel: CancellationToken,
    ) -> Result<PageResponse, DispatchError> {
        let nested = self
            .pages
            .find_nested_matches(&request.path)
            .ok_or_else(|| DispatchError::NotFound { path: request.path.clone() })?;

        tracing::debug!(
            request_id = %request.request_id(),
            path = %request.path,
            matches = nested.matches.len(),
            "Page routes matched"
        );

        let ctx = self.new_ctx(request, cancel);
        ctx.run_many(&self.middleware)
            .await
            .map_err(DispatchError::Prerequisite)?;

        let slots = nested.matches.into_iter().map(|found| {
            let loader = self
                .loaders
                .get(found.pattern.normalized())
                .cloned()
                .flatten();
            load_slot(ctx.clone(), found, loader)
        });
        let matches = join_all(slots).await;

        if let Some(interruption) = ctx.interruption() {
            return Err(DispatchError::Interrupted(interruption));
        }

        Ok(PageResponse {
            matches,
            splat_values: nested.splat_values,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tasks", &self.tasks)
            .field("middleware", &self.middleware.len())
            .field("api_patterns", &self.api.len())
            .field("page_patterns", &self.pages.len())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// `HEAD` falls back to the `GET` handler.
fn select_method<'a>(routes: &'a [(Method, Route)], method: &Method) -> Option<&'a Route> {
    let find = |wanted: &Method| routes.iter().find(|(m, _)| m == wanted).map(|(_, r)| r);
    find(method).or_else(|| (*method == Method::HEAD).then(|| find(&Method::GET)).flatten())
}

async fn run_handler(
    ctx: &Ctx,
    handler: &BoxedHandler,
    found: Match,
) -> Result<Value, DispatchError> {
    if let Some(interruption) = ctx.interruption() {
        return Err(DispatchError::Interrupted(interruption));
    }

    let pattern = found.pattern.source().to_string();
    let running = tokio::spawn((**handler)(RouteCtx {
        ctx: ctx.clone(),
        route: found,
    }));

    tokio::select! {
        joined = running => match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(DispatchError::Handler { pattern, error: Arc::from(error) }),
            Err(_) => Err(DispatchError::HandlerPanicked { pattern }),
        },
        interruption = ctx.interrupted() => Err(DispatchError::Interrupted(interruption)),
    }
}

async fn load_slot(ctx: Ctx, found: Match, loader: Option<Route>) -> LoaderSlot {
    let mut slot = LoaderSlot {
        route: MatchSummary::from(&found),
        data: None,
        error: None,
    };
    let Some(loader) = loader else {
        return slot;
    };

    if let Err(err) = ctx.run_many(&loader.prerequisites).await {
        tracing::warn!(pattern = %found.pattern, error = %err, "Loader prerequisite failed");
        slot.error = Some(err.to_string());
        return slot;
    }

    match run_handler(&ctx, &loader.handler, found).await {
        Ok(value) => slot.data = Some(value),
        Err(err) => {
            tracing::warn!(pattern = %slot.route.pattern, error = %err, "Loader failed");
            slot.error = Some(err.to_string());
        }
    }
    slot
}
