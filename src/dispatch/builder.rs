//! Startup-time assembly of a [`Dispatcher`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;

use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::handler::{boxed_handler, HandlerResult, Route, RouteCtx};
use crate::routing::{Matcher, MatcherOptions};
use crate::tasks::{BoxError, Ctx, TaskGraph, TaskHandle, TaskRef};

/// Collects tasks, middleware, API handlers and page loaders.
///
/// Every method panics on invalid input (bad pattern, duplicate route,
/// task from another graph): route tables are code, and a broken one must
/// stop the process before it serves traffic.
pub struct DispatcherBuilder {
    tasks: TaskGraph,
    middleware: Vec<TaskRef>,
    api: Matcher,
    api_routes: HashMap<String, Vec<(Method, Route)>>,
    pages: Matcher,
    loaders: HashMap<String, Option<Route>>,
    request_timeout: Option<Duration>,
}

impl DispatcherBuilder {
    pub fn new(options: MatcherOptions) -> Self {
        Self {
            tasks: TaskGraph::new(),
            middleware: Vec::new(),
            api: Matcher::new(options.clone()),
            api_routes: HashMap::new(),
            pages: Matcher::new(options),
            loaders: HashMap::new(),
            request_timeout: None,
        }
    }

    /// Register a request-scoped task.
    pub fn task<O, F, Fut>(&mut self, prerequisites: &[TaskRef], body: F) -> TaskHandle<O>
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
        O: Clone + Send + Sync + 'static,
    {
        self.tasks.register(prerequisites, body)
    }

    /// Run `task` before every handler and loader.
    pub fn middleware(&mut self, task: impl Into<TaskRef>) -> &mut Self {
        let task = task.into();
        self.check_tasks(&[task]);
        if !self.middleware.contains(&task) {
            self.middleware.push(task);
        }
        self
    }

    /// Register an API handler for `method` on `pattern`.
    pub fn route<F, Fut>(
        &mut self,
        method: Method,
        pattern: &str,
        prerequisites: &[TaskRef],
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RouteCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.check_tasks(prerequisites);
        let registered = self.api.register(pattern);
        let routes = self
            .api_routes
            .entry(registered.normalized().to_string())
            .or_default();
        assert!(
            !routes.iter().any(|(m, _)| *m == method),
            "duplicate route: {method} {pattern}"
        );
        tracing::debug!(method = %method, pattern = %pattern, "API route registered");
        routes.push((
            method,
            Route {
                prerequisites: prerequisites.to_vec(),
                handler: boxed_handler(handler),
            },
        ));
        self
    }

    pub fn get<F, Fut>(&mut self, pattern: &str, prerequisites: &[TaskRef], handler: F) -> &mut Self
    where
        F: Fn(RouteCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::GET, pattern, prerequisites, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: &str, prerequisites: &[TaskRef], handler: F) -> &mut Self
    where
        F: Fn(RouteCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(Method::POST, pattern, prerequisites, handler)
    }

    /// Register a page pattern that has no loader.
    pub fn page(&mut self, pattern: &str) -> &mut Self {
        let registered = self.pages.register(pattern);
        let key = registered.normalized().to_string();
        assert!(!self.loaders.contains_key(&key), "duplicate page: {pattern}");
        self.loaders.insert(key, None);
        self
    }

    /// Register a page pattern whose loader runs when the page matches.
    pub fn loader<F, Fut>(&mut self, pattern: &str, prerequisites: &[TaskRef], loader: F) -> &mut Self
    where
        F: Fn(RouteCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.check_tasks(prerequisites);
        let registered = self.pages.register(pattern);
        let key = registered.normalized().to_string();
        assert!(!self.loaders.contains_key(&key), "duplicate page: {pattern}");
        tracing::debug!(pattern = %pattern, "Page loader registered");
        self.loaders.insert(
            key,
            Some(Route {
                prerequisites: prerequisites.to_vec(),
                handler: boxed_handler(loader),
            }),
        );
        self
    }

    /// Deadline applied to every request context.
    pub fn request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Dispatcher {
        tracing::info!(
            tasks = self.tasks.len(),
            middleware = self.middleware.len(),
            api_patterns = self.api.len(),
            page_patterns = self.pages.len(),
            "Dispatcher built"
        );
        Dispatcher {
            tasks: Arc::new(self.tasks),
            middleware: self.middleware,
            api: self.api,
            api_routes: self.api_routes,
            pages: self.pages,
            loaders: self.loaders,
            request_timeout: self.request_timeout,
        }
    }

    fn check_tasks(&self, tasks: &[TaskRef]) {
        for task in tasks {
            assert_eq!(
                task.graph,
                self.tasks.id(),
                "{} belongs to another task graph",
                task.id
            );
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new(MatcherOptions::default())
    }
}
