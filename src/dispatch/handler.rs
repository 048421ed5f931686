//! Handler and loader plumbing.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::http::request::RequestInfo;
use crate::routing::Match;
use crate::tasks::{BoxError, Ctx, TaskRef};

/// What a handler or loader produces.
pub type HandlerResult = Result<Value, BoxError>;

/// Input to a handler or loader: the request context plus its own match.
#[derive(Debug, Clone)]
pub struct RouteCtx {
    pub ctx: Ctx,
    pub route: Match,
}

impl RouteCtx {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route.param(name)
    }

    pub fn splat_values(&self) -> Option<&[String]> {
        self.route.splat_values.as_deref()
    }

    pub fn request(&self) -> &RequestInfo {
        self.ctx.request()
    }
}

pub(crate) type BoxedHandler = Arc<dyn Fn(RouteCtx) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub(crate) fn boxed_handler<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(RouteCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |route| handler(route).boxed())
}

/// A registered handler with the tasks it needs first.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) prerequisites: Vec<TaskRef>,
    pub(crate) handler: BoxedHandler,
}
