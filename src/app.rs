//! Demo route table served by the `nestroute` binary.
//!
//! A session task acts as middleware, a user directory task is shared by
//! the API and the dashboard loaders, and the page tree exercises index,
//! dynamic and splat routes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, DispatcherBuilder, RouteCtx};
use crate::tasks::{BoxError, Ctx, TaskHandle};

/// Caller identity taken from the `authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<String>,
}

type Directory = Arc<BTreeMap<String, String>>;

/// Build the demo dispatcher from config.
pub fn build_dispatcher(config: &ServerConfig) -> Dispatcher {
    let options = config.matcher.to_options();
    let (d, splat) = (options.dynamic_prefix, options.splat);
    let mut builder = DispatcherBuilder::new(options);
    builder.request_timeout(Duration::from_millis(config.dispatch.request_timeout_ms));

    let session = builder.task(&[], |ctx: Ctx| async move {
        let user = ctx
            .request()
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        Ok::<_, BoxError>(Session { user })
    });
    let directory: TaskHandle<Directory> = builder.task(&[session.erase()], |_ctx: Ctx| async {
        let users: BTreeMap<String, String> = [("1", "ada"), ("2", "grace"), ("3", "linus")]
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        Ok::<_, BoxError>(Arc::new(users))
    });
    builder.middleware(session);

    let api = config.dispatch.api_prefix.trim_end_matches('/');
    builder
        .get(&format!("{api}/health"), &[], |_route| async {
            Ok(json!({ "status": "ok" }))
        })
        .get(&format!("{api}/me"), &[], move |route: RouteCtx| async move {
            let session = session.get(&route.ctx).await?;
            Ok(json!({ "user": session.user }))
        })
        .get(&format!("{api}/users"), &[directory.erase()], move |route: RouteCtx| async move {
            let users = directory.get(&route.ctx).await?;
            Ok(json!({ "users": users.values().collect::<Vec<_>>() }))
        })
        .get(&format!("{api}/users/{d}id"), &[], move |route: RouteCtx| async move {
            let users = directory.get(&route.ctx).await?;
            let id = route.param("id").unwrap_or_default();
            match users.get(id) {
                Some(name) => Ok(json!({ "id": id, "name": name })),
                None => Err(format!("no user with id {id}").into()),
            }
        })
        .get(&format!("{api}/files/{splat}"), &[], |route: RouteCtx| async move {
            Ok(json!({ "path": route.splat_values().map(|s| s.join("/")) }))
        });

    let index = config.matcher.index_segment.clone();
    builder
        .loader("/", &[], |_route| async { Ok(json!({ "layout": "root" })) })
        .loader(&format!("/{index}"), &[], |_route| async { Ok(json!({ "page": "home" })) })
        .loader("/dashboard", &[], move |route: RouteCtx| async move {
            let session = session.get(&route.ctx).await?;
            Ok(json!({ "layout": "dashboard", "user": session.user }))
        })
        .page("/dashboard/customers")
        .loader(&format!("/dashboard/customers/{d}id"), &[directory.erase()], move |route: RouteCtx| async move {
            let users = directory.get(&route.ctx).await?;
            let id = route.param("id").unwrap_or_default();
            Ok(json!({ "customer": users.get(id) }))
        })
        .loader(&format!("/docs/{splat}"), &[], |route: RouteCtx| async move {
            Ok(json!({ "doc": route.splat_values().map(|s| s.join("/")) }))
        })
        .loader(&format!("/{splat}"), &[], |route: RouteCtx| async move {
            Ok(json!({ "not_found": route.request().path }))
        });

    builder.build()
}
