// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求调度
//!
//! 把一个已解析的请求变成一个已完成的响应：
//!
//! `路径规范化 → 路由解析 → 方法选择 → 中间件链 → 处理函数 → 完成`
//!
//! 任何非终态都可能进入错误恢复分支。无论走哪条分支，调度都以
//! [`Response::seal`](crate::response::Response::seal) 结束，
//! 因此每个请求的响应恰好完成一次。

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, error, warn};

use crate::{
    context::Context,
    exception::RouteError,
    middleware::{Handler, HandlerResult, Next},
    param::Method,
    request::Request,
    response::{Response, SealedResponse},
    router::Router,
    util::normalize_path,
};

/// 意外错误的诊断通道。错误详情只会写到这里，不会进入响应体。
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, id: u128, method: Method, path: &str, detail: &str);
}

/// 默认诊断通道，写入错误日志
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, id: u128, method: Method, path: &str, detail: &str) {
        error!("[ID{}]处理 {} {} 时发生内部错误：{}", id, method, path, detail);
    }
}

/// 错误响应链的终点：写出 `{"message": ...}`
struct StatusHandler(RouteError);

impl Handler for StatusHandler {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { write_error(&mut cx.response, &self.0) })
    }
}

/// 按错误写出响应。意外错误只写出通用的 500 消息。
fn write_error(response: &mut Response, err: &RouteError) -> HandlerResult {
    match err {
        RouteError::Status {
            code,
            message: Some(message),
        } => response.error_with_message(*code, message),
        e if e.is_internal() => response.error(500),
        e => response.error(e.status_code()),
    }
}

impl Router {
    /// 调度一个请求并返回已完成的响应。
    pub async fn dispatch(&self, request: Request) -> SealedResponse {
        let id = request.id();
        let method = request.method();
        let target = request.target().to_string();
        let mut cx = Context::new(request);

        let outcome = AssertUnwindSafe(self.drive(&mut cx)).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(panic) => Some(RouteError::Internal(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        if let Some(e) = failure {
            self.recover(&mut cx, id, method, &target, e).await;
        }
        if !cx.response.is_finalized() {
            debug!("[ID{}]中间件链未完成响应，以默认状态结束", id);
        }
        cx.into_response().seal()
    }

    async fn drive(&self, cx: &mut Context) -> HandlerResult {
        let id = cx.request.id();
        let method = cx.request.method();

        // 1. 路径规范化
        let path = normalize_path(cx.request.target());

        // 2. 路由解析：精确查找优先，其次前缀树
        let resolution = self.resolve(&path);
        if !self.routes.contains_key(&resolution.pattern) {
            warn!("[ID{}]请求的路径：{} 不存在，返回404", id, path);
            return self.reject(cx, RouteError::NotFound).await;
        }

        // 3. 方法选择
        let bundle = match self.bundle(&resolution.pattern, method) {
            Some(bundle) => bundle,
            None => {
                warn!("[ID{}]路由 {} 未注册方法 {}，返回405", id, resolution.pattern, method);
                let allow = self
                    .allowed_methods(&resolution.pattern)
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                cx.response.header("Allow", &allow);
                return self.reject(cx, RouteError::MethodNotAllowed).await;
            }
        };
        debug!("[ID{}]匹配路由 {} {}", id, method, resolution.pattern);

        // 4. 中间件链，处理函数是链的最后一步
        cx.set_params(resolution.params);
        Next::new(&self.global, &bundle.middleware, bundle.handler.as_ref())
            .run(cx)
            .await
    }

    /// 经过全局中间件写出错误响应
    async fn reject(&self, cx: &mut Context, err: RouteError) -> HandlerResult {
        let terminal = StatusHandler(err);
        Next::new(&self.global, &[], &terminal).run(cx).await
    }

    /// 错误恢复：客户端错误原样写出，意外错误折叠为 500 并转交诊断通道。
    ///
    /// 错误响应同样经过全局中间件。全局中间件在这一轮再次失败时
    /// 不再重试，直接写出错误响应。
    async fn recover(&self, cx: &mut Context, id: u128, method: Method, target: &str, err: RouteError) {
        if err.is_internal() {
            self.diagnostics.report(id, method, target, &err.to_string());
        }
        if cx.response.is_finalized() {
            warn!("[ID{}]响应已完成后出现错误：{}", id, err);
            return;
        }

        let shown = if err.is_internal() { RouteError::status(500) } else { err };
        match AssertUnwindSafe(self.reject(cx, shown.clone())).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[ID{}]写出错误响应时中间件再次失败：{}", id, e),
            Err(panic) => warn!(
                "[ID{}]写出错误响应时中间件发生panic：{}",
                id,
                panic_message(panic.as_ref())
            ),
        }

        if !cx.response.is_finalized() {
            if let Err(e) = write_error(&mut cx.response, &shown) {
                error!("[ID{}]无法写出错误响应：{}", id, e);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
