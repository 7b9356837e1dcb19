// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 中间件链
//!
//! 每个请求依次经过全局中间件、路由中间件，最后到达处理函数。
//! 中间件通过 [`Next`] 推进到下一阶段：
//! - `Next::run` 按值消费 `Next`，因此每个中间件最多推进一次；
//! - 不调用 `run` 即永久停止后续阶段，不产生错误；
//! - 推进可以在任意异步操作之后发生，顺序严格按照注册顺序。
//!
//! 链本身不捕获错误，`Err` 原样返回给调度器。

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{context::Context, exception::RouteError};

/// 中间件与处理函数的返回值
pub type HandlerResult = Result<(), RouteError>;

/// 链的终点
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

/// 位于处理函数之前的一个阶段
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult>;
}

/// 推进到下一阶段的能力
pub struct Next<'a> {
    global: &'a [Arc<dyn Middleware>],
    route: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        global: &'a [Arc<dyn Middleware>],
        route: &'a [Arc<dyn Middleware>],
        handler: &'a dyn Handler,
    ) -> Self {
        Self { global, route, handler }
    }

    /// 剩余的中间件数量（不含处理函数）
    pub fn remaining(&self) -> usize {
        self.global.len() + self.route.len()
    }

    /// 运行下一阶段；没有剩余中间件时运行处理函数
    pub fn run<'b>(self, cx: &'b mut Context) -> BoxFuture<'b, HandlerResult>
    where
        'a: 'b,
    {
        if let Some((first, rest)) = self.global.split_first() {
            let next = Next::new(rest, self.route, self.handler);
            return first.handle(cx, next);
        }
        if let Some((first, rest)) = self.route.split_first() {
            let next = Next::new(self.global, rest, self.handler);
            return first.handle(cx, next);
        }
        self.handler.call(cx)
    }
}

/// 由闭包构造的处理函数，见 [`handler_fn`]
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.0)(cx)
    }
}

/// 把闭包包装为处理函数：
///
/// ```ignore
/// handler_fn(|cx| Box::pin(async move { cx.response.send("hi") }))
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    FnHandler(f)
}

/// 由闭包构造的中间件，见 [`from_fn`]
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn handle<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        (self.0)(cx, next)
    }
}

/// 把闭包包装为可共享的中间件：
///
/// ```ignore
/// from_fn(|cx, next| Box::pin(async move {
///     cx.locals.insert("seen".into(), true.into());
///     next.run(cx).await
/// }))
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware(f))
}
