// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表
//!
//! [`Router`] 持有全部注册状态：规范模式到方法表的映射、参数化路由的前缀树、
//! 全局中间件列表以及诊断通道。它在启动阶段构造并注册完毕，之后交给
//! 服务器以 `Arc<Router>` 共享，服务期间只读。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, warn};

use crate::{
    context::Params,
    dispatch::{DiagnosticsSink, LogSink},
    exception::ConfigError,
    middleware::{Handler, Middleware},
    param::{Method, CAPTURE_MARKER},
    trie::SegmentTrie,
    util::canonical_pattern,
};

/// 某个方法上的终点处理函数及其路由中间件
pub struct MethodBundle {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl MethodBundle {
    #[cfg(test)]
    fn middleware_len(&self) -> usize {
        self.middleware.len()
    }
}

/// 一个规范模式下各方法的处理函数
pub(crate) type MethodTable = BTreeMap<Method, Arc<MethodBundle>>;

/// 路由解析结果。
///
/// 未匹配时 `pattern` 为原始请求路径、`params` 为空；
/// 是否存在对应路由由路由表查询决定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub pattern: String,
    pub params: Params,
}

pub struct Router {
    pub(crate) routes: HashMap<String, MethodTable>,
    pub(crate) trie: SegmentTrie,
    pub(crate) global: Vec<Arc<dyn Middleware>>,
    pub(crate) diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            trie: SegmentTrie::new(),
            global: Vec::new(),
            diagnostics: Arc::new(LogSink),
        }
    }

    /// 替换默认的诊断通道
    pub fn set_diagnostics(&mut self, sink: Arc<dyn DiagnosticsSink>) -> &mut Self {
        self.diagnostics = sink;
        self
    }

    /// 追加一个全局中间件
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.global.push(middleware);
        self
    }

    /// 按顺序追加一组全局中间件
    pub fn use_all<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.global.extend(middleware);
        self
    }

    #[cfg(test)]
    fn global_middleware_len(&self) -> usize {
        self.global.len()
    }

    /// 注册没有路由中间件的路由
    pub fn route<H>(&mut self, pattern: &str, method: &str, handler: H) -> Result<&mut Self, ConfigError>
    where
        H: Handler + 'static,
    {
        self.route_with(pattern, method, Vec::new(), handler)
    }

    /// 注册路由：`middleware` 按顺序在全局中间件之后运行，`handler` 是链的终点。
    ///
    /// 方法名大小写不敏感，不在封闭集合内时返回 [`ConfigError::UnknownMethod`]。
    /// 含捕获段的模式同时写入前缀树与路由表，两者在这里一起建立。
    pub fn route_with<H>(
        &mut self,
        pattern: &str,
        method: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: H,
    ) -> Result<&mut Self, ConfigError>
    where
        H: Handler + 'static,
    {
        let method: Method = method.parse()?;
        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern must start with '/'".to_string(),
            });
        }
        let canonical = canonical_pattern(pattern);
        if canonical.contains(CAPTURE_MARKER) {
            self.trie.insert(&canonical)?;
        }

        let bundle = MethodBundle {
            handler: Arc::new(handler),
            middleware,
        };
        let table = self.routes.entry(canonical.clone()).or_default();
        if table.insert(method, Arc::new(bundle)).is_some() {
            warn!("路由 {} {} 被重复注册，新的处理函数将覆盖旧的", method, canonical);
        }
        debug!("注册路由：{} {}", method, canonical);
        Ok(self)
    }

    /// 解析规范化后的请求路径。
    ///
    /// 先在路由表中精确查找（覆盖所有纯字面路由），未命中再交给前缀树。
    pub fn resolve(&self, path: &str) -> Resolution {
        if self.routes.contains_key(path) {
            return Resolution {
                pattern: path.to_string(),
                params: Params::new(),
            };
        }
        match self.trie.resolve(path) {
            Some(m) => Resolution {
                pattern: m.pattern,
                params: m.params,
            },
            None => Resolution {
                pattern: path.to_string(),
                params: Params::new(),
            },
        }
    }

    /// 规范模式下已注册的方法，按声明顺序排列
    pub fn allowed_methods(&self, pattern: &str) -> Vec<Method> {
        self.routes
            .get(pattern)
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_route(&self, pattern: &str, method: Method) -> bool {
        self.routes
            .get(pattern)
            .map_or(false, |table| table.contains_key(&method))
    }

    pub(crate) fn bundle(&self, pattern: &str, method: Method) -> Option<&Arc<MethodBundle>> {
        self.routes.get(pattern).and_then(|table| table.get(&method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{from_fn, handler_fn};

    fn ok_handler() -> impl Handler {
        handler_fn(|cx| Box::pin(async move { cx.response.send("ok") }))
    }

    fn pass() -> Arc<dyn Middleware> {
        from_fn(|cx, next| next.run(cx))
    }

    #[test]
    fn test_static_route_resolves_with_empty_params() {
        let mut router = Router::new();
        router.route("/health", "GET", ok_handler()).unwrap();

        let r = router.resolve("/health");
        assert_eq!(r.pattern, "/health");
        assert!(r.params.is_empty());
        assert!(router.has_route("/health", Method::Get));
    }

    #[test]
    fn test_param_route_resolves() {
        let mut router = Router::new();
        router.route("/a/:x/b/:y", "get", ok_handler()).unwrap();

        let r = router.resolve("/a/1/b/2");
        assert_eq!(r.pattern, "/a/:x/b/:y");
        assert_eq!(r.params.get("x"), Some("1"));
        assert_eq!(r.params.get("y"), Some("2"));
    }

    #[test]
    fn test_unmatched_returns_raw_path() {
        let mut router = Router::new();
        router.route("/users/:id", "GET", ok_handler()).unwrap();

        let r = router.resolve("/nothing/here");
        assert_eq!(r.pattern, "/nothing/here");
        assert!(r.params.is_empty());
        assert!(!router.has_route(&r.pattern, Method::Get));
    }

    #[test]
    fn test_exact_lookup_beats_trie() {
        let mut router = Router::new();
        router.route("/users/:id", "GET", ok_handler()).unwrap();
        router.route("/users/me", "GET", ok_handler()).unwrap();

        let r = router.resolve("/users/me");
        assert_eq!(r.pattern, "/users/me");
        assert!(r.params.is_empty());
    }

    #[test]
    fn test_static_routes_stay_out_of_trie() {
        let mut router = Router::new();
        router.route("/a/b/c", "GET", ok_handler()).unwrap();
        router.route("/a/:y/d", "GET", ok_handler()).unwrap();

        // `/a/b/c` 只存在于路由表，`/a/b/d` 可以经参数分支匹配
        let r = router.resolve("/a/b/d");
        assert_eq!(r.pattern, "/a/:y/d");
        assert_eq!(r.params.get("y"), Some("b"));
    }

    #[test]
    fn test_unknown_method_is_config_error() {
        let mut router = Router::new();
        let err = router.route("/x", "FETCH", ok_handler()).err();
        assert_eq!(err, Some(ConfigError::UnknownMethod("FETCH".to_string())));
        assert!(!router.routes.contains_key("/x"));
    }

    #[test]
    fn test_pattern_must_start_with_slash() {
        let mut router = Router::new();
        let err = router.route("users", "GET", ok_handler()).err();
        assert!(matches!(err, Some(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_pattern_is_canonicalized() {
        let mut router = Router::new();
        router.route("/items/", "POST", ok_handler()).unwrap();
        router.route("/items/:id/", "GET", ok_handler()).unwrap();

        assert!(router.has_route("/items", Method::Post));
        assert_eq!(router.resolve("/items/3").pattern, "/items/:id");
    }

    #[test]
    fn test_conflicting_capture_is_config_error() {
        let mut router = Router::new();
        router.route("/users/:id", "GET", ok_handler()).unwrap();
        let err = router.route("/users/:name/posts", "GET", ok_handler()).err();
        assert!(matches!(err, Some(ConfigError::ConflictingParam { .. })));
    }

    #[test]
    fn test_methods_collected_per_pattern() {
        let mut router = Router::new();
        router
            .route("/users", "post", ok_handler())
            .unwrap()
            .route("/users", "GET", ok_handler())
            .unwrap();
        assert_eq!(router.allowed_methods("/users"), vec![Method::Get, Method::Post]);
        assert!(router.allowed_methods("/none").is_empty());
    }

    #[test]
    fn test_route_middleware_attached() {
        let mut router = Router::new();
        router
            .route_with("/admin", "GET", vec![pass(), pass()], ok_handler())
            .unwrap();
        let bundle = router.bundle("/admin", Method::Get).unwrap();
        assert_eq!(bundle.middleware_len(), 2);
    }

    #[test]
    fn test_global_admission_flattens_one_level() {
        let mut router = Router::new();
        router.use_middleware(pass());
        router.use_all(vec![pass(), pass()]);
        assert_eq!(router.global_middleware_len(), 3);
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut router = Router::new();
        router.route("/dup", "GET", ok_handler()).unwrap();
        router.route_with("/dup", "GET", vec![pass()], ok_handler()).unwrap();
        assert_eq!(router.bundle("/dup", Method::Get).unwrap().middleware_len(), 1);
    }
}
