// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文
//!
//! 每个请求拥有一个独立的 [`Context`]，在中间件链与处理函数之间传递：
//! - `request`：传输层解析好的请求。
//! - `response`：响应门面，负责唯一一次的完成操作。
//! - `params`：路由解析阶段写入的捕获参数，之后只读。
//! - `locals`：供中间件之间传递数据的自由映射。

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{request::Request, response::Response};

/// 中间件之间共享的请求级数据
pub type Locals = Map<String, Value>;

/// 捕获名到捕获值的映射，键唯一。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        self.inner.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// 单个请求的上下文。字段公开，便于在同一作用域内分别借用请求与响应。
#[derive(Debug)]
pub struct Context {
    pub request: Request,
    pub response: Response,
    pub locals: Locals,
    params: Params,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            locals: Locals::new(),
            params: Params::new(),
        }
    }

    /// 路由解析得到的全部捕获参数
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// 读取单个捕获参数
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// 只由调度器在进入中间件链之前调用一次
    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
