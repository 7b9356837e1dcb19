// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了路由器在生命周期不同阶段可能产生的三类错误。
//!
//! ## 设计意图
//! - **[`Exception`]**：传输层解析原始字节流时的失败，由服务器直接转化为 4xx/5xx。
//! - **[`RouteError`]**：请求阶段的带标签错误，携带状态码语义，由调度器统一映射。
//! - **[`ConfigError`]**：启动注册阶段的配置错误，立即失败，绝不拖延到请求阶段。

use std::error::Error;
use std::fmt;

/// 传输层解析请求报文时发生的异常。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    /// 请求头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行不符合 `METHOD TARGET VERSION` 格式。
    MalformedRequestLine,
    /// 请求使用了路由器无法识别的方法名。对应 `501 Not Implemented`。
    UnSupportedRequestMethod,
    /// 不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求头部或 `Content-Length` 格式非法。
    InvalidHeader,
    /// 请求超过配置的最大长度。对应 `413 Content Too Large`。
    RequestTooLarge,
    /// 连接在请求完整到达之前被关闭。
    IncompleteRequest,
}

impl Exception {
    /// 传输层应当返回给客户端的状态码
    pub fn status(&self) -> u16 {
        match self {
            Exception::UnSupportedRequestMethod => 501,
            Exception::UnsupportedHttpVersion => 505,
            Exception::RequestTooLarge => 413,
            _ => 400,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exception::RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            Exception::MalformedRequestLine => write!(f, "Malformed request line"),
            Exception::UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            Exception::UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            Exception::InvalidHeader => write!(f, "Invalid request header"),
            Exception::RequestTooLarge => write!(f, "Request exceeds the configured size limit"),
            Exception::IncompleteRequest => write!(f, "Connection closed before the request was complete"),
        }
    }
}

impl Error for Exception {}

/// 请求阶段的错误。
///
/// 中间件与处理函数通过返回 `Err(RouteError)` 来终止请求，
/// 由调度器的外层恢复边界统一分类并映射为状态码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// 请求路径没有匹配任何已注册的路由。对应 `404`。
    NotFound,
    /// 路由存在，但没有为该方法注册处理函数。对应 `405`。
    MethodNotAllowed,
    /// 处理函数主动给出的状态码，`message` 为空时使用原因短语。
    Status { code: u16, message: Option<String> },
    /// 其余意外错误。详情只会进入诊断通道，不会暴露给客户端。
    Internal(String),
    /// 对已经完成的响应再次执行完成操作。
    AlreadyFinalized,
}

impl RouteError {
    /// 以显式状态码终止请求
    pub fn status(code: u16) -> Self {
        RouteError::Status { code, message: None }
    }

    /// 以显式状态码和面向客户端的消息终止请求
    pub fn status_with_message(code: u16, message: impl Into<String>) -> Self {
        RouteError::Status {
            code,
            message: Some(message.into()),
        }
    }

    /// 包装一条内部错误详情
    pub fn internal(detail: impl Into<String>) -> Self {
        RouteError::Internal(detail.into())
    }

    /// 映射后的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            RouteError::NotFound => 404,
            RouteError::MethodNotAllowed => 405,
            RouteError::Status { code, .. } => *code,
            RouteError::Internal(_) | RouteError::AlreadyFinalized => 500,
        }
    }

    /// 是否属于需要转交诊断通道的意外错误
    pub fn is_internal(&self) -> bool {
        matches!(self, RouteError::Internal(_) | RouteError::AlreadyFinalized)
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound => write!(f, "Route not found (404)"),
            RouteError::MethodNotAllowed => write!(f, "Method not allowed (405)"),
            RouteError::Status { code, message } => match message {
                Some(m) => write!(f, "Status {}: {}", code, m),
                None => write!(f, "Status {}", code),
            },
            RouteError::Internal(detail) => write!(f, "Internal failure: {}", detail),
            RouteError::AlreadyFinalized => write!(f, "Response was already finalized"),
        }
    }
}

impl Error for RouteError {}

impl From<serde_json::Error> for RouteError {
    fn from(e: serde_json::Error) -> Self {
        RouteError::Internal(format!("JSON serialization failed: {}", e))
    }
}

/// 启动阶段的配置错误，出现即中止启动。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 注册时使用了封闭集合之外的 HTTP 方法名。
    UnknownMethod(String),
    /// 路由模式格式非法，例如不以 `/` 开头或捕获名为空。
    InvalidPattern { pattern: String, reason: String },
    /// 同一深度上出现了名称不同的两个捕获段。
    ConflictingParam {
        pattern: String,
        existing: String,
        requested: String,
    },
    /// 配置文件无法读取。
    Io { path: String, detail: String },
    /// 配置文件无法解析。
    Parse { path: String, detail: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownMethod(m) => write!(f, "Unknown method {}", m),
            ConfigError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid route pattern \"{}\": {}", pattern, reason)
            }
            ConfigError::ConflictingParam {
                pattern,
                existing,
                requested,
            } => write!(
                f,
                "Route pattern \"{}\" declares capture :{} where :{} is already registered",
                pattern, requested, existing
            ),
            ConfigError::Io { path, detail } => write!(f, "Can't read {}: {}", path, detail),
            ConfigError::Parse { path, detail } => write!(f, "Can't parse {}: {}", path, detail),
        }
    }
}

impl Error for ConfigError {}
