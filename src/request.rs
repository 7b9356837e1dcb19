// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! 路由内核只依赖这里的 `Request` 抽象：方法、原始目标路径、协议版本、
//! 头部和请求体。传输层负责把 TCP 流中读取的字节解析为该结构体：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 头部（Headers）的提取，字段名大小写不敏感。
//! 3. 根据 `Content-Length` 截取请求体。

use bytes::Bytes;
use log::error;

use crate::{exception::Exception, param::*};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// 一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// 全局请求 ID，用于在多线程环境下追踪日志
    id: u128,
    /// HTTP 请求方法
    method: Method,
    /// 请求目标（包含查询字符串）
    target: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按到达顺序保存的头部
    headers: Vec<(String, String)>,
    /// 请求体
    body: Bytes,
}

impl Request {
    /// 直接构造请求，主要供测试与进程内调度使用
    pub fn new(method: Method, target: &str) -> Self {
        Self {
            id: 0,
            method,
            target: target.to_string(),
            version: HttpVersion::V1_1,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_id(mut self, id: u128) -> Self {
        self.id = id;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// 判断缓冲区中的请求是否已经完整到达。
    ///
    /// 头部尚未结束时返回 `Ok(None)`；头部结束后返回整个请求（头部 + 请求体）
    /// 应有的字节数，供传输层决定是否继续读取。
    pub fn expected_length(buffer: &[u8]) -> Result<Option<usize>, Exception> {
        let head_len = match find_head_end(buffer) {
            Some(len) => len,
            None => return Ok(None),
        };
        let head = std::str::from_utf8(&buffer[..head_len]).map_err(|_| Exception::RequestIsNotUtf8)?;
        let content_length = parse_content_length(head.split(CRLF).skip(1))?;
        let total = head_len
            .checked_add(content_length)
            .ok_or(Exception::RequestTooLarge)?;
        Ok(Some(total))
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 定位头部结尾并验证头部是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 迭代解析头部。
    /// 4. 按 `Content-Length` 截取请求体。
    ///
    /// # 错误处理
    /// 如果请求格式不符合 HTTP 规范或使用了不支持的方法/版本，将返回相应的 `Exception`。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let head_len = find_head_end(buffer).ok_or(Exception::IncompleteRequest)?;
        let head = match std::str::from_utf8(&buffer[..head_len]) {
            Ok(head) => head,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or_default();

        // 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let method = match parts[0].parse::<Method>() {
            Ok(m) => m,
            Err(_) => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, parts[0]);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version = match parts[parts.len() - 1].to_uppercase().as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            other => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, other);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let target = parts[1..parts.len() - 1].join(" ");

        let mut headers = Vec::new();
        for line in lines.clone().filter(|l| !l.is_empty()) {
            match line.split_once(':') {
                Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
                None => {
                    error!("[ID{}]无法解析的请求头：{}", id, line);
                    return Err(Exception::InvalidHeader);
                }
            }
        }

        let content_length = parse_content_length(lines)?;
        let available = buffer.len() - head_len;
        if available < content_length {
            error!(
                "[ID{}]请求体不完整：期望{}字节，实际{}字节",
                id, content_length, available
            );
            return Err(Exception::IncompleteRequest);
        }
        let body = Bytes::copy_from_slice(&buffer[head_len..head_len + content_length]);

        Ok(Self {
            id,
            method,
            target,
            version,
            headers,
            body,
        })
    }
}

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// 原始请求目标（含查询参数）
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 查询字符串（不含 `?`）
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 大小写不敏感地读取头部，存在重复时返回第一个
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    /// 客户端支持的压缩算法列表，只要包含关键词即视为支持
    pub fn accept_encoding(&self) -> Vec<HttpEncoding> {
        let mut encodings = Vec::new();
        if let Some(value) = self.header("Accept-Encoding") {
            if value.contains("gzip") {
                encodings.push(HttpEncoding::Gzip);
            }
            if value.contains("deflate") {
                encodings.push(HttpEncoding::Deflate);
            }
            if value.contains("br") {
                encodings.push(HttpEncoding::Br);
            }
        }
        encodings
    }
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

fn parse_content_length<'a>(lines: impl Iterator<Item = &'a str>) -> Result<usize, Exception> {
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                return value.trim().parse::<usize>().map_err(|_| Exception::InvalidHeader);
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\nAccept-Encoding: gzip, deflate, br\r\n\r\n";

        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.target(), "/");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert_eq!(request.header("host"), Some("localhost:7878"));
        let encodings = request.accept_encoding();
        assert!(encodings.contains(&HttpEncoding::Gzip));
        assert!(encodings.contains(&HttpEncoding::Deflate));
        assert!(encodings.contains(&HttpEncoding::Br));
    }

    /// 路由器支持完整的方法集合，包括 DELETE 与 PATCH
    #[test]
    fn test_parse_delete_and_patch() {
        let delete = Request::try_from(b"DELETE /users/3 HTTP/1.1\r\nHost: x\r\n\r\n", 0).unwrap();
        assert_eq!(delete.method(), Method::Delete);

        let patch = Request::try_from(b"patch /users/3 HTTP/1.1\r\nHost: x\r\n\r\n", 0).unwrap();
        assert_eq!(patch.method(), Method::Patch);
    }

    #[test]
    fn test_unsupported_method() {
        let result = Request::try_from(b"BREW /pot HTTP/1.1\r\nHost: x\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    /// 确保不支持的版本（如 HTTP/2.0）被正确拒绝
    #[test]
    fn test_unsupported_http_version() {
        let result = Request::try_from(b"GET / HTTP/2.0\r\nHost: x\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::UnsupportedHttpVersion);
    }

    #[test]
    fn test_http_1_0_accepted() {
        let request = Request::try_from(b"GET / HTTP/1.0\r\n\r\n", 0).unwrap();
        assert_eq!(request.version(), HttpVersion::V1_0);
    }

    /// 验证 UTF-8 编码检查
    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD, b'\r', b'\n', b'\r', b'\n'];
        let result = Request::try_from(&buffer, 0);
        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_malformed_request_line() {
        let result = Request::try_from(b"GET\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::MalformedRequestLine);
    }

    #[test]
    fn test_header_without_colon() {
        let result = Request::try_from(b"GET / HTTP/1.1\r\nbroken header\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::InvalidHeader);
    }

    #[test]
    fn test_post_body_by_content_length() {
        let raw = b"POST /users HTTP/1.1\r\nContent-Length: 11\r\n\r\n{\"id\":7}xyzEXTRA";
        let request = Request::try_from(raw, 3).unwrap();
        assert_eq!(request.id(), 3);
        assert_eq!(request.body().as_ref(), b"{\"id\":7}xyz");
    }

    #[test]
    fn test_incomplete_body() {
        let raw = b"POST /users HTTP/1.1\r\nContent-Length: 20\r\n\r\nshort";
        assert_eq!(Request::try_from(raw, 0).unwrap_err(), Exception::IncompleteRequest);
    }

    #[test]
    fn test_expected_length() {
        assert_eq!(Request::expected_length(b"GET / HTTP/1.1\r\nHost: x").unwrap(), None);

        let raw = b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\n";
        assert_eq!(Request::expected_length(raw).unwrap(), Some(raw.len() + 4));

        let bad = b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n";
        assert_eq!(Request::expected_length(bad).unwrap_err(), Exception::InvalidHeader);
    }

    #[test]
    fn test_expected_length_overflowing_content_length() {
        let raw = b"POST /foo HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n";
        assert_eq!(Request::expected_length(raw).unwrap_err(), Exception::RequestTooLarge);
        // 完整解析时声明的长度远大于实际内容，视为请求不完整
        assert_eq!(Request::try_from(raw, 0).unwrap_err(), Exception::IncompleteRequest);
    }

    /// 确保带查询参数的路径能完整提取
    #[test]
    fn test_path_with_query_string() {
        let request = Request::try_from(b"GET /page?id=123&name=test HTTP/1.1\r\n\r\n", 0).unwrap();
        assert_eq!(request.target(), "/page?id=123&name=test");
        assert_eq!(request.query(), Some("id=123&name=test"));
    }

    /// 验证 Header 字段名是否大小写不敏感
    #[test]
    fn test_case_insensitive_headers() {
        let request = Request::try_from(
            b"GET / HTTP/1.1\r\nuser-agent: Test\r\naccept-encoding: gzip\r\n\r\n",
            0,
        )
        .unwrap();
        assert_eq!(request.user_agent(), "Test");
        assert_eq!(request.accept_encoding(), vec![HttpEncoding::Gzip]);
    }

    #[test]
    fn test_builder() {
        let request = Request::new(Method::Post, "/items")
            .with_id(9)
            .with_header("X-Token", "abc")
            .with_body("payload");
        assert_eq!(request.id(), 9);
        assert_eq!(request.header("x-token"), Some("abc"));
        assert_eq!(request.body().as_ref(), b"payload");
    }
}
