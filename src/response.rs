//! # 响应门面
//!
//! [`Response`] 是处理函数与中间件看到的有状态构建器：`status` 与 `header`
//! 只记录状态，`json` / `send` / `error` 会写入响应体并完成响应。
//! 完成操作在一个响应上只会生效一次。
//!
//! [`SealedResponse`] 是完成后的只读结果，只能通过 [`Response::seal`] 得到，
//! 传输层只接受这种类型，从而保证每个请求恰好被完成一次。

use std::io::{self, Write};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::Utc;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    exception::RouteError,
    param::*,
    util::{format_date, reason_phrase},
};

/// `send` 接受的响应体。变体由值的运行时形态决定媒体类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 文本，按原样写出
    Text(String),
    /// 结构化数据，序列化为 JSON
    Json(Value),
    /// 原始字节
    Binary(Bytes),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Binary(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(b))
    }
}

/// 出站响应的可变状态。
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// 显式设置之前为 `None`
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Bytes,
    finalized: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录状态码，不完成响应
    pub fn status(&mut self, code: u16) -> &mut Self {
        if self.finalized {
            warn!("响应已完成，忽略状态码{}", code);
            return self;
        }
        self.status = Some(code);
        self
    }

    /// 设置响应头，同名头部（大小写不敏感）会被替换
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.finalized {
            warn!("响应已完成，忽略响应头{}", name);
            return self;
        }
        self.set_header(name, value);
        self
    }

    /// 设置 JSON 媒体类型，序列化 `payload` 并完成响应。
    ///
    /// 序列化失败时返回内部错误，响应保持未完成状态。
    pub fn json<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<(), RouteError> {
        self.ensure_open()?;
        let body = serde_json::to_vec(payload)?;
        let status = self.status.unwrap_or(200);
        self.finalize(status, MIME_JSON, Bytes::from(body))
    }

    /// 以 200 为默认状态码发送响应体
    pub fn send(&mut self, body: impl Into<Payload>) -> Result<(), RouteError> {
        self.send_with_status(body, 200)
    }

    /// 发送响应体。此前通过 `status` 设置的状态码优先于 `default_status`。
    ///
    /// 文本按原样写出并使用文本媒体类型，结构化数据序列化为 JSON。
    pub fn send_with_status(&mut self, body: impl Into<Payload>, default_status: u16) -> Result<(), RouteError> {
        self.ensure_open()?;
        let status = self.status.unwrap_or(default_status);
        let (content_type, bytes) = match body.into() {
            Payload::Text(text) => (MIME_TEXT, Bytes::from(text)),
            Payload::Json(value) => (MIME_JSON, Bytes::from(serde_json::to_vec(&value)?)),
            Payload::Binary(bytes) => (MIME_BINARY, bytes),
        };
        self.finalize(status, content_type, bytes)
    }

    /// 以状态码的原因短语作为消息写出 `{"message": ...}`
    pub fn error(&mut self, code: u16) -> Result<(), RouteError> {
        self.error_with_message(code, reason_phrase(code))
    }

    /// 写出 `{"message": message}` 并完成响应
    pub fn error_with_message(&mut self, code: u16, message: &str) -> Result<(), RouteError> {
        self.ensure_open()?;
        let body = serde_json::to_vec(&json!({ "message": message }))?;
        self.finalize(code, MIME_JSON, Bytes::from(body))
    }

    /// 完成并封存响应。此前未完成时，以当前状态码（默认 200）和空响应体完成。
    pub fn seal(mut self) -> SealedResponse {
        if !self.finalized {
            let status = self.status.unwrap_or(200);
            self.status = Some(status);
            self.set_header("Content-Length", "0");
            self.body = Bytes::new();
            self.finalized = true;
        }
        let status = self.status.unwrap_or(200);
        SealedResponse {
            status,
            headers: self.headers,
            body: self.body,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn ensure_open(&self) -> Result<(), RouteError> {
        if self.finalized {
            warn!("响应已经完成，拒绝再次写入");
            return Err(RouteError::AlreadyFinalized);
        }
        Ok(())
    }

    fn finalize(&mut self, status: u16, content_type: &str, body: Bytes) -> Result<(), RouteError> {
        self.ensure_open()?;
        self.status = Some(status);
        self.set_header("Content-Type", content_type);
        self.set_header("Content-Length", &body.len().to_string());
        self.body = body;
        self.finalized = true;
        debug!("响应完成：{} {}", status, reason_phrase(status));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// 已完成的响应，只读，交由传输层写出。
#[derive(Debug, Clone, PartialEq)]
pub struct SealedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl SealedResponse {
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn information(&self) -> &'static str {
        reason_phrase(self.status)
    }

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

    /// 响应体解析为 JSON，主要供测试使用
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// 序列化为 HTTP/1.1 报文。
    ///
    /// `encoding` 为 `Some` 时压缩响应体；压缩失败则退回未压缩内容。
    /// `head_only` 用于 HEAD 请求：保留 `Content-Length` 但不写出响应体。
    pub fn to_bytes(&self, encoding: Option<HttpEncoding>, head_only: bool) -> Vec<u8> {
        let (content, encoding) = match encoding {
            Some(mode) if !self.body.is_empty() => match compress(&self.body, mode) {
                Ok(compressed) => (compressed, Some(mode)),
                Err(e) => {
                    error!("压缩响应体失败: {}，返回未压缩内容", e);
                    (self.body.to_vec(), None)
                }
            },
            _ => (self.body.to_vec(), None),
        };

        let mut head = format!("HTTP/1.1 {} {}{}", self.status, self.information(), CRLF);
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            head.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        if let Some(e) = encoding {
            head.push_str(&format!("Content-Encoding: {}{}", e, CRLF));
        }
        head.push_str(&format!("Content-Length: {}{}", content.len(), CRLF));
        head.push_str(&format!("Date: {}{}", format_date(&Utc::now()), CRLF));
        head.push_str(&format!("Server: {}{}", SERVER_NAME, CRLF));
        head.push_str(&format!("Connection: close{}", CRLF));
        head.push_str(CRLF);

        let mut bytes = head.into_bytes();
        if !head_only {
            bytes.extend_from_slice(&content);
        }
        bytes
    }
}

/// 按客户端声明的编码选择压缩方式，优先 gzip，其次 deflate 与 br
pub fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    [HttpEncoding::Gzip, HttpEncoding::Deflate, HttpEncoding::Br]
        .into_iter()
        .find(|e| accept_encoding.contains(e))
}

fn compress(data: &[u8], mode: HttpEncoding) -> io::Result<Vec<u8>> {
    let result = match mode {
        HttpEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        HttpEncoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        HttpEncoding::Br => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
    };

    if let Ok(ref compressed) = result {
        debug!(
            "压缩完成: {}, 原始大小: {} bytes, 压缩后: {} bytes",
            mode,
            data.len(),
            compressed.len()
        );
    }
    result
}
