// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 传输层
//!
//! 基于 Tokio 的 HTTP/1.x 服务器：接受 TCP 连接，为每个连接派生一个异步任务，
//! 读取并解析请求，交给 [`Router::dispatch`] 处理，再把封存后的响应写回。
//! 每个连接只处理一个请求，响应携带 `Connection: close`。

use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddrV4},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
};

use crate::{
    config::Config,
    exception::Exception,
    param::{HttpEncoding, Method},
    request::Request,
    response::{decide_encoding, Response, SealedResponse},
    router::Router,
};

/// 在调度之前观察每个请求的监听函数
pub type RequestHook = Arc<dyn Fn(&Request) + Send + Sync>;

const READ_CHUNK: usize = 1024;

pub struct Server {
    router: Arc<Router>,
    config: Arc<Config>,
    hook: Option<RequestHook>,
    active_connection: Arc<AtomicUsize>,
}

impl Server {
    pub fn new(router: Router, config: Config) -> Self {
        Self {
            router: Arc::new(router),
            config: Arc::new(config),
            hook: None,
            active_connection: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 安装额外的请求监听函数，在路由调度之前调用
    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 当前正在处理的连接数
    pub fn active_connections(&self) -> usize {
        self.active_connection.load(Ordering::SeqCst)
    }

    /// 按配置绑定监听地址：`local` 为真时只监听本地回环
    pub async fn bind(&self) -> io::Result<TcpListener> {
        let port = self.config.port();
        let address = match self.config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        info!("服务端将在{}:{}上监听Socket连接", address, port);
        let listener = TcpListener::bind(SocketAddrV4::new(address, port)).await?;
        info!("端口{}绑定完成", port);
        Ok(listener)
    }

    /// 持续接受连接，直到 `shutdown` 完成。
    ///
    /// 已经派生的连接任务不会被打断。
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("主循环接收到停机指令，正在退出...");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("接受TCP连接失败：{}", e);
                            continue;
                        }
                    };
                    debug!("[ID{}]TCP连接已建立：{}", id, addr);

                    let router = Arc::clone(&self.router);
                    let config = Arc::clone(&self.config);
                    let hook = self.hook.clone();
                    let active = Arc::clone(&self.active_connection);
                    tokio::spawn(async move {
                        active.fetch_add(1, Ordering::SeqCst);
                        serve_connection(stream, id, &router, &config, hook.as_ref()).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                    id += 1;
                }
            }
        }
        Ok(())
    }
}

/// 处理单个连接上的一个请求。
///
/// 读取直到请求完整到达，超过 `max_request_size` 时返回 413；
/// 解析失败按 [`Exception::status`] 返回对应状态码。
pub async fn serve_connection<S>(
    mut stream: S,
    id: u128,
    router: &Router,
    config: &Config,
    hook: Option<&RequestHook>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start_time = Instant::now();

    let parsed = match read_request(&mut stream, id, config.max_request_size()).await {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            debug!("[ID{}]客户端在发送请求前关闭了连接", id);
            return;
        }
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };

    let bytes = match parsed {
        Ok(request) => {
            debug!("[ID{}]成功解析HTTP请求", id);
            if let Some(hook) = hook {
                hook(&request);
            }

            let method = request.method();
            let version = request.version();
            let target = request.target().to_string();
            let user_agent = request.user_agent().to_string();
            let encoding = negotiate(config, &request.accept_encoding());

            let response = router.dispatch(request).await;
            let encoding = encoding.filter(|_| response.body().len() >= config.compression_min_size());
            info!(
                "[ID{}]{}, {}, {}, {}, {}, {}",
                id,
                version,
                target,
                method,
                response.status_code(),
                response.information(),
                user_agent
            );
            response.to_bytes(encoding, method == Method::Head)
        }
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            reject(e).to_bytes(None, false)
        }
    };

    if let Err(e) = write_all(&mut stream, &bytes).await {
        error!("[ID{}]写入响应时遇到错误: {}", id, e);
        return;
    }
    debug!(
        "[ID{}]HTTP响应已写回，耗时{}ms",
        id,
        start_time.elapsed().as_millis()
    );
}

/// 读取一个完整请求。`Ok(None)` 表示连接在发送任何字节前就被关闭。
async fn read_request<S>(
    stream: &mut S,
    id: u128,
    max_request_size: usize,
) -> io::Result<Option<Result<Request, Exception>>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Ok(Some(Err(Exception::IncompleteRequest)));
        }
        buffer.extend_from_slice(&chunk[..n]);

        let outcome = match Request::expected_length(&buffer) {
            Ok(Some(total)) if total > max_request_size => Err(Exception::RequestTooLarge),
            Ok(Some(total)) if buffer.len() >= total => Request::try_from(&buffer, id),
            Ok(_) if buffer.len() > max_request_size => Err(Exception::RequestTooLarge),
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        return Ok(Some(outcome));
    }
}

fn negotiate(config: &Config, accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    if !config.compression() {
        return None;
    }
    decide_encoding(accept_encoding)
}

/// 传输层错误的响应，不经过路由器
fn reject(e: Exception) -> SealedResponse {
    let mut response = Response::new();
    if let Err(err) = response.error(e.status()) {
        error!("无法构建错误响应：{}", err);
    }
    response.seal()
}

async fn write_all<S>(stream: &mut S, bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await?;
    stream.shutdown().await
}
