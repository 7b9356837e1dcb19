// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # webrouter 示例服务器
//!
//! 加载日志与运行配置，注册一组示例路由，并在 Tokio 运行时上启动服务器：
//! - `GET /`：欢迎文本
//! - `GET /users/:id`：读取路径参数
//! - `POST /users`：回显 JSON 请求体，返回 201
//! - `GET /admin`：需要 `Authorization` 头的路由中间件
//! - 全局中间件记录每个请求的耗时
//!
//! 按下 Ctrl-C 后停止接受新连接。

use std::{process, time::Instant};

use log::{error, info, warn};
use serde_json::{json, Value};
use tokio::runtime::Builder;

use webrouter::{
    from_fn, handler_fn, Config, ConfigError, Method, RouteError, Router, Server,
};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const APP_CONFIG: &str = "config/development.toml";

fn main() {
    // 1. 初始化日志系统
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法从{}初始化日志系统：{}", LOG_CONFIG, e);
        process::exit(1);
    }

    // 2. 环境配置加载，失败时使用默认配置
    let config = match Config::from_toml(APP_CONFIG) {
        Ok(config) => {
            info!("配置文件已载入");
            config
        }
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::new()
        }
    };

    // 3. 路由注册，配置错误直接终止启动
    let router = match build_router() {
        Ok(router) => router,
        Err(e) => {
            error!("路由注册失败：{}", e);
            process::exit(1);
        }
    };

    // 4. 根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };

    let server = Server::new(router, config).on_request(|request| {
        info!("[ID{}]收到请求 {} {}", request.id(), request.method(), request.target());
    });

    runtime.block_on(async move {
        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", server.config().port(), e);
                process::exit(1);
            }
        };

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听停机信号：{}", e);
            }
        };
        if let Err(e) = server.serve(listener, shutdown).await {
            error!("服务器异常退出：{}", e);
        }
        info!("服务器已停止，剩余活跃连接数：{}", server.active_connections());
    });
}

fn build_router() -> Result<Router, ConfigError> {
    let mut router = Router::new();

    router.use_middleware(from_fn(|cx, next| {
        Box::pin(async move {
            let start_time = Instant::now();
            let result = next.run(&mut *cx).await;
            info!(
                "[ID{}]{} {} 处理完成，用时{}ms",
                cx.request.id(),
                cx.request.method(),
                cx.request.target(),
                start_time.elapsed().as_millis()
            );
            result
        })
    }));

    let require_auth = from_fn(|cx, next| {
        Box::pin(async move {
            match cx.request.header("Authorization") {
                Some(token) if !token.is_empty() => {
                    cx.locals.insert("user".to_string(), json!(token));
                    next.run(cx).await
                }
                _ => Err(RouteError::status_with_message(401, "missing credentials")),
            }
        })
    });

    router
        .route(
            "/",
            Method::Get.as_str(),
            handler_fn(|cx| Box::pin(async move { cx.response.send("Welcome to webrouter") })),
        )?
        .route(
            "/users/:id",
            "GET",
            handler_fn(|cx| {
                Box::pin(async move {
                    let id = cx.param("id").unwrap_or_default().to_string();
                    cx.response.json(&json!({ "id": id }))
                })
            }),
        )?
        .route(
            "/users",
            "POST",
            handler_fn(|cx| {
                Box::pin(async move {
                    let user: Value = serde_json::from_slice(cx.request.body())
                        .map_err(|_| RouteError::status_with_message(400, "body must be JSON"))?;
                    cx.response.status(201).json(&user)
                })
            }),
        )?
        .route_with(
            "/admin",
            "GET",
            vec![require_auth],
            handler_fn(|cx| {
                Box::pin(async move {
                    let user = cx.locals.get("user").cloned().unwrap_or(Value::Null);
                    cx.response.json(&json!({ "admin": user }))
                })
            }),
        )?;

    Ok(router)
}
