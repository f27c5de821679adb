//! 行情代理服务
//!
//! 代替浏览器向上游行情接口取数，屏蔽上游的临时封禁、限流和空响应：
//! 多主机回退、软失败识别，批量报价不可用时按单代码时间序列重建报价

mod config;     // 配置
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::AppConfig;
use crate::middleware::CorsMiddleware;
use crate::services::transport::HttpTransport;
use crate::services::user_agent::RotatingUserAgents;
use crate::services::QuoteProxy;

/// 应用程序入口
///
/// 加载配置后启动 HTTP 服务器，默认监听 0.0.0.0:8080
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load();

    // RUST_LOG 优先于配置文件中的日志级别
    env_logger::init_from_env(Env::default().default_filter_or(loaded.config.log.level.as_str()));
    loaded.log();
    let config = loaded.config;

    if let Err(e) = config.validate() {
        log::error!("配置无效: {:#}", e);
        return Err(e);
    }

    let transport = HttpTransport::new(std::time::Duration::from_secs(
        config.upstream.connect_timeout_secs,
    ))?;
    let user_agents = RotatingUserAgents::new(config.upstream.user_agents.clone());
    let proxy = web::Data::new(QuoteProxy::new(
        &config,
        Arc::new(transport),
        Arc::new(user_agents),
    ));

    log::info!(
        "启动行情代理服务 {}，上游候选 {} 个",
        config.bind_addr(),
        config.upstream.hosts.len()
    );

    let cors = config.cors.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(proxy.clone())
            .wrap(CorsMiddleware::new(&cors)) // 跨域与缓存头
            .wrap(Logger::default()) // 请求日志
            .configure(handlers::config)
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(config.bind_addr())?.run().await?;
    Ok(())
}
