//! 主应用程序入口
//!
//! 加载配置，构建防护组件与成员目录，启动定时清扫与 Axum Web 服务。

mod sweeper;

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use application::{
    directory::memory::{DirectorySeed, MemoryDirectory},
    Clock, GuardContext, GuardSettings, MembershipDirectory, SystemClock,
};
use config::AppConfig;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

/// 成员目录种子文件（JSON）
const DIRECTORY_FILE_ENV: &str = "HEARTH_DIRECTORY_FILE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load().map_err(|err| {
        error!(error = %err, "配置加载失败");
        err
    })?;
    info!(config = %config.sanitize(), "配置已加载");
    if config.security.current_secret().is_none() {
        error!("未配置 HMAC_SECRET_CURRENT，邀请接口将返回 500");
    }
    if config.uses_development_jwt_secret() {
        warn!("正在使用开发用 JWT 密钥，请在生产环境设置 JWT_SECRET");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let guards = Arc::new(GuardContext::new(GuardSettings::from(&config), clock));
    let directory = load_directory()?;
    let jwt_service = Arc::new(JwtService::new(config.auth.clone()));

    let mut scheduler = sweeper::start(guards.clone(), &config.sweep).await?;

    let state = AppState::new(guards, directory, jwt_service)
        .with_trusted_proxy_headers(config.server.trust_proxy_headers);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {addr}"))?;
    info!("Hearth 防护服务启动在 http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown().await?;
    info!("服务已停止");
    Ok(())
}

/// 从种子文件构建内存成员目录；未配置时为空目录
fn load_directory() -> anyhow::Result<Arc<dyn MembershipDirectory>> {
    let Ok(path) = env::var(DIRECTORY_FILE_ENV) else {
        warn!("未设置 {DIRECTORY_FILE_ENV}，成员目录为空");
        return Ok(Arc::new(MemoryDirectory::new()));
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("无法读取成员目录文件 {path}"))?;
    let seed: DirectorySeed = serde_json::from_str(&raw)
        .with_context(|| format!("成员目录文件格式错误 {path}"))?;
    info!(
        rooms = seed.rooms.len(),
        users = seed.users.len(),
        memberships = seed.memberships.len(),
        "成员目录已加载"
    );
    Ok(Arc::new(MemoryDirectory::from_seed(seed)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "无法监听 Ctrl+C 信号");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig_term) => {
                sig_term.recv().await;
            }
            Err(err) => {
                error!(error = %err, "无法监听终止信号");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("接收到 Ctrl+C 信号，开始优雅停机..."),
        _ = terminate => info!("接收到终止信号，开始优雅停机..."),
    }
}
