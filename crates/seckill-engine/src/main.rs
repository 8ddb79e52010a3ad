//! 秒杀订单引擎守护进程
//!
//! 加载配置、连接数据库、执行迁移，然后运行超时订单清扫器
//! 直到收到退出信号。购买 / 支付 / 取消操作由上层服务通过
//! 库接口调用，本进程只承担后台清扫职责。

use anyhow::Result;
use tokio::signal;
use tracing::info;

use flashsale_shared::{config::AppConfig, database::Database, observability};
use seckill_engine::ExpirySweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置：config/default.toml -> config/{env}.toml -> FLASHSALE_ 环境变量
    let config = AppConfig::load("seckill-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化日志
    observability::init(&config.observability);

    info!("Starting seckill-engine...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化数据库连接并执行迁移
    let db = Database::connect(&config.database).await?;
    let pool = db.pool().clone();
    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("Database connection established, migrations applied");

    // 4. 运行清扫器直到收到退出信号
    let sweeper = ExpirySweeper::with_config(
        pool,
        config.engine.sweep_interval_seconds,
        config.engine.reservation_timeout_seconds,
        config.engine.sweep_batch_size,
    );

    tokio::select! {
        _ = sweeper.run() => {}
        _ = shutdown_signal() => {}
    }

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
