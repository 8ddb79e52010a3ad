//! 秒杀系统共享基础库
//!
//! 提供各组件共用的基础设施：配置加载、数据库连接池、
//! 统一错误类型、重试执行器和日志初始化。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;

pub use config::AppConfig;
pub use database::Database;
pub use error::{Result, SeckillError};
pub use retry::{RetryPolicy, retry_with_policy};
