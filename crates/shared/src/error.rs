//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 业务错误（库存不足、限购超额等）与系统错误（数据库、并发冲突）
//! 共用一个枚举，通过 `is_business_error` 区分。

use thiserror::Error;

/// 秒杀系统错误类型
#[derive(Debug, Error)]
pub enum SeckillError {
    // ==================== 活动与库存错误 ====================
    #[error("活动不在可购买状态: activity_id={activity_id}, 原因: {reason}")]
    ActivityNotActive { activity_id: i64, reason: String },

    #[error("库存不足: activity_id={activity_id}")]
    OutOfStock { activity_id: i64 },

    #[error("超过限购数量: activity_id={activity_id}, user_id={user_id}, 限购 {limit}")]
    LimitExceeded {
        activity_id: i64,
        user_id: i64,
        limit: i32,
    },

    // ==================== 幂等与状态机错误 ====================
    #[error("幂等键已被其他请求占用: idem_key={idem_key}")]
    IdempotencyKeyConflict { idem_key: String },

    #[error("非法的状态转换: order_id={order_id}, {from} -> {to}")]
    InvalidTransition {
        order_id: i64,
        from: String,
        to: String,
    },

    #[error("支付结果已记录: order_id={order_id}")]
    PaymentAlreadyRecorded { order_id: i64 },

    // ==================== 通用业务错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("权限不足: {operation}")]
    Forbidden { operation: String },

    #[error("参数校验失败: {0}")]
    Validation(String),

    // ==================== 系统错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    #[error("服务暂时不可用: {operation}")]
    ServiceUnavailable { operation: String },

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, SeckillError>;

impl SeckillError {
    /// 获取错误码（用于对外暴露的稳定标识）
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActivityNotActive { .. } => "ACTIVITY_NOT_ACTIVE",
            Self::OutOfStock { .. } => "OUT_OF_STOCK",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::IdempotencyKeyConflict { .. } => "IDEMPOTENCY_KEY_CONFLICT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PaymentAlreadyRecorded { .. } => "PAYMENT_ALREADY_RECORDED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 仅瞬时的基础设施故障可重试；业务拒绝（库存不足、限购等）
    /// 重试也不会成功，直接向上传播。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ConcurrencyConflict)
    }

    /// 是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::ConcurrencyConflict
                | Self::ServiceUnavailable { .. }
                | Self::Config(_)
                | Self::Internal(_)
        )
    }
}

/// 将 sqlx 错误归类为可重试的并发冲突或普通数据库错误
///
/// PostgreSQL 的序列化失败（40001）与死锁（40P01）属于事务级瞬时冲突，
/// 在工作单元边界重试即可恢复；其余错误原样保留。
pub fn classify_db_error(err: sqlx::Error) -> SeckillError {
    if let Some(db_err) = err.as_database_error() {
        if let Some(code) = db_err.code() {
            if code == "40001" || code == "40P01" || code == "55P03" {
                return SeckillError::ConcurrencyConflict;
            }
        }
    }
    SeckillError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = SeckillError::OutOfStock { activity_id: 7 };
        assert_eq!(err.code(), "OUT_OF_STOCK");

        let err = SeckillError::InvalidTransition {
            order_id: 1,
            from: "PAID".to_string(),
            to: "TIMEOUT".to_string(),
        };
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_payment_already_recorded_is_a_business_signal() {
        // 重放信号：引擎内部流转用，边界上转换为成功，绝不触发重试
        let err = SeckillError::PaymentAlreadyRecorded { order_id: 100 };
        assert_eq!(err.code(), "PAYMENT_ALREADY_RECORDED");
        assert!(err.is_business_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_is_retryable() {
        assert!(SeckillError::ConcurrencyConflict.is_retryable());
        assert!(SeckillError::Database(sqlx::Error::PoolTimedOut).is_retryable());

        assert!(!SeckillError::OutOfStock { activity_id: 1 }.is_retryable());
        assert!(
            !SeckillError::LimitExceeded {
                activity_id: 1,
                user_id: 2,
                limit: 1
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_is_business_error() {
        assert!(SeckillError::OutOfStock { activity_id: 1 }.is_business_error());
        assert!(
            SeckillError::IdempotencyKeyConflict {
                idem_key: "k".to_string()
            }
            .is_business_error()
        );
        assert!(!SeckillError::ConcurrencyConflict.is_business_error());
        assert!(!SeckillError::Internal("boom".to_string()).is_business_error());
    }

    #[test]
    fn test_error_display() {
        let err = SeckillError::LimitExceeded {
            activity_id: 10,
            user_id: 42,
            limit: 2,
        };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("2"));
    }
}
