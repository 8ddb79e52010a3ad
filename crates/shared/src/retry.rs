//! 重试策略与执行器
//!
//! 提供指数退避重试机制，用于工作单元边界的瞬时故障
//! （事务序列化失败、死锁、连接池超时）的自动恢复。
//! 业务拒绝（库存不足、限购超额等）不会被重试，直接向上传播。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::SeckillError;

/// 重试策略配置
///
/// 使用指数退避避免重试风暴：首次失败等 initial_delay，
/// 之后按 multiplier 倍增，直到达到最大间隔或最大重试次数。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    pub max_retries: u32,
    /// 首次重试前的等待时间
    pub initial_delay: Duration,
    /// 退避时间上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// 默认策略：最多重试 3 次，初始等待 20 毫秒，最大等待 500 毫秒
    ///
    /// 秒杀场景下调用方等在请求上，退避必须保持在毫秒级。
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// 从配置构造策略
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
        }
    }

    /// 计算第 N 次重试的等待时间（attempt 从 0 开始）
    ///
    /// 公式: initial_delay * multiplier^attempt，结果不超过 max_delay。
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// 是否应继续重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// 带重试的异步执行器
///
/// 对任意异步操作应用重试策略。仅当 `SeckillError::is_retryable`
/// 为真时才重试；重试次数耗尽后返回 `ServiceUnavailable`，
/// 让调用方能把瞬时故障与业务拒绝区分开。
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, SeckillError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SeckillError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                // 业务错误不重试，直接返回
                if !err.is_retryable() {
                    return Err(err);
                }

                // 已用尽重试次数，以可重试服务错误的形式上抛
                if !policy.should_retry(attempt) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_retries = policy.max_retries,
                        error = %err,
                        "已达最大重试次数，放弃重试"
                    );
                    return Err(SeckillError::ServiceUnavailable {
                        operation: operation_name.to_string(),
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "操作失败，将在退避后重试"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_for_attempt_exponential_backoff() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(40));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(80));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        // 超过上限后被钳制
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let policy = RetryPolicy::default();
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SeckillError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        };
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(SeckillError::ConcurrencyConflict)
                } else {
                    Ok(99)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_touch_business_errors() {
        let policy = RetryPolicy::default();
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result: Result<(), _> = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SeckillError::OutOfStock { activity_id: 1 })
            }
        })
        .await;

        // 业务拒绝只执行一次，且错误原样返回
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().code(), "OUT_OF_STOCK");
    }

    #[tokio::test]
    async fn test_retry_exhaustion_maps_to_service_unavailable() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        };
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result: Result<(), _> = retry_with_policy(&policy, "attempt_purchase", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SeckillError::ConcurrencyConflict)
            }
        })
        .await;

        // 首次执行 + 2 次重试 = 3 次调用
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().code(), "SERVICE_UNAVAILABLE");
    }
}
