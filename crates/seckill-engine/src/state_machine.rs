//! 订单状态机
//!
//! 订单生命周期：NEW -> {PAID, CANCELLED, TIMEOUT}，终态不再转出。
//! 本模块是 `order.status` 的唯一写入方：所有状态变更都必须经由
//! `apply_in_tx`，其余代码（引擎、清扫器）只能传入目标状态。
//!
//! 幂等接受规则：请求的目标状态与当前状态相同（例如已 PAID 的订单
//! 再次收到 PAID 回调）不算错误，返回 `AlreadyInTarget` 由调用方
//! 按无操作处理；其余从终态出发的转换一律拒绝为 INVALID_TRANSITION。

use sqlx::PgConnection;
use tracing::debug;

use flashsale_shared::error::{Result, SeckillError, classify_db_error};

use crate::models::OrderStatus;

/// 转换校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// 转换合法，可以执行
    Applied,
    /// 已处于目标状态，按无操作幂等接受
    AlreadyInTarget,
}

/// 校验一次状态转换
///
/// 穷尽匹配所有 (from, to) 组合；新增状态时编译器会强制补全
pub fn check_transition(
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<TransitionCheck> {
    use OrderStatus::*;

    if from == to {
        return Ok(TransitionCheck::AlreadyInTarget);
    }

    let legal = match (from, to) {
        (New, Paid) | (New, Cancelled) | (New, Timeout) => true,
        // 终态不转出；回到 NEW 也不允许
        (Paid, _) | (Cancelled, _) | (Timeout, _) | (_, New) => false,
    };

    if legal {
        Ok(TransitionCheck::Applied)
    } else {
        Err(SeckillError::InvalidTransition {
            order_id,
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        })
    }
}

/// 在事务中执行状态转换
///
/// UPDATE 带上 `status = from` 前置条件做最后一道比较并交换：
/// 即使调用方读到的状态已经过期（并发提交方先赢），也不会覆盖
/// 对方的转换结果，而是上报 CONCURRENCY_CONFLICT 由边界重试/放弃。
pub async fn apply_in_tx(
    tx: &mut PgConnection,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<TransitionCheck> {
    match check_transition(order_id, from, to)? {
        TransitionCheck::AlreadyInTarget => Ok(TransitionCheck::AlreadyInTarget),
        TransitionCheck::Applied => {
            let result = sqlx::query(
                r#"
                UPDATE seckill_order
                SET status = $3, updated_at = NOW()
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(order_id)
            .bind(from)
            .bind(to)
            .execute(tx)
            .await
            .map_err(classify_db_error)?;

            if result.rows_affected() == 0 {
                return Err(SeckillError::ConcurrencyConflict);
            }

            debug!(order_id, ?from, ?to, "订单状态已转换");
            Ok(TransitionCheck::Applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_legal_transitions_from_new() {
        for to in [Paid, Cancelled, Timeout] {
            assert_eq!(check_transition(1, New, to).unwrap(), TransitionCheck::Applied);
        }
    }

    #[test]
    fn test_terminal_states_reject_all_transitions() {
        for from in [Paid, Cancelled, Timeout] {
            for to in [New, Paid, Cancelled, Timeout] {
                if from == to {
                    continue;
                }
                let err = check_transition(1, from, to).unwrap_err();
                assert_eq!(err.code(), "INVALID_TRANSITION");
            }
        }
    }

    #[test]
    fn test_same_state_is_idempotent_acceptance() {
        // 已 PAID 的订单再次收到 PAID 回调是无操作，不是错误
        assert_eq!(
            check_transition(1, Paid, Paid).unwrap(),
            TransitionCheck::AlreadyInTarget
        );
        assert_eq!(
            check_transition(1, New, New).unwrap(),
            TransitionCheck::AlreadyInTarget
        );
    }

    #[test]
    fn test_no_transition_back_to_new() {
        let err = check_transition(1, Paid, New).unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("Paid"));
        assert!(err.to_string().contains("New"));
    }
}
