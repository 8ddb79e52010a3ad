//! 库存预留令牌定义
//!
//! 预留以持久化行的形式存在，令牌即行主键（uuid）。
//! 状态翻转使用带前置条件的 UPDATE，使 release/finalize
//! 在进程重启和多实例竞争下仍保持按令牌幂等。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReservationState;

/// 库存预留行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockReservation {
    /// 预留令牌
    pub id: Uuid,
    pub activity_id: i64,
    pub user_id: i64,
    /// 预留数量
    pub quantity: i32,
    /// 预留状态
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
}

/// 预留令牌（台账 reserve 的返回值）
///
/// 携带回滚/落定所需的全部信息，调用方不需要回查预留行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken {
    pub id: Uuid,
    pub activity_id: i64,
    pub user_id: i64,
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_serialization() {
        let row = StockReservation {
            id: Uuid::new_v4(),
            activity_id: 7,
            user_id: 42,
            quantity: 1,
            state: ReservationState::Held,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["activityId"], 7);
        assert_eq!(json["state"], "HELD");
    }
}
