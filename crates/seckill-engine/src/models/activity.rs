//! 秒杀活动实体定义
//!
//! 活动是对单个商品的限时促销：时间窗口、限购数量、总库存与秒杀价。
//! 剩余库存与用户购买计数由库存台账（ledger）独占管理，不在本实体上。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::ActivityStatus;

/// 秒杀活动
///
/// 不变式：`start_at < end_at`；总库存在创建时确定且不会增加
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SeckillActivity {
    pub id: i64,
    /// 促销的商品 ID（每个活动只对应一个商品）
    pub product_id: i64,
    /// 活动开始时间
    pub start_at: DateTime<Utc>,
    /// 活动结束时间
    pub end_at: DateTime<Utc>,
    /// 每用户限购数量
    pub limit_per_user: i32,
    /// 总库存（创建后不再增加）
    pub total_stock: i64,
    /// 秒杀价
    pub seckill_price: Decimal,
    /// 活动状态
    pub status: ActivityStatus,
    pub created_at: DateTime<Utc>,
}

impl SeckillActivity {
    /// 活动当前是否可购买
    ///
    /// 要求状态为 ACTIVE 且当前时间落在 [start_at, end_at) 内。
    /// 库存是否充足由台账在预留时判定，不在这里检查。
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ActivityStatus::Active && self.start_at <= now && now < self.end_at
    }

    /// 不在可购买状态时的原因描述（用于错误信息）
    pub fn inactive_reason(&self, now: DateTime<Utc>) -> String {
        if self.status != ActivityStatus::Active {
            return format!("活动状态为 {:?}", self.status);
        }
        if now < self.start_at {
            "活动尚未开始".to_string()
        } else {
            "活动已结束".to_string()
        }
    }
}

/// 活动库存行（台账独占）
///
/// 与活动表分离，使高频的条件更新只竞争这一行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStock {
    pub activity_id: i64,
    /// 总库存快照
    pub total: i64,
    /// 剩余库存
    pub remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn activity(status: ActivityStatus, now: DateTime<Utc>) -> SeckillActivity {
        SeckillActivity {
            id: 1,
            product_id: 10,
            start_at: now - Duration::minutes(5),
            end_at: now + Duration::minutes(5),
            limit_per_user: 1,
            total_stock: 100,
            seckill_price: Decimal::new(990, 2),
            status,
            created_at: now - Duration::hours(1),
        }
    }

    #[test]
    fn test_is_active_within_window() {
        let now = Utc::now();
        assert!(activity(ActivityStatus::Active, now).is_active(now));
    }

    #[test]
    fn test_not_active_when_pending_or_ended() {
        let now = Utc::now();
        assert!(!activity(ActivityStatus::Pending, now).is_active(now));
        assert!(!activity(ActivityStatus::Ended, now).is_active(now));
    }

    #[test]
    fn test_not_active_outside_window() {
        let now = Utc::now();
        let mut a = activity(ActivityStatus::Active, now);

        // 尚未开始
        a.start_at = now + Duration::minutes(1);
        assert!(!a.is_active(now));
        assert_eq!(a.inactive_reason(now), "活动尚未开始");

        // 已结束（end_at 为开区间边界）
        a.start_at = now - Duration::minutes(10);
        a.end_at = now;
        assert!(!a.is_active(now));
        assert_eq!(a.inactive_reason(now), "活动已结束");
    }
}
