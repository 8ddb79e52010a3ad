//! 库存台账（进程内实现）
//!
//! 与 PostgreSQL 实现同一契约：每个活动一把互斥锁保护的计数器，
//! 扣减与限购检查在锁内一步完成。用于并发属性测试；在单实例部署
//! 中也可作为数据库前面的快速路径（正确性边界仍是持久化台账）。

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use flashsale_shared::error::{Result, SeckillError};

use crate::models::{ReservationState, ReservationToken, SeckillActivity};

/// 单个活动的计数器（锁内整体更新）
struct ActivityCounters {
    remaining: i64,
    limit_per_user: i32,
    per_user: HashMap<i64, i32>,
}

/// 预留登记项
struct ReservationEntry {
    activity_id: i64,
    user_id: i64,
    quantity: i32,
    state: ReservationState,
}

/// 进程内库存台账
pub struct MemoryStockLedger {
    activities: DashMap<i64, Mutex<ActivityCounters>>,
    reservations: DashMap<Uuid, ReservationEntry>,
}

impl MemoryStockLedger {
    pub fn new() -> Self {
        Self {
            activities: DashMap::new(),
            reservations: DashMap::new(),
        }
    }

    /// 登记活动库存（活动创建时调用一次）
    pub fn init_stock(&self, activity: &SeckillActivity) {
        self.activities.insert(
            activity.id,
            Mutex::new(ActivityCounters {
                remaining: activity.total_stock,
                limit_per_user: activity.limit_per_user,
                per_user: HashMap::new(),
            }),
        );
    }

    /// 预留库存
    ///
    /// 扣减与限购递增在同一把锁内完成，任一守卫失败则整体不生效
    pub fn reserve(&self, activity_id: i64, user_id: i64, quantity: i32) -> Result<ReservationToken> {
        let counters = self
            .activities
            .get(&activity_id)
            .ok_or_else(|| SeckillError::NotFound {
                entity: "ActivityStock".to_string(),
                id: activity_id.to_string(),
            })?;

        {
            let mut guard = counters.lock();

            if guard.remaining < quantity as i64 {
                return Err(SeckillError::OutOfStock { activity_id });
            }

            let count = guard.per_user.get(&user_id).copied().unwrap_or(0);
            if count + quantity > guard.limit_per_user {
                return Err(SeckillError::LimitExceeded {
                    activity_id,
                    user_id,
                    limit: guard.limit_per_user,
                });
            }

            guard.remaining -= quantity as i64;
            *guard.per_user.entry(user_id).or_insert(0) += quantity;
        }

        let token_id = Uuid::new_v4();
        self.reservations.insert(
            token_id,
            ReservationEntry {
                activity_id,
                user_id,
                quantity,
                state: ReservationState::Held,
            },
        );

        Ok(ReservationToken {
            id: token_id,
            activity_id,
            user_id,
            quantity,
        })
    }

    /// 释放预留，按令牌幂等（重复释放 / 已落定均为无操作）
    pub fn release(&self, token_id: Uuid) -> Result<bool> {
        let (activity_id, user_id, quantity) = {
            let mut entry = match self.reservations.get_mut(&token_id) {
                Some(entry) => entry,
                None => return Ok(false),
            };
            if entry.state != ReservationState::Held {
                return Ok(false);
            }
            entry.state = ReservationState::Released;
            (entry.activity_id, entry.user_id, entry.quantity)
        };

        if let Some(counters) = self.activities.get(&activity_id) {
            let mut guard = counters.lock();
            guard.remaining += quantity as i64;
            if let Some(count) = guard.per_user.get_mut(&user_id) {
                *count -= quantity;
            }
        }

        Ok(true)
    }

    /// 落定预留（不归还库存），按令牌幂等
    pub fn finalize(&self, token_id: Uuid) -> Result<bool> {
        let mut entry = match self.reservations.get_mut(&token_id) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        if entry.state != ReservationState::Held {
            return Ok(false);
        }
        entry.state = ReservationState::Finalized;
        Ok(true)
    }

    /// 剩余库存（测试/监控用）
    pub fn remaining(&self, activity_id: i64) -> Option<i64> {
        self.activities.get(&activity_id).map(|c| c.lock().remaining)
    }

    /// 用户已购数量（测试/监控用）
    pub fn user_count(&self, activity_id: i64, user_id: i64) -> i32 {
        self.activities
            .get(&activity_id)
            .map(|c| c.lock().per_user.get(&user_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MemoryStockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityStatus;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn activity(total_stock: i64, limit_per_user: i32) -> SeckillActivity {
        let now = Utc::now();
        SeckillActivity {
            id: 1,
            product_id: 10,
            start_at: now - Duration::minutes(1),
            end_at: now + Duration::minutes(10),
            limit_per_user,
            total_stock,
            seckill_price: Decimal::new(990, 2),
            status: ActivityStatus::Active,
            created_at: now,
        }
    }

    #[test]
    fn test_reserve_and_release_round_trip() {
        let ledger = MemoryStockLedger::new();
        ledger.init_stock(&activity(10, 2));

        let token = ledger.reserve(1, 42, 1).unwrap();
        assert_eq!(ledger.remaining(1), Some(9));
        assert_eq!(ledger.user_count(1, 42), 1);

        // 释放后两个计数都恢复原值
        assert!(ledger.release(token.id).unwrap());
        assert_eq!(ledger.remaining(1), Some(10));
        assert_eq!(ledger.user_count(1, 42), 0);
    }

    #[test]
    fn test_release_is_idempotent_per_token() {
        let ledger = MemoryStockLedger::new();
        ledger.init_stock(&activity(10, 2));

        let token = ledger.reserve(1, 42, 1).unwrap();
        assert!(ledger.release(token.id).unwrap());
        // 重复释放是无操作，库存不会被多还
        assert!(!ledger.release(token.id).unwrap());
        assert_eq!(ledger.remaining(1), Some(10));
    }

    #[test]
    fn test_release_after_finalize_is_noop() {
        let ledger = MemoryStockLedger::new();
        ledger.init_stock(&activity(10, 2));

        let token = ledger.reserve(1, 42, 1).unwrap();
        assert!(ledger.finalize(token.id).unwrap());
        // 已落定的预留不可再释放
        assert!(!ledger.release(token.id).unwrap());
        assert_eq!(ledger.remaining(1), Some(9));
    }

    #[test]
    fn test_out_of_stock() {
        let ledger = MemoryStockLedger::new();
        ledger.init_stock(&activity(1, 5));

        ledger.reserve(1, 42, 1).unwrap();
        let err = ledger.reserve(1, 43, 1).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_STOCK");
    }

    #[test]
    fn test_limit_exceeded() {
        let ledger = MemoryStockLedger::new();
        ledger.init_stock(&activity(10, 1));

        ledger.reserve(1, 42, 1).unwrap();
        let err = ledger.reserve(1, 42, 1).unwrap_err();
        assert_eq!(err.code(), "LIMIT_EXCEEDED");
        // 限购拒绝不消耗库存
        assert_eq!(ledger.remaining(1), Some(9));
    }

    #[test]
    fn test_unknown_activity() {
        let ledger = MemoryStockLedger::new();
        let err = ledger.reserve(999, 42, 1).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
