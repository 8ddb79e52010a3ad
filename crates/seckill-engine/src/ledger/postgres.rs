//! 库存台账（PostgreSQL 实现）
//!
//! ## 并发控制策略
//!
//! 成千上万的并发预留会竞争同一个活动的库存计数，因此扣减必须是
//! 单条不可分的条件 UPDATE（`WHERE remaining >= n`），而不是
//! 先读后写——后者的丢失更新正是超卖的来源。不同活动之间互不串行。
//!
//! 限购检查同理：对 (activity_id, user_id) 计数行做带守卫的 UPSERT，
//! `WHERE count + n <= limit`，没有命中行即为超出限购。
//!
//! 三个操作都以 `&mut PgConnection` 形式提供，由调用方把台账变更
//! 和配对的订单行变更放进同一个事务——库存扣了却没有订单行
//! （或反之）是本系统首要要消除的失效模式。

use chrono::Utc;
use sqlx::PgConnection;
use sqlx::postgres::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use flashsale_shared::error::{Result, SeckillError, classify_db_error};

use crate::models::{
    ActivityStock, ReservationState, ReservationToken, SeckillActivity, StockReservation,
};

/// 库存台账
///
/// 持有连接池用于事务外的只读查询；写操作全部走 `*_in_tx` 静态方法
pub struct StockLedger {
    pool: PgPool,
}

impl StockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询活动库存行（只读，监控/测试用）
    pub async fn get_stock(&self, activity_id: i64) -> Result<Option<ActivityStock>> {
        let stock = sqlx::query_as::<_, ActivityStock>(
            r#"
            SELECT activity_id, total, remaining
            FROM activity_stock
            WHERE activity_id = $1
            "#,
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock)
    }

    /// 查询用户在某活动下的已购数量（只读）
    pub async fn get_user_count(&self, activity_id: i64, user_id: i64) -> Result<i32> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT purchased_count
            FROM activity_user_count
            WHERE activity_id = $1 AND user_id = $2
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }

    /// 在事务中预留库存
    ///
    /// 原子地完成：剩余库存扣减 + 用户计数递增 + 写入 HELD 预留行。
    /// 任一守卫未命中（库存会变负 / 用户将超限）即返回业务拒绝，
    /// 调用方回滚事务后前两步自动撤销。
    #[instrument(skip(tx, activity), fields(activity_id = activity.id))]
    pub async fn reserve_in_tx(
        tx: &mut PgConnection,
        activity: &SeckillActivity,
        user_id: i64,
        quantity: i32,
    ) -> Result<ReservationToken> {
        // 1. 条件扣减剩余库存：remaining 不足时 0 行命中
        let deducted = sqlx::query(
            r#"
            UPDATE activity_stock
            SET remaining = remaining - $2
            WHERE activity_id = $1 AND remaining >= $2
            "#,
        )
        .bind(activity.id)
        .bind(quantity as i64)
        .execute(&mut *tx)
        .await
        .map_err(classify_db_error)?;

        if deducted.rows_affected() == 0 {
            return Err(SeckillError::OutOfStock {
                activity_id: activity.id,
            });
        }

        // 2. 带守卫的用户计数 UPSERT：结果会超过限购时不返回行
        let counted: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO activity_user_count (activity_id, user_id, purchased_count)
            VALUES ($1, $2, $3)
            ON CONFLICT (activity_id, user_id) DO UPDATE
                SET purchased_count = activity_user_count.purchased_count + $3
                WHERE activity_user_count.purchased_count + $3 <= $4
            RETURNING purchased_count
            "#,
        )
        .bind(activity.id)
        .bind(user_id)
        .bind(quantity)
        .bind(activity.limit_per_user)
        .fetch_optional(&mut *tx)
        .await?;

        // INSERT 分支也要过限购关：首购数量本身可能就超限
        let within_limit = match counted {
            Some(count) => count <= activity.limit_per_user,
            None => false,
        };
        if !within_limit {
            return Err(SeckillError::LimitExceeded {
                activity_id: activity.id,
                user_id,
                limit: activity.limit_per_user,
            });
        }

        // 3. 写入预留行，令牌即行主键
        let token_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO stock_reservation (id, activity_id, user_id, quantity, state, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token_id)
        .bind(activity.id)
        .bind(user_id)
        .bind(quantity)
        .bind(ReservationState::Held)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        debug!(activity_id = activity.id, user_id, quantity, %token_id, "库存已预留");

        Ok(ReservationToken {
            id: token_id,
            activity_id: activity.id,
            user_id,
            quantity,
        })
    }

    /// 在事务中释放预留（取消 / 超时 / 支付失败）
    ///
    /// 按令牌幂等：只有 HELD -> RELEASED 的守卫翻转成功时才归还
    /// 库存和用户计数；令牌已处于 RELEASED / FINALIZED 则整个调用
    /// 是无操作并返回 false，以容忍清扫器与引擎的竞争重试。
    #[instrument(skip(tx))]
    pub async fn release_in_tx(tx: &mut PgConnection, token_id: Uuid) -> Result<bool> {
        let flipped = sqlx::query_as::<_, StockReservation>(
            r#"
            UPDATE stock_reservation
            SET state = $2
            WHERE id = $1 AND state = $3
            RETURNING id, activity_id, user_id, quantity, state, created_at
            "#,
        )
        .bind(token_id)
        .bind(ReservationState::Released)
        .bind(ReservationState::Held)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match flipped {
            Some(row) => row,
            None => {
                debug!(%token_id, "预留已处于终态，释放为无操作");
                return Ok(false);
            }
        };

        sqlx::query(
            r#"
            UPDATE activity_stock
            SET remaining = remaining + $2
            WHERE activity_id = $1
            "#,
        )
        .bind(row.activity_id)
        .bind(row.quantity as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE activity_user_count
            SET purchased_count = purchased_count - $3
            WHERE activity_id = $1 AND user_id = $2
            "#,
        )
        .bind(row.activity_id)
        .bind(row.user_id)
        .bind(row.quantity)
        .execute(&mut *tx)
        .await?;

        debug!(%token_id, activity_id = row.activity_id, "预留已释放，库存归还");
        Ok(true)
    }

    /// 在事务中落定预留（支付成功）
    ///
    /// 只翻转状态 HELD -> FINALIZED，不动库存计数——购买已成立。
    /// 与 release 相同的按令牌幂等语义。
    #[instrument(skip(tx))]
    pub async fn finalize_in_tx(tx: &mut PgConnection, token_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE stock_reservation
            SET state = $2
            WHERE id = $1 AND state = $3
            "#,
        )
        .bind(token_id)
        .bind(ReservationState::Finalized)
        .bind(ReservationState::Held)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 初始化活动库存行（活动创建时调用一次）
    pub async fn init_stock(&self, activity_id: i64, total: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_stock (activity_id, total, remaining)
            VALUES ($1, $2, $2)
            ON CONFLICT (activity_id) DO NOTHING
            "#,
        )
        .bind(activity_id)
        .bind(total)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
