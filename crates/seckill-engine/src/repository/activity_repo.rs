//! 活动仓储
//!
//! 活动本身由运营侧创建维护，引擎主要做读取；
//! create 用于集成测试和初始化脚本

use sqlx::{PgPool, Row};

use flashsale_shared::error::Result;

use crate::models::{ActivityStatus, SeckillActivity};

/// 秒杀活动仓储
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取单个活动
    pub async fn get_activity(&self, id: i64) -> Result<Option<SeckillActivity>> {
        let activity = sqlx::query_as::<_, SeckillActivity>(
            r#"
            SELECT id, product_id, start_at, end_at, limit_per_user,
                   total_stock, seckill_price, status, created_at
            FROM seckill_activity
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(activity)
    }

    /// 创建活动，返回新活动 ID
    pub async fn create_activity(&self, activity: &SeckillActivity) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO seckill_activity (product_id, start_at, end_at, limit_per_user,
                                          total_stock, seckill_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(activity.product_id)
        .bind(activity.start_at)
        .bind(activity.end_at)
        .bind(activity.limit_per_user)
        .bind(activity.total_stock)
        .bind(activity.seckill_price)
        .bind(activity.status)
        .bind(activity.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// 更新活动状态（运营侧操作）
    pub async fn update_status(&self, id: i64, status: ActivityStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE seckill_activity
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
