//! 订单仓储
//!
//! 提供订单的读写访问。状态列的 UPDATE 不在这里——那是状态机的
//! 专属职责（见 `state_machine::apply_in_tx`）。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use flashsale_shared::error::Result;

use super::traits::OrderRepositoryTrait;
use crate::models::Order;

const ORDER_COLUMNS: &str = "id, order_no, user_id, product_id, activity_id, status, \
                             amount, idem_key, reservation_id, created_at, updated_at";

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中插入订单
    ///
    /// `ON CONFLICT (idem_key) DO NOTHING`：幂等键撞车时不插入、
    /// 不报错，返回 None 由调用方回滚事务并取回已存在的订单。
    /// 唯一约束是幂等语义的事实来源，进程内的快路径检查只是优化。
    pub async fn insert_in_tx(tx: &mut PgConnection, order: &Order) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            INSERT INTO seckill_order (order_no, user_id, product_id, activity_id, status,
                                       amount, idem_key, reservation_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (idem_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&order.order_no)
        .bind(order.user_id)
        .bind(order.product_id)
        .bind(order.activity_id)
        .bind(order.status)
        .bind(order.amount)
        .bind(&order.idem_key)
        .bind(order.reservation_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_optional(tx)
        .await?;

        Ok(row.map(|r| r.get("id")))
    }

    /// 在事务中按主键锁定订单行（FOR UPDATE）
    ///
    /// 支付回调、取消和清扫器在改状态前都先锁行，
    /// 使同一订单上的并发转换串行化
    pub async fn get_for_update_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM seckill_order
            WHERE id = $1
            FOR UPDATE
            "#
        ))
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(order)
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM seckill_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM seckill_order WHERE order_no = $1"
        ))
        .bind(order_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order_by_idem_key(&self, idem_key: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM seckill_order WHERE idem_key = $1"
        ))
        .bind(idem_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_orders_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM seckill_order
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}
