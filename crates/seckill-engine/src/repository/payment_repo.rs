//! 支付仓储
//!
//! provider_txn_id 上的唯一约束是回调去重的事实来源：
//! 网关按至少一次语义投递，重放在插入时即被识别

use sqlx::{PgConnection, PgPool, Row};

use flashsale_shared::error::Result;

use crate::models::{PayStatus, Payment};

const PAYMENT_COLUMNS: &str = "id, order_id, pay_status, provider_txn_id, created_at, updated_at";

/// 支付仓储
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按第三方交易号查询支付记录
    pub async fn get_by_provider_txn_id(&self, provider_txn_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE provider_txn_id = $1"
        ))
        .bind(provider_txn_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// 按订单查询支付记录
    pub async fn get_by_order_id(&self, order_id: i64) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// 在事务中插入支付记录
    ///
    /// `ON CONFLICT (provider_txn_id) DO NOTHING`：同一笔网关流水
    /// 重复投递时不产生第二行，返回 None 表示此前已记录
    pub async fn insert_in_tx(
        tx: &mut PgConnection,
        order_id: i64,
        pay_status: PayStatus,
        provider_txn_id: Option<&str>,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            INSERT INTO payment (order_id, pay_status, provider_txn_id, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (provider_txn_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(order_id)
        .bind(pay_status)
        .bind(provider_txn_id)
        .fetch_optional(tx)
        .await?;

        Ok(row.map(|r| r.get("id")))
    }
}
