//! 超时订单清扫器
//!
//! 轮询超过预留时限仍处于 NEW 状态的订单，释放其库存预留并
//! 转换为 TIMEOUT。候选查询不持锁，每个订单在自己的事务内
//! 用 `FOR UPDATE SKIP LOCKED` 重新锁定并复核状态：单条订单
//! 失败只回滚它自己，不影响同批其他订单，下一轮会重新领取。
//!
//! 与支付回调在同一订单上竞争时先提交者赢：回调已把订单改为
//! PAID（或正持有行锁）的话，复核查询不返回行，清扫直接跳过。

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use flashsale_shared::error::Result;

use crate::ledger::StockLedger;
use crate::models::OrderStatus;
use crate::state_machine;

/// 超时订单清扫器
///
/// 以固定间隔轮询数据库，分批领取并处理超时订单。
/// 设计为可在多实例环境中安全运行。
pub struct ExpirySweeper {
    pool: PgPool,
    poll_interval: Duration,
    /// 预留时限：NEW 订单超过此时长未支付即视为超时
    reservation_timeout: Duration,
    /// 单次清扫的最大订单数
    batch_size: i64,
}

/// 待清扫的超时订单行
#[derive(sqlx::FromRow)]
struct ExpiredOrder {
    id: i64,
    order_no: String,
    reservation_id: Uuid,
}

impl ExpirySweeper {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            poll_interval: Duration::from_secs(10),
            reservation_timeout: Duration::from_secs(900),
            batch_size: 100,
        }
    }

    /// 创建带自定义配置的清扫器（主要用于测试）
    pub fn with_config(
        pool: PgPool,
        poll_secs: u64,
        timeout_secs: u64,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            poll_interval: Duration::from_secs(poll_secs),
            reservation_timeout: Duration::from_secs(timeout_secs),
            batch_size,
        }
    }

    /// 主循环：持续轮询超时订单直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            reservation_timeout = ?self.reservation_timeout,
            batch_size = self.batch_size,
            "ExpirySweeper 已启动"
        );
        loop {
            match self.sweep_once().await {
                Ok(swept) if swept > 0 => {
                    info!(swept, "超时订单清扫完成");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "超时订单清扫出错");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 执行一轮清扫，返回本轮成功处理的订单数
    ///
    /// 候选查询只读不持锁；每个订单单独一个事务。单条订单失败
    /// 只回滚并记日志跳过，不影响同批其他订单，下一轮会重新
    /// 领取到它。
    pub async fn sweep_once(&self) -> Result<usize> {
        let deadline = Utc::now()
            - chrono::Duration::from_std(self.reservation_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(900));

        let expired: Vec<ExpiredOrder> = sqlx::query_as(
            r#"
            SELECT id, order_no, reservation_id
            FROM seckill_order
            WHERE status = 'NEW' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(deadline)
        .bind(self.batch_size)
        .fetch_all(&self.pool)
        .await?;

        let mut swept = 0;
        for order in &expired {
            match self.expire_one(order).await {
                Ok(true) => swept += 1,
                // 订单已被回调或其他清扫实例处理，无事可做
                Ok(false) => {}
                Err(e) => {
                    warn!(order_no = %order.order_no, error = %e, "订单超时处理失败，跳过");
                }
            }
        }

        Ok(swept)
    }

    /// 在独立事务内将单个订单转换为 TIMEOUT 并释放其预留
    ///
    /// 候选查询到本事务开始之间订单可能已被支付回调处理，
    /// 因此先用 SKIP LOCKED 重新锁定并复核 NEW 状态，
    /// 未拿到行即返回 false 跳过
    async fn expire_one(&self, order: &ExpiredOrder) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM seckill_order
            WHERE id = $1 AND status = 'NEW'
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(order.id)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        StockLedger::release_in_tx(&mut tx, order.reservation_id).await?;
        state_machine::apply_in_tx(&mut tx, order.id, OrderStatus::New, OrderStatus::Timeout)
            .await?;

        tx.commit().await?;

        info!(order_no = %order.order_no, "订单超时，库存已释放");
        Ok(true)
    }
}
