//! 秒杀订单引擎
//!
//! 编排库存台账、幂等注册和订单状态机，实现三个对外操作：
//! 发起购买、确认支付、取消订单。
//!
//! ## 工作单元边界
//!
//! - 发起购买：库存预留 + 订单插入在同一事务内；幂等键冲突导致
//!   整个事务回滚，预留自动撤销，重试同一个键可以干净地成功。
//! - 确认支付：锁订单行 + 写支付记录 + 预留落定/释放 + 状态转换
//!   在同一事务内。
//! - 预留绝不跨网关调用持有：订单先以 NEW 落库返回，支付确认是
//!   之后独立的工作单元，初始预留不会被网关延迟劫持。
//!
//! 瞬时存储故障（序列化失败、死锁、连接池超时）在工作单元边界
//! 有界重试；业务拒绝原样上抛，绝不吞掉。

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use flashsale_shared::error::{Result, SeckillError};
use flashsale_shared::retry::{RetryPolicy, retry_with_policy};

use crate::ledger::StockLedger;
use crate::models::{Order, OrderStatus, PayStatus, SeckillActivity, generate_order_no};
use crate::repository::{
    ActivityRepository, OrderRepository, OrderRepositoryTrait, PaymentRepository, UserRepository,
};
use crate::service::dto::{PaymentCallback, PaymentConfirmation, PaymentOutcome, PurchaseRequest};
use crate::state_machine::{self, TransitionCheck};

/// 每次购买请求固定预留一件
const PURCHASE_QUANTITY: i32 = 1;

/// 秒杀订单引擎
pub struct SeckillEngine {
    pool: PgPool,
    activity_repo: Arc<ActivityRepository>,
    order_repo: Arc<OrderRepository>,
    payment_repo: Arc<PaymentRepository>,
    user_repo: Arc<UserRepository>,
    retry_policy: RetryPolicy,
}

impl SeckillEngine {
    pub fn new(
        pool: PgPool,
        activity_repo: Arc<ActivityRepository>,
        order_repo: Arc<OrderRepository>,
        payment_repo: Arc<PaymentRepository>,
        user_repo: Arc<UserRepository>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            activity_repo,
            order_repo,
            payment_repo,
            user_repo,
            retry_policy,
        }
    }

    // ==================== 发起购买 ====================

    /// 发起一次购买尝试
    ///
    /// 同一个幂等键只会创建一个订单：并发与后续的重复调用都拿到
    /// 同一条订单且不重复扣库存。失败原因（活动未开始/库存不足/
    /// 超出限购）以类型化错误原样上抛。
    #[instrument(skip(self, request), fields(user_id = request.user_id, activity_id = request.activity_id))]
    pub async fn attempt_purchase(&self, request: PurchaseRequest) -> Result<Order> {
        if request.idem_key.trim().is_empty() {
            return Err(SeckillError::Validation("幂等键不能为空".to_string()));
        }

        // 1. 活动必须存在且处于可购买窗口
        let activity = self
            .activity_repo
            .get_activity(request.activity_id)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "SeckillActivity".to_string(),
                id: request.activity_id.to_string(),
            })?;

        let now = Utc::now();
        if !activity.is_active(now) {
            return Err(SeckillError::ActivityNotActive {
                activity_id: activity.id,
                reason: activity.inactive_reason(now),
            });
        }

        // 2. 幂等快路径：键已见过则直接返回已有订单（不再扣库存）
        if let Some(existing) = self.order_repo.get_order_by_idem_key(&request.idem_key).await? {
            verify_idem_owner(&existing, &request)?;
            info!(idem_key = %request.idem_key, order_no = %existing.order_no, "幂等请求，返回已存在的订单");
            return Ok(existing);
        }

        // 3. 预留 + 建单的工作单元，瞬时故障有界重试
        let order = retry_with_policy(&self.retry_policy, "attempt_purchase", || {
            self.create_order_uow(&activity, &request)
        })
        .await?;

        info!(
            order_no = %order.order_no,
            activity_id = activity.id,
            user_id = request.user_id,
            "秒杀订单已创建"
        );

        Ok(order)
    }

    /// 预留库存并创建订单的单个事务
    ///
    /// 幂等键的唯一约束在插入处兜底：冲突时整个事务回滚
    /// （预留一并撤销），然后取回先到者创建的订单。
    async fn create_order_uow(
        &self,
        activity: &SeckillActivity,
        request: &PurchaseRequest,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let token =
            StockLedger::reserve_in_tx(&mut tx, activity, request.user_id, PURCHASE_QUANTITY)
                .await?;

        let now = Utc::now();
        let mut order = Order {
            id: 0,
            order_no: generate_order_no(),
            user_id: request.user_id,
            product_id: activity.product_id,
            activity_id: activity.id,
            status: OrderStatus::New,
            amount: activity.seckill_price,
            idem_key: request.idem_key.clone(),
            reservation_id: token.id,
            created_at: now,
            updated_at: now,
        };

        match OrderRepository::insert_in_tx(&mut tx, &order).await? {
            Some(id) => {
                tx.commit().await?;
                order.id = id;
                Ok(order)
            }
            None => {
                // 幂等键被并发请求先占用：回滚撤销本次预留，取回已有订单
                tx.rollback().await?;
                match self.order_repo.get_order_by_idem_key(&request.idem_key).await? {
                    Some(existing) => {
                        verify_idem_owner(&existing, request)?;
                        Ok(existing)
                    }
                    // 先到者的事务尚未提交完成，按并发冲突交给重试
                    None => Err(SeckillError::ConcurrencyConflict),
                }
            }
        }
    }

    // ==================== 确认支付 ====================

    /// 处理支付网关回调
    ///
    /// 重放检测统一以 `PaymentAlreadyRecorded` 在内部流转，
    /// 在本边界转换为 duplicate 标记的成功结果——重放是网关
    /// 至少一次投递的正常现象，不向调用方报错。与清扫器在
    /// 同一订单上竞争时先提交者赢，输家收到 INVALID_TRANSITION。
    #[instrument(skip(self, callback), fields(provider_txn_id = %callback.provider_txn_id))]
    pub async fn confirm_payment(&self, callback: PaymentCallback) -> Result<PaymentConfirmation> {
        // 同一笔网关流水已记录过
        if let Some(payment) = self
            .payment_repo
            .get_by_provider_txn_id(&callback.provider_txn_id)
            .await?
        {
            info!(order_id = payment.order_id, "支付结果已记录，忽略重放回调");
            return self.duplicate_confirmation(payment.order_id).await;
        }

        let order_id = self.resolve_order_id(&callback).await?;

        let outcome = retry_with_policy(&self.retry_policy, "confirm_payment", || {
            self.confirm_payment_uow(order_id, &callback)
        })
        .await;

        match outcome {
            Err(SeckillError::PaymentAlreadyRecorded { order_id }) => {
                self.duplicate_confirmation(order_id).await
            }
            other => other,
        }
    }

    /// 以重放（按成功的无操作）形式返回订单的当前状态
    async fn duplicate_confirmation(&self, order_id: i64) -> Result<PaymentConfirmation> {
        let order = self.require_order(order_id).await?;
        Ok(PaymentConfirmation {
            order_id: order.id,
            order_no: order.order_no,
            status: order.status,
            duplicate: true,
        })
    }

    /// 支付确认的单个事务
    async fn confirm_payment_uow(
        &self,
        order_id: i64,
        callback: &PaymentCallback,
    ) -> Result<PaymentConfirmation> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_for_update_in_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })?;

        let (target, pay_status) = match callback.outcome {
            PaymentOutcome::Success => (OrderStatus::Paid, PayStatus::Success),
            PaymentOutcome::Failed => (OrderStatus::Cancelled, PayStatus::Failed),
        };

        // 已处于目标状态：幂等接受，不再写第二条支付记录
        if let TransitionCheck::AlreadyInTarget =
            state_machine::check_transition(order.id, order.status, target)?
        {
            tx.rollback().await?;
            info!(order_no = %order.order_no, status = ?order.status, "订单已处于目标状态，回调为无操作");
            return Err(SeckillError::PaymentAlreadyRecorded { order_id: order.id });
        }

        // 记录支付结果；provider_txn_id 撞唯一约束说明重放刚好赶在
        // 本事务之前落库，同样按无操作处理
        let inserted = PaymentRepository::insert_in_tx(
            &mut tx,
            order.id,
            pay_status,
            Some(&callback.provider_txn_id),
        )
        .await?;
        if inserted.is_none() {
            tx.rollback().await?;
            warn!(order_no = %order.order_no, "并发重放回调，支付结果已由他方记录");
            return Err(SeckillError::PaymentAlreadyRecorded { order_id: order.id });
        }

        // 支付成功则落定预留（库存不归还），失败则释放
        match callback.outcome {
            PaymentOutcome::Success => {
                StockLedger::finalize_in_tx(&mut tx, order.reservation_id).await?;
            }
            PaymentOutcome::Failed => {
                StockLedger::release_in_tx(&mut tx, order.reservation_id).await?;
            }
        }

        state_machine::apply_in_tx(&mut tx, order.id, order.status, target).await?;

        tx.commit().await?;

        info!(order_no = %order.order_no, ?target, "支付回调处理完成");

        Ok(PaymentConfirmation {
            order_id: order.id,
            order_no: order.order_no,
            status: target,
            duplicate: false,
        })
    }

    // ==================== 取消订单 ====================

    /// 取消订单（本人或管理员）
    ///
    /// 仅 NEW 状态可取消；取消即释放预留，不产生支付记录。
    /// 对已取消订单的重复取消是幂等接受。
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: i64, by_user_id: i64) -> Result<Order> {
        let order = self.require_order(order_id).await?;

        // 授权：订单归属人或管理员
        if order.user_id != by_user_id {
            let caller = self
                .user_repo
                .get_user(by_user_id)
                .await?
                .ok_or_else(|| SeckillError::NotFound {
                    entity: "User".to_string(),
                    id: by_user_id.to_string(),
                })?;
            if !caller.is_admin() {
                return Err(SeckillError::Forbidden {
                    operation: format!("取消订单 {}", order.order_no),
                });
            }
        }

        retry_with_policy(&self.retry_policy, "cancel_order", || {
            self.cancel_order_uow(order_id)
        })
        .await
    }

    /// 取消订单的单个事务
    async fn cancel_order_uow(&self, order_id: i64) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = OrderRepository::get_for_update_in_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })?;

        match state_machine::check_transition(order.id, order.status, OrderStatus::Cancelled)? {
            TransitionCheck::AlreadyInTarget => {
                tx.rollback().await?;
                return Ok(order);
            }
            TransitionCheck::Applied => {}
        }

        StockLedger::release_in_tx(&mut tx, order.reservation_id).await?;
        state_machine::apply_in_tx(&mut tx, order.id, order.status, OrderStatus::Cancelled).await?;

        tx.commit().await?;

        info!(order_no = %order.order_no, "订单已取消，库存已释放");

        order.status = OrderStatus::Cancelled;
        Ok(order)
    }

    // ==================== 私有方法 ====================

    /// 按回调内容定位订单：provider_txn_id 未命中时
    /// 依次尝试订单号、订单 ID
    async fn resolve_order_id(&self, callback: &PaymentCallback) -> Result<i64> {
        if let Some(order_no) = &callback.order_no {
            if let Some(order) = self.order_repo.get_order_by_no(order_no).await? {
                return Ok(order.id);
            }
        }
        if let Some(order_id) = callback.order_id {
            if self.order_repo.get_order(order_id).await?.is_some() {
                return Ok(order_id);
            }
        }

        Err(SeckillError::NotFound {
            entity: "Order".to_string(),
            id: callback
                .order_no
                .clone()
                .or_else(|| callback.order_id.map(|id| id.to_string()))
                .unwrap_or_else(|| callback.provider_txn_id.clone()),
        })
    }

    async fn require_order(&self, order_id: i64) -> Result<Order> {
        self.order_repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })
    }
}

/// 校验幂等键归属
///
/// 同一个键被不同用户或不同活动复用是误用而不是重试，
/// 必须与正常的幂等命中区分开
fn verify_idem_owner(existing: &Order, request: &PurchaseRequest) -> Result<()> {
    if existing.user_id != request.user_id || existing.activity_id != request.activity_id {
        return Err(SeckillError::IdempotencyKeyConflict {
            idem_key: request.idem_key.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn order(user_id: i64, activity_id: i64, idem_key: &str) -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            order_no: generate_order_no(),
            user_id,
            product_id: 10,
            activity_id,
            status: OrderStatus::New,
            amount: Decimal::new(990, 2),
            idem_key: idem_key.to_string(),
            reservation_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_verify_idem_owner_accepts_same_caller() {
        let existing = order(42, 7, "idem-001");
        let request = PurchaseRequest::new(42, 7, "idem-001");
        assert!(verify_idem_owner(&existing, &request).is_ok());
    }

    #[test]
    fn test_verify_idem_owner_rejects_different_user() {
        let existing = order(42, 7, "idem-001");
        let request = PurchaseRequest::new(43, 7, "idem-001");
        let err = verify_idem_owner(&existing, &request).unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_KEY_CONFLICT");
    }

    #[test]
    fn test_verify_idem_owner_rejects_different_activity() {
        let existing = order(42, 7, "idem-001");
        let request = PurchaseRequest::new(42, 8, "idem-001");
        let err = verify_idem_owner(&existing, &request).unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_KEY_CONFLICT");
    }
}
