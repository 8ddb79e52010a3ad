//! 订单查询服务
//!
//! 只读查询面，依赖仓储抽象，不参与任何事务编排

use std::sync::Arc;

use tracing::instrument;

use flashsale_shared::error::{Result, SeckillError};

use crate::models::Order;
use crate::repository::OrderRepositoryTrait;

/// 单用户单次查询的最大返回条数
const MAX_PAGE_SIZE: i64 = 100;

/// 订单查询服务
pub struct OrderQueryService {
    order_repo: Arc<dyn OrderRepositoryTrait>,
}

impl OrderQueryService {
    pub fn new(order_repo: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { order_repo }
    }

    /// 按订单 ID 查询
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        self.order_repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })
    }

    /// 按订单号查询
    #[instrument(skip(self))]
    pub async fn get_order_by_no(&self, order_no: &str) -> Result<Order> {
        self.order_repo
            .get_order_by_no(order_no)
            .await?
            .ok_or_else(|| SeckillError::NotFound {
                entity: "Order".to_string(),
                id: order_no.to_string(),
            })
    }

    /// 按幂等键查询（供客户端重试前核对是否已下单成功）
    #[instrument(skip(self))]
    pub async fn get_order_by_idem_key(&self, idem_key: &str) -> Result<Option<Order>> {
        self.order_repo.get_order_by_idem_key(idem_key).await
    }

    /// 查询用户最近的订单
    #[instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: i64, limit: i64) -> Result<Vec<Order>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        self.order_repo.list_orders_by_user(user_id, limit).await
    }
}
