//! 仓储 Trait 定义
//!
//! 定义只读查询面的仓储接口，便于查询服务依赖抽象而非具体实现，
//! 支持 mock 测试

use async_trait::async_trait;

use flashsale_shared::error::Result;

use crate::models::Order;

/// 订单只读仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;
    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>>;
    async fn get_order_by_idem_key(&self, idem_key: &str) -> Result<Option<Order>>;
    async fn list_orders_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<Order>>;
}
