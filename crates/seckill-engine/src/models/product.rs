//! 商品实体定义
//!
//! 商品目录由外部系统管理，引擎只读取

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::ProductStatus;

/// 商品
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    /// 商品标题
    pub title: String,
    /// 商品原价
    pub price: Decimal,
    /// 商品状态
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// 是否可售
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_purchasable() {
        let mut product = Product {
            id: 1,
            title: "限量款".to_string(),
            price: Decimal::new(19900, 2),
            status: ProductStatus::On,
            created_at: Utc::now(),
        };
        assert!(product.is_purchasable());

        product.status = ProductStatus::Off;
        assert!(!product.is_purchasable());
    }
}
