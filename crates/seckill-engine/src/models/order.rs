//! 订单实体定义
//!
//! 一条订单对应一次成功的库存预留。订单号对外可见但不透明，
//! 幂等键由调用方提供并以唯一约束兜底。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::OrderStatus;

/// 订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// 订单号（唯一，对外展示）
    pub order_no: String,
    pub user_id: i64,
    pub product_id: i64,
    pub activity_id: i64,
    /// 订单状态（仅状态机可写）
    pub status: OrderStatus,
    /// 订单金额
    pub amount: Decimal,
    /// 幂等键（唯一约束是幂等语义的事实来源）
    pub idem_key: String,
    /// 库存预留令牌
    pub reservation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 生成订单号
///
/// 格式: SK{yyyyMMddHHmmss}{6位随机数}
/// 使用 UUID v4 的一部分作为随机数源
pub fn generate_order_no() -> String {
    let now = Utc::now();
    let uuid = Uuid::new_v4();
    let random = uuid.as_u128() % 1_000_000;
    format!("SK{}{:06}", now.format("%Y%m%d%H%M%S"), random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_order_no_format() {
        let order_no = generate_order_no();

        assert!(order_no.starts_with("SK"));
        // "SK" + 14 位时间戳 + 6 位随机数 = 22
        assert_eq!(order_no.len(), 22);
        assert!(order_no[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_serialization() {
        let now = Utc::now();
        let order = Order {
            id: 1,
            order_no: "SK20250101120000123456".to_string(),
            user_id: 42,
            product_id: 10,
            activity_id: 7,
            status: OrderStatus::New,
            amount: Decimal::new(990, 2),
            idem_key: "idem-001".to_string(),
            reservation_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["orderNo"], "SK20250101120000123456");
        assert_eq!(json["status"], "NEW");
        assert_eq!(json["idemKey"], "idem-001");
    }
}
