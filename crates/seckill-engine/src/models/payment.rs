//! 支付实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::PayStatus;

/// 支付记录
///
/// 每个允许触发状态转换的网关回调至多产生一条记录；
/// provider_txn_id 上的唯一约束用于识别网关重放
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// 支付状态
    pub pay_status: PayStatus,
    /// 第三方交易流水号（存在时唯一）
    #[sqlx(default)]
    pub provider_txn_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_serialization() {
        let now = Utc::now();
        let payment = Payment {
            id: 1,
            order_id: 100,
            pay_status: PayStatus::Success,
            provider_txn_id: Some("txn-abc".to_string()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["orderId"], 100);
        assert_eq!(json["payStatus"], "SUCCESS");
        assert_eq!(json["providerTxnId"], "txn-abc");
    }
}
