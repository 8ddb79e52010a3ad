//! 服务层请求/响应类型

use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// 购买请求
///
/// 幂等键由调用方（Web 层）生成并在重试时原样携带
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub user_id: i64,
    pub activity_id: i64,
    pub idem_key: String,
}

impl PurchaseRequest {
    pub fn new(user_id: i64, activity_id: i64, idem_key: impl Into<String>) -> Self {
        Self {
            user_id,
            activity_id,
            idem_key: idem_key.into(),
        }
    }
}

/// 支付网关回调的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Success,
    Failed,
}

/// 支付网关回调
///
/// 网关按至少一次语义投递：重复与乱序都可能发生。
/// 订单定位优先用 provider_txn_id，其次 order_no，最后 order_id
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    /// 第三方交易流水号
    pub provider_txn_id: String,
    /// 回调结果
    pub outcome: PaymentOutcome,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub order_no: Option<String>,
}

impl PaymentCallback {
    pub fn success(provider_txn_id: impl Into<String>, order_id: i64) -> Self {
        Self {
            provider_txn_id: provider_txn_id.into(),
            outcome: PaymentOutcome::Success,
            order_id: Some(order_id),
            order_no: None,
        }
    }

    pub fn failed(provider_txn_id: impl Into<String>, order_id: i64) -> Self {
        Self {
            provider_txn_id: provider_txn_id.into(),
            outcome: PaymentOutcome::Failed,
            order_id: Some(order_id),
            order_no: None,
        }
    }
}

/// 支付确认结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: i64,
    pub order_no: String,
    /// 确认后的订单状态
    pub status: OrderStatus,
    /// 是否为重放回调（已记录过，按成功的无操作处理）
    pub duplicate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_request_new() {
        let request = PurchaseRequest::new(42, 7, "idem-001");
        assert_eq!(request.user_id, 42);
        assert_eq!(request.activity_id, 7);
        assert_eq!(request.idem_key, "idem-001");
    }

    #[test]
    fn test_payment_callback_deserialization() {
        let json = r#"{"providerTxnId":"txn-1","outcome":"SUCCESS","orderNo":"SK123"}"#;
        let callback: PaymentCallback = serde_json::from_str(json).unwrap();

        assert_eq!(callback.provider_txn_id, "txn-1");
        assert_eq!(callback.outcome, PaymentOutcome::Success);
        assert_eq!(callback.order_no.as_deref(), Some("SK123"));
        assert!(callback.order_id.is_none());
    }

    #[test]
    fn test_payment_callback_builders() {
        let cb = PaymentCallback::failed("txn-2", 100);
        assert_eq!(cb.outcome, PaymentOutcome::Failed);
        assert_eq!(cb.order_id, Some(100));
    }
}
