//! 业务服务层
//!
//! `SeckillEngine` 承载全部写路径（购买/支付/取消），
//! `OrderQueryService` 承载只读查询面

mod dto;
mod engine;
mod query_service;

pub use dto::{PaymentCallback, PaymentConfirmation, PaymentOutcome, PurchaseRequest};
pub use engine::SeckillEngine;
pub use query_service::OrderQueryService;
