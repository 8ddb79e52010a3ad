//! 秒杀订单引擎
//!
//! 限量促销（秒杀）场景下的订单核心：在成千上万的并发购买请求下
//! 保证不超卖、不超限购、不重复下单。
//!
//! ## 核心功能
//!
//! - **库存台账**：活动库存的原子预留 / 释放 / 落定，永不为负
//! - **幂等注册**：同一幂等键的重试拿到同一条订单，不重复扣库存
//! - **订单状态机**：NEW -> {PAID, CANCELLED, TIMEOUT}，终态不转出
//! - **购买编排**：校验活动窗口、预留库存、创建订单的原子工作单元
//! - **支付回调**：至少一次投递的回调去重，成功落定 / 失败释放预留
//! - **超时清扫**：未支付订单到期自动转 TIMEOUT 并归还库存
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `ledger`: 库存台账（PostgreSQL 与内存两种实现）
//! - `state_machine`: 订单状态机
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层（引擎 + 查询）
//! - `sweeper`: 超时订单清扫器

pub mod ledger;
pub mod models;
pub mod repository;
pub mod service;
pub mod state_machine;
pub mod sweeper;

pub use ledger::{MemoryStockLedger, StockLedger};
pub use models::*;
pub use repository::{
    ActivityRepository, OrderRepository, OrderRepositoryTrait, PaymentRepository, UserRepository,
};
pub use service::{
    OrderQueryService, PaymentCallback, PaymentConfirmation, PaymentOutcome, PurchaseRequest,
    SeckillEngine,
};
pub use state_machine::{TransitionCheck, check_transition};
pub use sweeper::ExpirySweeper;
