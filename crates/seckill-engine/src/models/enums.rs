//! 秒杀系统枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 订单状态
///
/// NEW 是唯一初始状态；PAID / CANCELLED / TIMEOUT 均为终态，
/// 终态之间以及终态回到 NEW 的转换都不允许发生
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 新建 - 库存已预留，等待支付
    #[default]
    New,
    /// 已支付 - 支付成功，预留转为最终扣减
    Paid,
    /// 已取消 - 用户/管理员取消或支付失败，库存已释放
    Cancelled,
    /// 已超时 - 超过支付时限被清扫器关闭，库存已释放
    Timeout,
}

impl OrderStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled | Self::Timeout)
    }
}

/// 活动状态（运营侧）
///
/// ACTIVE 仅在 [start_at, end_at) 时间窗口内有效；
/// 库存清零不改变状态，只使后续预留失败
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    /// 未开始
    #[default]
    Pending,
    /// 进行中
    Active,
    /// 已结束
    Ended,
}

/// 商品状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// 可售
    #[default]
    On,
    /// 下架
    Off,
}

/// 支付状态
///
/// 网关回调视为同步给出最终结果，因此没有 PENDING 中间态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayStatus {
    /// 支付成功
    Success,
    /// 支付失败
    Failed,
}

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// 普通用户
    #[default]
    User,
    /// 管理员
    Admin,
}

/// 库存预留状态
///
/// HELD 是唯一初始状态；RELEASED / FINALIZED 均为终态。
/// release/finalize 对已处于终态的预留是无操作，以容忍
/// 清扫器与支付回调之间的竞争重试
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    /// 持有中 - 库存已扣减，订单未到终态
    #[default]
    Held,
    /// 已释放 - 库存已归还（取消/超时/支付失败）
    Released,
    /// 已落定 - 购买成立，库存不归还
    Finalized,
}
