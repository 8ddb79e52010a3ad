//! 用户实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::UserRole;

/// 用户
///
/// 创建后除角色外不可变；引擎只读取角色做取消订单的授权判断
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// 邮箱（唯一）
    pub email: String,
    /// 密码哈希
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 用户角色
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 是否为管理员
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
