//! 用户仓储
//!
//! 引擎只需要角色信息做取消订单的授权判断；
//! 注册、改密等归外部系统

use sqlx::{PgPool, Row};

use flashsale_shared::error::Result;

use crate::models::User;

/// 用户仓储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取单个用户
    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM seckill_user
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// 创建用户，返回新用户 ID（集成测试用）
    pub async fn create_user(&self, user: &User) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO seckill_user (email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }
}
