//! 数据库仓储层
//!
//! 每个实体一个仓储：池上的方法用于独立读写，`*_in_tx` 静态方法
//! 用于被编排进同一个事务（见引擎的工作单元边界）。

mod activity_repo;
mod order_repo;
mod payment_repo;
mod traits;
mod user_repo;

pub use activity_repo::ActivityRepository;
pub use order_repo::OrderRepository;
pub use payment_repo::PaymentRepository;
pub use traits::OrderRepositoryTrait;
pub use user_repo::UserRepository;

#[cfg(test)]
pub use traits::MockOrderRepositoryTrait;
