//! 领域模型定义
//!
//! 实体为不可变值类型（按值/引用传递），持久化通过仓储层显式进行。
//! 状态字段全部为带穷尽匹配的和类型，非法转换在编译期即被收窄。

mod activity;
mod enums;
mod order;
mod payment;
mod product;
mod reservation;
mod user;

pub use activity::{ActivityStock, SeckillActivity};
pub use enums::{
    ActivityStatus, OrderStatus, PayStatus, ProductStatus, ReservationState, UserRole,
};
pub use order::{Order, generate_order_no};
pub use payment::Payment;
pub use product::Product;
pub use reservation::{ReservationToken, StockReservation};
pub use user::User;
