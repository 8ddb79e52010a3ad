//! 库存台账模块
//!
//! 台账是活动剩余库存与用户购买计数的唯一写入方，对外暴露
//! reserve / release / finalize 三个原子操作。
//!
//! - `postgres`：生产实现。扣减用单条条件 UPDATE 完成，从根上消除
//!   读-改-写竞态；持久化的数据库操作是最终的正确性边界。
//! - `memory`：同一契约的进程内实现（每活动一把互斥锁的计数器），
//!   用于并发属性测试，也可作为单实例部署的快速路径。

pub mod memory;
pub mod postgres;

pub use memory::MemoryStockLedger;
pub use postgres::StockLedger;
