//! 跨仓储的业务流程
//!
//! - [`ordering`] - 购物车下单 (单事务)
//! - [`overdue`] - 出门逾期巡检 (周期任务 + 手动触发)

pub mod ordering;
pub mod overdue;

pub use ordering::place_order;
pub use overdue::{run_overdue_check, run_overdue_task};
