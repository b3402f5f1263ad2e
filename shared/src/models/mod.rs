//! Data models
//!
//! Shared between hostel-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.
//!
//! 生命周期规则（状态机）实现在模型上，纯函数、无 IO，服务端只负责加载和持久化。

pub mod announcement;
pub mod cart;
pub mod catalog;
pub mod common;
pub mod dining_menu;
pub mod maintenance;
pub mod meal_rating;
pub mod order;
pub mod outpass;
pub mod user;

// Re-exports
pub use announcement::*;
pub use cart::*;
pub use catalog::*;
pub use common::*;
pub use dining_menu::*;
pub use maintenance::*;
pub use meal_rating::*;
pub use order::*;
pub use outpass::*;
pub use user::*;
