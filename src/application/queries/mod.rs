//! 应用层 - 查询（读操作）
//!
//! 设置与统计面板的只读查询

mod settings_queries;
mod statistics_queries;

pub mod handlers;

pub use settings_queries::*;
pub use statistics_queries::*;
