//! 设定卡片管理

mod manager;

pub use manager::{Confirmation, WorldbookManager};
