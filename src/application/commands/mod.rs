//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：结构树、导出、设置

mod export_commands;
mod settings_commands;
mod structure_commands;

pub mod handlers;

pub use export_commands::*;
pub use settings_commands::*;
pub use structure_commands::*;
