//! Domain Layer - 领域层
//!
//! 纯同步模型，不做任何 I/O:
//! - Project Context: 项目结构树、选择
//! - Editor Context: 编辑缓冲区状态、撤销历史、搜索替换
//! - Worldbook Context: 设定卡片与过滤

pub mod editor;
pub mod project;
pub mod text_stats;
pub mod worldbook;
