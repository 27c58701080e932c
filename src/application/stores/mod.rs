//! 前端状态仓库
//!
//! - ProjectStore: 项目列表与当前项目
//! - GenesisStore: 新书创建向导的进行中状态

mod genesis;
mod project;

pub use genesis::{safe_project_name, GenesisStore};
pub use project::ProjectStore;
