//! Memory Layer - 内存后端
//!
//! 离线模式与测试共用的后端实现

mod backend;

pub use backend::{InMemoryBackend, SaveCall};
