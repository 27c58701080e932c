//! Editor Context - 编辑器的纯领域模型
//!
//! - 缓冲区与保存状态
//! - 撤销/重做历史
//! - 搜索替换

mod buffer;
mod history;
mod search;

pub use buffer::{BufferKind, SaveStatus, Snapshot};
pub use history::{History, DEFAULT_HISTORY_CAPACITY};
pub use search::{SearchMatch, SearchPanel};
