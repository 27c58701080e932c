//! AI 写作助手与文件版本

mod chat;
mod versions;

pub use chat::{ChatEntry, ChatSession, CHAT_HISTORY_WINDOW};
pub use versions::VersionHistory;
