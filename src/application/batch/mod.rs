//! 批量生成监视器
//!
//! 两阶段协议：同步创建任务拿到 task_id，再消费按 ID 限定的进度流。
//! 客户端只持有进度投影，流关闭后即丢弃。

mod monitor;
mod progress;

pub use monitor::BatchMonitor;
pub use progress::{BatchProgress, BatchStatus, LogEntry, LogLevel};
