//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod events;
pub mod http;
pub mod memory;
pub mod sse;

pub use events::NotificationPublisher;
pub use http::HttpBackendClient;
pub use memory::InMemoryBackend;
