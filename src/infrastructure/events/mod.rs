//! Events - 通知发布

mod publisher;

pub use publisher::NotificationPublisher;
