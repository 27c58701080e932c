//! Notification Publisher Implementation
//!
//! 界面 toast 的广播通道实现

use tokio::sync::broadcast;

use crate::application::ports::{Notification, NotificationLevel, NotifierPort};

/// 通知发布器
///
/// 没有订阅者时通知被丢弃，只留下日志
pub struct NotificationPublisher {
    channel: broadcast::Sender<Notification>,
}

impl NotificationPublisher {
    pub fn new(capacity: usize) -> Self {
        let (channel, _) = broadcast::channel(capacity.max(1));
        Self { channel }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.channel.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.channel.receiver_count()
    }
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(100)
    }
}

impl NotifierPort for NotificationPublisher {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::warn!(message = %notification.message, "Notification")
            }
            _ => tracing::info!(
                level = ?notification.level,
                message = %notification.message,
                "Notification"
            ),
        }

        if let Err(e) = self.channel.send(notification) {
            tracing::debug!(
                message = %e.0.message,
                "No subscribers for notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let publisher = NotificationPublisher::new(8);
        let mut a = publisher.subscribe();
        let mut b = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        publisher.notify(Notification::success("保存成功"));

        let got = a.recv().await.unwrap();
        assert_eq!(got.level, NotificationLevel::Success);
        assert_eq!(got.message, "保存成功");
        assert_eq!(b.recv().await.unwrap().message, "保存成功");
    }

    #[test]
    fn test_notify_without_subscribers_is_harmless() {
        let publisher = NotificationPublisher::default();
        publisher.notify(Notification::error("自动保存失败"));
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
