//! Version History - 查看与恢复文件的历史版本

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{FileVersion, Notification, NotifierPort, VersionApiPort};
use crate::application::worldbook::Confirmation;
use crate::domain::project::ProjectId;

pub struct VersionHistory {
    project: ProjectId,
    api: Arc<dyn VersionApiPort>,
    notifier: Arc<dyn NotifierPort>,
}

impl VersionHistory {
    pub fn new(
        project: ProjectId,
        api: Arc<dyn VersionApiPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            project,
            api,
            notifier,
        }
    }

    /// 文件的版本列表（旧在前）
    pub async fn list(&self, path: &str) -> Result<Vec<FileVersion>, ApplicationError> {
        let path = validate_path(path)?;
        let result = self.api.list_versions(&self.project, path).await;
        result.map_err(|e| {
            let err = ApplicationError::from(e);
            self.report("加载版本", &err);
            err
        })
    }

    /// 恢复到指定版本，覆盖当前内容，需要用户确认
    ///
    /// 拒绝时不发请求，返回 false；版本不存在为 NotFound
    pub async fn restore(
        &self,
        path: &str,
        version_id: &str,
        confirmation: Confirmation,
    ) -> Result<bool, ApplicationError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        let path = validate_path(path)?;

        let restored = match self
            .api
            .restore_version(&self.project, path, version_id)
            .await
        {
            Ok(true) => Ok(true),
            Ok(false) => Err(ApplicationError::not_found("Version", version_id)),
            Err(e) => Err(ApplicationError::from(e)),
        };
        match restored {
            Ok(_) => {
                tracing::info!(project = %self.project, path, version_id, "Version restored");
                self.notifier
                    .notify(Notification::success(format!("已恢复到版本 {}", version_id)));
                Ok(true)
            }
            Err(err) => {
                self.report("恢复版本", &err);
                Err(err)
            }
        }
    }

    fn report(&self, action: &str, err: &ApplicationError) {
        tracing::warn!(project = %self.project, action, error = %err, "Version operation failed");
        self.notifier.notify(Notification::error(format!(
            "{}失败: {}",
            action,
            err.user_message()
        )));
    }
}

fn validate_path(path: &str) -> Result<&str, ApplicationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ApplicationError::validation("文件路径不能为空"));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NotificationLevel, ProjectApiPort};
    use crate::infrastructure::events::NotificationPublisher;
    use crate::infrastructure::memory::InMemoryBackend;

    fn history(
        backend: &Arc<InMemoryBackend>,
    ) -> (Arc<NotificationPublisher>, VersionHistory) {
        let publisher = Arc::new(NotificationPublisher::new(16));
        let history = VersionHistory::new(
            ProjectId::new("demo").unwrap(),
            backend.clone(),
            publisher.clone(),
        );
        (publisher, history)
    }

    #[tokio::test]
    async fn test_restore_requires_confirmation() {
        let backend = Arc::new(InMemoryBackend::demo());
        let project = ProjectId::new("demo").unwrap();
        backend.save_chapter(&project, 2, "改过的正文").await.unwrap();
        let (publisher, history) = history(&backend);
        let mut rx = publisher.subscribe();

        let versions = history.list("chapter_002.md").await.unwrap();
        assert_eq!(versions.len(), 2);
        let original = &versions[0].version_id;

        assert!(!history
            .restore("chapter_002.md", original, Confirmation::Declined)
            .await
            .unwrap());
        assert_eq!(backend.get_chapter(&project, 2).await.unwrap(), "改过的正文");
        assert!(rx.try_recv().is_err());

        assert!(history
            .restore("chapter_002.md", original, Confirmation::Confirmed)
            .await
            .unwrap());
        assert!(backend
            .get_chapter(&project, 2)
            .await
            .unwrap()
            .starts_with("集市上"));
        assert_eq!(rx.try_recv().unwrap().level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn test_unknown_version_is_reported() {
        let backend = Arc::new(InMemoryBackend::demo());
        let (publisher, history) = history(&backend);
        let mut rx = publisher.subscribe();

        assert!(matches!(
            history
                .restore("chapter_001.md", "v9999", Confirmation::Confirmed)
                .await,
            Err(ApplicationError::NotFound { .. })
        ));
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.starts_with("恢复版本失败"));

        assert!(matches!(
            history.list("  ").await,
            Err(ApplicationError::Validation(_))
        ));
    }
}
