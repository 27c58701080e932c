//! Statistics Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{DailyWords, RecentEdit, Statistics, StatisticsApiPort};
use crate::application::queries::GetDashboard;

// ============================================================================
// Response DTOs
// ============================================================================

/// 统计面板
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub statistics: Statistics,
    pub daily: Vec<DailyWords>,
    pub recent: Vec<RecentEdit>,
}

impl Dashboard {
    /// 每日字数中的最大值，用于柱状图缩放
    pub fn peak_daily_words(&self) -> u64 {
        self.daily.iter().map(|d| d.words).max().unwrap_or(0)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub struct GetDashboardHandler {
    api: Arc<dyn StatisticsApiPort>,
}

impl GetDashboardHandler {
    pub fn new(api: Arc<dyn StatisticsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, query: GetDashboard) -> Result<Dashboard, ApplicationError> {
        let (statistics, daily, recent) = tokio::try_join!(
            self.api.statistics(&query.project),
            self.api.daily(&query.project),
            self.api.recent(&query.project),
        )?;

        tracing::debug!(
            project = %query.project,
            total_words = statistics.total_words,
            days = daily.len(),
            recent = recent.len(),
            "Dashboard loaded"
        );

        Ok(Dashboard {
            statistics,
            daily,
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::ProjectId;
    use crate::infrastructure::memory::InMemoryBackend;

    #[tokio::test]
    async fn test_dashboard_reflects_saved_chapters() {
        let backend = Arc::new(InMemoryBackend::demo());
        let project = ProjectId::new("demo").unwrap();

        let dashboard = GetDashboardHandler::new(backend)
            .handle(GetDashboard { project })
            .await
            .unwrap();

        assert!(dashboard.statistics.total_chapters > 0);
        assert!(dashboard.statistics.total_words > 0);
        assert!(!dashboard.recent.is_empty());
        assert_eq!(dashboard.daily.len(), 7);
        assert!(dashboard.peak_daily_words() <= dashboard.statistics.total_words);
    }

    #[tokio::test]
    async fn test_dashboard_unknown_project_fails() {
        let backend = Arc::new(InMemoryBackend::new());
        let result = GetDashboardHandler::new(backend)
            .handle(GetDashboard {
                project: ProjectId::new("ghost").unwrap(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Network(_))));
    }
}
