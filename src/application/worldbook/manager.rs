//! Worldbook Manager - 卡片列表的本地状态与 CRUD
//!
//! 过滤完全在客户端进行；创建/更新成功后用服务端返回的对象替换本地卡片。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{Notification, NotifierPort, WorldbookApiPort};
use crate::domain::project::ProjectId;
use crate::domain::worldbook::{category_counts, Card, CardDraft, CardFilter, CardId, CardType};

/// 删除前的确认结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// 导出文件格式
#[derive(Debug, Serialize, Deserialize)]
struct CardExport {
    cards: Vec<CardDraft>,
}

pub struct WorldbookManager {
    project: ProjectId,
    api: Arc<dyn WorldbookApiPort>,
    notifier: Arc<dyn NotifierPort>,
    cards: Vec<Card>,
    filter: CardFilter,
}

impl WorldbookManager {
    pub fn new(
        project: ProjectId,
        api: Arc<dyn WorldbookApiPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            project,
            api,
            notifier,
            cards: Vec::new(),
            filter: CardFilter::default(),
        }
    }

    /// 从后端加载全部卡片
    pub async fn load(&mut self) -> Result<usize, ApplicationError> {
        let result = self.api.list_cards(&self.project).await;
        let cards = self.report("加载卡片", result.map_err(ApplicationError::from))?;
        self.cards = cards;
        tracing::debug!(project = %self.project, count = self.cards.len(), "Cards loaded");
        Ok(self.cards.len())
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn filter(&self) -> &CardFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: CardFilter) {
        self.filter = filter;
    }

    /// 过滤后的可见卡片
    pub fn visible(&self) -> Vec<&Card> {
        self.filter.apply(&self.cards)
    }

    /// 各类别计数（None 键为全部）
    pub fn counts(&self) -> HashMap<Option<CardType>, usize> {
        category_counts(&self.cards)
    }

    /// 创建（id 为 None）或更新卡片
    ///
    /// 名称为空时在发请求之前拒绝
    pub async fn save(
        &mut self,
        id: Option<&CardId>,
        draft: CardDraft,
    ) -> Result<Card, ApplicationError> {
        let result = self.save_inner(id, draft).await;
        let card = self.report("保存", result)?;
        self.notifier
            .notify(Notification::success(format!("已保存: {}", card.name)));
        Ok(card)
    }

    async fn save_inner(
        &mut self,
        id: Option<&CardId>,
        draft: CardDraft,
    ) -> Result<Card, ApplicationError> {
        draft.validate()?;

        match id {
            Some(id) => {
                let card = self.api.update_card(&self.project, id, &draft).await?;
                match self.cards.iter_mut().find(|c| &c.id == id) {
                    Some(slot) => *slot = card.clone(),
                    None => self.cards.push(card.clone()),
                }
                tracing::info!(project = %self.project, card_id = %card.id, "Card updated");
                Ok(card)
            }
            None => {
                let card = self.api.create_card(&self.project, &draft).await?;
                self.cards.push(card.clone());
                tracing::info!(project = %self.project, card_id = %card.id, "Card created");
                Ok(card)
            }
        }
    }

    /// 删除卡片，需要用户确认；拒绝时不发请求，返回 false
    pub async fn delete(
        &mut self,
        id: &CardId,
        confirmation: Confirmation,
    ) -> Result<bool, ApplicationError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }

        let result = self.api.delete_card(&self.project, id).await;
        self.report("删除", result.map_err(ApplicationError::from))?;
        self.cards.retain(|c| &c.id != id);
        tracing::info!(project = %self.project, card_id = %id, "Card deleted");
        self.notifier.notify(Notification::success("卡片已删除"));
        Ok(true)
    }

    /// AI 从正文中提取设定，追加到本地列表
    pub async fn extract(&mut self) -> Result<Vec<Card>, ApplicationError> {
        let result = self.api.extract_cards(&self.project).await;
        let extracted = self.report("提取设定", result.map_err(ApplicationError::from))?;
        for card in &extracted {
            if !self.cards.iter().any(|c| c.id == card.id) {
                self.cards.push(card.clone());
            }
        }
        self.notifier.notify(Notification::success(format!(
            "提取了 {} 张卡片",
            extracted.len()
        )));
        Ok(extracted)
    }

    /// 导出为 JSON（不含 ID）
    pub fn export_json(&self) -> Result<String, ApplicationError> {
        let export = CardExport {
            cards: self.cards.iter().cloned().map(CardDraft::from).collect(),
        };
        let result = serde_json::to_string_pretty(&export)
            .map_err(|e| ApplicationError::InvalidResponse(e.to_string()));
        self.report("导出", result)
    }

    /// 从 JSON 导入，每张卡片都作为新卡片创建，返回创建数量
    ///
    /// 接受 `{"cards": [...]}` 或裸数组；名称为空的条目跳过
    pub async fn import_json(&mut self, json: &str) -> Result<usize, ApplicationError> {
        let result = self.import_inner(json).await;
        let created = self.report("导入", result)?;
        self.notifier
            .notify(Notification::success(format!("导入了 {} 张卡片", created)));
        Ok(created)
    }

    async fn import_inner(&mut self, json: &str) -> Result<usize, ApplicationError> {
        let drafts: Vec<CardDraft> = match serde_json::from_str::<CardExport>(json) {
            Ok(export) => export.cards,
            Err(_) => serde_json::from_str(json)
                .map_err(|e| ApplicationError::validation(format!("无效的导入文件: {}", e)))?,
        };

        let mut created = 0;
        for draft in drafts {
            if draft.validate().is_err() {
                tracing::warn!(project = %self.project, "Skipping imported card without name");
                continue;
            }
            let card = self.api.create_card(&self.project, &draft).await?;
            self.cards.push(card);
            created += 1;
        }
        Ok(created)
    }

    /// 失败时发布错误通知，结果原样返回
    fn report<T>(
        &self,
        action: &str,
        result: Result<T, ApplicationError>,
    ) -> Result<T, ApplicationError> {
        if let Err(e) = &result {
            tracing::warn!(project = %self.project, action, error = %e, "Worldbook operation failed");
            self.notifier.notify(Notification::error(format!(
                "{}失败: {}",
                action,
                e.user_message()
            )));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NotificationLevel;
    use crate::domain::worldbook::CategoryFilter;
    use crate::infrastructure::events::NotificationPublisher;
    use crate::infrastructure::memory::InMemoryBackend;

    async fn manager() -> (Arc<InMemoryBackend>, WorldbookManager) {
        let (backend, _, manager) = manager_with_publisher().await;
        (backend, manager)
    }

    async fn manager_with_publisher() -> (
        Arc<InMemoryBackend>,
        Arc<NotificationPublisher>,
        WorldbookManager,
    ) {
        let backend = Arc::new(InMemoryBackend::new());
        let project = ProjectId::new("demo").unwrap();
        backend
            .create_card(&project, &CardDraft::new("萧炎", CardType::Character).with_tags(vec!["主角".into()]))
            .await
            .unwrap();
        backend
            .create_card(&project, &CardDraft::new("乌坦城", CardType::Location).with_content("萧家所在"))
            .await
            .unwrap();

        let publisher = Arc::new(NotificationPublisher::new(16));
        let mut manager = WorldbookManager::new(project, backend.clone(), publisher.clone());
        manager.load().await.unwrap();
        (backend, publisher, manager)
    }

    #[tokio::test]
    async fn test_filter_and_counts() {
        let (_, mut manager) = manager().await;
        assert_eq!(manager.visible().len(), 2);

        manager.set_filter(CardFilter::new(CategoryFilter::All, "萧"));
        assert_eq!(manager.visible().len(), 2);

        manager.set_filter(CardFilter::new(CategoryFilter::Only(CardType::Character), "萧"));
        assert_eq!(manager.visible()[0].name, "萧炎");

        let counts = manager.counts();
        assert_eq!(counts[&None], 2);
        assert_eq!(counts[&Some(CardType::Location)], 1);
    }

    #[tokio::test]
    async fn test_save_validates_before_request() {
        let (backend, mut manager) = manager().await;
        let err = manager
            .save(None, CardDraft::new("  ", CardType::Item))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
        assert_eq!(backend.card_count(&ProjectId::new("demo").unwrap()), 2);
    }

    #[tokio::test]
    async fn test_create_and_update_use_server_object() {
        let (_, mut manager) = manager().await;
        let card = manager
            .save(None, CardDraft::new("玄重尺", CardType::Item))
            .await
            .unwrap();
        assert_eq!(manager.cards().len(), 3);

        let updated = manager
            .save(
                Some(&card.id),
                CardDraft::new("玄重尺", CardType::Item).with_content("重剑"),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, card.id);
        assert_eq!(manager.cards().len(), 3);
        assert_eq!(manager.card(&card.id).unwrap().content, "重剑");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (backend, mut manager) = manager().await;
        let project = ProjectId::new("demo").unwrap();
        let id = manager.cards()[0].id.clone();

        assert!(!manager.delete(&id, Confirmation::Declined).await.unwrap());
        assert_eq!(backend.card_count(&project), 2);
        assert_eq!(manager.cards().len(), 2);

        assert!(manager.delete(&id, Confirmation::Confirmed).await.unwrap());
        assert_eq!(backend.card_count(&project), 1);
        assert!(manager.card(&id).is_none());
    }

    #[tokio::test]
    async fn test_export_then_import_creates_new_cards() {
        let (backend, mut manager) = manager().await;
        let json = manager.export_json().unwrap();
        assert!(!json.contains("\"id\""));

        let created = manager.import_json(&json).await.unwrap();
        assert_eq!(created, 2);
        assert_eq!(manager.cards().len(), 4);
        assert_eq!(backend.card_count(&ProjectId::new("demo").unwrap()), 4);

        assert!(matches!(
            manager.import_json("not json").await,
            Err(ApplicationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_failures_are_published() {
        let (_, publisher, mut manager) = manager_with_publisher().await;
        let mut rx = publisher.subscribe();

        assert!(manager
            .save(None, CardDraft::new("  ", CardType::Item))
            .await
            .is_err());
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.starts_with("保存失败"));

        assert!(manager
            .delete(&CardId::new("nope"), Confirmation::Confirmed)
            .await
            .is_err());
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.starts_with("删除失败"));

        assert!(manager.import_json("not json").await.is_err());
        assert_eq!(rx.try_recv().unwrap().level, NotificationLevel::Error);
        assert_eq!(manager.cards().len(), 2);
    }
}
