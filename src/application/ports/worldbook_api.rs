//! Worldbook API Port - 设定卡片 CRUD

use async_trait::async_trait;

use super::ApiError;
use crate::domain::project::ProjectId;
use crate::domain::worldbook::{Card, CardDraft, CardId};

/// Worldbook API Port
#[async_trait]
pub trait WorldbookApiPort: Send + Sync {
    /// GET /api/world/:id/cards
    async fn list_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError>;

    /// POST /api/world/:id/cards，返回服务端的权威对象
    async fn create_card(&self, project: &ProjectId, draft: &CardDraft) -> Result<Card, ApiError>;

    /// PUT /api/world/:id/cards/:card_id
    async fn update_card(
        &self,
        project: &ProjectId,
        id: &CardId,
        draft: &CardDraft,
    ) -> Result<Card, ApiError>;

    /// DELETE /api/world/:id/cards/:card_id
    async fn delete_card(&self, project: &ProjectId, id: &CardId) -> Result<(), ApiError>;

    /// POST /api/world/:id/extract，AI 从正文中提取设定
    async fn extract_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError>;
}
