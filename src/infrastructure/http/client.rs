//! HTTP Backend Client - 调用小说写作后端
//!
//! 实现全部后端端口。普通 JSON 请求带超时；SSE 进度流不设总超时，
//! 由调用方丢弃流来关闭连接。

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::*;
use crate::application::ports::{
    ApiError, BatchEvent, ChatApiPort, ChatMessage, FileVersion, VersionApiPort, CreateBatchRequest, DailyWords, EventStream, ExportApiPort,
    ExportFormat, GenerationApiPort, GenerationEvent, GenerationParams, GenerationParamsView,
    GenesisApiPort, GlobalSettings, ProjectApiPort, Proposal, RecentEdit, SafetySettings,
    SettingsApiPort, StartGenerationRequest, Statistics, StatisticsApiPort, SystemPrompt,
    WorldbookApiPort,
};
use crate::config::BackendConfig;
use crate::domain::project::{NodeRef, Project, ProjectId, Structure};
use crate::domain::worldbook::{Card, CardDraft, CardId};
use crate::infrastructure::sse::decode_events;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_connect() {
        ApiError::Network(format!("Cannot connect to backend: {}", e))
    } else if e.is_decode() {
        ApiError::InvalidResponse(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

/// HTTP 后端客户端
pub struct HttpBackendClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::Network(format!("Invalid backend URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!(
                "Invalid backend URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout(),
        })
    }

    /// 拼接路径，每段单独百分号编码
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.client.get(self.url(segments)).timeout(self.timeout)
    }

    fn post(&self, segments: &[&str]) -> RequestBuilder {
        self.client.post(self.url(segments)).timeout(self.timeout)
    }

    /// 发送请求，非 2xx 时把 `{"error": ...}` 转成 `ApiError::Status`
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("error").to_string()
                } else {
                    body
                }
            });

        tracing::warn!(
            status = status.as_u16(),
            message = %message,
            "Backend request failed"
        );
        Err(ApiError::status(status.as_u16(), message))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    /// 打开 SSE 流
    async fn open_stream<T>(&self, segments: &[&str]) -> Result<EventStream<T>, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(segments);
        tracing::debug!(path = url.path(), "Opening SSE stream");
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self.execute(request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_transport_error));
        Ok(decode_events(bytes))
    }
}

// ============================================================================
// Project
// ============================================================================

#[async_trait]
impl ProjectApiPort for HttpBackendClient {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let response: ProjectsResponse = self.json(self.get(&["api", "projects"])).await?;
        Ok(response.into_projects())
    }

    async fn get_project(&self, project: &ProjectId) -> Result<Project, ApiError> {
        self.json(self.get(&["api", "projects", project.as_str()]))
            .await
    }

    async fn get_structure(&self, project: &ProjectId) -> Result<Structure, ApiError> {
        let structure: Structure = self
            .json(self.get(&["api", "project", project.as_str(), "structure"]))
            .await?;
        Ok(structure.normalized())
    }

    async fn save_node(
        &self,
        project: &ProjectId,
        node: &NodeRef,
        content: &str,
    ) -> Result<Option<String>, ApiError> {
        let body = SaveNodeBody {
            node_type: node.kind(),
            filename: node.filename(),
            content,
            vol_num: None,
        };
        let response: SaveNodeResponse = self
            .json(
                self.post(&["api", "project", project.as_str(), "structure", "node"])
                    .json(&body),
            )
            .await?;

        tracing::debug!(
            project = %project,
            node = node.kind(),
            filename = ?response.node.filename,
            "Structure node saved"
        );
        Ok(response.node.filename)
    }

    async fn create_volume(&self, project: &ProjectId) -> Result<Option<String>, ApiError> {
        self.save_node(project, &NodeRef::Volume { filename: None }, "")
            .await
    }

    async fn create_chapter(
        &self,
        project: &ProjectId,
        vol_num: u32,
    ) -> Result<Option<String>, ApiError> {
        let body = SaveNodeBody {
            node_type: "script",
            filename: None,
            content: "",
            vol_num: Some(vol_num),
        };
        let response: SaveNodeResponse = self
            .json(
                self.post(&["api", "project", project.as_str(), "structure", "node"])
                    .json(&body),
            )
            .await?;
        Ok(response.node.filename)
    }

    async fn get_chapter(&self, project: &ProjectId, chapter_num: u32) -> Result<String, ApiError> {
        let chapter = chapter_num.to_string();
        let response: ContentResponse = self
            .json(self.get(&["api", "project", project.as_str(), "chapter", &chapter]))
            .await?;
        Ok(response.content)
    }

    async fn save_chapter(
        &self,
        project: &ProjectId,
        chapter_num: u32,
        content: &str,
    ) -> Result<(), ApiError> {
        let chapter = chapter_num.to_string();
        self.send(
            self.post(&["api", "project", project.as_str(), "chapter", &chapter])
                .json(&ContentBody { content }),
        )
        .await
    }

    async fn generate_structure(
        &self,
        project: &ProjectId,
        master_outline: &str,
        volume_count: u32,
    ) -> Result<String, ApiError> {
        let response: MessageResponse = self
            .json(
                self.post(&["api", "project", project.as_str(), "structure", "generate"])
                    .json(&GenerateStructureBody {
                        master_outline,
                        volume_count,
                    }),
            )
            .await?;
        Ok(response.message.unwrap_or_default())
    }
}

// ============================================================================
// Generation
// ============================================================================

#[async_trait]
impl GenerationApiPort for HttpBackendClient {
    async fn start_generation(&self, request: StartGenerationRequest) -> Result<String, ApiError> {
        let body = StartGenerationBody {
            project: request.project.as_str(),
            stage: &request.stage,
            params: StageParams {
                outline: &request.outline,
                chapter_num: request.chapter_num,
            },
        };
        let response: QueueResponse = self
            .json(self.post(&["api", "generate", "stream"]).json(&body))
            .await?;

        tracing::info!(
            project = %request.project,
            chapter_num = request.chapter_num,
            queue_id = %response.queue_id,
            "Generation queued"
        );
        Ok(response.queue_id)
    }

    async fn open_generation_stream(
        &self,
        queue_id: &str,
    ) -> Result<EventStream<GenerationEvent>, ApiError> {
        self.open_stream(&["api", "generate", "progress", queue_id])
            .await
    }

    async fn create_batch(&self, request: CreateBatchRequest) -> Result<String, ApiError> {
        let body = CreateBatchBody {
            project: request.project.as_str(),
            start_chapter: request.start_chapter,
            count: request.count,
            start: request.start_chapter,
            end: request.end_chapter(),
        };
        let response: BatchCreatedResponse = self
            .json(self.post(&["api", "batch", "create"]).json(&body))
            .await?;

        response
            .task_id
            .or(response.job_id)
            .ok_or_else(|| ApiError::InvalidResponse("missing task_id".to_string()))
    }

    async fn open_batch_stream(&self, task_id: &str) -> Result<EventStream<BatchEvent>, ApiError> {
        self.open_stream(&["api", "batch", "progress", task_id])
            .await
    }
}

// ============================================================================
// Worldbook
// ============================================================================

#[async_trait]
impl WorldbookApiPort for HttpBackendClient {
    async fn list_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError> {
        let response: CardsResponse = self
            .json(self.get(&["api", "world", project.as_str(), "cards"]))
            .await?;
        Ok(response.into_cards())
    }

    async fn create_card(&self, project: &ProjectId, draft: &CardDraft) -> Result<Card, ApiError> {
        let response: CardResponse = self
            .json(
                self.post(&["api", "world", project.as_str(), "cards"])
                    .json(draft),
            )
            .await?;
        Ok(response.into_card())
    }

    async fn update_card(
        &self,
        project: &ProjectId,
        id: &CardId,
        draft: &CardDraft,
    ) -> Result<Card, ApiError> {
        let request = self
            .client
            .put(self.url(&["api", "world", project.as_str(), "cards", id.as_str()]))
            .timeout(self.timeout)
            .json(draft);
        let response: CardResponse = self.json(request).await?;
        Ok(response.into_card())
    }

    async fn delete_card(&self, project: &ProjectId, id: &CardId) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&["api", "world", project.as_str(), "cards", id.as_str()]))
            .timeout(self.timeout);
        self.send(request).await
    }

    async fn extract_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError> {
        let response: ExtractResponse = self
            .json(self.post(&["api", "world", project.as_str(), "extract"]))
            .await?;
        Ok(response.extracted)
    }
}

// ============================================================================
// Export
// ============================================================================

#[async_trait]
impl ExportApiPort for HttpBackendClient {
    async fn export(&self, project: &ProjectId, format: ExportFormat) -> Result<String, ApiError> {
        let response: ExportResponse = self
            .json(
                self.post(&["api", "export", format.as_str()])
                    .json(&ExportBody {
                        project: project.as_str(),
                    }),
            )
            .await?;
        Ok(response.filename)
    }

    async fn download(&self, project: &ProjectId, filename: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .execute(self.get(&["api", "export", project.as_str(), "download", filename]))
            .await?;
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[async_trait]
impl StatisticsApiPort for HttpBackendClient {
    async fn statistics(&self, project: &ProjectId) -> Result<Statistics, ApiError> {
        self.json(self.get(&["api", "statistics", project.as_str()]))
            .await
    }

    async fn daily(&self, project: &ProjectId) -> Result<Vec<DailyWords>, ApiError> {
        let response: DailyResponse = self
            .json(self.get(&["api", "statistics", project.as_str(), "daily"]))
            .await?;
        Ok(response.daily)
    }

    async fn recent(&self, project: &ProjectId) -> Result<Vec<RecentEdit>, ApiError> {
        let response: RecentResponse = self
            .json(self.get(&["api", "statistics", project.as_str(), "recent"]))
            .await?;
        Ok(response.recent)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[async_trait]
impl SettingsApiPort for HttpBackendClient {
    async fn global_settings(&self) -> Result<GlobalSettings, ApiError> {
        self.json(self.get(&["api", "settings", "global", "full"])).await
    }

    async fn generation_params(&self) -> Result<GenerationParamsView, ApiError> {
        self.json(self.get(&["api", "settings", "params"])).await
    }

    async fn update_generation_params(
        &self,
        params: &GenerationParams,
    ) -> Result<GenerationParams, ApiError> {
        let response: ParamsResponse = self
            .json(self.post(&["api", "settings", "params"]).json(params))
            .await?;
        Ok(response.config)
    }

    async fn apply_preset(&self, name: &str) -> Result<GenerationParams, ApiError> {
        let response: ParamsResponse = self
            .json(self.post(&["api", "settings", "params", "preset", name]))
            .await?;
        Ok(response.config)
    }

    async fn safety_settings(&self) -> Result<SafetySettings, ApiError> {
        self.json(self.get(&["api", "settings", "safety"])).await
    }

    async fn update_safety_settings(
        &self,
        settings: &SafetySettings,
    ) -> Result<SafetySettings, ApiError> {
        let response: SafetyResponse = self
            .json(self.post(&["api", "settings", "safety"]).json(settings))
            .await?;
        Ok(response.settings)
    }

    async fn system_prompt(&self, project: &ProjectId) -> Result<SystemPrompt, ApiError> {
        self.json(self.get(&["api", "settings", "system-prompt", project.as_str()]))
            .await
    }

    async fn save_system_prompt(&self, project: &ProjectId, content: &str) -> Result<(), ApiError> {
        self.send(
            self.post(&["api", "settings", "system-prompt", project.as_str()])
                .json(&ContentBody { content }),
        )
        .await
    }
}

// ============================================================================
// Genesis
// ============================================================================

#[async_trait]
impl GenesisApiPort for HttpBackendClient {
    async fn propose(&self, inspiration: &str) -> Result<Vec<Proposal>, ApiError> {
        let body = serde_json::json!({ "inspiration": inspiration });
        let response: ProposalsResponse = self
            .json(self.post(&["api", "genesis", "propose"]).json(&body))
            .await?;
        Ok(response.proposals)
    }

    async fn init_project(&self, project_name: &str, config_yaml: &str) -> Result<(), ApiError> {
        let body = GenesisInitBody {
            project_name,
            proposal: ProposalRef { config_yaml },
            config_yaml,
        };
        self.send(self.post(&["api", "genesis", "init"]).json(&body)).await
    }
}

// ============================================================================
// Chat / Versions
// ============================================================================

#[async_trait]
impl ChatApiPort for HttpBackendClient {
    async fn chat(
        &self,
        project: &ProjectId,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ApiError> {
        let body = ChatBody {
            project: project.as_str(),
            message,
            history,
        };
        let response: ChatResponse = self
            .json(self.post(&["api", "chat"]).json(&body))
            .await?;
        Ok(response.reply)
    }
}

#[async_trait]
impl VersionApiPort for HttpBackendClient {
    async fn list_versions(
        &self,
        project: &ProjectId,
        path: &str,
    ) -> Result<Vec<FileVersion>, ApiError> {
        let response: VersionsResponse = self
            .json(
                self.post(&["api", "versions", project.as_str(), "list"])
                    .json(&VersionPathBody { path }),
            )
            .await?;
        Ok(response.versions)
    }

    async fn restore_version(
        &self,
        project: &ProjectId,
        path: &str,
        version_id: &str,
    ) -> Result<bool, ApiError> {
        let response: SuccessResponse = self
            .json(
                self.post(&["api", "versions", project.as_str(), "restore"])
                    .json(&RestoreVersionBody { path, version_id }),
            )
            .await?;
        tracing::info!(
            project = %project,
            path,
            version_id,
            restored = response.success,
            "Version restore requested"
        );
        Ok(response.success)
    }
}
