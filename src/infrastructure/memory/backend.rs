//! In-Memory Backend Implementation
//!
//! 所有后端端口的内存实现。生成与批量任务按预设脚本回放事件，
//! 保存请求记入调用日志，可以整体切换为失败模式。

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::application::ports::{
    ApiError, BatchEvent, ChatApiPort, ChatMessage, FileVersion, VersionApiPort, CreateBatchRequest, DailyWords, EventStream, ExportApiPort,
    ExportFormat, GenerationApiPort, GenerationEvent, GenerationParams, GenerationParamsView,
    GenesisApiPort, GlobalSettings, ModelInfo, ProjectApiPort, Proposal, RecentEdit,
    SafetySettings, SettingsApiPort, StartGenerationRequest, Statistics, StatisticsApiPort,
    SystemPrompt, WorldbookApiPort,
};
use crate::domain::project::{NodeRef, Project, ProjectId, Script, Structure, Volume};
use crate::domain::text_stats::word_count;
use crate::domain::worldbook::{Card, CardDraft, CardId, CardType};

/// 默认脚本中相邻事件的间隔
const DEFAULT_EVENT_DELAY: Duration = Duration::from_millis(40);
const RECENT_LIMIT: usize = 10;
/// 每个文件保留的版本数
const MAX_VERSIONS_PER_FILE: usize = 50;

/// 一次保存请求（无论成功与否都会记录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveCall {
    Node {
        kind: &'static str,
        filename: Option<String>,
        content: String,
    },
    Chapter {
        chapter: u32,
        content: String,
    },
}

#[derive(Debug, Default)]
struct ProjectState {
    project: Project,
    structure: Structure,
    chapters: BTreeMap<u32, String>,
    recent: Vec<RecentEdit>,
    daily: BTreeMap<String, u64>,
    /// 文件路径 -> 版本（旧在前）
    versions: BTreeMap<String, Vec<StoredVersion>>,
}

#[derive(Debug, Clone)]
struct StoredVersion {
    version: FileVersion,
    content: String,
}

impl ProjectState {
    fn snapshot(&mut self, version_id: String, chapter: u32, content: &str, message: &str) {
        let path = chapter_filename(chapter);
        let versions = self.versions.entry(path.clone()).or_default();
        versions.push(StoredVersion {
            version: FileVersion {
                version_id,
                file_path: path,
                content_hash: String::new(),
                timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
                message: message.to_string(),
                word_count: word_count(content) as u64,
            },
            content: content.to_string(),
        });
        if versions.len() > MAX_VERSIONS_PER_FILE {
            let excess = versions.len() - MAX_VERSIONS_PER_FILE;
            versions.drain(..excess);
        }
    }

    fn touch(&mut self, filename: String) {
        self.recent.retain(|r| r.filename != filename);
        self.recent.insert(
            0,
            RecentEdit {
                filename,
                modified: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            },
        );
        self.recent.truncate(RECENT_LIMIT);
    }
}

struct Scripted<T> {
    events: Vec<T>,
    delay: Duration,
}

struct SettingsState {
    params: GenerationParams,
    presets: BTreeMap<String, GenerationParams>,
    safety: SafetySettings,
}

impl Default for SettingsState {
    fn default() -> Self {
        let preset = |temperature: f64, top_p: f64| GenerationParams {
            temperature: Some(temperature),
            top_p: Some(top_p),
            ..Default::default()
        };
        let mut presets = BTreeMap::new();
        presets.insert("creative".to_string(), preset(1.0, 0.95));
        presets.insert("balanced".to_string(), preset(0.7, 0.9));
        presets.insert("precise".to_string(), preset(0.3, 0.8));

        Self {
            params: GenerationParams {
                temperature: Some(0.8),
                max_tokens: Some(4096),
                top_p: Some(0.95),
                top_k: Some(40),
                theme: None,
            },
            presets,
            safety: SafetySettings {
                harm_block_threshold: Some("BLOCK_NONE".to_string()),
                enable_content_filter: Some(false),
                extra: BTreeMap::new(),
            },
        }
    }
}

/// 流被丢弃或读完时计数
struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn project_not_found() -> ApiError {
    ApiError::status(404, "Project not found")
}

/// 内存后端
pub struct InMemoryBackend {
    projects: DashMap<String, ProjectState>,
    /// 项目列表按创建顺序返回
    order: Mutex<Vec<String>>,
    cards: DashMap<String, Vec<Card>>,
    system_prompts: DashMap<String, String>,
    exports: DashMap<(String, String), Vec<u8>>,
    settings: Mutex<SettingsState>,

    generation_script: Mutex<Option<Scripted<GenerationEvent>>>,
    batch_script: Mutex<Option<Scripted<BatchEvent>>>,
    queued_generations: DashMap<String, StartGenerationRequest>,
    queued_batches: DashMap<String, CreateBatchRequest>,

    fail_saves: AtomicBool,
    save_delay: Mutex<Duration>,
    save_calls: Mutex<Vec<SaveCall>>,
    generation_requests: Mutex<Vec<StartGenerationRequest>>,
    batch_requests: Mutex<Vec<CreateBatchRequest>>,
    chat_requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    list_calls: AtomicUsize,
    streams_opened: AtomicUsize,
    streams_closed: Arc<AtomicUsize>,
    next_id: AtomicU64,
    version_seq: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            order: Mutex::new(Vec::new()),
            cards: DashMap::new(),
            system_prompts: DashMap::new(),
            exports: DashMap::new(),
            settings: Mutex::new(SettingsState::default()),
            generation_script: Mutex::new(None),
            batch_script: Mutex::new(None),
            queued_generations: DashMap::new(),
            queued_batches: DashMap::new(),
            fail_saves: AtomicBool::new(false),
            save_delay: Mutex::new(Duration::ZERO),
            save_calls: Mutex::new(Vec::new()),
            generation_requests: Mutex::new(Vec::new()),
            batch_requests: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            streams_opened: AtomicUsize::new(0),
            streams_closed: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
            version_seq: AtomicU64::new(1),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 带一个示例项目 `demo` 的后端（离线模式使用）
    pub fn demo() -> Self {
        let backend = Self::new();
        let script = |num: u32, vol: u32, content: &str| Script {
            script_num: num,
            content: content.to_string(),
            filename: Some(format!("v{:02}_s{:02}.md", vol, num)),
            word_count: 0,
        };

        backend.seed_project(
            Project {
                name: "demo".to_string(),
                title: "山海行".to_string(),
                genre: "玄幻".to_string(),
                current_volume: 1,
                current_chapter: 2,
                target_words: 300_000,
                words_per_chapter: 3000,
                ..Default::default()
            },
            Structure {
                title: "山海行".to_string(),
                master_outline: "少年离开山村，踏上寻找失落古城的旅程。".to_string(),
                volumes: vec![
                    Volume {
                        vol_num: 1,
                        content: "# 第1卷 出山\n少年结识同伴，第一次见识江湖。".to_string(),
                        filename: Some("volume_01.md".to_string()),
                        scripts: vec![
                            script(1, 1, "少年在山村长大，偶得残破地图。"),
                            script(2, 1, "离开山村，在集市遇到神秘老者。"),
                            script(3, 1, "夜宿破庙，遭遇山匪。"),
                        ],
                    },
                    Volume {
                        vol_num: 2,
                        content: "# 第2卷 古城\n沿地图深入荒漠。".to_string(),
                        filename: Some("volume_02.md".to_string()),
                        scripts: vec![
                            script(4, 2, "穿越沙暴，发现古城遗迹。"),
                            script(5, 2, "古城守卫苏醒。"),
                        ],
                    },
                ],
            },
        );

        backend.put_chapter("demo", 1, "清晨的雾气笼罩着山村，少年推开木门，望向远处的群山。");
        backend.put_chapter("demo", 2, "集市上人声鼎沸，一位白发老者拦住了他的去路。");

        let cards = vec![
            CardDraft::new("林川", CardType::Character)
                .with_description("主角，山村少年")
                .with_tags(vec!["主角".to_string()]),
            CardDraft::new("落霞古城", CardType::Location).with_content("埋在荒漠之下的古城"),
            CardDraft::new("残破地图", CardType::Item).with_content("指向古城的线索"),
        ];
        for draft in cards {
            backend.insert_card("demo", &draft);
        }

        backend
    }

    /// 写入（或覆盖）项目与结构树
    pub fn seed_project(&self, project: Project, structure: Structure) {
        let name = project.name.clone();
        let structure = structure.normalized();
        match self.projects.get_mut(&name) {
            Some(mut state) => {
                state.project = project;
                state.structure = structure;
            }
            None => {
                self.projects.insert(
                    name.clone(),
                    ProjectState {
                        project,
                        structure,
                        ..Default::default()
                    },
                );
                lock(&self.order).push(name);
            }
        }
    }

    /// 直接写入章节正文（不记入调用日志）
    pub fn set_chapter(&self, project: &ProjectId, chapter: u32, content: &str) {
        self.put_chapter(project.as_str(), chapter, content);
    }

    fn put_chapter(&self, project: &str, chapter: u32, content: &str) {
        if let Some(mut state) = self.projects.get_mut(project) {
            state.snapshot(self.version_id(), chapter, content, "初始版本");
            state.chapters.insert(chapter, content.to_string());
            set_script_words(&mut state.structure, chapter, word_count(content) as u64);
            state.touch(chapter_filename(chapter));
        }
    }

    /// 下一条生成流回放的事件，每个事件前等待 `delay`
    pub fn script_generation(&self, events: Vec<GenerationEvent>, delay: Duration) {
        *lock(&self.generation_script) = Some(Scripted { events, delay });
    }

    /// 下一条批量进度流回放的事件
    pub fn script_batch(&self, events: Vec<BatchEvent>, delay: Duration) {
        *lock(&self.batch_script) = Some(Scripted { events, delay });
    }

    /// 打开后所有保存请求都返回 500
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// 保存请求在返回前等待 `delay`（调用仍立即记录）
    pub fn set_save_delay(&self, delay: Duration) {
        *lock(&self.save_delay) = delay;
    }

    pub fn save_calls(&self) -> Vec<SaveCall> {
        lock(&self.save_calls).clone()
    }

    pub fn generation_requests(&self) -> Vec<StartGenerationRequest> {
        lock(&self.generation_requests).clone()
    }

    pub fn batch_requests(&self) -> Vec<CreateBatchRequest> {
        lock(&self.batch_requests).clone()
    }

    /// 收到的对话请求：(消息, 附带的历史)
    pub fn chat_requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        lock(&self.chat_requests).clone()
    }

    fn version_id(&self) -> String {
        format!("v{:04}", self.version_seq.fetch_add(1, Ordering::SeqCst))
    }

    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    pub fn streams_closed(&self) -> usize {
        self.streams_closed.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn card_count(&self, project: &ProjectId) -> usize {
        self.cards
            .get(project.as_str())
            .map(|cards| cards.len())
            .unwrap_or(0)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn insert_card(&self, project: &str, draft: &CardDraft) -> Card {
        let card = draft.clone().into_card(CardId::new(self.next_id().to_string()));
        self.cards
            .entry(project.to_string())
            .or_default()
            .push(card.clone());
        card
    }

    async fn record_save(&self, call: SaveCall) -> Result<(), ApiError> {
        lock(&self.save_calls).push(call);
        let delay = *lock(&self.save_delay);
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ApiError::status(500, "save failed"));
        }
        Ok(())
    }

    fn open_scripted<T: Send + 'static>(&self, scripted: Scripted<T>) -> EventStream<T> {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        let guard = StreamGuard(self.streams_closed.clone());
        let delay = scripted.delay;

        stream::unfold(
            (scripted.events.into_iter(), guard),
            move |(mut events, guard)| async move {
                let event = events.next()?;
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                Some((Ok(event), (events, guard)))
            },
        )
        .boxed()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn chapter_filename(chapter: u32) -> String {
    format!("chapter_{:03}.md", chapter)
}

/// `chapter_001.md` 或 `content/chapter_001.md` -> 1
fn chapter_from_path(path: &str) -> Option<u32> {
    let name = path.rsplit('/').next()?;
    name.strip_prefix("chapter_")?
        .strip_suffix(".md")?
        .parse()
        .ok()
}

fn set_script_words(structure: &mut Structure, chapter: u32, words: u64) {
    if let Some(script) = structure
        .volumes
        .iter_mut()
        .find_map(|v| v.script_mut(chapter))
    {
        script.word_count = words;
    }
}

/// 示例生成脚本：按章纲拼一段正文，分块回放
fn default_generation(request: &StartGenerationRequest) -> Scripted<GenerationEvent> {
    let text = format!(
        "第{}章。{}。风从山口吹来，他握紧了手中的地图，向前走去。",
        request.chapter_num,
        request.outline.trim().trim_end_matches('。')
    );
    let chars: Vec<char> = text.chars().collect();

    let mut events = vec![GenerationEvent::Start {
        message: format!("开始生成第 {} 章", request.chapter_num),
    }];
    events.extend(chars.chunks(8).map(|chunk| GenerationEvent::Chunk {
        content: chunk.iter().collect(),
    }));
    events.push(GenerationEvent::Complete {
        content: String::new(),
        word_count: chars.len() as u64,
    });

    Scripted {
        events,
        delay: DEFAULT_EVENT_DELAY,
    }
}

fn default_batch(request: &CreateBatchRequest) -> Scripted<BatchEvent> {
    let mut events = Vec::new();
    for (i, chapter) in (request.start_chapter..=request.end_chapter()).enumerate() {
        events.push(BatchEvent::Progress {
            current: i as u32 + 1,
            total: request.count,
            message: format!("正在生成第 {} 章", chapter),
        });
        events.push(BatchEvent::Complete {
            chapter: Some(chapter),
        });
    }
    events.push(BatchEvent::Done);

    Scripted {
        events,
        delay: DEFAULT_EVENT_DELAY * 5,
    }
}

/// 从项目配置中读取 `key: value`
fn yaml_field(config_yaml: &str, key: &str) -> Option<String> {
    config_yaml.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

// ============================================================================
// Project
// ============================================================================

#[async_trait]
impl ProjectApiPort for InMemoryBackend {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let order = lock(&self.order).clone();
        Ok(order
            .iter()
            .filter_map(|name| {
                self.projects.get(name).map(|state| {
                    let mut project = state.project.clone();
                    project.word_count = state.structure.total_words();
                    project
                })
            })
            .collect())
    }

    async fn get_project(&self, project: &ProjectId) -> Result<Project, ApiError> {
        self.projects
            .get(project.as_str())
            .map(|state| state.project.clone())
            .ok_or_else(project_not_found)
    }

    async fn get_structure(&self, project: &ProjectId) -> Result<Structure, ApiError> {
        self.projects
            .get(project.as_str())
            .map(|state| state.structure.clone())
            .ok_or_else(project_not_found)
    }

    async fn save_node(
        &self,
        project: &ProjectId,
        node: &NodeRef,
        content: &str,
    ) -> Result<Option<String>, ApiError> {
        self.record_save(SaveCall::Node {
            kind: node.kind(),
            filename: node.filename().map(str::to_string),
            content: content.to_string(),
        })
        .await?;

        // 不带文件名的卷 / 章节节点表示新建
        let created = match node {
            NodeRef::Volume { filename: None } => Some(self.create_volume(project).await?),
            NodeRef::Script { filename: None } => Some(self.create_chapter(project, 1).await?),
            _ => None,
        };
        let filename = match created {
            Some(filename) if content.is_empty() => return Ok(filename),
            Some(filename) => filename,
            None => node.filename().map(str::to_string),
        };

        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;

        match (node, filename.as_deref()) {
            (NodeRef::Master, _) => state.structure.master_outline = content.to_string(),
            (NodeRef::Volume { .. }, Some(name)) => {
                let volume = state
                    .structure
                    .volumes
                    .iter_mut()
                    .find(|v| v.filename.as_deref() == Some(name))
                    .ok_or_else(|| ApiError::status(404, "File not found"))?;
                volume.content = content.to_string();
            }
            (NodeRef::Script { .. }, Some(name)) => {
                let script = state
                    .structure
                    .volumes
                    .iter_mut()
                    .flat_map(|v| v.scripts.iter_mut())
                    .find(|s| s.filename.as_deref() == Some(name))
                    .ok_or_else(|| ApiError::status(404, "File not found"))?;
                script.content = content.to_string();
            }
            (_, None) => return Err(ApiError::status(400, "Content required")),
        }

        state.touch(
            filename
                .clone()
                .unwrap_or_else(|| "master_outline.md".to_string()),
        );
        Ok(filename)
    }

    async fn create_volume(&self, project: &ProjectId) -> Result<Option<String>, ApiError> {
        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;

        let vol_num = state.structure.next_volume_number();
        let filename = format!("volume_{:02}.md", vol_num);
        state.structure.volumes.push(Volume {
            vol_num,
            content: format!("# 第{}卷\n", vol_num),
            filename: Some(filename.clone()),
            scripts: Vec::new(),
        });
        state.touch(filename.clone());

        tracing::debug!(project = %project, vol_num, "Volume created");
        Ok(Some(filename))
    }

    async fn create_chapter(
        &self,
        project: &ProjectId,
        vol_num: u32,
    ) -> Result<Option<String>, ApiError> {
        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;

        let volume = state
            .structure
            .volumes
            .iter_mut()
            .find(|v| v.vol_num == vol_num)
            .ok_or_else(|| ApiError::status(404, "Volume not found"))?;
        let script_num = volume.scripts.iter().map(|s| s.script_num).max().unwrap_or(0) + 1;
        let filename = format!("v{:02}_s{:02}.md", vol_num, script_num);
        volume.scripts.push(Script {
            script_num,
            content: format!("## 第{}章大纲\n", script_num),
            filename: Some(filename.clone()),
            word_count: 0,
        });
        state.touch(filename.clone());

        tracing::debug!(project = %project, vol_num, script_num, "Chapter created");
        Ok(Some(filename))
    }

    async fn get_chapter(&self, project: &ProjectId, chapter_num: u32) -> Result<String, ApiError> {
        let state = self
            .projects
            .get(project.as_str())
            .ok_or_else(project_not_found)?;
        state
            .chapters
            .get(&chapter_num)
            .cloned()
            .ok_or_else(|| ApiError::status(404, "File not found"))
    }

    async fn save_chapter(
        &self,
        project: &ProjectId,
        chapter_num: u32,
        content: &str,
    ) -> Result<(), ApiError> {
        self.record_save(SaveCall::Chapter {
            chapter: chapter_num,
            content: content.to_string(),
        })
        .await?;

        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;

        state.snapshot(self.version_id(), chapter_num, content, "自动保存");
        let words = word_count(content) as u64;
        let previous = state
            .chapters
            .insert(chapter_num, content.to_string())
            .map(|old| word_count(&old) as u64)
            .unwrap_or(0);
        let today = Local::now().format("%Y-%m-%d").to_string();
        *state.daily.entry(today).or_default() += words.saturating_sub(previous);
        set_script_words(&mut state.structure, chapter_num, words);
        state.touch(chapter_filename(chapter_num));
        Ok(())
    }

    async fn generate_structure(
        &self,
        project: &ProjectId,
        master_outline: &str,
        volume_count: u32,
    ) -> Result<String, ApiError> {
        if master_outline.trim().is_empty() {
            return Err(ApiError::status(400, "总纲不能为空"));
        }
        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;

        state.structure.master_outline = master_outline.to_string();
        state.structure.volumes = (1..=volume_count)
            .map(|vol_num| Volume {
                vol_num,
                content: format!("# 第{}卷\n", vol_num),
                filename: Some(format!("volume_{:02}.md", vol_num)),
                scripts: (1..=3)
                    .map(|n| {
                        let script_num = (vol_num - 1) * 3 + n;
                        Script {
                            script_num,
                            content: format!("## 第{}章大纲\n", script_num),
                            filename: Some(format!("v{:02}_s{:02}.md", vol_num, script_num)),
                            word_count: 0,
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(format!("已生成 {} 卷结构", volume_count))
    }
}

// ============================================================================
// Generation
// ============================================================================

#[async_trait]
impl GenerationApiPort for InMemoryBackend {
    async fn start_generation(&self, request: StartGenerationRequest) -> Result<String, ApiError> {
        let queue_id = Uuid::new_v4().to_string();
        lock(&self.generation_requests).push(request.clone());
        self.queued_generations.insert(queue_id.clone(), request);
        Ok(queue_id)
    }

    async fn open_generation_stream(
        &self,
        queue_id: &str,
    ) -> Result<EventStream<GenerationEvent>, ApiError> {
        let (_, request) = self
            .queued_generations
            .remove(queue_id)
            .ok_or_else(|| ApiError::status(404, "任务不存在"))?;
        let scripted = lock(&self.generation_script)
            .take()
            .unwrap_or_else(|| default_generation(&request));
        Ok(self.open_scripted(scripted))
    }

    async fn create_batch(&self, request: CreateBatchRequest) -> Result<String, ApiError> {
        let job_id = Uuid::new_v4().to_string();
        lock(&self.batch_requests).push(request.clone());
        self.queued_batches.insert(job_id.clone(), request);
        Ok(job_id)
    }

    async fn open_batch_stream(&self, task_id: &str) -> Result<EventStream<BatchEvent>, ApiError> {
        let (_, request) = self
            .queued_batches
            .remove(task_id)
            .ok_or_else(|| ApiError::status(404, "任务不存在"))?;
        let scripted = lock(&self.batch_script)
            .take()
            .unwrap_or_else(|| default_batch(&request));
        Ok(self.open_scripted(scripted))
    }
}

// ============================================================================
// Worldbook
// ============================================================================

#[async_trait]
impl WorldbookApiPort for InMemoryBackend {
    async fn list_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError> {
        Ok(self
            .cards
            .get(project.as_str())
            .map(|cards| cards.clone())
            .unwrap_or_default())
    }

    async fn create_card(&self, project: &ProjectId, draft: &CardDraft) -> Result<Card, ApiError> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::status(400, "名称不能为空"));
        }
        Ok(self.insert_card(project.as_str(), draft))
    }

    async fn update_card(
        &self,
        project: &ProjectId,
        id: &CardId,
        draft: &CardDraft,
    ) -> Result<Card, ApiError> {
        let mut cards = self
            .cards
            .get_mut(project.as_str())
            .ok_or_else(|| ApiError::status(404, "Card not found"))?;
        let card = cards
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ApiError::status(404, "Card not found"))?;
        *card = draft.clone().into_card(id.clone());
        Ok(card.clone())
    }

    async fn delete_card(&self, project: &ProjectId, id: &CardId) -> Result<(), ApiError> {
        let mut cards = self
            .cards
            .get_mut(project.as_str())
            .ok_or_else(|| ApiError::status(404, "Card not found"))?;
        let before = cards.len();
        cards.retain(|c| &c.id != id);
        if cards.len() == before {
            return Err(ApiError::status(404, "Card not found"));
        }
        Ok(())
    }

    /// 每个有正文的章节提取一张事件卡
    async fn extract_cards(&self, project: &ProjectId) -> Result<Vec<Card>, ApiError> {
        let chapters: Vec<(u32, String)> = {
            let state = self
                .projects
                .get(project.as_str())
                .ok_or_else(project_not_found)?;
            state
                .chapters
                .iter()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(num, text)| (*num, text.clone()))
                .collect()
        };

        Ok(chapters
            .into_iter()
            .map(|(num, text)| {
                let summary: String = text.chars().take(30).collect();
                let draft = CardDraft::new(format!("第{}章事件", num), CardType::Event)
                    .with_content(summary)
                    .with_tags(vec!["自动提取".to_string()]);
                self.insert_card(project.as_str(), &draft)
            })
            .collect())
    }
}

// ============================================================================
// Export
// ============================================================================

#[async_trait]
impl ExportApiPort for InMemoryBackend {
    async fn export(&self, project: &ProjectId, format: ExportFormat) -> Result<String, ApiError> {
        let text = {
            let state = self
                .projects
                .get(project.as_str())
                .ok_or_else(|| ApiError::status(404, "项目不存在"))?;
            let structure = &state.structure;

            let mut text = format!("{}\n\n{}\n", structure.title, structure.master_outline);
            for volume in &structure.volumes {
                text.push_str(&format!("\n第{}卷\n", volume.vol_num));
                for script in &volume.scripts {
                    text.push_str(&format!("\n第{}章\n", script.script_num));
                    if let Some(body) = state.chapters.get(&script.script_num) {
                        text.push_str(body);
                        text.push('\n');
                    }
                }
            }
            text
        };

        let filename = format!("{}.{}", project, format);
        self.exports
            .insert((project.to_string(), filename.clone()), text.into_bytes());
        Ok(filename)
    }

    async fn download(&self, project: &ProjectId, filename: &str) -> Result<Vec<u8>, ApiError> {
        self.exports
            .get(&(project.to_string(), filename.to_string()))
            .map(|bytes| bytes.clone())
            .ok_or_else(|| ApiError::status(404, "File not found"))
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[async_trait]
impl StatisticsApiPort for InMemoryBackend {
    async fn statistics(&self, project: &ProjectId) -> Result<Statistics, ApiError> {
        let state = self
            .projects
            .get(project.as_str())
            .ok_or_else(project_not_found)?;
        Ok(Statistics {
            total_words: state
                .chapters
                .values()
                .map(|text| word_count(text) as u64)
                .sum(),
            total_chapters: state.structure.total_chapters() as u64,
            daily_words: state.daily.clone(),
        })
    }

    /// 最近 7 天（含今天），按日期升序
    async fn daily(&self, project: &ProjectId) -> Result<Vec<DailyWords>, ApiError> {
        let state = self
            .projects
            .get(project.as_str())
            .ok_or_else(project_not_found)?;
        let today = Local::now().date_naive();
        Ok((0..7)
            .rev()
            .map(|days| {
                let date = (today - ChronoDuration::days(days))
                    .format("%Y-%m-%d")
                    .to_string();
                let words = state.daily.get(&date).copied().unwrap_or(0);
                DailyWords { date, words }
            })
            .collect())
    }

    async fn recent(&self, project: &ProjectId) -> Result<Vec<RecentEdit>, ApiError> {
        self.projects
            .get(project.as_str())
            .map(|state| state.recent.clone())
            .ok_or_else(project_not_found)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[async_trait]
impl SettingsApiPort for InMemoryBackend {
    async fn global_settings(&self) -> Result<GlobalSettings, ApiError> {
        let settings = lock(&self.settings);
        let mut available_models = BTreeMap::new();
        available_models.insert(
            "offline".to_string(),
            vec![ModelInfo {
                name: "scripted".to_string(),
                context: Some(8192),
                desc: Some("内存回放".to_string()),
            }],
        );
        Ok(GlobalSettings {
            current_model: Some("scripted".to_string()),
            current_provider: Some("offline".to_string()),
            generation_config: settings.params.clone(),
            safety_settings: settings.safety.clone(),
            config_presets: settings.presets.clone(),
            available_models,
            api_keys_configured: BTreeMap::new(),
        })
    }

    async fn generation_params(&self) -> Result<GenerationParamsView, ApiError> {
        let settings = lock(&self.settings);
        Ok(GenerationParamsView {
            config: settings.params.clone(),
            presets: settings.presets.clone(),
        })
    }

    async fn update_generation_params(
        &self,
        params: &GenerationParams,
    ) -> Result<GenerationParams, ApiError> {
        let mut settings = lock(&self.settings);
        let current = &mut settings.params;
        if params.temperature.is_some() {
            current.temperature = params.temperature;
        }
        if params.max_tokens.is_some() {
            current.max_tokens = params.max_tokens;
        }
        if params.top_p.is_some() {
            current.top_p = params.top_p;
        }
        if params.top_k.is_some() {
            current.top_k = params.top_k;
        }
        if params.theme.is_some() {
            current.theme = params.theme.clone();
        }
        Ok(current.clone())
    }

    async fn apply_preset(&self, name: &str) -> Result<GenerationParams, ApiError> {
        let mut settings = lock(&self.settings);
        let preset = settings
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::status(404, "预设不存在"))?;
        let current = &mut settings.params;
        current.temperature = preset.temperature.or(current.temperature);
        current.max_tokens = preset.max_tokens.or(current.max_tokens);
        current.top_p = preset.top_p.or(current.top_p);
        current.top_k = preset.top_k.or(current.top_k);
        Ok(current.clone())
    }

    async fn safety_settings(&self) -> Result<SafetySettings, ApiError> {
        Ok(lock(&self.settings).safety.clone())
    }

    async fn update_safety_settings(
        &self,
        settings: &SafetySettings,
    ) -> Result<SafetySettings, ApiError> {
        let mut state = lock(&self.settings);
        let safety = &mut state.safety;
        if settings.harm_block_threshold.is_some() {
            safety.harm_block_threshold = settings.harm_block_threshold.clone();
        }
        if settings.enable_content_filter.is_some() {
            safety.enable_content_filter = settings.enable_content_filter;
        }
        safety
            .extra
            .extend(settings.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(safety.clone())
    }

    async fn system_prompt(&self, project: &ProjectId) -> Result<SystemPrompt, ApiError> {
        Ok(match self.system_prompts.get(project.as_str()) {
            Some(content) => SystemPrompt {
                content: content.clone(),
                exists: true,
            },
            None => SystemPrompt::default(),
        })
    }

    async fn save_system_prompt(&self, project: &ProjectId, content: &str) -> Result<(), ApiError> {
        self.system_prompts
            .insert(project.to_string(), content.to_string());
        Ok(())
    }
}

// ============================================================================
// Chat / Versions
// ============================================================================

#[async_trait]
impl ChatApiPort for InMemoryBackend {
    async fn chat(
        &self,
        project: &ProjectId,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::status(400, "消息不能为空"));
        }
        if !self.projects.contains_key(project.as_str()) {
            return Err(project_not_found());
        }
        lock(&self.chat_requests).push((message.to_string(), history.to_vec()));
        Ok(format!(
            "关于「{}」：可以先写清人物的动机，再安排一个意外推动情节。",
            message
        ))
    }
}

/// 只有章节正文（`chapter_NNN.md`）带版本
#[async_trait]
impl VersionApiPort for InMemoryBackend {
    async fn list_versions(
        &self,
        project: &ProjectId,
        path: &str,
    ) -> Result<Vec<FileVersion>, ApiError> {
        let state = self
            .projects
            .get(project.as_str())
            .ok_or_else(project_not_found)?;
        let versions = chapter_from_path(path)
            .and_then(|chapter| state.versions.get(&chapter_filename(chapter)))
            .map(|versions| versions.iter().map(|v| v.version.clone()).collect())
            .unwrap_or_default();
        Ok(versions)
    }

    async fn restore_version(
        &self,
        project: &ProjectId,
        path: &str,
        version_id: &str,
    ) -> Result<bool, ApiError> {
        let mut state = self
            .projects
            .get_mut(project.as_str())
            .ok_or_else(project_not_found)?;
        let Some(chapter) = chapter_from_path(path) else {
            return Ok(false);
        };
        let Some(content) = state
            .versions
            .get(&chapter_filename(chapter))
            .and_then(|versions| versions.iter().find(|v| v.version.version_id == version_id))
            .map(|v| v.content.clone())
        else {
            return Ok(false);
        };

        if let Some(current) = state.chapters.get(&chapter).cloned() {
            state.snapshot(
                self.version_id(),
                chapter,
                &current,
                &format!("回滚前备份 (恢复到 {})", version_id),
            );
        }
        set_script_words(&mut state.structure, chapter, word_count(&content) as u64);
        state.chapters.insert(chapter, content);
        state.touch(chapter_filename(chapter));
        Ok(true)
    }
}

// ============================================================================
// Genesis
// ============================================================================

#[async_trait]
impl GenesisApiPort for InMemoryBackend {
    async fn propose(&self, inspiration: &str) -> Result<Vec<Proposal>, ApiError> {
        let inspiration = inspiration.trim();
        if inspiration.is_empty() {
            return Err(ApiError::status(400, "灵感不能为空"));
        }
        let seed: String = inspiration.chars().take(4).collect();

        Ok([("启程", "玄幻"), ("风云", "武侠"), ("归来", "都市")]
            .iter()
            .map(|(suffix, genre)| {
                let title = format!("{}{}", seed, suffix);
                Proposal {
                    config_yaml: format!(
                        "title: {}\ngenre: {}\ninspiration: {}\n",
                        title, genre, inspiration
                    ),
                    core_positioning: format!("{}题材，围绕「{}」展开", genre, inspiration),
                    highlights: serde_json::json!([
                        format!("{}世界观", genre),
                        "成长主线"
                    ]),
                    introduction: format!("一个关于{}的故事。", inspiration),
                    title,
                }
            })
            .collect())
    }

    async fn init_project(&self, project_name: &str, config_yaml: &str) -> Result<(), ApiError> {
        if project_name.trim().is_empty() || config_yaml.trim().is_empty() {
            return Err(ApiError::status(400, "缺少参数"));
        }

        let title = yaml_field(config_yaml, "title").unwrap_or_else(|| project_name.to_string());
        let genre = yaml_field(config_yaml, "genre").unwrap_or_default();
        if !self.projects.contains_key(project_name) {
            self.seed_project(
                Project {
                    name: project_name.to_string(),
                    title: title.clone(),
                    genre: genre.clone(),
                    ..Default::default()
                },
                Structure {
                    title,
                    ..Default::default()
                },
            );
        }
        self.system_prompts.insert(
            project_name.to_string(),
            format!("你是一位擅长{}题材的小说作家。", genre),
        );

        tracing::info!(project = %project_name, "Project initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(name: &str) -> ProjectId {
        ProjectId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_new_nodes_follow_backend_naming() {
        let backend = InMemoryBackend::demo();
        let project = pid("demo");

        assert_eq!(
            backend.create_volume(&project).await.unwrap().as_deref(),
            Some("volume_03.md")
        );
        assert_eq!(
            backend.create_chapter(&project, 3).await.unwrap().as_deref(),
            Some("v03_s01.md")
        );
        let structure = backend.get_structure(&project).await.unwrap();
        assert_eq!(structure.volume(3).unwrap().content, "# 第3卷\n");
        assert_eq!(structure.script(3, 1).unwrap().content, "## 第1章大纲\n");

        assert!(backend.create_chapter(&project, 9).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_saves_are_still_logged() {
        let backend = InMemoryBackend::demo();
        let project = pid("demo");
        backend.set_fail_saves(true);

        let err = backend.save_chapter(&project, 1, "新正文").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert_eq!(backend.save_calls().len(), 1);
        assert_ne!(backend.get_chapter(&project, 1).await.unwrap(), "新正文");

        backend.set_fail_saves(false);
        backend.save_chapter(&project, 1, "新正文").await.unwrap();
        assert_eq!(backend.get_chapter(&project, 1).await.unwrap(), "新正文");
        let structure = backend.get_structure(&project).await.unwrap();
        assert_eq!(structure.script(1, 1).unwrap().word_count, 3);
    }

    #[tokio::test]
    async fn test_stream_counts_close_on_drop() {
        let backend = InMemoryBackend::new();
        backend.script_generation(
            vec![
                GenerationEvent::Chunk {
                    content: "a".to_string(),
                },
                GenerationEvent::Done,
            ],
            Duration::ZERO,
        );
        let queue = backend
            .start_generation(StartGenerationRequest::content(pid("p"), "大纲", 1))
            .await
            .unwrap();
        let mut stream = backend.open_generation_stream(&queue).await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert_eq!(backend.streams_opened(), 1);
        assert_eq!(backend.streams_closed(), 0);

        drop(stream);
        assert_eq!(backend.streams_closed(), 1);

        // queue_id 只能消费一次
        assert!(backend.open_generation_stream(&queue).await.is_err());
    }

    #[tokio::test]
    async fn test_default_generation_ends_with_complete() {
        let backend = InMemoryBackend::demo();
        let queue = backend
            .start_generation(StartGenerationRequest::content(pid("demo"), "遇到老者", 2))
            .await
            .unwrap();
        let events: Vec<_> = backend
            .open_generation_stream(&queue)
            .await
            .unwrap()
            .collect()
            .await;

        assert!(matches!(events[0], Ok(GenerationEvent::Start { .. })));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                Ok(GenerationEvent::Chunk { content }) => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert!(text.contains("遇到老者"));
        match events.last() {
            Some(Ok(GenerationEvent::Complete { word_count, .. })) => {
                assert_eq!(*word_count, text.chars().count() as u64)
            }
            other => panic!("unexpected last event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_genesis_init_registers_project() {
        let backend = InMemoryBackend::new();
        let proposals = backend.propose("少年修仙").await.unwrap();
        assert_eq!(proposals.len(), 3);
        assert!(proposals[0].config_yaml.contains("genre: 玄幻"));

        backend
            .init_project("少年修仙启程", &proposals[0].config_yaml)
            .await
            .unwrap();
        let project = backend.get_project(&pid("少年修仙启程")).await.unwrap();
        assert_eq!(project.title, "少年修仙启程");
        assert_eq!(project.genre, "玄幻");
        assert!(backend.system_prompt(&pid("少年修仙启程")).await.unwrap().exists);

        assert!(backend.propose("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_chapter_saves_are_versioned_and_restorable() {
        let backend = InMemoryBackend::demo();
        let project = pid("demo");
        backend.save_chapter(&project, 1, "第二稿").await.unwrap();

        let versions = backend
            .list_versions(&project, "content/chapter_001.md")
            .await
            .unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].message, "初始版本");
        assert_eq!(versions[1].message, "自动保存");

        assert!(backend
            .restore_version(&project, "chapter_001.md", &versions[0].version_id)
            .await
            .unwrap());
        assert!(backend
            .get_chapter(&project, 1)
            .await
            .unwrap()
            .starts_with("清晨的雾气"));
        let after = backend.list_versions(&project, "chapter_001.md").await.unwrap();
        assert_eq!(after.len(), 3);
        assert!(after[2].message.starts_with("回滚前备份"));

        assert!(!backend
            .restore_version(&project, "chapter_001.md", "nope")
            .await
            .unwrap());
        assert!(backend
            .list_versions(&project, "outline.md")
            .await
            .unwrap()
            .is_empty());
    }
}
