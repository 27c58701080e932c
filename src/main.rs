//! Novel Studio 命令行
//!
//! 在终端里驱动编辑会话、批量生成、设定卡片、导出与统计。
//! `--offline` 使用带示例项目的内存后端。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use novel_studio::application::ports::{ExportFormat, NotificationLevel};
use novel_studio::application::{
    ApplyPreset, ApplyPresetHandler, BackendPorts, BatchMonitor, ChatSession, Confirmation,
    EditorSession, ExportProject, ExportProjectHandler, GetDashboard, GetDashboardHandler,
    GetGlobalSettings, GetGlobalSettingsHandler, ProjectStore, ShortcutDispatcher,
    VersionHistory, WorldbookManager,
};
use novel_studio::config::{load_config, load_config_from_path, print_config, AppConfig};
use novel_studio::domain::project::{ProjectId, Selection};
use novel_studio::domain::text_stats::{line_count, word_count};
use novel_studio::domain::worldbook::{CardDraft, CardFilter, CardId, CardType, CategoryFilter};
use novel_studio::infrastructure::{HttpBackendClient, InMemoryBackend, NotificationPublisher};

#[derive(Parser)]
#[command(name = "novel-studio", version, about = "AI 小说创作客户端")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, env = "NOVEL_STUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// 使用内存后端（带示例项目 demo）
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 列出项目
    Projects,
    /// 打印卷/章结构树
    Structure { project: String },
    /// 打印纲要与正文
    Show {
        project: String,
        #[arg(long)]
        volume: Option<u32>,
        #[arg(long)]
        chapter: Option<u32>,
    },
    /// 编辑章纲或正文并保存
    Write {
        project: String,
        #[arg(long)]
        volume: u32,
        #[arg(long)]
        chapter: u32,
        #[arg(long)]
        outline: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// 流式生成章节正文并保存
    Generate {
        project: String,
        #[arg(long)]
        volume: u32,
        #[arg(long)]
        chapter: u32,
        #[arg(long)]
        outline: Option<String>,
    },
    /// 批量生成
    Batch {
        project: String,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        count: u32,
    },
    /// 设定卡片列表
    Cards {
        project: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    /// 新建设定卡片
    CardAdd {
        project: String,
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        card_type: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// 删除设定卡片
    CardRm {
        project: String,
        id: String,
        /// 确认删除
        #[arg(long)]
        yes: bool,
    },
    /// 导出并下载
    Export {
        project: String,
        format: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// 字数统计
    Stats { project: String },
    /// 全局设置
    Settings {
        /// 应用预设
        #[arg(long)]
        preset: Option<String>,
    },
    /// 与写作助手对话；不给消息时从标准输入逐行读取
    Chat {
        project: String,
        /// 依次发送的消息，每条一轮
        messages: Vec<String>,
    },
    /// 列出文件的历史版本
    Versions {
        project: String,
        /// 相对项目目录的路径，如 chapter_001.md
        path: String,
    },
    /// 恢复文件到某个历史版本
    VersionRestore {
        project: String,
        path: String,
        version_id: String,
        /// 确认覆盖当前内容
        #[arg(long)]
        yes: bool,
    },
    /// 快捷键表
    Shortcuts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match cli.config.as_deref() {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    let ports = if cli.offline {
        tracing::info!("Running offline with the in-memory backend");
        BackendPorts::from_backend(InMemoryBackend::demo().arc())
    } else {
        BackendPorts::from_backend(Arc::new(HttpBackendClient::new(&config.backend)?))
    };

    let publisher = Arc::new(NotificationPublisher::default());
    let mut notifications = publisher.subscribe();
    let toasts = tokio::spawn(async move {
        while let Ok(n) = notifications.recv().await {
            let tag = match n.level {
                NotificationLevel::Info => "i",
                NotificationLevel::Success => "✓",
                NotificationLevel::Warning => "!",
                NotificationLevel::Error => "✗",
            };
            eprintln!("[{}] {}", tag, n.message);
        }
    });

    let result = run(cli.command, &config, ports, publisher).await;

    // 让已发布的通知打印出来
    tokio::time::sleep(Duration::from_millis(20)).await;
    toasts.abort();
    result
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},novel_studio={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // 日志写到 stderr，stdout 只留给命令输出
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn project_id(name: &str) -> anyhow::Result<ProjectId> {
    ProjectId::new(name).map_err(|e| anyhow::anyhow!("Invalid project name: {}", e))
}

async fn run(
    command: Command,
    config: &AppConfig,
    ports: BackendPorts,
    publisher: Arc<NotificationPublisher>,
) -> anyhow::Result<()> {
    match command {
        Command::Projects => {
            let mut store = ProjectStore::new(ports.projects.clone());
            for project in store.fetch_projects().await? {
                println!(
                    "{:<20} {:<24} {:>8} 字  {}",
                    project.name,
                    project.display_title(),
                    project.word_count,
                    project.modified.as_deref().unwrap_or("-")
                );
            }
        }

        Command::Structure { project } => {
            let structure = ports
                .projects
                .get_structure(&project_id(&project)?)
                .await?
                .normalized();
            println!("{}", structure.title);
            for volume in &structure.volumes {
                println!(
                    "第 {} 卷  ({} 章, {} 字)",
                    volume.vol_num,
                    volume.chapter_count(),
                    volume.word_count()
                );
                for script in &volume.scripts {
                    println!("  第 {} 章  {} 字", script.script_num, script.word_count);
                }
            }
            println!(
                "共 {} 章, {} 字",
                structure.total_chapters(),
                structure.total_words()
            );
        }

        Command::Show {
            project,
            volume,
            chapter,
        } => {
            let session = open_session(&project, config, &ports, &publisher).await?;
            let selection = match (volume, chapter) {
                (Some(volume), Some(chapter)) => Selection::chapter(volume, chapter),
                (Some(volume), None) => Selection::Volume(volume),
                (None, None) => Selection::Master,
                (None, Some(_)) => anyhow::bail!("--chapter requires --volume"),
            };
            session.select(selection).await?;

            let outline = session.outline();
            println!("== {} ==", selection.label());
            println!("{}", outline);
            if selection.is_chapter() {
                let body = session.chapter();
                println!("== 正文 ({} 字, {} 行) ==", word_count(&body), line_count(&body));
                println!("{}", body);
            }
            session.close();
        }

        Command::Write {
            project,
            volume,
            chapter,
            outline,
            body,
        } => {
            let session = open_session(&project, config, &ports, &publisher).await?;
            session.select(Selection::chapter(volume, chapter)).await?;
            if let Some(outline) = outline {
                session.edit_outline(outline)?;
            }
            if let Some(body) = body {
                session.edit_chapter(body)?;
            }
            session.save().await?;
            let (outline_words, chapter_words) = session.word_counts();
            println!(
                "{}: 章纲 {} 字, 正文 {} 字 ({})",
                session.selection().label(),
                outline_words,
                chapter_words,
                session.status().label()
            );
            session.close();
        }

        Command::Generate {
            project,
            volume,
            chapter,
            outline,
        } => {
            let session = open_session(&project, config, &ports, &publisher).await?;
            session.select(Selection::chapter(volume, chapter)).await?;
            if let Some(outline) = outline {
                session.edit_outline(outline)?;
            }
            stream_generation(&session).await?;
            session.save().await?;
            session.close();
        }

        Command::Batch {
            project,
            start,
            count,
        } => {
            let monitor = Arc::new(BatchMonitor::new(
                ports.generation.clone(),
                publisher.clone(),
                &config.batch,
            ));
            let project = project_id(&project)?;
            let mut progress = monitor.subscribe();

            let runner = monitor.clone();
            let mut task = tokio::spawn(async move { runner.start(&project, start, count).await });

            let printer = tokio::spawn(async move {
                let mut printed = 0;
                while progress.changed().await.is_ok() {
                    let snapshot = progress.borrow_and_update().clone();
                    for entry in snapshot.log.iter().skip(printed) {
                        println!("{}", entry.display_line());
                    }
                    printed = snapshot.log.len();
                }
            });

            let status = tokio::select! {
                status = &mut task => status?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received interrupt, stopping batch monitor");
                    monitor.stop();
                    task.await?
                }
            };
            // 等打印追上最后一条日志
            tokio::time::sleep(Duration::from_millis(20)).await;
            printer.abort();

            let status = status?;
            println!("状态: {} ({}%)", status.as_str(), monitor.progress().percent());
        }

        Command::Cards {
            project,
            category,
            query,
        } => {
            let mut manager = worldbook(&project, &ports, &publisher)?;
            manager.load().await?;
            let category = match category.as_deref() {
                Some(c) => CategoryFilter::parse(c)
                    .with_context(|| format!("Unknown card category: {}", c))?,
                None => CategoryFilter::All,
            };
            manager.set_filter(CardFilter::new(category, query.unwrap_or_default()));

            for card in manager.visible() {
                let tags = if card.tags.is_empty() {
                    String::new()
                } else {
                    format!("  #{}", card.tags.join(" #"))
                };
                println!("{:<12} [{}] {}{}", card.id.as_str(), card.card_type.label(), card.name, tags);
            }
            let counts = manager.counts();
            println!(
                "显示 {} / 共 {} 张",
                manager.visible().len(),
                counts.get(&None).copied().unwrap_or_default()
            );
        }

        Command::CardAdd {
            project,
            name,
            card_type,
            content,
            tags,
        } => {
            let card_type = CardType::parse(&card_type)
                .with_context(|| format!("Unknown card type: {}", card_type))?;
            let draft = CardDraft::new(name, card_type)
                .with_content(content.unwrap_or_default())
                .with_tags(tags);
            let mut manager = worldbook(&project, &ports, &publisher)?;
            let card = manager.save(None, draft).await?;
            println!("{}", card.id);
        }

        Command::CardRm { project, id, yes } => {
            let confirmation = if yes {
                Confirmation::Confirmed
            } else {
                Confirmation::Declined
            };
            let mut manager = worldbook(&project, &ports, &publisher)?;
            if !manager.delete(&CardId::new(id), confirmation).await? {
                println!("未删除：需要 --yes 确认");
            }
        }

        Command::Export {
            project,
            format,
            out,
        } => {
            let format = ExportFormat::from_extension(&format)
                .with_context(|| format!("Unsupported export format: {}", format))?;
            let path = ExportProjectHandler::new(ports.export.clone())
                .handle(ExportProject {
                    project: project_id(&project)?,
                    format,
                    out_dir: out,
                })
                .await?;
            println!("{}", path.display());
        }

        Command::Stats { project } => {
            let dashboard = GetDashboardHandler::new(ports.statistics.clone())
                .handle(GetDashboard {
                    project: project_id(&project)?,
                })
                .await?;
            println!(
                "总字数 {}  总章节 {}",
                dashboard.statistics.total_words, dashboard.statistics.total_chapters
            );
            let peak = dashboard.peak_daily_words().max(1);
            for day in &dashboard.daily {
                let bar = "█".repeat(((day.words * 30) / peak) as usize);
                println!("{}  {:>6}  {}", day.date, day.words, bar);
            }
            for edit in &dashboard.recent {
                println!("{}  {}", edit.modified, edit.filename);
            }
        }

        Command::Settings { preset } => {
            if let Some(name) = preset {
                let params = ApplyPresetHandler::new(ports.settings.clone())
                    .handle(ApplyPreset { name })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&params)?);
            } else {
                let settings = GetGlobalSettingsHandler::new(ports.settings.clone())
                    .handle(GetGlobalSettings)
                    .await?;
                println!(
                    "模型: {} ({})",
                    settings.current_model.as_deref().unwrap_or("-"),
                    settings.current_provider.as_deref().unwrap_or("-")
                );
                println!(
                    "生成参数: {}",
                    serde_json::to_string(&settings.generation_config)?
                );
                println!(
                    "预设: {}",
                    settings
                        .config_presets
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        Command::Chat { project, messages } => {
            let mut chat = ChatSession::new(project_id(&project)?, ports.chat.clone());
            if messages.is_empty() {
                use tokio::io::AsyncBufReadExt;

                let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
                while let Some(line) = lines.next_line().await? {
                    if line.trim().is_empty() {
                        continue;
                    }
                    println!("{}", chat.send(&line).await?.message.content);
                }
            } else {
                for message in messages {
                    println!("> {}", message);
                    println!("{}", chat.send(&message).await?.message.content);
                }
            }
        }

        Command::Versions { project, path } => {
            let history = VersionHistory::new(
                project_id(&project)?,
                ports.versions.clone(),
                publisher.clone(),
            );
            for version in history.list(&path).await? {
                println!(
                    "{:<10} {:<20} {:>6} 字  {}",
                    version.version_id, version.timestamp, version.word_count, version.message
                );
            }
        }

        Command::VersionRestore {
            project,
            path,
            version_id,
            yes,
        } => {
            let confirmation = if yes {
                Confirmation::Confirmed
            } else {
                Confirmation::Declined
            };
            let history = VersionHistory::new(
                project_id(&project)?,
                ports.versions.clone(),
                publisher.clone(),
            );
            if !history.restore(&path, &version_id, confirmation).await? {
                println!("未恢复：需要 --yes 确认");
            }
        }

        Command::Shortcuts => {
            for (chord, action) in ShortcutDispatcher::with_defaults().list() {
                println!("{:<18} {}", chord, action.description());
            }
        }
    }

    Ok(())
}

async fn open_session(
    project: &str,
    config: &AppConfig,
    ports: &BackendPorts,
    publisher: &Arc<NotificationPublisher>,
) -> anyhow::Result<EditorSession> {
    let session = EditorSession::open(
        project_id(project)?,
        ports,
        publisher.clone(),
        &config.editor,
    )
    .await?;
    Ok(session)
}

fn worldbook(
    project: &str,
    ports: &BackendPorts,
    publisher: &Arc<NotificationPublisher>,
) -> anyhow::Result<WorldbookManager> {
    Ok(WorldbookManager::new(
        project_id(project)?,
        ports.worldbook.clone(),
        publisher.clone(),
    ))
}

/// 生成期间轮询正文缓冲区，把新增部分写到 stdout
async fn stream_generation(session: &EditorSession) -> anyhow::Result<()> {
    use std::io::Write;

    let generation = session.generate();
    tokio::pin!(generation);
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    let mut printed = String::new();
    let mut stdout = std::io::stdout();

    let mut flush_new = |printed: &mut String| -> std::io::Result<()> {
        let current = session.chapter();
        match current.strip_prefix(printed.as_str()) {
            Some(tail) if !tail.is_empty() => stdout.write_all(tail.as_bytes())?,
            Some(_) => return Ok(()),
            // complete 事件可能整体替换了正文
            None => {
                writeln!(stdout)?;
                stdout.write_all(current.as_bytes())?;
            }
        }
        stdout.flush()?;
        *printed = current;
        Ok(())
    };

    let outcome = loop {
        tokio::select! {
            outcome = &mut generation => break outcome?,
            _ = ticker.tick() => flush_new(&mut printed)?,
            _ = tokio::signal::ctrl_c() => {
                session.stop_generation();
            }
        }
    };
    flush_new(&mut printed)?;
    println!();

    tracing::info!(success = outcome.is_success(), "Generation command finished");
    Ok(())
}
