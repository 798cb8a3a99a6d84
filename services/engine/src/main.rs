use anyhow::{Context, Result};
use checkin_agent::{AnalysisService, IngestQueue, ProjectManager, SubmitOutcome};
use checkin_core::{Clock, GapAnalysisRequest, ProcessUpdateRequest, SummaryRequest, SummaryType};
use checkin_storage::ResultCache;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod replay;
mod settings;

use settings::Settings;

// =========================================================================
// 1. 命令行
// =========================================================================
#[derive(Parser, Debug)]
#[command(name = "checkin", about = "Weekly check-in tracker")]
struct Cli {
    /// 配置文件 (默认尝试 config/default.toml)
    #[arg(long, env = "CHECKIN_CONFIG")]
    config: Option<PathBuf>,

    /// 输入结束后输出缺口分析与汇总报告
    #[arg(long)]
    report: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 从标准输入逐行读取 JSON 签到 (默认)
    Stdin,
    /// 回放目录中的 Markdown 签到
    Replay {
        dir: PathBuf,
        /// 路径子串过滤 (忽略大小写)
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// 两条消息之间的间隔
        #[arg(long, default_value_t = 250)]
        delay_ms: u64,
        /// 固定回放时钟，例如 "2025-03-03 09:00:00"
        #[arg(long)]
        at: Option<String>,
    },
}

// =========================================================================
// 2. 日志配置 (输出到终端 + 文件)
// =========================================================================
fn init_logging(log_dir: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // 1. 文件输出器：每天生成一个新的日志文件 (logs/checkin.log.2025-xx-xx)
    let file_appender = tracing_appender::rolling::daily(log_dir, "checkin.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 2. 终端层：标准输出留给 JSON 回执，日志走 stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .compact();

    // 3. 文件层
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(console_layer)
        .with(file_layer)
        .init();

    guard // 必须返回 guard，否则日志线程会立即销毁
}

// =========================================================================
// 3. 输入源
// =========================================================================

/// 提交一条签到；回执到达后失效相关缓存并输出到 stdout
async fn submit(
    queue: &IngestQueue,
    service: &Arc<AnalysisService>,
    replies: &mut JoinSet<()>,
    request: ProcessUpdateRequest,
) {
    let employee = request.employee_id.clone();
    match queue.submit(request).await {
        SubmitOutcome::Queued(ticket) => {
            let service = service.clone();
            replies.spawn(async move {
                let id = ticket.id.clone();
                let Some(response) = ticket.wait().await else {
                    warn!("[ENGINE] {} dropped before processing", id);
                    return;
                };
                service.invalidate_for_update(&response.assigned_projects).await;
                match serde_json::to_string(&response) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("[ENGINE] Failed to encode response {}: {}", id, e),
                }
            });
        }
        SubmitOutcome::Rejected(reason) => {
            warn!("[ENGINE] Update from {} rejected: {:?}", employee, reason);
        }
    }
}

async fn read_stdin(queue: &IngestQueue, service: &Arc<AnalysisService>, replies: &mut JoinSet<()>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ProcessUpdateRequest>(&line) {
            Ok(request) => submit(queue, service, replies, request).await,
            Err(e) => warn!("[ENGINE] Skipping line {}: {}", line_no, e),
        }
    }
    Ok(())
}

async fn run_replay(
    queue: &IngestQueue,
    service: &Arc<AnalysisService>,
    replies: &mut JoinSet<()>,
    dir: PathBuf,
    pattern: Option<String>,
    limit: usize,
    delay_ms: u64,
) -> Result<()> {
    let items = replay::collect_markdown(&dir, pattern.as_deref(), limit)?;
    info!("[REPLAY] Found {} markdown files under {}", items.len(), dir.display());

    for item in items {
        info!("[REPLAY] → {}", item.path.display());
        submit(queue, service, replies, item.request).await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
    Ok(())
}

// =========================================================================
// 4. 后台任务
// =========================================================================

/// 周期性缺口扫描：发现 high 以上的缺口时告警
fn spawn_gap_scan(service: Arc<AnalysisService>, interval: Duration, token: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let gaps = service.find_critical_gaps().await;
                    if gaps.is_empty() {
                        info!("[ENGINE] Gap scan: no high-severity gaps");
                    }
                    for gap in gaps {
                        warn!("[ENGINE] Gap scan: [{}] {} ({})", gap.severity, gap.description, gap.id);
                    }
                }
            }
        }
    });
}

async fn print_report(service: &AnalysisService, settings: &Settings) -> Result<()> {
    let gaps = service
        .analyze_knowledge_gaps(&GapAnalysisRequest {
            timeframe: settings.analysis.timeframe,
            ..Default::default()
        })
        .await;
    let summary = service
        .generate_summary(&SummaryRequest::new(
            SummaryType::ExecutiveBrief,
            settings.analysis.timeframe,
        ))
        .await;

    let report = serde_json::json!({ "gaps": gaps, "summary": summary });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// =========================================================================
// 5. 主入口 (Main Entry)
// =========================================================================
#[tokio::main]
async fn main() -> Result<()> {
    // A. 加载配置与日志
    dotenv().ok();
    let Cli { config, report, command } = Cli::parse();
    let settings = Settings::load(config.as_deref())?;
    let _log_guard = init_logging(&settings.log_dir);

    info!("Starting check-in engine");

    // B. 组装组件
    let model = settings.llm.build_backend()?;
    let store = settings.storage.build()?;
    info!(
        "[ENGINE] Model: {}, store: {}",
        model.as_ref().map(|m| m.model_name()).unwrap_or("disabled"),
        store.backend_name()
    );

    let manager = Arc::new(ProjectManager::builder().with_model(model).with_store(store).build());
    manager.load_from_store().await;

    let token = CancellationToken::new();
    let cache = Arc::new(ResultCache::new(settings.cache.ttl()));
    let sweeper = cache.spawn_sweeper(settings.cache.sweep_interval(), token.clone());
    let service = Arc::new(AnalysisService::new(manager.clone(), cache));

    if settings.analysis.gap_scan_interval_secs > 0 {
        spawn_gap_scan(
            service.clone(),
            Duration::from_secs(settings.analysis.gap_scan_interval_secs),
            token.clone(),
        );
    }

    let (queue, worker) = IngestQueue::new(settings.ingest.queue_capacity);
    let worker = tokio::spawn(worker.run(manager.clone(), token.clone()));

    // C. 读取输入，Ctrl+C 时提前停止
    let mut replies = JoinSet::new();
    let feed = async {
        match command {
            Some(Command::Replay {
                dir,
                pattern,
                limit,
                delay_ms,
                at,
            }) => {
                if let Some(at) = at {
                    let ms = Clock::parse_str(&at).with_context(|| format!("Unrecognized --at time: {}", at))?;
                    Clock::set_mock_time(ms);
                    info!("[REPLAY] Clock pinned at {}", Clock::format_ms(ms));
                }
                run_replay(&queue, &service, &mut replies, dir, pattern, limit, delay_ms).await
            }
            Some(Command::Stdin) | None => read_stdin(&queue, &service, &mut replies).await,
        }
    };

    let interrupted = tokio::select! {
        result = feed => {
            result?;
            false
        }
        _ = signal::ctrl_c() => {
            warn!("🛑 Ctrl+C received! Shutting down gracefully...");
            true
        }
    };

    // D. 收尾：关闭队列让 worker 处理完剩余签到
    drop(queue);
    if interrupted {
        token.cancel();
    }
    let processed = worker.await.context("Ingest worker panicked")?;
    while replies.join_next().await.is_some() {}
    info!("[ENGINE] Processed {} updates", processed);

    if report && !interrupted {
        print_report(&service, &settings).await?;
    }

    token.cancel();
    sweeper.await.ok();
    Clock::reset();
    info!("👋 Check-in engine shutdown complete.");
    Ok(())
}
