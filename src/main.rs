mod cli;

use std::future::Future;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cli::{Cli, Command};
use timed_link_opener::models::{BatchEvent, EventReceiver};
use timed_link_opener::services::{load_candidates_file, parse_inline, scan_page, CandidateQueue};
use timed_link_opener::utils::logging::{self, format_local_time, format_remaining};
use timed_link_opener::{App, Config, DecisionReason};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    match cli.command {
        Command::Start {
            files,
            links,
            scan,
            dry_run,
        } => {
            let candidates = collect_candidates(&files, links.as_deref(), scan.as_deref()).await?;
            run_start(config, candidates, dry_run).await
        }
        Command::Status => {
            let (app, _rx) = App::initialize(config, false).await?;
            let status = app.controller().check_status().await;
            println!("{}", serde_json::to_string(&status)?);
            match status.reason {
                DecisionReason::HardCooldown => println!(
                    "🔒 冷却中，剩余 {}",
                    format_remaining(status.remaining_ms.unwrap_or(0))
                ),
                DecisionReason::SessionLimitReached => {
                    println!("会话额度已用完 ({}/{})", status.used, status.max)
                }
                _ => println!(
                    "可用 {} 个，会话已用 {}/{}",
                    status.available, status.used, status.max
                ),
            }
            Ok(())
        }
        Command::Clear => {
            let (app, _rx) = App::initialize(config, false).await?;
            app.controller()
                .clear_state()
                .await
                .context("清空使用状态失败")?;
            println!("✓ 使用状态已清空");
            Ok(())
        }
        Command::Scan { url } => {
            for link in scan_page(&url).await? {
                println!("{}", link);
            }
            Ok(())
        }
    }
}

/// 汇总所有来源的候选链接（按出现顺序去重）
async fn collect_candidates(
    files: &[std::path::PathBuf],
    links: Option<&str>,
    scan: Option<&str>,
) -> Result<Vec<String>> {
    let mut queue = CandidateQueue::new();

    for path in files {
        let loaded = load_candidates_file(path)
            .await
            .with_context(|| format!("读取候选文件失败: {}", path.display()))?;
        let added = queue.extend(loaded);
        info!("{}: 新增 {} 个候选链接", path.display(), added);
    }
    if let Some(list) = links {
        queue.extend(parse_inline(list));
    }
    if let Some(page) = scan {
        let found = scan_page(page)
            .await
            .with_context(|| format!("扫描网页失败: {}", page))?;
        queue.extend(found);
    }

    if queue.is_empty() {
        warn!("没有找到有效的候选链接");
    }
    Ok(queue.into_vec())
}

async fn run_start(config: Config, candidates: Vec<String>, dry_run: bool) -> Result<()> {
    let (app, rx) = App::initialize(config, !dry_run).await?;
    let started = app.controller().start_batch(candidates).await;
    println!("{}", serde_json::to_string(&started.ack)?);

    let Some(handle) = started.handle else {
        match started.ack.reason {
            Some(DecisionReason::HardCooldown) => println!(
                "🔒 冷却中，剩余 {}",
                format_remaining(started.ack.remaining_ms.unwrap_or(0))
            ),
            Some(DecisionReason::SessionLimitReached) => println!(
                "会话额度已用完 ({}/{})",
                started.ack.used, started.ack.max
            ),
            _ => println!("未受理"),
        }
        return Ok(());
    };

    let mut rx = rx;
    follow_events(&mut rx, interrupt_signal(), || {
        warn!("收到中断信号，当前链接处理完后停止");
        app.controller().cancel();
    })
    .await?;

    let outcome = handle.await?;
    info!(
        "本次打开 {} 个，会话已用 {}/{}",
        outcome.success_count,
        outcome.final_state.links_used_in_session,
        app.config().session_allowance
    );
    Ok(())
}

/// 等待 Ctrl-C；无法监听时永不返回
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听中断信号: {}", e);
        futures::future::pending::<()>().await;
    }
}

/// 输出事件直到批次结束；中断时调用 `on_interrupt` 后继续输出到结束事件
///
/// 返回是否被中断。
async fn follow_events(
    rx: &mut EventReceiver,
    interrupt: impl Future<Output = ()>,
    on_interrupt: impl FnOnce(),
) -> Result<bool> {
    let interrupted = tokio::select! {
        result = print_events(rx) => {
            result?;
            false
        }
        _ = interrupt => true,
    };
    if interrupted {
        on_interrupt();
        print_events(rx).await?;
    }
    Ok(interrupted)
}

/// 逐行输出事件（JSON + 可读文本），直到批次结束
async fn print_events(rx: &mut EventReceiver) -> Result<()> {
    while let Some(event) = rx.recv().await {
        println!("{}", serde_json::to_string(&event)?);
        match &event {
            BatchEvent::Progress {
                current,
                total,
                label,
                window_seconds,
                ..
            } => println!("▶ [{}/{}] {}（停留 {} 秒）", current, total, label, window_seconds),
            BatchEvent::BatchCompleteNoLockout { summary, .. } => println!("✓ {}", summary),
            BatchEvent::BatchCompleteWithLockout {
                success_count,
                lockout_until,
                ..
            } => println!(
                "✓ 已打开 {} 个，会话额度用完，冷却至 {}",
                success_count,
                format_local_time(*lockout_until)
            ),
        }
        if event.is_completion() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timed_link_opener::models::event_channel;

    fn completion() -> BatchEvent {
        BatchEvent::BatchCompleteNoLockout {
            success_count: 1,
            used: 1,
            max: 15,
            summary: "1 channels presented. 1/15 session links used.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_interrupt_still_drains_to_completion() {
        let (tx, mut rx) = event_channel();
        let mut cancelled = false;

        let sender = tokio::spawn(async move {
            tokio::task::yield_now().await;
            tx.send(completion()).unwrap();
            tx
        });

        let interrupted = follow_events(&mut rx, async {}, || cancelled = true)
            .await
            .unwrap();
        let tx = sender.await.unwrap();

        assert!(interrupted);
        assert!(cancelled);
        assert!(rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn test_completion_without_interrupt() {
        let (tx, mut rx) = event_channel();
        tx.send(completion()).unwrap();

        let interrupted = follow_events(&mut rx, std::future::pending(), || {
            panic!("不应触发中断")
        })
        .await
        .unwrap();

        assert!(!interrupted);
    }
}
