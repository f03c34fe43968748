//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use chrono::{Local, TimeZone};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时默认 `info`，详细模式为 `debug`。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 把剩余毫秒数格式化为 `mm:ss`，负数按 0 处理
pub fn format_remaining(milliseconds: i64) -> String {
    let total_seconds = milliseconds.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// 把 Unix 毫秒时间戳格式化为本地时间
pub fn format_local_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// 记录程序启动信息
pub fn log_startup(session_allowance: u32, max_per_batch: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 定时打开频道链接");
    info!("📊 会话额度: {} | 单批上限: {}", session_allowance, max_per_batch);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 本批将处理的数量
/// - `candidates`: 候选链接总数
/// - `available`: 会话剩余额度
pub fn log_batch_start(total: u32, candidates: usize, available: u32) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理本批: {} 个链接", total);
    info!("📄 候选: {} 个 | 会话剩余额度: {}", candidates, available);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `success`: 成功数量
/// - `total`: 本批总数
/// - `used`: 会话已用
/// - `max`: 会话额度
pub fn log_batch_complete(success: u32, total: u32, used: u32, max: u32) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 本批完成: 成功 {}/{}", success, total);
    info!("📊 会话已用: {}/{}", used, max);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
