//! 命令行定义

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Timed Link Opener - 按配额分批打开频道链接
#[derive(Parser)]
#[command(name = "timed-link-opener", version, about = "按配额分批打开频道链接")]
pub struct Cli {
    /// 配置文件路径（TOML）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// 开始一个批次
    Start {
        /// 候选链接文件（.txt / .csv），可重复
        #[arg(short, long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,

        /// 逗号分隔的链接列表
        #[arg(short, long)]
        links: Option<String>,

        /// 从网页提取链接
        #[arg(short, long, value_name = "URL")]
        scan: Option<String>,

        /// 不连接浏览器，只记录将要打开的链接
        #[arg(long)]
        dry_run: bool,
    },

    /// 查看会话额度和冷却状态
    Status,

    /// 清空使用状态
    Clear,

    /// 提取网页中的频道链接并输出
    Scan {
        #[arg(value_name = "URL")]
        url: String,
    },
}
