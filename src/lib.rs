//! # Timed Link Opener
//!
//! 按配额分批打开频道链接的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源（存储、浏览器、时钟），只暴露能力
//! - `KvStore` - 键值存储（JSON 文件 / 内存）
//! - `TabOpener` - 打开标签页（Chrome / dry-run）
//! - `Clock` - 当前时间（系统 / 手动）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `QuotaManager` - 会话额度与冷却状态机
//! - `link_scanner` - 从网页提取频道链接
//! - `candidate_loader` - 从文件读取候选链接
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个链接"的完整处理流程
//! - `LinkCtx` - 上下文封装（序号 + 地址 + 显示名）
//! - `PresentFlow` - 流程编排（进度事件 → 打开 → 计数 → 停留）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/controller` - 对外入口，单飞控制
//! - `orchestrator/batch_scheduler` - 批次调度，节奏与冷却
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, Tier};
pub use error::{AppError, AppResult};
pub use models::{BatchEvent, BatchOutcome, Decision, DecisionReason, StartAck, UsageState};
pub use orchestrator::{App, BatchScheduler, Controller, StartedBatch};
pub use services::{QuotaManager, QuotaPolicy};
pub use workflow::{LinkCtx, PresentFlow, PresentResult};
