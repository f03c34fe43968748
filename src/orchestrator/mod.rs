//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次调度和对外入口，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用装配
//! - 打开状态存储、连接浏览器
//! - 组装 QuotaManager / BatchScheduler / Controller
//!
//! ### `controller` - 控制器
//! - 开始批次、查询状态、清空状态、取消
//! - 单飞标志：同一时刻最多一个批次
//!
//! ### `batch_scheduler` - 批次调度器
//! - 计算本批数量
//! - 严格顺序地处理每个链接，控制节奏
//! - 批次结束时判断是否进入冷却
//!
//! ## 层次关系
//!
//! ```text
//! controller (处理开始 / 状态 / 清空)
//!     ↓
//! batch_scheduler (处理 Vec<String>)
//!     ↓
//! workflow::PresentFlow (处理单个链接)
//!     ↓
//! services (能力层：quota / scan / load)
//!     ↓
//! infrastructure (基础设施：KvStore / TabOpener / Clock)
//! ```

pub mod app;
pub mod batch_scheduler;
pub mod controller;

// 重新导出主要类型
pub use app::App;
pub use batch_scheduler::{batch_size, BatchScheduler, ScheduleSettings, NOTHING_TO_DO_MESSAGE};
pub use controller::{Controller, StartedBatch};
