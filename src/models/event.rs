use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::usage_state::UsageState;

/// 批处理向调用方发送的事件
///
/// 序列化形状与浏览器端界面约定一致（`action` 作为标签）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum BatchEvent {
    /// 正在展示第 current/total 个链接
    #[serde(rename = "showCountdown")]
    Progress {
        current: u32,
        total: u32,
        label: String,
        address: String,
        window_seconds: u64,
    },
    /// 批次结束，未触发冷却
    #[serde(rename = "processingCompleteNoCooldown")]
    BatchCompleteNoLockout {
        success_count: u32,
        used: u32,
        max: u32,
        summary: String,
    },
    /// 批次结束，会话额度用尽，冷却开始
    #[serde(rename = "processingCompleteWithCooldown")]
    BatchCompleteWithLockout {
        success_count: u32,
        lockout_until: i64,
        used: u32,
        max: u32,
    },
}

impl BatchEvent {
    /// 是否为批次结束事件
    pub fn is_completion(&self) -> bool {
        !matches!(self, BatchEvent::Progress { .. })
    }
}

pub type EventSender = mpsc::UnboundedSender<BatchEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BatchEvent>;

/// 创建事件通道
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// 一次批处理的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 本次成功打开的数量
    pub success_count: u32,
    /// 结束时的使用状态
    pub final_state: UsageState,
    /// 本次是否触发了冷却
    pub lockout_triggered: bool,
}
