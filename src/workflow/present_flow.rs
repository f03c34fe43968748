//! 链接展示流程 - 流程层
//!
//! 核心职责：定义"一个链接"的完整展示流程
//!
//! 流程顺序：
//! 1. 通知界面开始倒计时
//! 2. 打开前台标签页（带超时）
//! 3. 成功则记录一次消耗
//! 4. 等待用户操作窗口结束（无论成功与否）

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::BrowserError;
use crate::infrastructure::TabOpener;
use crate::models::{BatchEvent, EventSender};
use crate::services::QuotaManager;
use crate::workflow::link_ctx::LinkCtx;

/// 链接展示结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    /// 已打开并计入额度
    Opened,
    /// 打开失败，不计入额度
    Failed,
}

/// 链接展示流程
///
/// - 编排单个链接的展示
/// - 打开失败只记日志，不重试，不消耗额度
/// - 不关心批次上限和冷却
pub struct PresentFlow {
    opener: Arc<dyn TabOpener>,
    quota: Arc<QuotaManager>,
    events: EventSender,
    interactive_window: Duration,
    open_timeout: Duration,
}

impl PresentFlow {
    /// 创建新的展示流程
    pub fn new(
        opener: Arc<dyn TabOpener>,
        quota: Arc<QuotaManager>,
        events: EventSender,
        interactive_window: Duration,
        open_timeout: Duration,
    ) -> Self {
        Self {
            opener,
            quota,
            events,
            interactive_window,
            open_timeout,
        }
    }

    pub async fn run(&self, ctx: &LinkCtx) -> PresentResult {
        info!("{} 准备展示: {}", ctx, ctx.address);

        self.emit(BatchEvent::Progress {
            current: ctx.current,
            total: ctx.total,
            label: ctx.label.clone(),
            address: ctx.address.clone(),
            window_seconds: self.interactive_window.as_secs(),
        });

        let result = match self.open(ctx).await {
            Ok(()) => {
                let state = self.quota.record_consumed().await;
                info!(
                    "{} ✓ 已打开，会话已用 {}",
                    ctx, state.links_used_in_session
                );
                PresentResult::Opened
            }
            Err(e) => {
                warn!("{} ⚠️ 打开失败，跳过: {}", ctx, e);
                PresentResult::Failed
            }
        };

        debug!(
            "{} 等待用户操作 {}s",
            ctx,
            self.interactive_window.as_secs()
        );
        sleep(self.interactive_window).await;

        result
    }

    /// 打开标签页；超时按打开失败处理
    async fn open(&self, ctx: &LinkCtx) -> Result<(), BrowserError> {
        match timeout(self.open_timeout, self.opener.open_tab(&ctx.address)).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::OpenTabTimeout {
                url: ctx.address.clone(),
                timeout_ms: u64::try_from(self.open_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn emit(&self, event: BatchEvent) {
        if self.events.send(event).is_err() {
            debug!("事件接收方已关闭，忽略事件");
        }
    }
}
