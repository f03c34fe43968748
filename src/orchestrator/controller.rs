//! 控制器 - 编排层
//!
//! 对外的入口：开始批次、查询状态、清空状态、取消。
//!
//! 同一时刻最多只有一个批次在运行。配额的读-改-写没有隔离，
//! 单飞标志让并发批次在结构上不可能出现。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{BatchOutcome, Decision, DecisionReason, StartAck};
use crate::orchestrator::batch_scheduler::{batch_size, BatchScheduler};
use crate::services::QuotaManager;
use crate::utils::logging::format_remaining;

/// 已受理（或被拒绝）的批次
#[derive(Debug)]
pub struct StartedBatch {
    /// 即时应答
    pub ack: StartAck,
    /// 受理时为后台任务句柄
    pub handle: Option<JoinHandle<BatchOutcome>>,
}

/// 运行标志守卫，离开作用域即释放
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 控制器
pub struct Controller {
    quota: Arc<QuotaManager>,
    scheduler: Arc<BatchScheduler>,
    running: Arc<AtomicBool>,
    cancel: Mutex<CancellationToken>,
}

impl Controller {
    pub fn new(quota: Arc<QuotaManager>, scheduler: Arc<BatchScheduler>) -> Self {
        Self {
            quota,
            scheduler,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// 开始一个批次
    ///
    /// 立即返回应答；受理后批次在后台任务中运行，进度通过事件通道发送。
    /// 已有批次在运行时拒绝（`batch_in_progress`）。
    pub async fn start_batch(&self, candidates: Vec<String>) -> StartedBatch {
        let Some(guard) = RunGuard::acquire(&self.running) else {
            let status = self.quota.peek().await;
            warn!("⚠️ 已有批次在运行，拒绝新的开始请求");
            return StartedBatch {
                ack: StartAck::busy(status.used, status.max),
                handle: None,
            };
        };

        let decision = self.quota.can_process_start().await;
        if !decision.allow {
            log_refusal(&decision);
            return StartedBatch {
                ack: StartAck::refused(&decision),
                handle: None,
            };
        }

        let count = batch_size(
            candidates.len(),
            decision.available,
            self.scheduler.settings().max_per_batch,
        );
        info!(
            "✓ 受理批次: 本批 {} 个，会话已用 {}/{}",
            count, decision.used, decision.max
        );

        let token = CancellationToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            *current = token.clone();
        }

        let scheduler = self.scheduler.clone();
        let available = decision.available;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            scheduler.run(&candidates, available, &token).await
        });

        StartedBatch {
            ack: StartAck::accepted(count, decision.used, decision.max),
            handle: Some(handle),
        }
    }

    /// 查询状态（只读，可随时调用）
    pub async fn check_status(&self) -> Decision {
        self.quota.peek().await
    }

    /// 清空使用状态（测试 / 调试用）
    pub async fn clear_state(&self) -> Result<(), StoreError> {
        self.quota.clear_all_state().await
    }

    /// 请求取消当前批次，在下一个链接之前生效
    pub fn cancel(&self) {
        if let Ok(current) = self.cancel.lock() {
            current.cancel();
        }
    }

    /// 是否有批次在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn log_refusal(decision: &Decision) {
    match decision.reason {
        DecisionReason::HardCooldown => info!(
            "🔒 冷却中，剩余 {}",
            format_remaining(decision.remaining_ms.unwrap_or(0))
        ),
        DecisionReason::SessionLimitReached => info!(
            "会话额度 ({}) 已用完 ({}/{})",
            decision.max, decision.used, decision.max
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ManualClock, MemoryStore, ScriptedTabOpener};
    use crate::models::{event_channel, UsageState};
    use crate::orchestrator::batch_scheduler::ScheduleSettings;
    use crate::services::QuotaPolicy;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000_000;

    fn create_controller() -> (Controller, Arc<QuotaManager>) {
        let quota = Arc::new(QuotaManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(NOW)),
            QuotaPolicy {
                session_allowance: 15,
                session_reset_window: Duration::from_secs(60),
                hard_cooldown_duration: Duration::from_secs(3600),
            },
        ));
        let (tx, _rx) = event_channel();
        let scheduler = Arc::new(BatchScheduler::new(
            quota.clone(),
            Arc::new(ScriptedTabOpener::new()),
            tx,
            ScheduleSettings {
                max_per_batch: 15,
                interactive_window: Duration::from_secs(10),
                post_interactive_delay: Duration::from_secs(3),
                open_timeout: Duration::from_secs(15),
            },
        ));
        (Controller::new(quota.clone(), scheduler), quota)
    }

    fn links(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://www.youtube.com/@c{}", i))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_rejected_while_running() {
        let (controller, _) = create_controller();

        let first = controller.start_batch(links(3)).await;
        assert!(first.ack.accepted);
        assert_eq!(first.ack.count_this_batch, Some(3));
        assert!(controller.is_running());

        let second = controller.start_batch(links(2)).await;
        assert!(!second.ack.accepted);
        assert_eq!(second.ack.reason, Some(DecisionReason::BatchInProgress));
        assert!(second.handle.is_none());

        let outcome = first.handle.unwrap().await.unwrap();
        assert_eq!(outcome.success_count, 3);
        assert!(!controller.is_running());

        let third = controller.start_batch(links(1)).await;
        assert!(third.ack.accepted);
        third.handle.unwrap().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_releases_run_flag() {
        let (controller, quota) = create_controller();
        quota
            .overwrite_state(UsageState {
                links_used_in_session: 15,
                last_activity_timestamp: NOW,
                hard_cooldown_until: NOW + 1_800_000,
            })
            .await
            .unwrap();

        let started = controller.start_batch(links(2)).await;
        assert!(!started.ack.accepted);
        assert_eq!(started.ack.reason, Some(DecisionReason::HardCooldown));
        assert_eq!(started.ack.remaining_ms, Some(1_800_000));
        assert!(!controller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_count_respects_allowance() {
        let (controller, quota) = create_controller();
        quota
            .overwrite_state(UsageState {
                links_used_in_session: 12,
                last_activity_timestamp: NOW,
                hard_cooldown_until: 0,
            })
            .await
            .unwrap();

        let started = controller.start_batch(links(10)).await;
        assert_eq!(started.ack.count_this_batch, Some(3));
        assert_eq!(started.ack.used, 12);

        let outcome = started.handle.unwrap().await.unwrap();
        assert!(outcome.lockout_triggered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_servable_mid_batch() {
        let (controller, _) = create_controller();
        let started = controller.start_batch(links(3)).await;

        tokio::time::sleep(Duration::from_secs(11)).await;
        let status = controller.check_status().await;
        assert!(status.allow);
        assert_eq!(status.used, 1);

        started.handle.unwrap().await.unwrap();
        assert_eq!(controller.check_status().await.used, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_current_batch() {
        let (controller, _) = create_controller();
        let started = controller.start_batch(links(5)).await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.cancel();

        let outcome = started.handle.unwrap().await.unwrap();
        assert_eq!(outcome.success_count, 1);
    }

    #[tokio::test]
    async fn test_clear_state() {
        let (controller, quota) = create_controller();
        quota
            .overwrite_state(UsageState {
                links_used_in_session: 15,
                last_activity_timestamp: NOW,
                hard_cooldown_until: NOW + 10,
            })
            .await
            .unwrap();

        controller.clear_state().await.unwrap();
        assert_eq!(controller.check_status().await, Decision::ok(15, 0, 15));
    }
}
