//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 按预先批准的额度逐个打开候选链接，每个链接之间留出固定的操作窗口和间隔。
//!
//! ## 流程
//!
//! 1. `n = min(候选数, 可用额度, 单批上限)`，为 0 直接报告"无事可做"
//! 2. 严格顺序处理：展示 → 等待操作窗口 → （非最后一个）再等待间隔
//! 3. 单个链接打开失败不影响后续，也不消耗额度
//! 4. 结束后重新读取使用状态，额度用尽则触发硬冷却
//!
//! 取消只在两个链接之间检查，不会打断正在打开的标签页。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::TabOpener;
use crate::models::{BatchEvent, BatchOutcome, EventSender};
use crate::services::QuotaManager;
use crate::utils::logging;
use crate::workflow::{LinkCtx, PresentFlow, PresentResult};

/// "无事可做"时的完成消息
pub const NOTHING_TO_DO_MESSAGE: &str = "No links processed (batch limit or session allowance met).";

/// 调度参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// 单批上限，与会话额度无关
    pub max_per_batch: u32,
    /// 每个链接的操作窗口
    pub interactive_window: Duration,
    /// 两个链接之间的额外间隔
    pub post_interactive_delay: Duration,
    /// 打开单个标签页的超时
    pub open_timeout: Duration,
}

impl ScheduleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_per_batch: config.max_per_batch,
            interactive_window: config.interactive_window(),
            post_interactive_delay: config.post_interactive_delay(),
            open_timeout: config.open_timeout(),
        }
    }
}

/// 本批实际处理数量
pub fn batch_size(candidates: usize, available: u32, max_per_batch: u32) -> u32 {
    let candidates = u32::try_from(candidates).unwrap_or(u32::MAX);
    candidates.min(available).min(max_per_batch)
}

/// 批次调度器
pub struct BatchScheduler {
    quota: Arc<QuotaManager>,
    flow: PresentFlow,
    events: EventSender,
    settings: ScheduleSettings,
}

impl BatchScheduler {
    pub fn new(
        quota: Arc<QuotaManager>,
        opener: Arc<dyn TabOpener>,
        events: EventSender,
        settings: ScheduleSettings,
    ) -> Self {
        let flow = PresentFlow::new(
            opener,
            quota.clone(),
            events.clone(),
            settings.interactive_window,
            settings.open_timeout,
        );
        Self {
            quota,
            flow,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// 运行一个批次
    ///
    /// # 参数
    /// - `candidates`: 候选链接（调用方已去重）
    /// - `available`: 开始前配额管理器给出的可用额度
    /// - `cancel`: 协作式取消
    pub async fn run(
        &self,
        candidates: &[String],
        available: u32,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let total = batch_size(candidates.len(), available, self.settings.max_per_batch);

        if total == 0 {
            info!("本批没有可处理的链接（批次上限或会话额度已满）");
            let state = self.quota.get_state().await;
            self.emit(BatchEvent::BatchCompleteNoLockout {
                success_count: 0,
                used: state.links_used_in_session,
                max: self.quota.policy().session_allowance,
                summary: NOTHING_TO_DO_MESSAGE.to_string(),
            });
            return BatchOutcome {
                success_count: 0,
                final_state: state,
                lockout_triggered: false,
            };
        }

        logging::log_batch_start(total, candidates.len(), available);

        let mut success_count = 0u32;
        for (i, address) in candidates.iter().take(total as usize).enumerate() {
            if cancel.is_cancelled() {
                warn!("⚠️ 批次已取消，剩余 {} 个链接不再处理", total as usize - i);
                break;
            }

            let ctx = LinkCtx::new(i as u32 + 1, total, address.as_str());
            if self.flow.run(&ctx).await == PresentResult::Opened {
                success_count += 1;
            }

            if !ctx.is_last() {
                debug!(
                    "{} 等待 {}ms 后处理下一个",
                    ctx,
                    self.settings.post_interactive_delay.as_millis()
                );
                sleep(self.settings.post_interactive_delay).await;
            }
        }

        self.finish(success_count, total).await
    }

    /// 收尾：额度用尽则触发冷却，并通知界面
    async fn finish(&self, success_count: u32, total: u32) -> BatchOutcome {
        let max = self.quota.policy().session_allowance;
        let state = self.quota.get_state().await;
        let used = state.links_used_in_session;

        logging::log_batch_complete(success_count, total, used, max);

        if used >= max {
            let locked = self.quota.trigger_lockout().await;
            self.emit(BatchEvent::BatchCompleteWithLockout {
                success_count,
                lockout_until: locked.hard_cooldown_until,
                used: locked.links_used_in_session,
                max,
            });
            return BatchOutcome {
                success_count,
                final_state: locked,
                lockout_triggered: true,
            };
        }

        self.emit(BatchEvent::BatchCompleteNoLockout {
            success_count,
            used,
            max,
            summary: format!(
                "{} channels presented. {}/{} session links used.",
                success_count, used, max
            ),
        });
        BatchOutcome {
            success_count,
            final_state: state,
            lockout_triggered: false,
        }
    }

    fn emit(&self, event: BatchEvent) {
        if self.events.send(event).is_err() {
            debug!("事件接收方已关闭，忽略事件");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ManualClock, MemoryStore, ScriptedTabOpener};
    use crate::models::{event_channel, EventReceiver, UsageState};
    use crate::services::QuotaPolicy;
    use tokio::time::Instant;

    const NOW: i64 = 1_700_000_000_000;

    struct Harness {
        scheduler: BatchScheduler,
        quota: Arc<QuotaManager>,
        store: Arc<MemoryStore>,
        opener: Arc<ScriptedTabOpener>,
        events: EventReceiver,
    }

    fn settings() -> ScheduleSettings {
        ScheduleSettings {
            max_per_batch: 15,
            interactive_window: Duration::from_secs(10),
            post_interactive_delay: Duration::from_secs(3),
            open_timeout: Duration::from_secs(15),
        }
    }

    fn create_harness(opener: ScriptedTabOpener) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaManager::new(
            store.clone(),
            Arc::new(ManualClock::new(NOW)),
            QuotaPolicy {
                session_allowance: 15,
                session_reset_window: Duration::from_secs(60),
                hard_cooldown_duration: Duration::from_secs(3600),
            },
        ));
        let opener = Arc::new(opener);
        let (tx, rx) = event_channel();
        let scheduler = BatchScheduler::new(quota.clone(), opener.clone(), tx, settings());
        Harness {
            scheduler,
            quota,
            store,
            opener,
            events: rx,
        }
    }

    fn links(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://www.youtube.com/@channel{}", i))
            .collect()
    }

    fn drain(rx: &mut EventReceiver) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_batch_size_is_smallest_limit() {
        assert_eq!(batch_size(20, 15, 15), 15);
        assert_eq!(batch_size(5, 15, 15), 5);
        assert_eq!(batch_size(30, 40, 15), 15);
        assert_eq!(batch_size(30, 4, 15), 4);
        assert_eq!(batch_size(0, 15, 15), 0);
        assert_eq!(batch_size(3, 0, 15), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_links_no_lockout() {
        let mut h = create_harness(ScriptedTabOpener::new());
        let candidates = links(5);

        let outcome = h
            .scheduler
            .run(&candidates, 15, &CancellationToken::new())
            .await;

        assert_eq!(outcome.success_count, 5);
        assert!(!outcome.lockout_triggered);
        assert_eq!(outcome.final_state.links_used_in_session, 5);
        assert_eq!(h.opener.opened(), candidates);

        let events = drain(&mut h.events);
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0],
            BatchEvent::Progress {
                current: 1,
                total: 5,
                label: "channel0".to_string(),
                address: candidates[0].clone(),
                window_seconds: 10,
            }
        );
        assert_eq!(
            events[5],
            BatchEvent::BatchCompleteNoLockout {
                success_count: 5,
                used: 5,
                max: 15,
                summary: "5 channels presented. 5/15 session links used.".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_window_and_delay() {
        let h = create_harness(ScriptedTabOpener::new());
        let start = Instant::now();

        h.scheduler
            .run(&links(3), 15, &CancellationToken::new())
            .await;

        // 3 个操作窗口 + 2 个间隔，最后一个之后不再等待间隔
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3 * 10 + 2 * 3));
        assert!(elapsed < Duration::from_secs(3 * 10 + 3 * 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_twenty_candidates_capped_and_lockout_triggered() {
        let mut h = create_harness(ScriptedTabOpener::new());

        let outcome = h
            .scheduler
            .run(&links(20), 15, &CancellationToken::new())
            .await;

        assert_eq!(h.opener.attempted().len(), 15);
        assert_eq!(outcome.success_count, 15);
        assert!(outcome.lockout_triggered);
        assert_eq!(outcome.final_state.links_used_in_session, 15);
        assert_eq!(outcome.final_state.hard_cooldown_until, NOW + 3_600_000);

        let events = drain(&mut h.events);
        assert_eq!(
            events.last(),
            Some(&BatchEvent::BatchCompleteWithLockout {
                success_count: 15,
                lockout_until: NOW + 3_600_000,
                used: 15,
                max: 15,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_boundary() {
        // 结束于 14：不触发
        let h = create_harness(ScriptedTabOpener::new());
        h.quota
            .overwrite_state(UsageState {
                links_used_in_session: 10,
                last_activity_timestamp: NOW,
                hard_cooldown_until: 0,
            })
            .await
            .unwrap();
        let outcome = h.scheduler.run(&links(4), 5, &CancellationToken::new()).await;
        assert_eq!(outcome.final_state.links_used_in_session, 14);
        assert!(!outcome.lockout_triggered);
        assert_eq!(h.quota.get_state().await.hard_cooldown_until, 0);

        // 再来 1 个，结束于 15：触发
        let outcome = h.scheduler.run(&links(1), 1, &CancellationToken::new()).await;
        assert_eq!(outcome.final_state.links_used_in_session, 15);
        assert!(outcome.lockout_triggered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_continues_and_skips_quota() {
        let candidates = links(3);
        let mut h = create_harness(ScriptedTabOpener::new().fail_on(candidates[1].clone()));

        let outcome = h
            .scheduler
            .run(&candidates, 15, &CancellationToken::new())
            .await;

        assert_eq!(h.opener.attempted(), candidates);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.final_state.links_used_in_session, 2);

        let progress: Vec<u32> = drain(&mut h.events)
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { current, .. } => Some(current),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_open_times_out_as_failure() {
        let candidates = links(2);
        let h = create_harness(ScriptedTabOpener::new().hang_on(candidates[0].clone()));

        let outcome = h
            .scheduler
            .run(&candidates, 15, &CancellationToken::new())
            .await;

        assert_eq!(outcome.success_count, 1);
        assert_eq!(h.opener.opened(), vec![candidates[1].clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_do() {
        let mut h = create_harness(ScriptedTabOpener::new());

        let outcome = h.scheduler.run(&[], 15, &CancellationToken::new()).await;
        assert_eq!(outcome.success_count, 0);
        let outcome = h.scheduler.run(&links(3), 0, &CancellationToken::new()).await;
        assert_eq!(outcome.success_count, 0);
        assert!(h.opener.attempted().is_empty());

        let events = drain(&mut h.events);
        assert_eq!(events.len(), 2);
        for event in events {
            match event {
                BatchEvent::BatchCompleteNoLockout {
                    success_count,
                    summary,
                    ..
                } => {
                    assert_eq!(success_count, 0);
                    assert_eq!(summary, NOTHING_TO_DO_MESSAGE);
                }
                other => panic!("意外事件: {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_write_failure_still_counts_progress() {
        let h = create_harness(ScriptedTabOpener::new());
        h.store.set_fail_writes(true);

        let outcome = h.scheduler.run(&links(3), 15, &CancellationToken::new()).await;

        assert_eq!(outcome.success_count, 3);
        assert_eq!(h.opener.opened().len(), 3);
        assert_eq!(outcome.final_state.links_used_in_session, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_before_next_item() {
        let h = create_harness(ScriptedTabOpener::new());
        let cancel = CancellationToken::new();
        let candidates = links(5);

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                // 第一个链接的操作窗口内取消
                sleep(Duration::from_secs(5)).await;
                cancel.cancel();
            })
        };

        let outcome = h.scheduler.run(&candidates, 15, &cancel).await;
        canceller.await.unwrap();

        assert_eq!(h.opener.attempted(), vec![candidates[0].clone()]);
        assert_eq!(outcome.success_count, 1);
        assert!(!outcome.lockout_triggered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_waits_for_open_in_flight() {
        let candidates = links(3);
        let h = create_harness(
            ScriptedTabOpener::new().slow_on(candidates[0].clone(), Duration::from_secs(5)),
        );
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                // 第一个标签页还在打开时取消
                sleep(Duration::from_secs(2)).await;
                cancel.cancel();
            })
        };

        let outcome = h.scheduler.run(&candidates, 15, &cancel).await;
        canceller.await.unwrap();

        assert_eq!(h.opener.opened(), vec![candidates[0].clone()]);
        assert_eq!(h.opener.attempted().len(), 1);
        assert_eq!(outcome.success_count, 1);
        assert_eq!(h.quota.get_state().await.links_used_in_session, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_write_failure_still_reports_lockout() {
        let mut h = create_harness(ScriptedTabOpener::new());
        h.quota
            .overwrite_state(UsageState {
                links_used_in_session: 15,
                last_activity_timestamp: NOW,
                hard_cooldown_until: 0,
            })
            .await
            .unwrap();
        h.store.set_fail_writes(true);

        let outcome = h.scheduler.run(&links(1), 1, &CancellationToken::new()).await;

        assert!(outcome.lockout_triggered);
        assert_eq!(outcome.final_state.hard_cooldown_until, NOW + 3_600_000);
        assert_eq!(h.quota.get_state().await.hard_cooldown_until, 0);
        assert!(matches!(
            drain(&mut h.events).last(),
            Some(BatchEvent::BatchCompleteWithLockout { lockout_until, .. })
                if *lockout_until == NOW + 3_600_000
        ));
    }
}
