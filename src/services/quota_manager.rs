//! 配额管理 - 业务能力层
//!
//! 使用状态的唯一事实来源：回答"现在能不能开始、还能处理多少"，并记录消耗。
//!
//! ## 状态
//!
//! - 会话：连续无操作超过重置窗口后，已用计数归零
//! - 硬冷却：会话额度用尽后由调度器触发，期间一律拒绝
//!
//! 两者独立存储。冷却检查总在会话重置之前，过期的会话不会掩盖有效的冷却。
//! 冷却结束时不会清零已用计数，是否归零只看无操作时长。
//!
//! 存储失败不向上抛出：读失败视为全新状态，写失败记日志后按内存中的计算值继续。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::StoreError;
use crate::infrastructure::{Clock, KvStore};
use crate::models::{Decision, StateUpdate, UsageState};

/// 使用状态在存储中的键
pub const USAGE_STATE_KEY: &str = "usageState";

/// 配额策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// 每个会话的额度
    pub session_allowance: u32,
    /// 会话重置窗口
    pub session_reset_window: Duration,
    /// 硬冷却时长
    pub hard_cooldown_duration: Duration,
}

impl QuotaPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_allowance: config.session_allowance,
            session_reset_window: Duration::from_millis(config.session_reset_window_ms),
            hard_cooldown_duration: Duration::from_millis(config.hard_cooldown_duration_ms),
        }
    }
}

/// 会话过期则归零已用计数
///
/// 纯函数：从未活动或无操作超过窗口，且已用计数大于 0 时，`used` 归零。
/// 不修改冷却字段，重复调用结果不变。
pub fn reset_session_if_expired(
    state: UsageState,
    now_ms: i64,
    reset_window: Duration,
) -> UsageState {
    let window_ms = i64::try_from(reset_window.as_millis()).unwrap_or(i64::MAX);
    let expired = match state.last_activity() {
        None => true,
        Some(last) => now_ms.saturating_sub(last) > window_ms,
    };

    if expired && state.links_used_in_session > 0 {
        debug!("会话因无操作已过期，已用计数归零");
        UsageState {
            links_used_in_session: 0,
            ..state
        }
    } else {
        state
    }
}

/// 配额管理器
///
/// 职责：
/// - 读写持久化的使用状态
/// - 判断能否开始、可用额度
/// - 记录消耗、触发冷却
/// - 不认识标签页 / 批次
pub struct QuotaManager {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    policy: QuotaPolicy,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, policy: QuotaPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// 当前时刻（毫秒）
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// 读取使用状态
    ///
    /// 存储为空、读取失败或内容无法解析时返回默认状态，从不失败。
    pub async fn get_state(&self) -> UsageState {
        match self.store.get(USAGE_STATE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<UsageState>(value) {
                Ok(state) => state,
                Err(e) => {
                    warn!("⚠️ 使用状态无法解析，按全新状态处理: {}", e);
                    UsageState::default()
                }
            },
            Ok(None) => UsageState::default(),
            Err(e) => {
                warn!("⚠️ 读取使用状态失败，按全新状态处理: {}", e);
                UsageState::default()
            }
        }
    }

    /// 合并部分字段并持久化，返回合并后的状态
    ///
    /// 写入失败时返回错误，调用方应视为"状态未改变"。
    pub async fn update_state(&self, update: StateUpdate) -> Result<UsageState, StoreError> {
        let merged = self.get_state().await.merged(update);
        self.persist(merged).await
    }

    async fn persist(&self, state: UsageState) -> Result<UsageState, StoreError> {
        let value = serde_json::to_value(state)
            .map_err(|e| StoreError::write_failed(USAGE_STATE_KEY, e))?;
        self.store.set(USAGE_STATE_KEY, value).await?;
        debug!("使用状态已更新: {:?}", state);
        Ok(state)
    }

    /// 以当前时刻判断会话是否过期
    pub fn reset_session_if_expired(&self, state: UsageState) -> UsageState {
        reset_session_if_expired(state, self.now_ms(), self.policy.session_reset_window)
    }

    /// 能否开始处理
    ///
    /// 每次调用都重新计算。会话重置会尽力持久化，失败不影响结果，
    /// 下一次调用会得出同样的重置。
    pub async fn can_process_start(&self) -> Decision {
        self.evaluate(true).await
    }

    /// 与 `can_process_start` 相同的判断，但不写入任何东西
    ///
    /// 用于随时查询状态（包括批次进行中）。
    pub async fn peek(&self) -> Decision {
        self.evaluate(false).await
    }

    async fn evaluate(&self, persist_reset: bool) -> Decision {
        let state = self.get_state().await;
        let now = self.now_ms();
        let max = self.policy.session_allowance;

        // 1. 硬冷却优先
        if state.is_locked(now) {
            return Decision::hard_cooldown(
                state.hard_cooldown_until - now,
                state.links_used_in_session,
                max,
            );
        }

        // 2. 会话过期则归零
        let reset = self.reset_session_if_expired(state);
        if persist_reset && reset.links_used_in_session != state.links_used_in_session {
            let update = StateUpdate {
                links_used_in_session: Some(0),
                ..Default::default()
            };
            if let Err(e) = self.update_state(update).await {
                warn!("⚠️ 会话重置未能保存: {}", e);
            }
        }

        // 3. 可用额度
        let used = reset.links_used_in_session;
        let available = max.saturating_sub(used);
        if available == 0 {
            return Decision::session_limit_reached(used, max);
        }

        Decision::ok(available, used, max)
    }

    /// 记录一次成功消耗：已用 +1，最近活动时刻设为现在
    ///
    /// 读-改-写没有隔离，调用方负责保证同一时刻只有一个批次在运行。
    /// 写入失败只记日志，返回内存中计算出的状态。
    pub async fn record_consumed(&self) -> UsageState {
        let current = self.get_state().await;
        let next = current.merged(StateUpdate {
            links_used_in_session: Some(current.links_used_in_session.saturating_add(1)),
            last_activity_timestamp: Some(self.now_ms()),
            ..Default::default()
        });
        match self.persist(next).await {
            Ok(state) => state,
            Err(e) => {
                warn!("⚠️ 消耗记录未能保存: {}", e);
                next
            }
        }
    }

    /// 触发硬冷却：冷却截止时刻 = 现在 + 冷却时长
    ///
    /// 不修改已用计数和最近活动时刻。由调度器在会话额度用尽时调用一次。
    pub async fn trigger_lockout(&self) -> UsageState {
        let duration_ms =
            i64::try_from(self.policy.hard_cooldown_duration.as_millis()).unwrap_or(i64::MAX);
        let until = self.now_ms().saturating_add(duration_ms);
        let next = self.get_state().await.merged(StateUpdate {
            hard_cooldown_until: Some(until),
            ..Default::default()
        });
        let state = match self.persist(next).await {
            Ok(state) => state,
            Err(e) => {
                warn!("⚠️ 冷却状态未能保存: {}", e);
                next
            }
        };
        info!(
            "🔒 已触发硬冷却，截止: {}",
            crate::utils::logging::format_local_time(until)
        );
        state
    }

    /// 删除全部使用状态，恢复默认（测试 / 调试用）
    pub async fn clear_all_state(&self) -> Result<(), StoreError> {
        self.store.remove(USAGE_STATE_KEY).await?;
        info!("🧹 已清除全部使用状态");
        Ok(())
    }

    /// 直接写入一份完整状态（测试 / 调试用）
    pub async fn overwrite_state(&self, state: UsageState) -> Result<UsageState, StoreError> {
        self.persist(state).await
    }
}
