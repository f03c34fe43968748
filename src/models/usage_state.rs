use serde::{Deserialize, Serialize};

/// 使用状态（进程内唯一、跨重启持久化）
///
/// 持久化布局：
/// `{ linksUsedInSession: int, lastActivityTimestamp: int|0, hardCooldownUntil: int|0 }`
///
/// 时间戳均为 Unix 毫秒，`0` 表示未设置。缺失的字段按默认值补齐。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageState {
    /// 本会话已消耗的链接数
    pub links_used_in_session: u32,
    /// 最近一次成功消耗的时刻，0 表示从未使用
    pub last_activity_timestamp: i64,
    /// 硬冷却截止时刻，0 表示没有冷却
    pub hard_cooldown_until: i64,
}

impl UsageState {
    /// 最近活动时刻
    pub fn last_activity(&self) -> Option<i64> {
        (self.last_activity_timestamp > 0).then_some(self.last_activity_timestamp)
    }

    /// 冷却截止时刻；0 表示未设置
    pub fn cooldown_until(&self) -> Option<i64> {
        (self.hard_cooldown_until > 0).then_some(self.hard_cooldown_until)
    }

    /// 在 `now_ms` 时刻是否处于硬冷却
    pub fn is_locked(&self, now_ms: i64) -> bool {
        self.cooldown_until().is_some_and(|until| now_ms < until)
    }

    /// 合并部分字段
    pub fn merged(self, update: StateUpdate) -> Self {
        Self {
            links_used_in_session: update
                .links_used_in_session
                .unwrap_or(self.links_used_in_session),
            last_activity_timestamp: update
                .last_activity_timestamp
                .unwrap_or(self.last_activity_timestamp),
            hard_cooldown_until: update
                .hard_cooldown_until
                .unwrap_or(self.hard_cooldown_until),
        }
    }
}

/// 使用状态的部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub links_used_in_session: Option<u32>,
    pub last_activity_timestamp: Option<i64>,
    pub hard_cooldown_until: Option<i64>,
}
