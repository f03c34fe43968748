use serde::Serialize;

/// 能否开始处理的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// 允许
    Ok,
    /// 硬冷却中
    HardCooldown,
    /// 本会话额度已用完
    SessionLimitReached,
    /// 已有批次在运行
    BatchInProgress,
}

/// 配额判断结果
///
/// 拒绝时也带上剩余时间和已用 / 上限，界面无需再查询一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allow: bool,
    pub reason: DecisionReason,
    pub available: u32,
    pub used: u32,
    pub max: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
}

impl Decision {
    pub fn hard_cooldown(remaining_ms: i64, used: u32, max: u32) -> Self {
        Self {
            allow: false,
            reason: DecisionReason::HardCooldown,
            available: 0,
            used,
            max,
            remaining_ms: Some(remaining_ms),
        }
    }

    pub fn session_limit_reached(used: u32, max: u32) -> Self {
        Self {
            allow: false,
            reason: DecisionReason::SessionLimitReached,
            available: 0,
            used,
            max,
            remaining_ms: None,
        }
    }

    pub fn ok(available: u32, used: u32, max: u32) -> Self {
        Self {
            allow: true,
            reason: DecisionReason::Ok,
            available,
            used,
            max,
            remaining_ms: None,
        }
    }
}

/// 开始批次请求的即时应答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DecisionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_this_batch: Option<u32>,
    pub used: u32,
    pub max: u32,
}

impl StartAck {
    pub fn accepted(count_this_batch: u32, used: u32, max: u32) -> Self {
        Self {
            accepted: true,
            reason: None,
            remaining_ms: None,
            count_this_batch: Some(count_this_batch),
            used,
            max,
        }
    }

    pub fn refused(decision: &Decision) -> Self {
        Self {
            accepted: false,
            reason: Some(decision.reason),
            remaining_ms: decision.remaining_ms,
            count_this_batch: None,
            used: decision.used,
            max: decision.max,
        }
    }

    pub fn busy(used: u32, max: u32) -> Self {
        Self {
            accepted: false,
            reason: Some(DecisionReason::BatchInProgress),
            remaining_ms: None,
            count_this_batch: None,
            used,
            max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refusal_ack_carries_render_data() {
        let ack = StartAck::refused(&Decision::hard_cooldown(1_800_000, 15, 15));
        assert_eq!(
            serde_json::to_value(ack).unwrap(),
            json!({
                "accepted": false,
                "reason": "hard_cooldown",
                "remainingMs": 1_800_000,
                "used": 15,
                "max": 15
            })
        );
    }
}
