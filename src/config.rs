use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 会员等级
///
/// 等级只决定会话额度和会话重置窗口的默认值，显式配置优先。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// 免费版：60 秒无操作重置，每个会话 15 个链接
    Free,
    /// 高级版：2 小时无操作重置，每个会话 50 个链接
    Premium,
}

impl Tier {
    /// 会话重置窗口（毫秒）
    pub fn session_reset_window_ms(self) -> u64 {
        match self {
            Tier::Free => 60_000,
            Tier::Premium => 2 * 60 * 60 * 1000,
        }
    }

    /// 每个会话的链接额度
    pub fn session_allowance(self) -> u32 {
        match self {
            Tier::Free => 15,
            Tier::Premium => 50,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "premium" => Some(Tier::Premium),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 单次批处理最多打开的链接数
    pub max_per_batch: u32,
    /// 每个标签页留给用户操作的时间（秒）
    pub interactive_window_seconds: u64,
    /// 两个链接之间的额外间隔（毫秒）
    pub post_interactive_delay_ms: u64,
    /// 会话额度用尽后的硬冷却时长（毫秒）
    pub hard_cooldown_duration_ms: u64,
    /// 会员等级
    pub tier: Tier,
    /// 无操作多久后重置会话计数（毫秒）
    pub session_reset_window_ms: u64,
    /// 每个会话的链接额度
    pub session_allowance: u32,
    /// 打开单个标签页的超时（毫秒）
    pub open_timeout_ms: u64,
    /// 使用状态持久化文件
    pub state_file: String,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 是否启动无头浏览器（否则连接已运行的浏览器）
    pub headless: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        let tier = Tier::Free;
        Self {
            max_per_batch: 15,
            interactive_window_seconds: 10,
            post_interactive_delay_ms: 3000,
            hard_cooldown_duration_ms: 60 * 60 * 1000,
            tier,
            session_reset_window_ms: tier.session_reset_window_ms(),
            session_allowance: tier.session_allowance(),
            open_timeout_ms: 15_000,
            state_file: "usage_state.json".to_string(),
            browser_debug_port: 9222,
            headless: false,
            verbose_logging: false,
        }
    }
}

/// 配置文件结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    max_per_batch: Option<u32>,
    interactive_window_seconds: Option<u64>,
    post_interactive_delay_ms: Option<u64>,
    hard_cooldown_duration_ms: Option<u64>,
    tier: Option<Tier>,
    session_reset_window_ms: Option<u64>,
    session_allowance: Option<u32>,
    open_timeout_ms: Option<u64>,
    state_file: Option<String>,
    browser_debug_port: Option<u16>,
    headless: Option<bool>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 从环境变量加载，未设置的字段使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 配置文件加载，环境变量仍可覆盖文件中的值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_toml_str(&content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(config.with_env_overrides())
    }

    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(tier) = file.tier {
            config = config.with_tier(tier);
        }
        Ok(Self {
            max_per_batch: file.max_per_batch.unwrap_or(config.max_per_batch),
            interactive_window_seconds: file
                .interactive_window_seconds
                .unwrap_or(config.interactive_window_seconds),
            post_interactive_delay_ms: file
                .post_interactive_delay_ms
                .unwrap_or(config.post_interactive_delay_ms),
            hard_cooldown_duration_ms: file
                .hard_cooldown_duration_ms
                .unwrap_or(config.hard_cooldown_duration_ms),
            tier: config.tier,
            session_reset_window_ms: file
                .session_reset_window_ms
                .unwrap_or(config.session_reset_window_ms),
            session_allowance: file.session_allowance.unwrap_or(config.session_allowance),
            open_timeout_ms: file.open_timeout_ms.unwrap_or(config.open_timeout_ms),
            state_file: file.state_file.unwrap_or(config.state_file),
            browser_debug_port: file.browser_debug_port.unwrap_or(config.browser_debug_port),
            headless: file.headless.unwrap_or(config.headless),
            verbose_logging: file.verbose_logging.unwrap_or(config.verbose_logging),
        })
    }

    /// 切换等级，同时替换等级相关的默认值
    pub fn with_tier(self, tier: Tier) -> Self {
        Self {
            tier,
            session_reset_window_ms: tier.session_reset_window_ms(),
            session_allowance: tier.session_allowance(),
            ..self
        }
    }

    fn with_env_overrides(self) -> Self {
        let base = match std::env::var("TIER").ok().as_deref().and_then(Tier::parse) {
            Some(tier) => self.with_tier(tier),
            None => self,
        };
        Self {
            max_per_batch: env_or("MAX_PER_BATCH", base.max_per_batch),
            interactive_window_seconds: env_or(
                "INTERACTIVE_WINDOW_SECONDS",
                base.interactive_window_seconds,
            ),
            post_interactive_delay_ms: env_or(
                "POST_INTERACTIVE_DELAY_MS",
                base.post_interactive_delay_ms,
            ),
            hard_cooldown_duration_ms: env_or(
                "HARD_COOLDOWN_DURATION_MS",
                base.hard_cooldown_duration_ms,
            ),
            tier: base.tier,
            session_reset_window_ms: env_or("SESSION_RESET_WINDOW_MS", base.session_reset_window_ms),
            session_allowance: env_or("SESSION_ALLOWANCE", base.session_allowance),
            open_timeout_ms: env_or("OPEN_TIMEOUT_MS", base.open_timeout_ms),
            state_file: std::env::var("STATE_FILE").unwrap_or(base.state_file),
            browser_debug_port: env_or("BROWSER_DEBUG_PORT", base.browser_debug_port),
            headless: env_or("HEADLESS", base.headless),
            verbose_logging: env_or("VERBOSE_LOGGING", base.verbose_logging),
        }
    }

    pub fn interactive_window(&self) -> Duration {
        Duration::from_secs(self.interactive_window_seconds)
    }

    pub fn post_interactive_delay(&self) -> Duration {
        Duration::from_millis(self.post_interactive_delay_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

fn env_or<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_free_tier() {
        let config = Config::default();
        assert_eq!(config.tier, Tier::Free);
        assert_eq!(config.session_allowance, 15);
        assert_eq!(config.session_reset_window_ms, 60_000);
        assert_eq!(config.hard_cooldown_duration_ms, 3_600_000);
        assert_eq!(config.max_per_batch, 15);
    }

    #[test]
    fn test_toml_tier_supplies_defaults() {
        let config = Config::from_toml_str("tier = \"premium\"\n").unwrap();
        assert_eq!(config.session_allowance, 50);
        assert_eq!(config.session_reset_window_ms, 7_200_000);
    }

    #[test]
    fn test_toml_explicit_values_win_over_tier() {
        let content = r#"
            tier = "premium"
            session_allowance = 20
            interactive_window_seconds = 5
            state_file = "state/usage.json"
        "#;
        let config = Config::from_toml_str(content).unwrap();
        assert_eq!(config.session_allowance, 20);
        assert_eq!(config.session_reset_window_ms, 7_200_000);
        assert_eq!(config.interactive_window(), Duration::from_secs(5));
        assert_eq!(config.state_file, "state/usage.json");
    }

    #[test]
    fn test_toml_rejects_unknown_tier() {
        assert!(Config::from_toml_str("tier = \"gold\"\n").is_err());
    }
}
