//! 频道链接
//!
//! 判断一个地址是否为频道主页，并生成界面显示用的名称

use std::sync::OnceLock;

use regex::Regex;

const CHANNEL_URL_PATTERN: &str = r"^(https?://)?(www\.)?(youtube\.com/(channel/UC[\w-]{21}[A-Za-z0-9]|c/[\w-]+|user/[\w-]+|@[\w.-]+)(/\S*)?)$";

fn channel_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHANNEL_URL_PATTERN).expect("频道链接正则无效"))
}

/// 是否为频道主页链接（`/channel/UC…`、`/c/…`、`/user/…`、`/@…`）
pub fn is_valid_channel_url(url: &str) -> bool {
    !url.is_empty() && channel_url_regex().is_match(url)
}

/// 显示名称
///
/// 取最后一段路径，去掉开头的 `@`；
/// 以 `UC` 开头且长度超过 20 的频道 ID 统一显示为 `Channel`。
pub fn display_label(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let segment = segment.strip_prefix('@').unwrap_or(segment);
    if segment.starts_with("UC") && segment.chars().count() > 20 {
        "Channel".to_string()
    } else {
        segment.to_string()
    }
}
