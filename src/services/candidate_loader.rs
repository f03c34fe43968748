//! 候选链接加载 - 业务能力层
//!
//! 从 .txt / .csv 文件或逗号分隔的文本中读取频道链接。
//! 无效条目跳过并记录警告，结果按首次出现的顺序去重。

use std::collections::HashSet;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::InputError;
use crate::models::is_valid_channel_url;
use crate::utils::logging::truncate_text;

/// 频道导出文件的表头
const CSV_HEADER: &str = "channel id,channel url,channel title";

/// 去重的候选队列
#[derive(Debug, Default, Clone)]
pub struct CandidateQueue {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入队列；已存在时返回 `false`
    pub fn push(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    /// 批量加入，返回新增数量
    pub fn extend(&mut self, urls: impl IntoIterator<Item = String>) -> usize {
        urls.into_iter().filter(|url| self.push(url.clone())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// 解析 .txt：每行一个链接
pub fn parse_txt(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| keep_valid(line, "TXT"))
        .collect()
}

/// 解析 .csv
///
/// 跳过表头 `channel id,channel url,channel title`（不区分大小写）；
/// 多列时取第 2 列，单列时取第 1 列；去掉两端的双引号。
pub fn parse_csv(content: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut header_skipped = false;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !header_skipped && line.eq_ignore_ascii_case(CSV_HEADER) {
            header_skipped = true;
            debug!("跳过 CSV 表头: {}", line);
            continue;
        }

        let columns: Vec<&str> = line.split(',').collect();
        let cell = if columns.len() > 1 { columns[1] } else { columns[0] };
        let cell = cell.trim();
        let cell = cell
            .strip_prefix('"')
            .and_then(|c| c.strip_suffix('"'))
            .unwrap_or(cell);

        if let Some(url) = keep_valid(cell, "CSV") {
            urls.push(url);
        }
    }

    urls
}

/// 解析逗号分隔的链接列表
///
/// 每一项必须是带协议的完整地址。
pub fn parse_inline(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| match Url::parse(item) {
            Ok(_) => true,
            Err(e) => {
                warn!("输入: 跳过不完整的地址 {}: {}", truncate_text(item, 80), e);
                false
            }
        })
        .filter_map(|item| keep_valid(item, "输入"))
        .collect()
}

fn keep_valid(candidate: &str, source: &str) -> Option<String> {
    if is_valid_channel_url(candidate) {
        Some(candidate.to_string())
    } else {
        warn!("{}: 跳过无效链接: {}", source, truncate_text(candidate, 80));
        None
    }
}

/// 从文件加载候选链接（按扩展名选择格式）
pub async fn load_candidates_file(path: &Path) -> Result<Vec<String>, InputError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    let parse: fn(&str) -> Vec<String> = match extension.as_deref() {
        Some("txt") => parse_txt,
        Some("csv") => parse_csv,
        _ => {
            return Err(InputError::UnsupportedFileType {
                path: path.display().to_string(),
            })
        }
    };

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| InputError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let urls = parse(&content);
    info!(
        "从 {} 读取到 {} 个有效链接",
        path.file_name().unwrap_or_default().to_string_lossy(),
        urls.len()
    );
    Ok(urls)
}
