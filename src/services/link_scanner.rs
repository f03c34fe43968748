//! 网页扫描服务 - 业务能力层
//!
//! 从网页源码中提取频道链接：相对地址按页面地址解析，
//! 去掉查询参数和锚点，按首次出现的顺序去重。

use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::InputError;
use crate::models::is_valid_channel_url;

/// 从网页源码中提取频道链接
///
/// # 参数
/// - `html`: 网页源码
/// - `base`: 网页地址，用于解析相对链接
pub fn scan_html_for_channel_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut anchors = 0usize;

    for element in document.select(&anchor) {
        anchors += 1;
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let Ok(mut absolute) = base.join(href) else {
            debug!("跳过无法解析的链接: {}", href);
            continue;
        };
        absolute.set_query(None);
        absolute.set_fragment(None);

        let sanitized = absolute.to_string();
        if !is_valid_channel_url(&sanitized) {
            continue;
        }
        if seen.insert(sanitized.clone()) {
            found.push(sanitized);
        }
    }

    info!(
        "扫描完成: {} 个链接标签，提取到 {} 个频道链接",
        anchors,
        found.len()
    );
    found
}

/// 下载网页源码
pub async fn fetch_page(page_url: &Url) -> Result<String, InputError> {
    info!("正在抓取网页: {}", page_url);
    let to_error = |source| InputError::PageFetchFailed {
        url: page_url.to_string(),
        source,
    };
    let response = reqwest::get(page_url.clone())
        .await
        .and_then(|r| r.error_for_status())
        .map_err(to_error)?;
    response.text().await.map_err(to_error)
}

/// 抓取网页并提取频道链接
pub async fn scan_page(page_url: &str) -> Result<Vec<String>, InputError> {
    let url = Url::parse(page_url).map_err(|source| InputError::InvalidPageUrl {
        url: page_url.to_string(),
        source,
    })?;
    let html = fetch_page(&url).await?;
    Ok(scan_html_for_channel_links(&html, &url))
}
