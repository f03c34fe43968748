//! 标签页打开器 - 基础设施层
//!
//! 持有唯一的 Browser 资源，只暴露"打开一个前台标签页"的能力

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Browser;
use tracing::{debug, info};

use crate::error::BrowserError;

/// 打开标签页的能力
///
/// 可能失败，也可能永不返回；超时由调用方负责。
#[async_trait]
pub trait TabOpener: Send + Sync {
    async fn open_tab(&self, url: &str) -> Result<(), BrowserError>;
}

/// 基于 chromiumoxide 的标签页打开器
///
/// 职责：
/// - 持有 Browser 资源
/// - 新建页面并切到前台
/// - 不认识配额 / 批次
pub struct ChromeTabOpener {
    browser: Browser,
}

impl ChromeTabOpener {
    pub fn new(browser: Browser) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl TabOpener for ChromeTabOpener {
    async fn open_tab(&self, url: &str) -> Result<(), BrowserError> {
        debug!("新建标签页: {}", url);
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::open_tab_failed(url, e))?;
        page.bring_to_front()
            .await
            .map_err(|e| BrowserError::open_tab_failed(url, e))?;
        Ok(())
    }
}

/// 只记日志、不真正打开的打开器（--dry-run）
#[derive(Debug, Default)]
pub struct DryRunTabOpener;

#[async_trait]
impl TabOpener for DryRunTabOpener {
    async fn open_tab(&self, url: &str) -> Result<(), BrowserError> {
        info!("[dry-run] 打开标签页: {}", url);
        Ok(())
    }
}

/// 按预设脚本返回结果的打开器
///
/// 指定地址打开失败、变慢或永不返回，其余地址成功；记录每次尝试。
/// 用于测试和演示，不接触真实浏览器。
#[derive(Debug, Default)]
pub struct ScriptedTabOpener {
    failing: HashSet<String>,
    hanging: HashSet<String>,
    slow: HashMap<String, Duration>,
    attempted: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedTabOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开该地址时返回错误
    pub fn fail_on(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// 打开该地址时永不返回
    pub fn hang_on(mut self, url: impl Into<String>) -> Self {
        self.hanging.insert(url.into());
        self
    }

    /// 打开该地址前先等待 `delay`
    pub fn slow_on(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.slow.insert(url.into(), delay);
        self
    }

    /// 尝试过的地址（按顺序）
    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// 成功打开的地址（按顺序）
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TabOpener for ScriptedTabOpener {
    async fn open_tab(&self, url: &str) -> Result<(), BrowserError> {
        if let Ok(mut attempted) = self.attempted.lock() {
            attempted.push(url.to_string());
        }
        if self.hanging.contains(url) {
            futures::future::pending::<()>().await;
        }
        if let Some(delay) = self.slow.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(url) {
            return Err(BrowserError::open_tab_failed(
                url,
                std::io::Error::new(std::io::ErrorKind::Other, "scripted failure"),
            ));
        }
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        Ok(())
    }
}
