//! 应用装配 - 编排层
//!
//! 管理应用生命周期：打开存储、连接浏览器、组装控制器。
//! Browser 只交给标签页打开器持有。

use std::sync::Arc;

use anyhow::Result;

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{
    ChromeTabOpener, DryRunTabOpener, JsonFileStore, KvStore, SystemClock, TabOpener,
};
use crate::models::{event_channel, EventReceiver};
use crate::orchestrator::batch_scheduler::{BatchScheduler, ScheduleSettings};
use crate::orchestrator::controller::Controller;
use crate::services::{QuotaManager, QuotaPolicy};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    controller: Controller,
}

impl App {
    /// 初始化应用
    ///
    /// 返回应用和事件接收端。`open_browser` 为假时不连接浏览器（dry-run / 只查询状态）。
    pub async fn initialize(config: Config, open_browser: bool) -> Result<(Self, EventReceiver)> {
        logging::log_startup(config.session_allowance, config.max_per_batch);

        let opener: Arc<dyn TabOpener> = if open_browser {
            let browser = if config.headless {
                browser::launch_headless_browser().await?
            } else {
                browser::connect_to_browser(config.browser_debug_port).await?
            };
            Arc::new(ChromeTabOpener::new(browser))
        } else {
            Arc::new(DryRunTabOpener)
        };

        let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(&config.state_file));
        let quota = Arc::new(QuotaManager::new(
            store,
            Arc::new(SystemClock),
            QuotaPolicy::from_config(&config),
        ));

        let (tx, rx) = event_channel();
        let scheduler = Arc::new(BatchScheduler::new(
            quota.clone(),
            opener,
            tx,
            ScheduleSettings::from_config(&config),
        ));

        let app = Self {
            controller: Controller::new(quota, scheduler),
            config,
        };
        Ok((app, rx))
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
