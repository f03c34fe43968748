//! 链接处理上下文
//!
//! 封装"我正在展示本批第几个链接"这一信息

use std::fmt::Display;

use crate::models::display_label;

/// 链接处理上下文
#[derive(Debug, Clone)]
pub struct LinkCtx {
    /// 本批中的序号（从1开始）
    pub current: u32,

    /// 本批总数
    pub total: u32,

    /// 链接地址
    pub address: String,

    /// 显示名称（仅用于界面和日志）
    pub label: String,
}

impl LinkCtx {
    /// 创建新的链接上下文
    pub fn new(current: u32, total: u32, address: impl Into<String>) -> Self {
        let address = address.into();
        let label = display_label(&address);
        Self {
            current,
            total,
            address,
            label,
        }
    }

    /// 是否为本批最后一个
    pub fn is_last(&self) -> bool {
        self.current >= self.total
    }
}

impl Display for LinkCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[链接 {}/{} {}]", self.current, self.total, self.label)
    }
}
