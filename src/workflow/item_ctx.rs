//! 作品处理上下文
//!
//! 封装"我正在处理队列里的第几个作品、第几次尝试"这一信息

use std::fmt::Display;

use crate::models::WorkItem;
use crate::utils::logging::truncate_text;

/// 作品处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 作品在队列中的序号（从0开始，与游标一致）
    pub index: usize,

    /// 队列总数（仅用于日志显示）
    pub total: usize,

    /// 作品标题
    pub title: String,

    /// 当前尝试次数（从1开始）
    pub attempt: u32,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize, item: &WorkItem) -> Self {
        Self {
            index,
            total,
            title: item.title.clone(),
            attempt: 1,
        }
    }

    /// 从指定的尝试次数继续
    pub fn at_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt.max(1);
        self
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[作品 {}/{} 《{}》 尝试#{}]",
            self.index + 1,
            self.total,
            truncate_text(&self.title, 30),
            self.attempt
        )
    }
}
