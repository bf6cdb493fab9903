//! 学号处理上下文
//!
//! 封装"我正在处理哪个门户的哪个学号"这一信息

use std::fmt::Display;

use crate::models::Identifier;

/// 学号处理上下文
#[derive(Debug, Clone)]
pub struct ScrapeCtx {
    /// 成绩查询首页
    pub index_url: String,

    pub identifier: Identifier,

    /// 在范围中的位置（从 1 开始，仅用于日志显示）
    pub position: usize,

    /// 范围内学号总数
    pub total: usize,
}

impl ScrapeCtx {
    pub fn new(index_url: impl Into<String>, identifier: Identifier, position: usize, total: usize) -> Self {
        Self {
            index_url: index_url.into(),
            identifier,
            position,
            total,
        }
    }

    /// 单个学号查询
    pub fn single(index_url: impl Into<String>, identifier: Identifier) -> Self {
        Self::new(index_url, identifier, 1, 1)
    }
}

impl Display for ScrapeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[学号 {} {}/{}]",
            self.identifier, self.position, self.total
        )
    }
}
