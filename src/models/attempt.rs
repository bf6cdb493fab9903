//! 尝试记录

use serde::Serialize;
use std::fmt::Display;

/// 一次提交的分类结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// 门户返回了成绩页
    Success,
    /// 门户提示验证码错误
    InvalidCaptcha,
    /// 网络 / 服务端错误，或无法识别的响应
    PortalError(String),
}

impl Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "成功"),
            AttemptOutcome::InvalidCaptcha => write!(f, "验证码错误"),
            AttemptOutcome::PortalError(reason) => write!(f, "门户错误 ({})", reason),
        }
    }
}

/// 单个学号的一次验证码尝试
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// 从 1 开始
    pub attempt_index: usize,
    pub guessed_text: String,
    pub outcome: AttemptOutcome,
}
