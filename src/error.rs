//! 错误类型
//!
//! 单个学号的最终失败以 `ScrapeResult::Failure` 的形式作为值返回，
//! 不会通过编排层向上抛出。

use serde::Serialize;
use thiserror::Error;

/// 抓取过程中的所有错误
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// 验证码图片无效（零面积、无法解码）
    #[error("验证码图片无效: {0}")]
    InvalidImage(String),

    /// 门户拒绝了识别出的验证码
    #[error("验证码错误 (识别结果: {guess:?})")]
    InvalidCaptcha { guess: String },

    /// 网络 / 门户服务端错误
    #[error("门户错误: {0}")]
    Portal(String),

    /// 学号格式无效（调用方错误，不重试）
    #[error("学号无效: {0}")]
    InvalidIdentifier(String),

    /// 学号范围无效（调用方错误，不重试）
    #[error("学号范围无效: {0}")]
    InvalidRange(String),

    /// 验证码重试次数耗尽
    #[error("重试次数耗尽 (共尝试 {attempts} 次), 最后一次: {last}")]
    RetryBudgetExhausted {
        attempts: usize,
        #[source]
        last: Box<ScrapeError>,
    },

    /// 连续获取验证码失败，属于基础设施故障
    #[error("无法获取验证码 (连续失败 {failures} 次): {last}")]
    ChallengeUnavailable {
        failures: usize,
        #[source]
        last: Box<ScrapeError>,
    },

    /// 运行被取消
    #[error("任务已取消")]
    Cancelled,

    /// 抓取任务异常退出
    #[error("抓取任务异常退出: {0}")]
    TaskFailed(String),

    /// 识别服务错误
    #[error("识别服务错误: {0}")]
    Recognition(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("图片处理失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),
}

impl ScrapeError {
    /// 结构化错误中使用的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidImage(_) => "invalid_image",
            ScrapeError::InvalidCaptcha { .. } => "invalid_captcha",
            ScrapeError::Portal(_) => "portal_error",
            ScrapeError::InvalidIdentifier(_) => "invalid_identifier",
            ScrapeError::InvalidRange(_) => "invalid_range",
            ScrapeError::RetryBudgetExhausted { .. } => "retry_budget_exhausted",
            ScrapeError::ChallengeUnavailable { .. } => "challenge_unavailable",
            ScrapeError::Cancelled => "cancelled",
            ScrapeError::TaskFailed(_) => "task_failed",
            ScrapeError::Recognition(_) => "recognition_error",
            ScrapeError::Config(_) => "config_error",
            ScrapeError::Http(_) => "http_error",
            ScrapeError::Image(_) => "image_error",
            ScrapeError::Io(_) => "io_error",
            ScrapeError::Csv(_) => "csv_error",
        }
    }
}

/// 返回给调用方的结构化错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

impl From<&ScrapeError> for ErrorPayload {
    fn from(err: &ScrapeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// 库内统一的结果类型
pub type Result<T> = std::result::Result<T, ScrapeError>;
