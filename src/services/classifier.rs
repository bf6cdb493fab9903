//! 响应判定 - 业务能力层
//!
//! 把门户对表单提交的响应归为三类之一，是重试循环唯一的决策点：
//!
//! 1. 非 2xx 状态码 → `PortalError`
//! 2. 包含验证码错误提示 → `InvalidCaptcha`
//! 3. 包含成绩页标志文字 → `Success`
//! 4. 其他 → `PortalError`，带上门户 `alert('...')` 中的提示（如果有）

use regex::Regex;

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::{AttemptOutcome, RawResponse};
use crate::utils::truncate_text;

const ALERT_PATTERN: &str = r#"alert\(\s*['"]([^'"]*)['"]\s*\)"#;

/// 响应判定器
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    success_markers: Vec<String>,
    invalid_captcha_markers: Vec<String>,
    alert_re: Regex,
}

impl ResponseClassifier {
    pub fn new(success_markers: Vec<String>, invalid_captcha_markers: Vec<String>) -> Result<Self> {
        let alert_re = Regex::new(ALERT_PATTERN).map_err(|e| ScrapeError::Config(e.to_string()))?;
        Ok(Self {
            success_markers,
            invalid_captcha_markers,
            alert_re,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.success_markers.clone(),
            config.invalid_captcha_markers.clone(),
        )
    }

    /// 判定一次提交的结果
    pub fn classify(&self, response: &RawResponse) -> AttemptOutcome {
        if !response.is_http_success() {
            return AttemptOutcome::PortalError(format!("HTTP {}", response.status));
        }

        let body = &response.body;

        // 验证码错误页也可能带有成绩页的部分文字，先判断验证码
        if self
            .invalid_captcha_markers
            .iter()
            .any(|m| body.contains(m.as_str()))
        {
            return AttemptOutcome::InvalidCaptcha;
        }

        if self.success_markers.iter().any(|m| body.contains(m.as_str())) {
            return AttemptOutcome::Success;
        }

        let reason = match self.alert_re.captures(body).and_then(|c| c.get(1)) {
            Some(message) => message.as_str().trim().to_string(),
            None => format!("无法识别的响应: {}", truncate_text(body.trim(), 80)),
        };
        AttemptOutcome::PortalError(reason)
    }
}
