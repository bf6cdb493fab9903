use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// 程序配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 成绩门户根地址
    pub portal_base_url: String,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否校验 TLS 证书
    pub verify_ssl: bool,
    /// 每个学号的验证码重试次数
    pub max_retry: usize,
    /// 同时处理的学号数量
    pub max_concurrent: usize,
    /// 连续获取验证码失败的上限（不占用验证码重试次数）
    pub max_fetch_attempts: usize,
    /// 获取验证码失败后的退避基数（毫秒），每次翻倍
    pub fetch_backoff_ms: u64,
    /// 范围查询整体超时（秒），超时后取消剩余学号
    pub range_timeout_secs: Option<u64>,
    /// 单次范围查询最多包含的学号数量
    pub max_range_size: usize,
    /// 识别前是否清洗验证码
    pub enable_clean: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 识别服务配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 响应判定 ---
    /// 成绩页中一定出现的文字
    pub success_markers: Vec<String>,
    /// 验证码错误提示
    pub invalid_captcha_markers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_base_url: "https://results.vtu.ac.in".to_string(),
            request_timeout_secs: 20,
            verify_ssl: false,
            max_retry: 5,
            max_concurrent: 10,
            max_fetch_attempts: 3,
            fetch_backoff_ms: 500,
            range_timeout_secs: None,
            max_range_size: 10_000,
            enable_clean: true,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            success_markers: vec!["Student Name".to_string()],
            invalid_captcha_markers: vec!["Invalid captcha code".to_string()],
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            portal_base_url: std::env::var("PORTAL_BASE_URL").unwrap_or(default.portal_base_url),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", default.request_timeout_secs),
            verify_ssl: env_parse("VERIFY_SSL", default.verify_ssl),
            max_retry: env_parse("MAX_RETRY", default.max_retry),
            max_concurrent: env_parse("MAX_CONCURRENT", default.max_concurrent),
            max_fetch_attempts: env_parse("MAX_FETCH_ATTEMPTS", default.max_fetch_attempts),
            fetch_backoff_ms: env_parse("FETCH_BACKOFF_MS", default.fetch_backoff_ms),
            range_timeout_secs: std::env::var("RANGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(default.range_timeout_secs),
            max_range_size: env_parse("MAX_RANGE_SIZE", default.max_range_size),
            enable_clean: env_parse("ENABLE_CLEAN", default.enable_clean),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            success_markers: env_list("SUCCESS_MARKERS").unwrap_or(default.success_markers),
            invalid_captcha_markers: env_list("INVALID_CAPTCHA_MARKERS")
                .unwrap_or(default.invalid_captcha_markers),
        }
    }

    /// 从 TOML 文件加载，缺省的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ScrapeError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.max_retry == 0 {
            return Err(ScrapeError::Config("max_retry 必须大于 0".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(ScrapeError::Config("max_concurrent 必须大于 0".to_string()));
        }
        if self.max_range_size == 0 {
            return Err(ScrapeError::Config("max_range_size 必须大于 0".to_string()));
        }
        if self.max_fetch_attempts == 0 {
            return Err(ScrapeError::Config("max_fetch_attempts 必须大于 0".to_string()));
        }
        if self.success_markers.is_empty() {
            return Err(ScrapeError::Config("success_markers 不能为空".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn range_timeout(&self) -> Option<Duration> {
        self.range_timeout_secs.map(Duration::from_secs)
    }

    /// 解析查询首页地址
    ///
    /// 完整 URL 原样返回；站点路径（如 `JJEcbcs25`）拼接为
    /// `{portal_base_url}/{site}/index.php`。
    pub fn resolve_index_url(&self, index_url: &str) -> String {
        let trimmed = index_url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return trimmed.to_string();
        }
        format!(
            "{}/{}/index.php",
            self.portal_base_url.trim_end_matches('/'),
            trimmed.trim_matches('/')
        )
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 逗号分隔的列表
fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = std::env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_retry, 5);
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.max_range_size, 10_000);
        assert!(config.enable_clean);
        assert_ok!(config.validate());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str(
            r#"
            max_retry = 8
            max_concurrent = 4
            enable_clean = false
            invalid_captcha_markers = ["Wrong captcha"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retry, 8);
        assert_eq!(config.max_concurrent, 4);
        assert!(!config.enable_clean);
        assert_eq!(config.invalid_captcha_markers, vec!["Wrong captcha"]);
        assert_eq!(config.request_timeout_secs, 20);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml_str("max_retry = \"lots\""),
            Err(ScrapeError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_budgets() {
        let config = Config {
            max_retry: 0,
            ..Config::default()
        };
        assert_err!(config.validate());

        let config = Config {
            max_concurrent: 0,
            ..Config::default()
        };
        assert_err!(config.validate());

        let config = Config {
            max_range_size: 0,
            ..Config::default()
        };
        assert_err!(config.validate());

        let config = Config {
            success_markers: Vec::new(),
            ..Config::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn resolves_site_path_against_base_url() {
        let config = Config::default();
        assert_eq!(
            config.resolve_index_url("JJEcbcs25"),
            "https://results.vtu.ac.in/JJEcbcs25/index.php"
        );
        assert_eq!(
            config.resolve_index_url("https://example.org/x/index.php"),
            "https://example.org/x/index.php"
        );
    }
}
