//! 集成测试用的桩实现：内存门户 + 脚本化识别器
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vtu_result_scraper::{
    App, CaptchaImage, Challenge, CleanedImage, Config, FormToken, Identifier, PortalSession,
    RawResponse, Recognizer, ResponseClassifier, Result, RetryPolicy, ScrapeError, ScrapeFlow,
};

/// 门户只接受这个识别结果
pub const CORRECT_GUESS: &str = "right";

pub const INVALID_CAPTCHA_BODY: &str = "<script>alert('Invalid captcha code !!!');</script>";
pub const NOT_AVAILABLE_BODY: &str =
    "<script>alert('University Seat Number is not available or Invalid..!');</script>";

pub fn success_body(identifier: &Identifier) -> String {
    format!(
        "<table><tr><td>Student Name</td><td>: STUDENT {}</td></tr></table>",
        identifier
    )
}

/// 内存门户
///
/// - 每次获取验证码都发放新的令牌
/// - 识别结果等于 `CORRECT_GUESS` 时返回成绩页，否则返回验证码错误
/// - `rejected` 中的学号总是返回"学号不存在"提示
#[derive(Default)]
pub struct StubPortal {
    pub fetches: AtomicUsize,
    pub submits: AtomicUsize,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    fetch_failures: AtomicUsize,
    fetch_delay: Duration,
    submit_error: bool,
    rejected: HashSet<String>,
    submitted_tokens: Mutex<Vec<String>>,
}

impl StubPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 前 `n` 次获取验证码失败
    pub fn with_fetch_failures(self, n: usize) -> Self {
        self.fetch_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// 每次提交都是传输错误
    pub fn with_submit_error(mut self) -> Self {
        self.submit_error = true;
        self
    }

    pub fn with_rejected(mut self, identifiers: &[&str]) -> Self {
        self.rejected = identifiers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn submitted_tokens(&self) -> Vec<String> {
        self.submitted_tokens.lock().unwrap().clone()
    }

    fn take_fetch_failure(&self) -> bool {
        self.fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PortalSession for StubPortal {
    async fn fetch_challenge(&self, index_url: &str) -> Result<Challenge> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.take_fetch_failure() {
            return Err(ScrapeError::Portal("门户暂时不可用".to_string()));
        }

        Ok(Challenge {
            image: captcha_image(),
            token: FormToken::new(
                format!("token-{}", n),
                "http://portal.test/resultpage.php",
                index_url,
                Some(format!("PHPSESSID=session-{}", n)),
            ),
        })
    }

    async fn submit(
        &self,
        token: FormToken,
        identifier: &Identifier,
        guess: &str,
    ) -> Result<RawResponse> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted_tokens
            .lock()
            .unwrap()
            .push(token.value().to_string());

        if self.submit_error {
            return Err(ScrapeError::Portal("connection reset".to_string()));
        }
        if self.rejected.contains(&identifier.to_string()) {
            return Ok(RawResponse::new(200, NOT_AVAILABLE_BODY));
        }
        if guess == CORRECT_GUESS {
            Ok(RawResponse::new(200, success_body(identifier)))
        } else {
            Ok(RawResponse::new(200, INVALID_CAPTCHA_BODY))
        }
    }
}

/// 浅灰背景上的一条深色横线
pub fn captcha_image() -> CaptchaImage {
    let (width, height) = (12u32, 6u32);
    let mut pixels = vec![210u8; (width * height) as usize];
    for y in 2..4 {
        for x in 2..10 {
            pixels[(y * width + x) as usize] = 30;
        }
    }
    CaptchaImage::from_luma(width, height, pixels).unwrap()
}

fn is_binary(image: &CleanedImage) -> bool {
    image
        .pixels()
        .iter()
        .all(|&p| p == CleanedImage::INK || p == CleanedImage::PAPER)
}

/// 按脚本返回识别结果：第 `correct_from` 次调用起返回正确结果
pub struct ScriptedRecognizer {
    calls: AtomicUsize,
    binary_inputs: AtomicUsize,
    correct_from: Option<usize>,
}

impl ScriptedRecognizer {
    /// 第 `n` 次调用（从 1 开始）起识别正确
    pub fn correct_from(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            binary_inputs: AtomicUsize::new(0),
            correct_from: Some(n),
        }
    }

    pub fn always_correct() -> Self {
        Self::correct_from(1)
    }

    pub fn always_wrong() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            binary_inputs: AtomicUsize::new(0),
            correct_from: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 收到的二值图数量
    pub fn binary_inputs(&self) -> usize {
        self.binary_inputs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, image: CleanedImage) -> Result<String> {
        if is_binary(&image) {
            self.binary_inputs.fetch_add(1, Ordering::SeqCst);
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.correct_from {
            Some(n) if call >= n => Ok(CORRECT_GUESS.to_string()),
            _ => Ok(format!("wrong{}", call)),
        }
    }
}

/// 总是返回同一个原始识别结果
pub struct FixedRecognizer {
    text: String,
    calls: AtomicUsize,
    binary_inputs: AtomicUsize,
}

impl FixedRecognizer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            binary_inputs: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn binary_inputs(&self) -> usize {
        self.binary_inputs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for FixedRecognizer {
    async fn recognize(&self, image: CleanedImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if is_binary(&image) {
            self.binary_inputs.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.text.clone())
    }
}

/// 测试配置：重试 5 次，退避 1ms
pub fn test_config(max_concurrent: usize) -> Config {
    Config {
        max_retry: 5,
        max_concurrent,
        max_fetch_attempts: 3,
        fetch_backoff_ms: 1,
        ..Config::default()
    }
}

pub fn build_flow(
    portal: Arc<StubPortal>,
    recognizer: Arc<dyn Recognizer>,
    max_retry: usize,
) -> ScrapeFlow {
    let config = Config {
        max_retry,
        ..test_config(1)
    };
    ScrapeFlow::new(
        portal,
        recognizer,
        ResponseClassifier::from_config(&config).unwrap(),
        RetryPolicy::from_config(&config),
    )
}

pub fn build_app(
    config: Config,
    portal: Arc<StubPortal>,
    recognizer: Arc<ScriptedRecognizer>,
) -> App {
    App::with_components(config, portal, recognizer).unwrap()
}
