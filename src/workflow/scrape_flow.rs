//! 学号查询流程 - 流程层
//!
//! 核心职责：定义"一个学号"的完整重试状态机
//!
//! 每次尝试：获取验证码 → 清洗 → 识别 → 提交 → 判定
//!
//! - 判定为成功：立即结束，不会发起下一次尝试
//! - 验证码错误 / 提交时门户错误：消耗一次 `max_retry`
//! - 获取验证码、清洗、识别失败：不消耗 `max_retry`，单独计数并指数退避，
//!   连续失败 `max_fetch_attempts` 次后以基础设施故障结束
//!
//! 每次尝试的令牌和图片只属于这一次尝试，令牌提交时按值消费。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::{AttemptOutcome, AttemptRecord, Challenge, FormToken, ScrapeResult};
use crate::services::{image_cleaner, PortalSession, Recognizer, ResponseClassifier};
use crate::workflow::scrape_ctx::ScrapeCtx;

/// 退避时间最多翻倍的次数
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 验证码重试次数
    pub max_retry: usize,
    /// 连续获取验证码失败的上限
    pub max_fetch_attempts: usize,
    /// 获取失败后的退避基数
    pub fetch_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retry: config.max_retry,
            max_fetch_attempts: config.max_fetch_attempts,
            fetch_backoff: Duration::from_millis(config.fetch_backoff_ms),
        }
    }

    /// 第 `failures` 次连续失败后的等待时间
    pub fn backoff(&self, failures: usize) -> Duration {
        let doublings = (failures.saturating_sub(1) as u32).min(MAX_BACKOFF_DOUBLINGS);
        self.fetch_backoff.saturating_mul(1 << doublings)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 已识别、等待提交的一次尝试
struct PreparedAttempt {
    token: FormToken,
    guess: String,
}

/// 学号查询流程
///
/// - 编排一个学号的完整重试循环
/// - 不持有任何会话状态，可在多个任务间克隆共享
/// - 只依赖能力接口（portal / recognizer / classifier）
#[derive(Clone)]
pub struct ScrapeFlow {
    portal: Arc<dyn PortalSession>,
    recognizer: Arc<dyn Recognizer>,
    classifier: Arc<ResponseClassifier>,
    policy: RetryPolicy,
    enable_clean: bool,
}

impl ScrapeFlow {
    pub fn new(
        portal: Arc<dyn PortalSession>,
        recognizer: Arc<dyn Recognizer>,
        classifier: ResponseClassifier,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            portal,
            recognizer,
            classifier: Arc::new(classifier),
            policy,
            enable_clean: true,
        }
    }

    /// 关闭后识别器直接收到灰度图
    pub fn with_clean(mut self, enable_clean: bool) -> Self {
        self.enable_clean = enable_clean;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 查询一个学号，直到成功或重试次数耗尽
    pub async fn run(&self, ctx: &ScrapeCtx) -> ScrapeResult {
        info!("{} 开始查询", ctx);

        let max_retry = self.policy.max_retry;
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(max_retry);
        let mut last_rejection: Option<ScrapeError> = None;

        for attempt_index in 1..=max_retry {
            let PreparedAttempt { token, guess } = match self.prepare(ctx).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    error!("{} ❌ {}", ctx, e);
                    return ScrapeResult::failure(e, attempts);
                }
            };

            info!(
                "{} 第 {}/{} 次尝试，识别结果: {:?}",
                ctx, attempt_index, max_retry, guess
            );

            let (outcome, rejection) = match self.portal.submit(token, &ctx.identifier, &guess).await {
                Ok(response) => match self.classifier.classify(&response) {
                    AttemptOutcome::Success => {
                        attempts.push(AttemptRecord {
                            attempt_index,
                            guessed_text: guess,
                            outcome: AttemptOutcome::Success,
                        });
                        info!("{} ✓ 查询成功 (第 {} 次尝试)", ctx, attempt_index);
                        return ScrapeResult::Success {
                            payload: response.body,
                            attempts,
                        };
                    }
                    AttemptOutcome::InvalidCaptcha => (
                        AttemptOutcome::InvalidCaptcha,
                        ScrapeError::InvalidCaptcha {
                            guess: guess.clone(),
                        },
                    ),
                    AttemptOutcome::PortalError(reason) => (
                        AttemptOutcome::PortalError(reason.clone()),
                        ScrapeError::Portal(reason),
                    ),
                },
                Err(e) => (AttemptOutcome::PortalError(e.to_string()), e),
            };

            warn!("{} ⚠️ 第 {} 次尝试失败: {}", ctx, attempt_index, rejection);
            attempts.push(AttemptRecord {
                attempt_index,
                guessed_text: guess,
                outcome,
            });
            last_rejection = Some(rejection);
        }

        let last = last_rejection
            .unwrap_or_else(|| ScrapeError::Config("max_retry 为 0，没有进行任何尝试".to_string()));
        let err = ScrapeError::RetryBudgetExhausted {
            attempts: attempts.len(),
            last: Box::new(last),
        };
        error!("{} ❌ {}", ctx, err);
        ScrapeResult::failure(err, attempts)
    }

    /// 获取一份可用的验证码并完成识别
    ///
    /// 失败不占用验证码重试次数，按退避策略重新获取新的验证码。
    async fn prepare(&self, ctx: &ScrapeCtx) -> Result<PreparedAttempt> {
        let mut failures = 0;
        loop {
            match self.try_prepare(ctx).await {
                Ok(prepared) => return Ok(prepared),
                Err(e) => {
                    failures += 1;
                    if failures >= self.policy.max_fetch_attempts {
                        return Err(ScrapeError::ChallengeUnavailable {
                            failures,
                            last: Box::new(e),
                        });
                    }
                    let delay = self.policy.backoff(failures);
                    warn!(
                        "{} ⚠️ 获取验证码失败 ({}/{}): {}，{:?} 后重试",
                        ctx, failures, self.policy.max_fetch_attempts, e, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn try_prepare(&self, ctx: &ScrapeCtx) -> Result<PreparedAttempt> {
        let Challenge { image, token } = self.portal.fetch_challenge(&ctx.index_url).await?;
        debug!("{} 验证码尺寸: {}x{}", ctx, image.width(), image.height());

        let cleaned = image_cleaner::prepare(image, self.enable_clean)?;
        let guess = self.recognizer.recognize(cleaned).await?;

        Ok(PreparedAttempt { token, guess })
    }
}
