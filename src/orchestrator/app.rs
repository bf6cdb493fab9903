//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 持有配置和所有能力对象，对上层暴露两个操作：
//!
//! - `scrape_single`：查询单个学号，返回成绩页或结构化错误
//! - `scrape_range`：查询学号范围，返回按学号顺序排列的结果
//! - `evaluate`：用样本目录评估识别效果
//!
//! 具体的门户客户端和识别器可以替换（测试中使用桩实现）。

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clients::HttpPortalClient;
use crate::config::Config;
use crate::error::Result;
use crate::models::{Identifier, RangeRequest, RangeResult, ScrapeOutcome, SingleRequest};
use crate::orchestrator::evaluator::{EvalReport, Evaluator};
use crate::orchestrator::range_runner::RangeOrchestrator;
use crate::services::{LlmRecognizer, PortalSession, Recognizer, ResponseClassifier};
use crate::utils::logging;
use crate::workflow::{RetryPolicy, ScrapeCtx, ScrapeFlow};

/// 应用主结构
pub struct App {
    config: Config,
    recognizer: Arc<dyn Recognizer>,
    flow: ScrapeFlow,
    orchestrator: RangeOrchestrator,
}

impl App {
    /// 使用 HTTP 门户客户端和视觉模型识别器初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        let portal = Arc::new(HttpPortalClient::new(&config)?);
        let recognizer = Arc::new(LlmRecognizer::new(&config));

        let app = Self::with_components(config, portal, recognizer)?;
        logging::log_startup(&app.config);
        Ok(app)
    }

    /// 使用指定的门户客户端和识别器初始化
    pub fn with_components(
        config: Config,
        portal: Arc<dyn PortalSession>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Result<Self> {
        config.validate()?;
        let classifier = ResponseClassifier::from_config(&config)?;
        let flow = ScrapeFlow::new(
            portal,
            recognizer.clone(),
            classifier,
            RetryPolicy::from_config(&config),
        )
        .with_clean(config.enable_clean);
        let orchestrator =
            RangeOrchestrator::new(flow.clone(), config.max_concurrent, config.max_range_size);

        Ok(Self {
            config,
            recognizer,
            flow,
            orchestrator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 查询单个学号
    ///
    /// 学号格式错误同样以结构化错误返回，不会抛出。
    pub async fn scrape_single(&self, request: &SingleRequest) -> ScrapeOutcome {
        let identifier: Identifier = match request.usn.parse() {
            Ok(identifier) => identifier,
            Err(e) => return ScrapeOutcome::rejected(&e),
        };

        let index_url = self.config.resolve_index_url(&request.index_url);
        let ctx = ScrapeCtx::single(index_url, identifier);
        self.flow.run(&ctx).await.to_outcome()
    }

    /// 查询学号范围
    ///
    /// `cancel` 被触发时，正在查询的学号记为取消，尚未开始的记为未开始。
    /// 配置了 `range_timeout_secs` 时超时会自动触发取消。
    pub async fn scrape_range(
        &self,
        request: &RangeRequest,
        cancel: CancellationToken,
    ) -> Result<RangeResult> {
        let index_url = self.config.resolve_index_url(&request.index_url);
        let cancel = cancel.child_token();

        if let Some(timeout) = self.config.range_timeout() {
            let timer = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = timer.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        info!("⏰ 范围查询超时 ({:?})，取消剩余学号", timeout);
                        timer.cancel();
                    }
                }
            });
        }

        let result = self
            .orchestrator
            .run(&index_url, &request.start_usn, &request.end_usn, cancel.clone())
            .await;

        // 结束后释放超时计时器
        cancel.cancel();

        let result = result?;
        logging::print_range_stats(&result.stats());
        Ok(result)
    }

    /// 用样本目录评估识别效果，`out_csv` 指定时逐行写入 CSV
    pub async fn evaluate(&self, folder: &Path, out_csv: Option<&Path>) -> Result<EvalReport> {
        Evaluator::new(self.recognizer.clone(), self.config.enable_clean)
            .evaluate_folder(folder, out_csv)
            .await
    }
}
