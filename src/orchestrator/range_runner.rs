//! 学号范围编排器 - 编排层
//!
//! ## 职责
//!
//! 对 `[start, end]` 内的每个学号运行一次 `ScrapeFlow`，汇总为 `RangeResult`。
//!
//! ## 核心功能
//!
//! 1. **范围校验**：起止学号不合法或学号数量超过上限时立即返回 `InvalidRange`，
//!    不分配结果缓冲区，也不发起任何查询
//! 2. **并发控制**：使用 Semaphore 限制同时运行的学号数量，一个完成后立即放入下一个
//! 3. **失败隔离**：单个学号的失败只记录在结果里，不影响其他学号
//! 4. **有序汇总**：按枚举顺序等待任务句柄，结果顺序与完成顺序无关
//! 5. **取消**：取消后正在运行的学号记为 `Cancelled` 失败，尚未开始的记为 `NotAttempted`

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{Result, ScrapeError};
use crate::models::{Identifier, IdentifierRange, RangeResult, ScrapeResult};
use crate::utils::logging;
use crate::workflow::{ScrapeCtx, ScrapeFlow};

/// 范围编排器
#[derive(Clone)]
pub struct RangeOrchestrator {
    flow: ScrapeFlow,
    max_concurrent: usize,
    max_range_size: usize,
}

impl RangeOrchestrator {
    pub fn new(flow: ScrapeFlow, max_concurrent: usize, max_range_size: usize) -> Self {
        Self {
            flow,
            max_concurrent,
            max_range_size,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// 使用默认并发数查询整个范围
    pub async fn run(
        &self,
        index_url: &str,
        start: &str,
        end: &str,
        cancel: CancellationToken,
    ) -> Result<RangeResult> {
        self.run_with_concurrency(index_url, start, end, self.max_concurrent, cancel)
            .await
    }

    /// 查询整个范围
    ///
    /// # 错误
    /// 只有范围本身无效时返回错误；单个学号的失败记录在结果中。
    pub async fn run_with_concurrency(
        &self,
        index_url: &str,
        start: &str,
        end: &str,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<RangeResult> {
        if concurrency == 0 {
            return Err(ScrapeError::Config("并发数必须大于 0".to_string()));
        }

        let range = IdentifierRange::parse(start, end)?;
        let total = match usize::try_from(range.count_remaining()) {
            Ok(total) if total <= self.max_range_size => total,
            _ => {
                return Err(ScrapeError::InvalidRange(format!(
                    "{} ~ {} 共 {} 个学号，超过上限 {}",
                    start,
                    end,
                    range.count_remaining(),
                    self.max_range_size
                )))
            }
        };
        logging::log_range_start(start, end, total, concurrency);

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles: Vec<(Identifier, Option<JoinHandle<ScrapeResult>>)> =
            Vec::with_capacity(total);

        for (idx, identifier) in range.enumerate() {
            // 等待空闲名额；取消后剩余学号不再启动
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                handles.push((identifier, None));
                continue;
            };

            let ctx = ScrapeCtx::new(index_url, identifier.clone(), idx + 1, total);
            let flow = self.flow.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!("{} ⏹️ 已取消", ctx);
                        ScrapeResult::failure(ScrapeError::Cancelled, Vec::new())
                    }
                    result = flow.run(&ctx) => result,
                }
            });
            handles.push((identifier, Some(handle)));
        }

        // 按枚举顺序汇总
        let finished = join_all(handles.into_iter().map(|(identifier, handle)| async move {
            let result = match handle {
                None => ScrapeResult::NotAttempted,
                Some(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("[学号 {}] 任务执行失败: {}", identifier, e);
                        ScrapeResult::failure(ScrapeError::TaskFailed(e.to_string()), Vec::new())
                    }
                },
            };
            (identifier, result)
        }))
        .await;

        let mut results = RangeResult::with_capacity(total);
        for (identifier, result) in finished {
            results.record(identifier.to_string(), result);
        }

        let stats = results.stats();
        info!(
            "范围 {} ~ {} 完成: 成功 {}, 失败 {}, 未开始 {}",
            start, end, stats.success, stats.failed, stats.not_attempted
        );

        Ok(results)
    }
}
