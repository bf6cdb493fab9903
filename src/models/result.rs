//! 抓取结果
//!
//! `ScrapeResult` 一旦生成便不再修改；`RangeResult` 只由范围编排器写入，
//! 迭代顺序与学号枚举顺序一致。

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ErrorPayload, ScrapeError};
use crate::models::attempt::AttemptRecord;

/// 单个学号的最终结果
#[derive(Debug)]
pub enum ScrapeResult {
    /// 成功，`payload` 为门户返回的成绩页 HTML
    Success {
        payload: String,
        attempts: Vec<AttemptRecord>,
    },
    /// 尝试过但失败
    Failure {
        error: ScrapeError,
        attempts: Vec<AttemptRecord>,
    },
    /// 取消时尚未开始
    NotAttempted,
}

/// 结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    Failure,
    NotAttempted,
}

impl ScrapeResult {
    pub fn failure(error: ScrapeError, attempts: Vec<AttemptRecord>) -> Self {
        ScrapeResult::Failure { error, attempts }
    }

    pub fn status(&self) -> ScrapeStatus {
        match self {
            ScrapeResult::Success { .. } => ScrapeStatus::Success,
            ScrapeResult::Failure { .. } => ScrapeStatus::Failure,
            ScrapeResult::NotAttempted => ScrapeStatus::NotAttempted,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeResult::Success { .. })
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            ScrapeResult::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScrapeError> {
        match self {
            ScrapeResult::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// 已记录的验证码尝试
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            ScrapeResult::Success { attempts, .. } | ScrapeResult::Failure { attempts, .. } => {
                attempts
            }
            ScrapeResult::NotAttempted => &[],
        }
    }

    /// 转换为可序列化的对外结果
    pub fn to_outcome(&self) -> ScrapeOutcome {
        ScrapeOutcome {
            status: self.status(),
            payload: self.payload().map(str::to_string),
            error: self.error().map(ErrorPayload::from),
            attempts: self.attempts().to_vec(),
        }
    }
}

/// 对外暴露的单个学号结果：成绩页或结构化错误
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub status: ScrapeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    pub attempts: Vec<AttemptRecord>,
}

impl ScrapeOutcome {
    /// 请求本身无效（例如学号格式错误）时的结果
    pub fn rejected(err: &ScrapeError) -> Self {
        Self {
            status: ScrapeStatus::Failure,
            payload: None,
            error: Some(ErrorPayload::from(err)),
            attempts: Vec::new(),
        }
    }
}

/// 范围统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RangeStats {
    pub success: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub total: usize,
}

/// 学号 → 结果，按学号枚举顺序排列
#[derive(Debug, Default)]
pub struct RangeResult {
    entries: IndexMap<String, ScrapeResult>,
}

impl RangeResult {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// 每个学号只能写入一次
    pub(crate) fn record(&mut self, identifier: String, result: ScrapeResult) {
        let previous = self.entries.insert(identifier, result);
        debug_assert!(previous.is_none(), "identifier recorded twice");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&ScrapeResult> {
        self.entries.get(identifier)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScrapeResult)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn stats(&self) -> RangeStats {
        let mut stats = RangeStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for result in self.entries.values() {
            match result.status() {
                ScrapeStatus::Success => stats.success += 1,
                ScrapeStatus::Failure => stats.failed += 1,
                ScrapeStatus::NotAttempted => stats.not_attempted += 1,
            }
        }
        stats
    }

    /// 转换为有序的可序列化映射
    pub fn to_outcomes(&self) -> IndexMap<String, ScrapeOutcome> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_outcome()))
            .collect()
    }
}
