//! # VTU Result Scraper
//!
//! 自动查询受图片验证码保护的成绩门户
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 持有 HTTP 客户端，只暴露门户会话能力
//! - `HttpPortalClient` - 打开首页取令牌和验证码、提交查询表单
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次尝试
//! - `image_cleaner` - 验证码清洗（灰度 → 中值滤波 → 自适应阈值 → 多数表决）
//! - `Recognizer` / `LlmRecognizer` - 验证码识别能力
//! - `ResponseClassifier` - 判定提交结果
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学号"的完整重试流程
//! - `ScrapeCtx` - 上下文封装（门户地址 + 学号）
//! - `ScrapeFlow` - 重试状态机（获取 → 清洗 → 识别 → 提交 → 判定）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/range_runner` - 学号范围编排，管理并发、取消和有序汇总
//! - `orchestrator/evaluator` - 样本目录评估，检验清洗 + 识别的准确率
//! - `orchestrator/app` - 应用入口，对外暴露单个学号 / 学号范围 / 识别评估三个操作
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::HttpPortalClient;
pub use config::Config;
pub use error::{ErrorPayload, Result, ScrapeError};
pub use models::{
    AttemptOutcome, AttemptRecord, CaptchaImage, Challenge, CleanedImage, FormToken, Identifier,
    IdentifierRange, RangeRequest, RangeResult, RawResponse, ScrapeOutcome, ScrapeResult,
    ScrapeStatus, SingleRequest,
};
pub use orchestrator::{App, EvalReport, EvalRow, Evaluator, RangeOrchestrator};
pub use services::{clean, LlmRecognizer, PortalSession, Recognizer, ResponseClassifier};
pub use workflow::{RetryPolicy, ScrapeCtx, ScrapeFlow};
