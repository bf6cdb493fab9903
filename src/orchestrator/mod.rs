//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! app (对外操作：单个学号 / 学号范围)
//!     ↓
//! range_runner (处理 Vec<Identifier>，并发控制 + 有序汇总)
//!     ↓
//! workflow::ScrapeFlow (处理单个学号的重试状态机)
//!     ↓
//! services (能力层：清洗 / 识别 / 判定 / 门户会话)
//!     ↓
//! clients (基础设施：HTTP 门户客户端)
//! ```
//!
//! `evaluator` 不经过门户，直接用样本目录检验清洗 + 识别的效果。

pub mod app;
pub mod evaluator;
pub mod range_runner;

pub use app::App;
pub use evaluator::{EvalReport, EvalRow, Evaluator};
pub use range_runner::RangeOrchestrator;
