//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数；查询结果同时追加到输出日志文件中。

use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::models::{RangeResult, RangeStats, ScrapeOutcome, ScrapeResult};

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n成绩抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 验证码成绩抓取模式");
    info!("🌐 门户地址: {}", config.portal_base_url);
    info!(
        "📊 最大并发数: {} | 验证码重试: {} 次",
        config.max_concurrent, config.max_retry
    );
    info!("{}", "=".repeat(60));
}

/// 记录范围查询开始
///
/// # 参数
/// - `start`: 起始学号
/// - `end`: 结束学号
/// - `total`: 学号总数
/// - `max_concurrent`: 最大并发数
pub fn log_range_start(start: &str, end: &str, total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始查询学号范围 {} ~ {}", start, end);
    info!("📄 共 {} 个学号，最多同时处理 {} 个", total, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印范围查询统计
pub fn print_range_stats(stats: &RangeStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 范围查询完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    if stats.not_attempted > 0 {
        info!("⏹️ 未开始: {}", stats.not_attempted);
    }
    info!("{}", "=".repeat(60));
}

/// 把范围查询结果追加到输出日志文件
///
/// 每个学号一行：学号、状态、尝试次数、失败原因
pub fn append_range_report(
    log_file_path: &str,
    start: &str,
    end: &str,
    result: &RangeResult,
) -> Result<()> {
    let stats = result.stats();
    let mut report = format!(
        "[{}] 学号范围 {} ~ {}: 成功 {}/{}, 失败 {}, 未开始 {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        start,
        end,
        stats.success,
        stats.total,
        stats.failed,
        stats.not_attempted
    );
    for (usn, entry) in result.iter() {
        let line = match entry {
            ScrapeResult::Success { attempts, .. } => {
                format!("  {}\t成功\t{} 次尝试\n", usn, attempts.len())
            }
            ScrapeResult::Failure { error, attempts } => {
                format!("  {}\t失败\t{} 次尝试\t{}\n", usn, attempts.len(), error)
            }
            ScrapeResult::NotAttempted => format!("  {}\t未开始\n", usn),
        };
        report.push_str(&line);
    }
    report.push('\n');

    append_to_log(log_file_path, &report)
}

/// 把单个学号的查询结果追加到输出日志文件
pub fn append_single_report(log_file_path: &str, usn: &str, outcome: &ScrapeOutcome) -> Result<()> {
    let detail = match &outcome.error {
        Some(error) => format!("失败\t{}: {}", error.kind, error.message),
        None => "成功".to_string(),
    };
    let line = format!(
        "[{}] 学号 {}\t{}\t{} 次尝试\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        usn,
        detail,
        outcome.attempts.len()
    );
    append_to_log(log_file_path, &line)
}

fn append_to_log(log_file_path: &str, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
