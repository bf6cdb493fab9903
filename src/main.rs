use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vtu_result_scraper::utils::logging;
use vtu_result_scraper::{logger, App, Config, RangeRequest, SingleRequest};

/// 成绩门户验证码自动查询工具
#[derive(Debug, Parser)]
#[command(name = "vtu-scrape", version)]
struct Cli {
    /// TOML 配置文件，不指定时从环境变量读取
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 识别前不清洗验证码
    #[arg(long, global = true)]
    no_clean: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 查询单个学号
    Single { index_url: String, usn: String },
    /// 查询学号范围 [start, end]
    Range {
        index_url: String,
        start: String,
        end: String,
        /// 覆盖配置中的最大并发数
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// 用样本目录评估识别效果（文件名即正确答案）
    Eval {
        folder: PathBuf,
        /// 结果 CSV 路径
        #[arg(long, default_value = "results.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => Config::from_env(),
    };
    if let Command::Range {
        concurrency: Some(n),
        ..
    } = &cli.command
    {
        config.max_concurrent = *n;
    }
    if cli.no_clean {
        config.enable_clean = false;
    }

    let log_file = config.output_log_file.clone();
    logging::init_log_file(&log_file)?;
    let app = App::initialize(config)?;

    let output = match cli.command {
        Command::Single { index_url, usn } => {
            let request = SingleRequest { index_url, usn };
            let outcome = app.scrape_single(&request).await;
            logging::append_single_report(&log_file, &request.usn, &outcome)?;
            serde_json::to_string_pretty(&outcome)?
        }
        Command::Range {
            index_url,
            start,
            end,
            ..
        } => {
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("⏹️ 收到中断信号，取消剩余学号");
                    ctrl_c.cancel();
                }
            });

            let request = RangeRequest {
                index_url,
                start_usn: start,
                end_usn: end,
            };
            let result = app.scrape_range(&request, cancel).await?;
            logging::append_range_report(&log_file, &request.start_usn, &request.end_usn, &result)?;
            serde_json::to_string_pretty(&result.to_outcomes())?
        }
        Command::Eval { folder, out } => {
            let report = app.evaluate(&folder, Some(&out)).await?;
            info!("📄 评估结果已写入 {}", out.display());
            serde_json::to_string_pretty(&report)?
        }
    };

    println!("{}", output);
    Ok(())
}
