//! 识别效果评估 - 编排层
//!
//! ## 职责
//!
//! 对一个目录中的验证码样本逐个清洗、识别，并与文件名（不含扩展名）比对：
//!
//! - 只处理 `.jpg` / `.jpeg` / `.png`，按文件名排序
//! - 单个样本读取或识别失败只记为一行错误，不中断评估
//! - 指定输出文件时逐行写入 CSV（`file,expected,ocr,clean,match`），每行写完立即落盘

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Result, ScrapeError};
use crate::models::CaptchaImage;
use crate::services::{image_cleaner, normalize_guess, Recognizer};

const SAMPLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

const CSV_HEADER: [&str; 5] = ["file", "expected", "ocr", "clean", "match"];

/// 单个样本的评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalRow {
    pub file: String,
    pub expected: String,
    /// 识别器原始输出
    pub ocr: String,
    /// 规整后的识别结果；出错时为 `ERROR: ...`
    pub clean: String,
    #[serde(rename = "match")]
    pub matched: bool,
}

impl EvalRow {
    fn record(&self) -> [&str; 5] {
        [
            self.file.as_str(),
            self.expected.as_str(),
            self.ocr.as_str(),
            self.clean.as_str(),
            if self.matched { "1" } else { "0" },
        ]
    }
}

/// 整个目录的评估结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct EvalReport {
    pub rows: Vec<EvalRow>,
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn matched(&self) -> usize {
        self.rows.iter().filter(|row| row.matched).count()
    }

    /// 识别准确率，没有样本时为 0
    pub fn accuracy(&self) -> f64 {
        if self.rows.is_empty() {
            0.0
        } else {
            self.matched() as f64 / self.total() as f64
        }
    }
}

/// 识别效果评估器
pub struct Evaluator {
    recognizer: Arc<dyn Recognizer>,
    enable_clean: bool,
}

impl Evaluator {
    pub fn new(recognizer: Arc<dyn Recognizer>, enable_clean: bool) -> Self {
        Self {
            recognizer,
            enable_clean,
        }
    }

    /// 评估目录中的所有样本
    ///
    /// # 错误
    /// 目录不存在、无法读取或 CSV 无法写入时返回错误
    pub async fn evaluate_folder(&self, folder: &Path, out_csv: Option<&Path>) -> Result<EvalReport> {
        if !folder.is_dir() {
            return Err(ScrapeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("样本目录不存在: {}", folder.display()),
            )));
        }

        let samples = list_samples(folder)?;
        info!(
            "📦 开始评估 {}，共 {} 个样本 (清洗: {})",
            folder.display(),
            samples.len(),
            if self.enable_clean { "开启" } else { "关闭" }
        );

        let mut writer = match out_csv {
            Some(path) => {
                let mut writer = csv::Writer::from_path(path)?;
                writer.write_record(CSV_HEADER)?;
                writer.flush()?;
                Some(writer)
            }
            None => None,
        };

        let mut report = EvalReport::default();
        for path in samples {
            let row = self.evaluate_file(&path).await;
            if let Some(writer) = writer.as_mut() {
                writer.write_record(row.record())?;
                writer.flush()?;
            }
            report.rows.push(row);
        }

        info!(
            "📊 评估完成: {}/{} 正确 ({:.1}%)",
            report.matched(),
            report.total(),
            report.accuracy() * 100.0
        );
        Ok(report)
    }

    /// 评估单个样本，期望结果取自文件名
    pub async fn evaluate_file(&self, path: &Path) -> EvalRow {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expected = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.recognize_file(path).await {
            Ok(ocr) => {
                let clean = normalize_guess(&ocr);
                let matched = clean == expected;
                if matched {
                    info!("✓ MATCH: {} == {} ({})", clean, expected, file);
                } else {
                    warn!("✗ MISMATCH: {} != {} ({})", clean, expected, file);
                }
                EvalRow {
                    file,
                    expected,
                    ocr,
                    clean,
                    matched,
                }
            }
            Err(e) => {
                error!("❌ 处理 {} 失败: {}", file, e);
                EvalRow {
                    file,
                    expected,
                    ocr: String::new(),
                    clean: format!("ERROR: {}", e),
                    matched: false,
                }
            }
        }
    }

    async fn recognize_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let image = CaptchaImage::from_bytes(&bytes)?;
        let prepared = image_cleaner::prepare(image, self.enable_clean)?;
        self.recognizer.recognize(prepared).await
    }
}

/// 目录中的样本文件，按路径排序
pub fn list_samples(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut samples: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_sample(path))
        .collect();
    samples.sort();
    Ok(samples)
}

fn is_sample(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SAMPLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
