mod common;

use std::path::Path;
use std::sync::Arc;

use common::{build_app, test_config, FixedRecognizer, ScriptedRecognizer, StubPortal};
use image::{GrayImage, Luma};
use tempfile::TempDir;
use tokio_test::assert_err;
use vtu_result_scraper::{Evaluator, ScrapeError};

/// 浅灰背景上的深色笔画
fn write_sample(dir: &Path, name: &str) {
    let image = GrayImage::from_fn(40, 16, |x, y| {
        if (4..12).contains(&y) && x % 8 < 3 {
            Luma([20])
        } else {
            Luma([200])
        }
    });
    image.save(dir.join(name)).unwrap();
}

fn sample_folder() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_sample(dir.path(), "AB12.png");
    write_sample(dir.path(), "XY99.png");
    std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();
    dir
}

#[tokio::test]
async fn test_evaluation_writes_csv_rows() {
    let dir = sample_folder();
    let out = dir.path().join("results.csv");
    let recognizer = Arc::new(FixedRecognizer::new("A B1 2."));

    let report = Evaluator::new(recognizer.clone(), true)
        .evaluate_folder(dir.path(), Some(&out))
        .await
        .unwrap();

    let files: Vec<&str> = report.rows.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["AB12.png", "XY99.png", "broken.jpg"]);
    assert_eq!(report.matched(), 1);
    assert!((report.accuracy() - 1.0 / 3.0).abs() < 1e-9);

    assert!(report.rows[0].matched);
    assert_eq!(report.rows[0].clean, "AB12");
    assert!(!report.rows[1].matched);
    assert_eq!(report.rows[1].expected, "XY99");
    assert!(report.rows[2].ocr.is_empty());
    assert!(report.rows[2].clean.starts_with("ERROR: "));

    // 只有两张图片交给识别器
    assert_eq!(recognizer.calls(), 2);
    assert_eq!(recognizer.binary_inputs(), 2);

    let csv = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "file,expected,ocr,clean,match");
    assert_eq!(lines[1], "AB12.png,AB12,A B1 2.,AB12,1");
    assert_eq!(lines[2], "XY99.png,XY99,A B1 2.,AB12,0");
    assert!(lines[3].starts_with("broken.jpg,broken,,"));
    assert!(lines[3].ends_with(",0"));
}

#[tokio::test]
async fn test_evaluation_without_cleaning() {
    let dir = sample_folder();
    let recognizer = Arc::new(FixedRecognizer::new("AB12"));

    let report = Evaluator::new(recognizer.clone(), false)
        .evaluate_folder(dir.path(), None)
        .await
        .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.matched(), 1);
    assert_eq!(recognizer.calls(), 2);
    assert_eq!(recognizer.binary_inputs(), 0);
    assert!(!dir.path().join("results.csv").exists());
}

#[tokio::test]
async fn test_missing_folder_is_an_error() {
    let dir = TempDir::new().unwrap();
    let evaluator = Evaluator::new(Arc::new(FixedRecognizer::new("AB12")), true);

    let err = assert_err!(
        evaluator
            .evaluate_folder(&dir.path().join("missing"), None)
            .await
    );
    assert!(matches!(err, ScrapeError::Io(_)));
}

#[tokio::test]
async fn test_app_evaluate_follows_clean_setting() {
    let dir = sample_folder();
    let recognizer = Arc::new(ScriptedRecognizer::always_correct());
    let config = vtu_result_scraper::Config {
        enable_clean: false,
        ..test_config(1)
    };
    let app = build_app(config, Arc::new(StubPortal::new()), recognizer.clone());

    let report = app.evaluate(dir.path(), None).await.unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.matched(), 0);
    assert_eq!(recognizer.calls(), 2);
    assert_eq!(recognizer.binary_inputs(), 0);
}
