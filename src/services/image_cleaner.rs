//! 验证码清洗 - 业务能力层
//!
//! 把原始验证码图片转换为高对比度的二值图（白底黑字）。固定流水线，
//! 每一步都假设上一步的输出分布，顺序不能调换：
//!
//! 1. 灰度化（ITU-R 601-2 感知加权，彩色噪点不会压过笔画）
//! 2. 3×3 中值滤波，去掉孤立噪点
//! 3. 自适应阈值：`(平均亮度 + 最低亮度) / 2`，比阈值暗的是笔画
//! 4. 3×3 多数表决平滑：邻域 9 个像素中至少 5 个是笔画才保留
//!
//! 纯函数，没有随机性：相同输入总是得到逐位相同的输出。

use image::{imageops, DynamicImage, GrayImage, Luma, Rgb};
use imageproc::filter::{filter3x3, median_filter};
use imageproc::map::map_colors;

use crate::error::{Result, ScrapeError};
use crate::models::{CaptchaImage, CleanedImage};

/// 多数表决的票数门槛（3×3 窗口中的过半数）
const MAJORITY: u8 = 5;

/// 清洗验证码图片
///
/// # 错误
/// 零面积图片返回 `ScrapeError::InvalidImage`
pub fn clean(raw: CaptchaImage) -> Result<CleanedImage> {
    ensure_area(&raw)?;

    let gray = grayscale(&raw.into_inner());
    let smoothed = median_filter(&gray, 1, 1);
    let ink = threshold_mask(&smoothed);

    Ok(CleanedImage::from_gray(majority_vote(&ink)))
}

/// 识别前的图片处理
///
/// 关闭清洗时只做灰度化，像素不再限定为 INK / PAPER。
pub fn prepare(raw: CaptchaImage, enable_clean: bool) -> Result<CleanedImage> {
    if enable_clean {
        return clean(raw);
    }
    ensure_area(&raw)?;
    Ok(CleanedImage::from_gray(grayscale(&raw.into_inner())))
}

fn ensure_area(raw: &CaptchaImage) -> Result<()> {
    if raw.width() == 0 || raw.height() == 0 {
        return Err(ScrapeError::InvalidImage(format!(
            "图片尺寸为 {}x{}",
            raw.width(),
            raw.height()
        )));
    }
    Ok(())
}

/// ITU-R 601-2 亮度：`L = R * 299/1000 + G * 587/1000 + B * 114/1000`，定点取整
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471;
    ((weighted + 0x8000) >> 16) as u8
}

fn grayscale(image: &DynamicImage) -> GrayImage {
    map_colors(&image.to_rgb8(), |Rgb([r, g, b])| Luma([luminance(r, g, b)]))
}

/// 自适应阈值：比 `(平均亮度 + 最低亮度) / 2` 暗的像素记为 1
fn threshold_mask(gray: &GrayImage) -> GrayImage {
    let pixels = gray.as_raw();
    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    let mean = sum as f64 / pixels.len() as f64;
    let min = pixels.iter().copied().min().unwrap_or(0);
    let threshold = (mean + f64::from(min)) / 2.0;

    map_colors(gray, |Luma([p])| Luma([u8::from(f64::from(p) < threshold)]))
}

/// 3×3 多数表决，窗口越界部分视为背景
fn majority_vote(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();

    // 四周补一圈背景，卷积只读取内部像素
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    let votes: GrayImage = filter3x3(&padded, &[1i32; 9]);

    GrayImage::from_fn(width, height, |x, y| {
        if votes.get_pixel(x + 1, y + 1).0[0] >= MAJORITY {
            Luma([CleanedImage::INK])
        } else {
            Luma([CleanedImage::PAPER])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 浅色背景上的一条深色横线，外加零星噪点
    fn sample_captcha() -> CaptchaImage {
        let (w, h) = (24u32, 12u32);
        let mut pixels = vec![210u8; (w * h) as usize];
        for y in 4..8 {
            for x in 3..21 {
                pixels[(y * w + x) as usize] = 30;
            }
        }
        // 孤立噪点
        pixels[(1 * w + 1) as usize] = 0;
        pixels[(10 * w + 22) as usize] = 0;
        pixels[(2 * w + 12) as usize] = 255;
        CaptchaImage::from_luma(w, h, pixels).unwrap()
    }

    #[test]
    fn rejects_zero_area_image() {
        let empty = CaptchaImage::from_luma(0, 5, Vec::new()).unwrap();
        assert!(matches!(clean(empty), Err(ScrapeError::InvalidImage(_))));
    }

    #[test]
    fn output_is_binary_with_same_dimensions() {
        let cleaned = clean(sample_captcha()).unwrap();
        assert_eq!((cleaned.width(), cleaned.height()), (24, 12));
        assert!(cleaned
            .pixels()
            .iter()
            .all(|&p| p == CleanedImage::INK || p == CleanedImage::PAPER));
        assert!(cleaned.pixels().contains(&CleanedImage::INK));
        assert!(cleaned.pixels().contains(&CleanedImage::PAPER));
    }

    #[test]
    fn is_deterministic() {
        let first = clean(sample_captcha()).unwrap();
        let second = clean(sample_captcha()).unwrap();
        assert_eq!(first.pixels(), second.pixels());
    }

    #[test]
    fn dark_strokes_become_black_and_speckles_vanish() {
        let cleaned = clean(sample_captcha()).unwrap();
        // 线条内部
        assert_eq!(cleaned.pixel(10, 5), CleanedImage::INK);
        assert_eq!(cleaned.pixel(15, 6), CleanedImage::INK);
        // 噪点位置
        assert_eq!(cleaned.pixel(1, 1), CleanedImage::PAPER);
        assert_eq!(cleaned.pixel(22, 10), CleanedImage::PAPER);
        // 背景
        assert_eq!(cleaned.pixel(12, 0), CleanedImage::PAPER);
    }

    #[test]
    fn colored_background_noise_does_not_dominate_text() {
        let (w, h) = (20u32, 10u32);
        let mut pixels = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let stroke = (3..7).contains(&y) && (2..18).contains(&x);
                if stroke {
                    pixels.extend_from_slice(&[20, 20, 60]);
                } else if (x + y) % 2 == 0 {
                    // 亮绿色背景纹理
                    pixels.extend_from_slice(&[120, 250, 120]);
                } else {
                    pixels.extend_from_slice(&[240, 240, 200]);
                }
            }
        }
        let cleaned = clean(CaptchaImage::from_rgb(w, h, pixels).unwrap()).unwrap();
        assert_eq!(cleaned.pixel(10, 4), CleanedImage::INK);
        assert_eq!(cleaned.pixel(10, 8), CleanedImage::PAPER);
        assert_eq!(cleaned.pixel(0, 0), CleanedImage::PAPER);
    }

    #[test]
    fn luminance_matches_601_weights() {
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(128, 128, 128), 128);
    }

    #[test]
    fn grayscale_of_colored_pixels() {
        let rgb = CaptchaImage::from_rgb(3, 1, vec![255, 0, 0, 0, 255, 0, 0, 0, 255]).unwrap();
        let gray = grayscale(&rgb.into_inner());
        assert_eq!(gray.as_raw(), &vec![76, 150, 29]);
    }

    #[test]
    fn majority_vote_treats_outside_as_background() {
        let votes = majority_vote(&GrayImage::from_pixel(4, 4, Luma([1])));
        // 角上只有 4 个邻居是笔画
        assert_eq!(votes.get_pixel(0, 0).0[0], CleanedImage::PAPER);
        assert_eq!(votes.get_pixel(3, 3).0[0], CleanedImage::PAPER);
        // 边上 6 个，内部 9 个
        assert_eq!(votes.get_pixel(1, 0).0[0], CleanedImage::INK);
        assert_eq!(votes.get_pixel(2, 2).0[0], CleanedImage::INK);
    }

    #[test]
    fn prepare_without_cleaning_keeps_gray_levels() {
        let raw = CaptchaImage::from_luma(3, 1, vec![10, 128, 240]).unwrap();
        let prepared = prepare(raw, false).unwrap();
        assert_eq!(prepared.pixels(), &[10, 128, 240]);

        let empty = CaptchaImage::from_luma(0, 0, Vec::new()).unwrap();
        assert!(matches!(prepare(empty, false), Err(ScrapeError::InvalidImage(_))));
    }

    #[test]
    fn uniform_image_is_all_background() {
        let flat = CaptchaImage::from_luma(5, 5, vec![128; 25]).unwrap();
        let cleaned = clean(flat).unwrap();
        assert!(cleaned.pixels().iter().all(|&p| p == CleanedImage::PAPER));
    }
}
