//! 单次尝试内的会话数据：验证码图片、表单令牌、门户响应
//!
//! 这些值都只属于一次尝试，随尝试结束而丢弃。`FormToken` 不实现
//! `Clone`，提交时按值消费，因此同一个令牌不可能被提交两次。

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat};

use crate::error::{Result, ScrapeError};

/// 门户返回的原始验证码图片
#[derive(Debug)]
pub struct CaptchaImage {
    image: DynamicImage,
}

impl CaptchaImage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// 从 HTTP 响应字节解码（JPEG / PNG / GIF）
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ScrapeError::InvalidImage(format!("无法解码验证码图片: {}", e)))?;
        Ok(Self { image })
    }

    /// 由灰度像素构造（按行存储）
    pub fn from_luma(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let buffer: GrayImage = ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
            ScrapeError::InvalidImage(format!("像素数量与尺寸 {}x{} 不符", width, height))
        })?;
        Ok(Self {
            image: DynamicImage::ImageLuma8(buffer),
        })
    }

    /// 由 RGB 像素构造（按行存储，每像素 3 字节）
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let buffer: image::RgbImage = ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
            ScrapeError::InvalidImage(format!("像素数量与尺寸 {}x{} 不符", width, height))
        })?;
        Ok(Self {
            image: DynamicImage::ImageRgb8(buffer),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub(crate) fn into_inner(self) -> DynamicImage {
        self.image
    }
}

/// 清洗后的二值图：白底黑字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedImage {
    pixels: GrayImage,
}

impl CleanedImage {
    /// 笔画颜色
    pub const INK: u8 = 0;
    /// 背景颜色
    pub const PAPER: u8 = 255;

    pub(crate) fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// 按行存储的像素值
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels.get_pixel(x, y).0[0]
    }

    /// 编码为 PNG，供识别服务使用
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        DynamicImage::ImageLuma8(self.pixels.clone())
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }
}

/// 表单令牌，绑定一个门户会话，只能提交一次
#[derive(Debug)]
pub struct FormToken {
    value: String,
    action_url: String,
    referer: String,
    cookie: Option<String>,
}

impl FormToken {
    pub fn new(
        value: impl Into<String>,
        action_url: impl Into<String>,
        referer: impl Into<String>,
        cookie: Option<String>,
    ) -> Self {
        Self {
            value: value.into(),
            action_url: action_url.into(),
            referer: referer.into(),
            cookie,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// 表单提交地址
    pub fn action_url(&self) -> &str {
        &self.action_url
    }

    pub fn referer(&self) -> &str {
        &self.referer
    }

    /// 会话 Cookie（`name=value; name2=value2`）
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// 一次验证码挑战：图片 + 令牌
#[derive(Debug)]
pub struct Challenge {
    pub image: CaptchaImage,
    pub token: FormToken,
}

/// 门户对表单提交的原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
