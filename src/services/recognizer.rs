//! 验证码识别能力
//!
//! 识别模型本身是外部能力，这里只定义接口和识别结果的规整规则。
//! 本地不校验识别结果的格式，是否正确只由门户判断。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CleanedImage;

/// 验证码识别器
///
/// 调用可能很慢（模型推理 / 远程服务），流程层不假设低延迟。
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// 返回对清洗后图片的最佳猜测
    async fn recognize(&self, image: CleanedImage) -> Result<String>;
}

/// 规整识别结果
///
/// - 去掉所有空白和句点
/// - 把形近符号映射为字母，去掉无意义的标点
pub fn normalize_guess(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .filter_map(map_symbol)
        .collect()
}

fn map_symbol(c: char) -> Option<char> {
    match c {
        '£' => Some('F'),
        '@' => Some('A'),
        '$' | '§' => Some('S'),
        '!' | '|' => Some('I'),
        '€' => Some('E'),
        '¥' => Some('Y'),
        '¢' => Some('C'),
        '?' | '*' | '#' | ',' | '.' | ':' | '\'' => None,
        other => Some(other),
    }
}
