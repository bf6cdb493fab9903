//! 视觉大模型识别器 - 业务能力层
//!
//! 把清洗后的验证码以 PNG data URL 的形式发给兼容 OpenAI API 的视觉模型，
//! 让模型只返回验证码字符。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::CleanedImage;
use crate::services::recognizer::{normalize_guess, Recognizer};

const SYSTEM_PROMPT: &str = "You read captcha images. Reply with the captcha characters only, \
     without spaces, punctuation or explanation.";

const USER_PROMPT: &str = "What are the characters in this captcha?";

/// 视觉大模型识别器
pub struct LlmRecognizer {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmRecognizer {
    /// 创建新的识别器
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 发送一张图片，返回模型的原始回答
    async fn send_image(&self, data_url: String) -> std::result::Result<String, OpenAIError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()?;

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: USER_PROMPT.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: data_url,
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.0)
            .max_completion_tokens(16u32)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| OpenAIError::InvalidArgument("识别服务返回内容为空".to_string()))
    }
}

#[async_trait]
impl Recognizer for LlmRecognizer {
    async fn recognize(&self, image: CleanedImage) -> Result<String> {
        let png = image.to_png()?;
        debug!("调用识别模型 {}，图片大小: {} 字节", self.model_name, png.len());

        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png));
        let raw = self.send_image(data_url).await.map_err(|e| {
            warn!("识别服务调用失败: {}", e);
            ScrapeError::Recognition(e.to_string())
        })?;

        let guess = normalize_guess(&raw);
        debug!("识别结果: {:?} -> {:?}", raw, guess);
        Ok(guess)
    }
}
