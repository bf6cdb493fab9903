//! 门户会话能力
//!
//! HTTP 细节由具体实现负责（见 `clients::HttpPortalClient`），流程层只依赖这个接口。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Challenge, FormToken, Identifier, RawResponse};

/// 门户会话客户端
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// 打开新会话，返回验证码图片和表单令牌
    async fn fetch_challenge(&self, index_url: &str) -> Result<Challenge>;

    /// 提交表单；令牌被消费，不能再次使用
    async fn submit(
        &self,
        token: FormToken,
        identifier: &Identifier,
        guess: &str,
    ) -> Result<RawResponse>;
}
