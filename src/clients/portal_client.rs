//! 成绩门户 HTTP 客户端
//!
//! 封装所有与成绩门户相关的 HTTP 调用：打开首页拿令牌和验证码、提交查询表单。
//! 每次 `fetch_challenge` 都是一个新会话，会话 Cookie 随 `FormToken` 一起交给调用方，
//! 不同学号之间不共享任何会话状态。

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::{CaptchaImage, Challenge, FormToken, Identifier, RawResponse};
use crate::services::PortalSession;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

/// 首页中解析出的表单信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    pub token: String,
    pub captcha_url: String,
    pub action_url: String,
}

/// 成绩门户客户端
pub struct HttpPortalClient {
    client: Client,
}

impl HttpPortalClient {
    /// 创建新的门户客户端
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, cookie: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Portal(format!(
                "GET {} 返回 HTTP {}",
                url,
                response.status().as_u16()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PortalSession for HttpPortalClient {
    async fn fetch_challenge(&self, index_url: &str) -> Result<Challenge> {
        let response = self.get(index_url, None).await?;
        let mut cookie = session_cookie(&response);
        let html = response.text().await?;
        debug!("首页长度: {} 字符", html.len());

        let page = parse_index_page(&html, index_url)?;
        debug!("令牌: {}，验证码地址: {}", page.token, page.captcha_url);

        let captcha = self.get(&page.captcha_url, cookie.as_deref()).await?;
        cookie = merge_cookies(cookie, session_cookie(&captcha));
        let bytes = captcha.bytes().await?;
        let image = CaptchaImage::from_bytes(&bytes)?;

        Ok(Challenge {
            image,
            token: FormToken::new(page.token, page.action_url, index_url, cookie),
        })
    }

    async fn submit(
        &self,
        token: FormToken,
        identifier: &Identifier,
        guess: &str,
    ) -> Result<RawResponse> {
        let lns = identifier.to_string();
        let form = [
            ("Token", token.value()),
            ("lns", lns.as_str()),
            ("captchacode", guess),
        ];

        let mut request = self
            .client
            .post(token.action_url())
            .header(REFERER, token.referer())
            .form(&form);
        if let Some(cookie) = token.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("提交结果: HTTP {}，{} 字符", status, body.len());

        Ok(RawResponse::new(status, body))
    }
}

/// 解析首页：令牌、验证码图片地址、表单提交地址
///
/// 表单没有 `action` 时使用同目录下的 `resultpage.php`。
pub fn parse_index_page(html: &str, index_url: &str) -> Result<IndexPage> {
    let base = Url::parse(index_url)
        .map_err(|e| ScrapeError::Portal(format!("首页地址无效 {}: {}", index_url, e)))?;
    let document = Html::parse_document(html);

    let token = select_attr(&document, r#"input[name="Token"]"#, "value")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ScrapeError::Portal("首页中没有找到 Token".to_string()))?;

    let captcha_src = select_attr(&document, r#"img[src*="captcha"]"#, "src")
        .ok_or_else(|| ScrapeError::Portal("首页中没有找到验证码图片".to_string()))?;

    let action = select_attr(&document, "form[action]", "action")
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "resultpage.php".to_string());

    Ok(IndexPage {
        token,
        captcha_url: join_url(&base, &captcha_src)?,
        action_url: join_url(&base, action.trim())?,
    })
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(str::to_string)
}

fn join_url(base: &Url, reference: &str) -> Result<String> {
    base.join(reference)
        .map(|url| url.to_string())
        .map_err(|e| ScrapeError::Portal(format!("无法解析地址 {}: {}", reference, e)))
}

/// 从响应的 `Set-Cookie` 头中取出 `name=value` 部分
fn session_cookie(response: &reqwest::Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// 合并两组 Cookie，同名时以后者为准
fn merge_cookies(current: Option<String>, update: Option<String>) -> Option<String> {
    let (current, update) = match (current, update) {
        (None, None) => return None,
        (Some(c), None) => return Some(c),
        (None, Some(u)) => return Some(u),
        (Some(c), Some(u)) => (c, u),
    };

    let cookie_name = |pair: &str| pair.split('=').next().unwrap_or("").trim().to_string();
    let updated: Vec<&str> = update.split("; ").collect();
    let mut merged: Vec<&str> = current
        .split("; ")
        .filter(|pair| !updated.iter().any(|u| cookie_name(*u) == cookie_name(*pair)))
        .collect();
    merged.extend(updated.iter().copied());
    Some(merged.join("; "))
}
