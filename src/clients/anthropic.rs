/// Anthropic Messages APIクライアント。
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::CountryOracle;
use crate::classifier::prompt::{SYSTEM_PROMPT, user_prompt};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

/// クライアントの設定。
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// 新しいクライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build anthropic HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid anthropic base URL")?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
        })
    }

    /// 単一のユーザーメッセージを送信し、最初のテキストブロックを返す。
    ///
    /// # Errors
    /// 通信失敗、エラーステータス、またはテキストを含まない応答の場合。
    pub async fn complete(&self, system: &str, prompt: String) -> Result<String> {
        let url = self
            .base_url
            .join("v1/messages")
            .context("failed to build messages URL")?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("anthropic messages request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "anthropic messages endpoint returned error status {status}: {}",
                truncate_error_message(&body)
            ));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .context("failed to deserialize anthropic messages response")?;

        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| anyhow!("anthropic response contained no text block"))
    }
}

#[async_trait]
impl CountryOracle for AnthropicClient {
    async fn locate(&self, publisher: &str) -> Result<String> {
        debug!(publisher, model = %self.model, "requesting publisher country");
        self.complete(SYSTEM_PROMPT, user_prompt(publisher)).await
    }
}

fn truncate_error_message(msg: &str) -> String {
    let char_count = msg.chars().count();
    if char_count <= MAX_ERROR_MESSAGE_LENGTH {
        return msg.to_string();
    }
    let truncated: String = msg.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
    format!("{truncated}... (truncated, {char_count} chars)")
}
