//! Language model call contract.

use async_trait::async_trait;

use crate::{AiError, ChatTurn};

/// Completes a conversation: a system prompt plus alternating turns ending
/// with the user's question.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, AiError>;
}

#[cfg(feature = "http")]
pub use self::anthropic::{AnthropicClient, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL};

#[cfg(feature = "http")]
mod anthropic {
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tracing::{debug, info};

    use super::LlmClient;
    use crate::{AiError, ChatTurn};

    pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
    pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

    const API_VERSION: &str = "2023-06-01";
    const MAX_TOKENS: u32 = 1024;

    #[derive(Serialize)]
    struct MessagesRequest<'a> {
        model: &'a str,
        max_tokens: u32,
        system: &'a str,
        messages: &'a [ChatTurn],
    }

    #[derive(Deserialize)]
    struct MessagesResponse {
        content: Vec<ContentBlock>,
        #[serde(default)]
        usage: Option<Usage>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        text: String,
    }

    #[derive(Deserialize)]
    struct Usage {
        input_tokens: u32,
        output_tokens: u32,
    }

    /// Messages API client.
    pub struct AnthropicClient {
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    }

    impl AnthropicClient {
        /// `base_url` should be like `https://api.anthropic.com` (no trailing slash).
        pub fn new(base_url: String, api_key: String, model: String) -> Self {
            Self {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                model,
            }
        }
    }

    #[async_trait]
    impl LlmClient for AnthropicClient {
        async fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, AiError> {
            let url = format!("{}/v1/messages", self.base_url);
            let body = MessagesRequest {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                system,
                messages: turns,
            };

            debug!(url = %url, model = %self.model, turns = turns.len(), "sending completion request");
            let resp = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(AiError::Server {
                    status: status.as_u16(),
                    body,
                });
            }

            let result: MessagesResponse = resp.json().await?;
            if let Some(usage) = &result.usage {
                info!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "completion received"
                );
            }
            let text: String = result
                .content
                .iter()
                .filter(|block| block.kind == "text")
                .map(|block| block.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            if text.trim().is_empty() {
                return Err(AiError::EmptyResponse);
            }
            Ok(text)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn request_body_shape() {
            let turns = vec![ChatTurn::user("What does trample do?")];
            let body = MessagesRequest {
                model: DEFAULT_MODEL,
                max_tokens: MAX_TOKENS,
                system: "be brief",
                messages: &turns,
            };
            let json = serde_json::to_value(&body).unwrap();
            assert_eq!(json["system"], "be brief");
            assert_eq!(json["messages"][0]["role"], "user");
            assert_eq!(json["messages"][0]["content"], "What does trample do?");
        }

        #[test]
        fn response_text_blocks() {
            let raw = r#"{"content":[{"type":"text","text":"Rule 702.19b applies."}],
                          "usage":{"input_tokens":12,"output_tokens":5}}"#;
            let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed.content[0].text, "Rule 702.19b applies.");
            assert_eq!(parsed.usage.unwrap().output_tokens, 5);
        }

        #[test]
        fn trailing_slash_trimmed() {
            let client = AnthropicClient::new(
                "https://api.anthropic.com/".into(),
                "key".into(),
                DEFAULT_MODEL.into(),
            );
            assert_eq!(client.base_url, DEFAULT_ANTHROPIC_URL);
        }
    }
}
