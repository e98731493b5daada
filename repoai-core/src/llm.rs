//! LLM Client Adapter over an OpenAI-compatible chat-completions endpoint
//! (Groq by default).
//!
//! One request per call: the optional system prompt goes first, followed by
//! the caller's messages; the first choice's text comes back. Failures are
//! returned as [`LlmError`] and never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::LlmSettings;
use crate::contract::{ChatMessage, ChatRequest, LlmClient};
use crate::error::LlmError;

pub struct ChatClient {
    client: Client,
    settings: LlmSettings,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        info!(
            endpoint = %settings.endpoint,
            model = %settings.model,
            api_key_set = settings.api_key.is_some(),
            "Initialized ChatClient"
        );
        Ok(Self { client, settings })
    }

    fn build_body<'a>(&'a self, request: ChatRequest) -> CompletionBody<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(request.messages);
        CompletionBody {
            model: &self.settings.model,
            messages,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for ChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let api_key = self.settings.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let body = self.build_body(request);
        debug!(
            model = body.model,
            messages = body.messages.len(),
            max_tokens = body.max_tokens,
            "Sending chat completion"
        );

        let resp = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, endpoint = %self.settings.endpoint, "Chat completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(status = %status, "Chat completion endpoint returned error. Response body: {text}");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        first_choice_text(parsed)
    }

    fn model(&self) -> String {
        self.settings.model.clone()
    }

    fn has_api_key(&self) -> bool {
        self.settings.api_key.is_some()
    }
}

fn first_choice_text(resp: CompletionResponse) -> Result<String, LlmError> {
    resp.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ChatRole;

    fn client(api_key: Option<&str>) -> ChatClient {
        ChatClient::new(LlmSettings {
            api_key: api_key.map(str::to_string),
            ..LlmSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn system_prompt_leads_the_message_list() {
        let c = client(Some("k"));
        let body = c.build_body(ChatRequest {
            system: Some("be terse".into()),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 64,
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be terse");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn no_system_message_without_prompt() {
        let c = client(Some("k"));
        let body = c.build_body(ChatRequest {
            system: None,
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 64,
        });
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, ChatRole::User);
    }

    #[test]
    fn picks_first_choice() {
        let resp: CompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "first"}},
                            {"message": {"role": "assistant", "content": "second"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(resp).unwrap(), "first");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_choice_text(empty), Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn refuses_without_api_key() {
        let c = client(None);
        assert!(!c.has_api_key());
        let err = c
            .chat(ChatRequest {
                system: None,
                messages: vec![ChatMessage::user("hi")],
                max_tokens: 8,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
