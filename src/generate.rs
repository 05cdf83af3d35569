//! Grounded answer synthesis over an OpenAI-compatible chat API.
//!
//! Groq is the default endpoint. The model receives [`SYSTEM_PROMPT`] and a
//! user message built from the evidence block, and is asked to cite
//! `[Source N]` labels. Sampling is kept conservative for factual answers.

use std::time::Duration;

use medassist_core::context::{build_user_prompt, SYSTEM_PROMPT};
use serde::Deserialize;

use crate::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("no API key: pass one with the request or set {0}")]
    MissingApiKey(String),
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client configured from `[llm]`.
pub struct Generator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

impl Generator {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// A non-blank request key wins over the environment.
    pub fn resolve_api_key(&self, override_key: Option<&str>) -> Result<String, GenerateError> {
        if let Some(key) = override_key.map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey(self.api_key_env.clone()))
    }

    fn request_body(&self, context: &str, question: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(context, question)},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "top_p": self.top_p,
        })
    }

    /// Answer `question` from `context`. One attempt; no retry.
    pub async fn generate(
        &self,
        context: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<String, GenerateError> {
        let key = self.resolve_api_key(api_key)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&self.request_body(context, question))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let answer = parse_answer(parsed)?;
        tracing::info!(
            chars = answer.chars().count(),
            model = %self.model,
            "generated answer"
        );
        Ok(answer)
    }
}

fn parse_answer(response: ChatResponse) -> Result<String, GenerateError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerateError::InvalidResponse("no choices in completion".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(env: &str) -> Generator {
        let config = LlmConfig {
            api_key_env: env.to_string(),
            url: "http://127.0.0.1:1/v1/".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        Generator::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            generator("MEDASSIST_TEST_UNSET_KEY").endpoint,
            "http://127.0.0.1:1/v1/chat/completions"
        );
    }

    #[test]
    fn test_override_key_wins() {
        let g = generator("MEDASSIST_TEST_UNSET_KEY");
        assert_eq!(g.resolve_api_key(Some(" gsk_abc ")).unwrap(), "gsk_abc");
    }

    #[test]
    fn test_missing_key() {
        let g = generator("MEDASSIST_TEST_UNSET_KEY");
        assert!(matches!(
            g.resolve_api_key(None),
            Err(GenerateError::MissingApiKey(_))
        ));
        assert!(matches!(
            g.resolve_api_key(Some("   ")),
            Err(GenerateError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_request_body_sampling() {
        let g = generator("MEDASSIST_TEST_UNSET_KEY");
        let body = g.request_body("[Source 1: a.pdf, Page 1] ...", "what is anemia?");
        assert_eq!(body["max_tokens"], 2048);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("USER QUESTION: what is anemia?"));
    }

    #[test]
    fn test_parse_answer() {
        let ok: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Anemia is [Source 1]."}}]
        }))
        .unwrap();
        assert_eq!(parse_answer(ok).unwrap(), "Anemia is [Source 1].");

        let empty: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            parse_answer(empty),
            Err(GenerateError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let g = generator("MEDASSIST_TEST_UNSET_KEY");
        let err = g.generate("ctx", "q", Some("key")).await.unwrap_err();
        assert!(matches!(err, GenerateError::Request(_)));
    }
}
