use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Prompt in, text out. The orchestrator only depends on this seam.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl LlmClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Same endpoint and credential, different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Generate a completion using the OpenAI API format
    pub async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.7),
            max_tokens: Some(2000),
        };

        let mut req = self.client.post(&url).json(&request);

        // Local OpenAI-compatible servers run without a key
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = req.send().await.context("Failed to send LLM request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            anyhow::bail!("LLM API returned error {}: {}", status, body);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
    }

    /// Generate a JSON response using the LLM
    pub async fn generate_json<T>(&self, messages: Vec<Message>) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.chat(messages).await?;
        parse_json(&response)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![Message::user(prompt)]).await
    }
}

/// Parse a JSON payload out of a model reply that may wrap it in prose,
/// a ```json fence or a <think> block.
pub fn parse_json<T>(response: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if let Ok(parsed) = serde_json::from_str::<T>(response) {
        return Ok(parsed);
    }

    let cleaned = match response.rfind("</think>") {
        Some(think_end) => &response[think_end + 8..],
        None => response,
    };

    let json_content = if let Some(start) = cleaned.find("```json") {
        let after_start = &cleaned[start + 7..];
        match after_start.find("```") {
            Some(end) => after_start[..end].trim(),
            None => cleaned,
        }
    } else if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start <= end {
            &cleaned[start..=end]
        } else {
            cleaned
        }
    } else {
        cleaned
    };

    serde_json::from_str::<T>(json_content.trim()).with_context(|| {
        format!(
            "Failed to parse JSON. Extracted: {} | Response: {}",
            json_content,
            response.chars().take(500).collect::<String>()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Verdict {
        label: String,
        score: f64,
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "Sure!\n```json\n{\"label\": \"joy\", \"score\": 0.8}\n```";
        let verdict: Verdict = parse_json(reply).expect("parse");
        assert_eq!(verdict.label, "joy");
        assert!((verdict.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn parses_json_after_think_block() {
        let reply = "<think>{not json}</think> {\"label\": \"fear\", \"score\": 0.4}";
        let verdict: Verdict = parse_json(reply).expect("parse");
        assert_eq!(verdict.label, "fear");
    }

    #[test]
    fn reports_unparseable_reply() {
        let err = parse_json::<Verdict>("no json here").unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = LlmClient::new(
            "http://localhost:11434/v1/".to_string(),
            String::new(),
            "llama3.2".to_string(),
        );
        assert_eq!(client.api_url, "http://localhost:11434/v1");
        assert_eq!(client.with_model("tiny").model(), "tiny");
    }
}
