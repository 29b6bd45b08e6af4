//! Generation service: sends the conversation to the hosted language model.

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::types::{AttachmentDraft, ConversationEntry};

const SYSTEM_INSTRUCTION: &str = r#"You are an expert web developer AI. Your goal is to create a single-page static website based on the user's request.

**Phase 1: Conversation**
- If the user's request is vague, engage in a friendly conversation to clarify their needs. Ask about the website's purpose, name, color scheme, content, etc.
- **Use Markdown for all your conversational messages** (e.g., use lists, bolding with **, etc.) to make them clear and easy to read.

**Phase 2: Code Generation**
- Once you have enough information, you will generate the website code.
- Your final output for code generation MUST contain two parts: a success message and a JSON code block.
- First, write a success message in Markdown. For example: "I've finished creating your website! Check out the live preview."
- Then, on a new line, provide the complete website code as a single JSON object enclosed in a Markdown code block.

**JSON Code Block Rules:**
```json
{
  "html": "...",
  "css": "...",
  "js": "..."
}
```
- The object must contain exactly these three keys, each with a string value.
- The "html" value must be the content for the <body> tag.
- The "css" value must be the content for a <style> tag.
- The "js" value must be the content for a <script> tag.

**General Rules:**
- Generate all user-facing text in the website in the following language: "{language}".
- The website must be modern, clean, fully responsive, and visually appealing.
- Use relative paths for any uploaded images (e.g., "./images/filename.jpg").
- Do not include the JSON code block in your conversational messages. Only provide it when you are generating the final website."#;

pub fn system_instruction(site_language: &str) -> String {
    SYSTEM_INSTRUCTION.replace("{language}", site_language)
}

/// Everything one exchange sends to the model
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Transcript before the current prompt
    pub history: Vec<ConversationEntry>,
    pub prompt: String,
    pub attachments: Vec<AttachmentDraft>,
}

impl GenerationRequest {
    /// Prompt text plus a line naming the uploaded images
    pub fn full_prompt(&self) -> String {
        let image_note = if self.attachments.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = self
                .attachments
                .iter()
                .map(|a| a.display_name.as_str())
                .collect();
            format!(
                "The user has uploaded the following images to use in the design: {}.",
                names.join(", ")
            )
        };
        format!("{}\n{}", self.prompt, image_note)
    }
}

pub trait GenerationService: Send + Sync {
    /// Return the model's raw text reply
    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    api_base_url: String,
    site_language: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        api_base_url: impl Into<String>,
        site_language: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            model: model.into(),
            api_base_url: api_base_url.into(),
            site_language: site_language.into(),
        }
    }

    /// Client configured from `config`, with the API key taken from the environment
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            resolve_api_key(),
            config.model.clone(),
            config.api_base_url.clone(),
            config.site_language.clone(),
        )
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|entry| {
                json!({
                    "role": entry.speaker.as_role(),
                    "parts": [{ "text": entry.text }],
                })
            })
            .collect();

        let mut parts = vec![json!({ "text": request.full_prompt() })];
        parts.extend(request.attachments.iter().map(|attachment| {
            json!({
                "inlineData": {
                    "mimeType": attachment.mime_type,
                    "data": attachment.payload(),
                }
            })
        }));
        contents.push(json!({ "role": "user", "parts": parts }));

        json!({
            "systemInstruction": {
                "parts": [{ "text": system_instruction(&self.site_language) }]
            },
            "contents": contents,
        })
    }
}

impl GenerationService for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("API key is not set (export SITECHAT_API_KEY or GEMINI_API_KEY)")?;
        let endpoint = self.endpoint();
        debug!(
            endpoint = %endpoint,
            history = request.history.len(),
            attachments = request.attachments.len(),
            "sending generation request"
        );

        let response = match ureq::post(&endpoint)
            .set("x-goog-api-key", api_key)
            .send_json(self.request_body(request))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                bail!("generation request failed: {} - {}", status, body);
            }
            Err(err) => return Err(err).context("generation request failed"),
        };

        let json: Value = response
            .into_json()
            .context("failed to parse generation response")?;
        extract_reply_text(&json)
    }
}

/// Concatenate the text parts of the first candidate
pub fn extract_reply_text(response: &Value) -> Result<String> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array);

    let Some(parts) = parts else {
        if let Some(reason) = response
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(Value::as_str)
        {
            bail!("generation blocked: {reason}");
        }
        bail!("generation response missing text content");
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Ok(text)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn resolve_api_key() -> Option<String> {
    env_non_empty("SITECHAT_API_KEY")
        .or_else(|| env_non_empty("GEMINI_API_KEY"))
        .or_else(|| env_non_empty("API_KEY"))
}
