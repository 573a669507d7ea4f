//! Upstream generation requests.
//!
//! Validates a generation request, forwards it to the selected provider and
//! shapes the reply. Whatever text comes back is opaque: it is handed to the
//! normalizer unvalidated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::ProviderSettings;
use crate::error::{RequestError, UpstreamError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const PROMPT_REQUIRED_MESSAGE: &str = "Prompt is required";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate code";

/// Instructions sent with every prompt.
pub const SYSTEM_PROMPT: &str = r#"You are an expert React and UI/UX developer. Every response you provide should be a compilable React component.

Requirements:
- Use React function components written in plain JavaScript with JSX (no TypeScript)
- Style with Tailwind CSS utility classes
- Use these components when appropriate: Button, Card, CardHeader, CardTitle, CardDescription, CardContent, CardFooter, Input, Textarea, Label, Select, SelectTrigger, SelectContent, SelectItem, SelectValue, Checkbox, Switch, Badge, Separator, Tabs, TabsList, TabsTrigger, TabsContent, Progress
- Keep the component self-contained, responsive and accessible
- Make it interactive where it makes sense (buttons, forms, toggles)
- Give the main component a capitalized name
- Return ONLY the component code, no explanations

Do not include:
- Type definitions, interfaces or type annotations
- Generic type parameters
- Template literals for string building (use + instead)

Imports such as `import { Button } from "@/components/ui/button"` are allowed; they are resolved for you."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        })
    }
}

impl FromStr for Provider {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(RequestError::bad_request(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt_text: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: Some(prompt_text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub generated_text: String,
}

/// One completion call against one provider.
pub trait CompletionClient {
    fn complete(
        &self,
        provider: Provider,
        api_key: &str,
        settings: &ProviderSettings,
        system: &str,
        prompt: &str,
    ) -> Result<String, UpstreamError>;
}

pub fn handle_generate(
    provider: Provider,
    request: &GenerateRequest,
    settings: &ProviderSettings,
    client: &dyn CompletionClient,
) -> Result<GenerateResponse, RequestError> {
    let prompt = request
        .prompt_text
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| RequestError::bad_request(PROMPT_REQUIRED_MESSAGE))?;

    let api_key = match provider {
        Provider::OpenAi => settings.openai_api_key.as_deref(),
        Provider::Anthropic => settings.anthropic_api_key.as_deref(),
    }
    .ok_or_else(|| {
        RequestError::internal(format!(
            "{} API key not configured",
            provider.display_name()
        ))
    })?;

    match client.complete(provider, api_key, settings, SYSTEM_PROMPT, prompt) {
        Ok(generated_text) => {
            info!(%provider, chars = generated_text.len(), "generation completed");
            Ok(GenerateResponse { generated_text })
        }
        Err(err) => {
            warn!(%provider, error = %err, "upstream generation failed");
            let message = err.to_string();
            Err(RequestError::internal(if message.trim().is_empty() {
                GENERATION_FAILED_MESSAGE.to_string()
            } else {
                message
            }))
        }
    }
}

// ── HTTP client ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessage>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

/// Provider error bodies carry `{ "error": { "message": ... } }`.
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking client over `ureq`.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }

    fn post_json<T: Serialize>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &T,
    ) -> Result<String, UpstreamError> {
        let mut request = self.agent.post(url).header("content-type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let mut response = request
            .send_json(body)
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if status >= 400 {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("upstream returned status {}", status));
            return Err(UpstreamError::Status { status, message });
        }
        Ok(text)
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionClient for UreqClient {
    fn complete(
        &self,
        provider: Provider,
        api_key: &str,
        settings: &ProviderSettings,
        system: &str,
        prompt: &str,
    ) -> Result<String, UpstreamError> {
        match provider {
            Provider::Anthropic => {
                let body = AnthropicRequest {
                    model: &settings.anthropic_model,
                    max_tokens: settings.max_tokens,
                    system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                };
                let text = self.post_json(
                    ANTHROPIC_API_URL,
                    &[("x-api-key", api_key), ("anthropic-version", ANTHROPIC_VERSION)],
                    &body,
                )?;
                parse_anthropic(&text)
            }
            Provider::OpenAi => {
                let bearer = format!("Bearer {}", api_key);
                let body = OpenAiRequest {
                    model: &settings.openai_model,
                    temperature: settings.temperature,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: system,
                        },
                        ChatMessage {
                            role: "user",
                            content: prompt,
                        },
                    ],
                };
                let text = self.post_json(OPENAI_API_URL, &[("authorization", bearer.as_str())], &body)?;
                parse_openai(&text)
            }
        }
    }
}

/// Text of the first content block, or empty when it is not a text block.
fn parse_anthropic(body: &str) -> Result<String, UpstreamError> {
    let resp: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    Ok(resp
        .content
        .into_iter()
        .next()
        .filter(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .unwrap_or_default())
}

fn parse_openai(body: &str) -> Result<String, UpstreamError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    Ok(resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default())
}
