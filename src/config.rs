//! Preview configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Provider credentials are normally taken from the environment.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_MODEL_VAR: &str = "PREVIEW_ANTHROPIC_MODEL";
pub const OPENAI_MODEL_VAR: &str = "PREVIEW_OPENAI_MODEL";
pub const REPORT_TO_HOST_VAR: &str = "PREVIEW_REPORT_TO_HOST";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    pub sandbox: SandboxConfig,
    pub providers: ProviderSettings,
}

impl PreviewConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ANTHROPIC_API_KEY_VAR) {
            self.providers.anthropic_api_key = Some(key);
        }
        if let Some(key) = non_empty(OPENAI_API_KEY_VAR) {
            self.providers.openai_api_key = Some(key);
        }
        if let Some(model) = non_empty(ANTHROPIC_MODEL_VAR) {
            self.providers.anthropic_model = model;
        }
        if let Some(model) = non_empty(OPENAI_MODEL_VAR) {
            self.providers.openai_model = model;
        }
        if let Some(flag) = non_empty(REPORT_TO_HOST_VAR) {
            self.sandbox.report_to_host = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }
    }
}

/// What goes into each execution document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxConfig {
    pub react_url: String,
    pub react_dom_url: String,
    pub babel_url: String,
    pub tailwind_url: String,
    /// Post diagnostics to the parent window in addition to rendering them.
    /// On by default; turning it off keeps diagnostics inside the frame.
    pub report_to_host: bool,
    pub frame_title: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            react_url: "https://unpkg.com/react@18/umd/react.production.min.js".to_string(),
            react_dom_url: "https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"
                .to_string(),
            babel_url: "https://unpkg.com/@babel/standalone/babel.min.js".to_string(),
            tailwind_url: "https://cdn.tailwindcss.com".to_string(),
            report_to_host: true,
            frame_title: "Component Preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_model: "claude-sonnet-4-5".to_string(),
            openai_model: "gpt-4o".to_string(),
            max_tokens: 16000,
            temperature: 0.7,
        }
    }
}
