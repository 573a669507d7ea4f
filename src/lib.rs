//! # Component Preview Native
//!
//! Previews generated UI component source without a build step.
//!
//! ## Pipeline
//!
//! 1. **Normalize**: fences, imports, exports and type syntax are stripped from the
//!    raw generated text (`normalize`).
//! 2. **Resolve**: the first capitalized, callable, non-shim top-level binding is
//!    chosen as the entry component (`resolve`).
//! 3. **Build**: a fresh execution document embeds the runtime, the shim catalog and
//!    the script inside a guarded evaluation block (`sandbox`).
//! 4. **Isolate**: the document is loaded into a frame that may only run scripts.
//!
//! ## Error Channels
//!
//! - Request errors (missing prompt, missing credential, upstream failure) are
//!   reported to the host page and never reach the sandbox.
//! - Execution and resolution errors are rendered inside the sandbox and never
//!   escape it.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod config;
mod error;
mod generate;
mod normalize;
mod preview;
mod resolve;
mod sandbox;
mod shims;

#[cfg(test)]
mod bootstrap_tests;

pub use config::{PreviewConfig, ProviderSettings, SandboxConfig};
pub use error::{
    ConfigError, ErrorBody, ErrorReporter, RenderError, RenderPhase, RequestError, UpstreamError,
    SANDBOX_MESSAGE_SOURCE,
};
pub use generate::{
    handle_generate, CompletionClient, GenerateRequest, GenerateResponse, Provider, UreqClient,
    PROMPT_REQUIRED_MESSAGE, SYSTEM_PROMPT,
};
pub use normalize::{normalize, normalize_with_report, Normalization, NormalizedScript, Strategy};
pub use preview::{Completion, GenerationTicket, PreviewSession, PreviewState, PLACEHOLDER_MESSAGE};
pub use resolve::{resolve_entry, Resolution, RESOLUTION_FAILURE_MESSAGE};
pub use sandbox::{ExecutionDocument, SandboxFrame, SandboxHost, SANDBOX_POLICY};
pub use shims::{ShimCatalog, ShimComponent, RUNTIME_NAMES};

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
lazy_static::lazy_static! {
    static ref CATALOG: std::sync::Arc<ShimCatalog> = std::sync::Arc::new(ShimCatalog::standard());
}

#[cfg(feature = "napi")]
#[napi]
pub fn normalize_component_native(raw: String) -> String {
    normalize(&raw).into_string()
}

#[cfg(feature = "napi")]
#[napi]
pub fn build_preview_native(
    raw: String,
    config_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let config = match config_json {
        Some(json) => {
            let mut config = PreviewConfig::from_json(&json)
                .map_err(|e| napi::Error::from_reason(e.to_string()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => PreviewConfig::from_env(),
    };
    let mut session = PreviewSession::new(std::sync::Arc::clone(&CATALOG), config.sandbox);
    serde_json::to_value(session.load(&raw)).map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Returns `{ status, body }` where body is a `GenerateResponse` or an `ErrorBody`.
#[cfg(feature = "napi")]
#[napi]
pub fn generate_component_native(provider: String, prompt_text: String) -> serde_json::Value {
    let config = PreviewConfig::from_env();
    let result = provider.parse::<Provider>().and_then(|provider| {
        handle_generate(
            provider,
            &GenerateRequest::new(prompt_text),
            &config.providers,
            &UreqClient::new(),
        )
    });
    match result {
        Ok(response) => serde_json::json!({ "status": 200, "body": response }),
        Err(err) => serde_json::json!({ "status": err.status, "body": err.body() }),
    }
}
