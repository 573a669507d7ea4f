//! Preview session: the lifecycle of one host view.
//!
//! Raw text in, one of two states out: a placeholder when nothing has been
//! generated, or a freshly built sandbox frame. Generation responses are
//! sequenced with tickets so a slow response cannot replace a newer one.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::error::{ErrorReporter, RequestError};
use crate::generate::GenerateResponse;
use crate::normalize::normalize_with_report;
use crate::resolve::{resolve_entry, Resolution};
use crate::sandbox::{SandboxFrame, SandboxHost};
use crate::shims::ShimCatalog;

pub const PLACEHOLDER_MESSAGE: &str = "Generated UI will appear here";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PreviewState {
    Placeholder { message: &'static str },
    Ready {
        frame: SandboxFrame,
        resolution: Resolution,
    },
}

/// Issued when a generation starts; only the latest ticket may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GenerationTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug)]
pub struct PreviewSession {
    host: SandboxHost,
    state: PreviewState,
    reporter: ErrorReporter,
    latest_ticket: u64,
}

impl PreviewSession {
    pub fn new(catalog: Arc<ShimCatalog>, config: SandboxConfig) -> Self {
        Self {
            host: SandboxHost::new(catalog, config),
            state: placeholder(),
            reporter: ErrorReporter::new(),
            latest_ticket: 0,
        }
    }

    /// Replaces whatever is shown with a preview of `raw`. The previous
    /// document is discarded before the new one is built.
    pub fn load(&mut self, raw: &str) -> &PreviewState {
        self.host.unload();
        self.reporter.clear_sandbox();

        if raw.trim().is_empty() {
            debug!("no generated text, showing placeholder");
            self.state = placeholder();
            return &self.state;
        }

        let normalization = normalize_with_report(raw);
        let resolution = resolve_entry(&normalization.script, self.host.catalog());
        let frame = self.host.load(&normalization.script, &resolution).clone();

        self.state = PreviewState::Ready { frame, resolution };
        &self.state
    }

    pub fn begin_generation(&mut self) -> GenerationTicket {
        self.latest_ticket += 1;
        self.reporter.clear();
        GenerationTicket(self.latest_ticket)
    }

    /// Publishes a generation result if `ticket` is still the latest one.
    /// Request errors go to the host channel and leave the sandbox alone.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GenerateResponse, RequestError>,
    ) -> Completion {
        if ticket.0 != self.latest_ticket {
            warn!(
                ticket = ticket.0,
                latest = self.latest_ticket,
                "dropping stale generation response"
            );
            return Completion::Stale;
        }

        match result {
            Ok(response) => {
                info!(ticket = ticket.0, "applying generation response");
                self.load(&response.generated_text);
            }
            Err(err) => {
                self.reporter.report_request(&err);
                self.teardown();
            }
        }
        Completion::Applied
    }

    /// Discards the live document, as when the view unmounts.
    pub fn teardown(&mut self) {
        self.host.unload();
        self.state = placeholder();
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn frame(&self) -> Option<&SandboxFrame> {
        self.host.current()
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut ErrorReporter {
        &mut self.reporter
    }
}

fn placeholder() -> PreviewState {
    PreviewState::Placeholder {
        message: PLACEHOLDER_MESSAGE,
    }
}
