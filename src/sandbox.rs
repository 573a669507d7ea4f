//! # Sandbox Module
//!
//! Builds the execution document for one generation and wraps it in the
//! isolation boundary the host page loads it into.
//!
//! ## Key Invariants
//!
//! 1. **One document per generation**: a document is rebuilt from scratch on every
//!    code change and never patched.
//! 2. **Embedded as data**: the normalized script and the shim catalog travel as
//!    JSON string literals, so nothing in the generated text can close the
//!    bootstrap's `<script>` tag.
//! 3. **Guarded evaluation**: transpile, evaluate, resolve and mount all run under
//!    a catch that renders an inline diagnostic instead of output.
//! 4. **Scripts only**: the frame is sandboxed with `allow-scripts` alone (opaque
//!    origin, no storage, no navigation, no forms, no popups) and the document's
//!    CSP denies network, form, frame and base-uri access.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

use crate::config::SandboxConfig;
use crate::error::SANDBOX_MESSAGE_SOURCE;
use crate::normalize::NormalizedScript;
use crate::resolve::{Resolution, RESOLUTION_FAILURE_MESSAGE};
use crate::shims::ShimCatalog;

/// The only capability granted to the frame.
pub const SANDBOX_POLICY: &str = "allow-scripts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDocument {
    pub html: String,
    pub entry: Option<String>,
    pub fingerprint: String,
}

impl ExecutionDocument {
    pub fn build(
        script: &NormalizedScript,
        resolution: &Resolution,
        catalog: &ShimCatalog,
        config: &SandboxConfig,
    ) -> Self {
        let entry = resolution.entry().map(str::to_string);
        let bootstrap = render_bootstrap(script, resolution, catalog, config);

        let html = DOCUMENT_TEMPLATE
            .replace("__CSP__", &escape_attr(&content_security_policy(config)))
            .replace("__TAILWIND_URL__", &escape_attr(&config.tailwind_url))
            .replace("__REACT_URL__", &escape_attr(&config.react_url))
            .replace("__REACT_DOM_URL__", &escape_attr(&config.react_dom_url))
            .replace("__BABEL_URL__", &escape_attr(&config.babel_url))
            .replace("__BOOTSTRAP__", &bootstrap);

        let fingerprint = compute_fingerprint(&html);
        Self {
            html,
            entry,
            fingerprint,
        }
    }
}

/// What the host page mounts: an iframe description carrying the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxFrame {
    pub srcdoc: String,
    pub sandbox: &'static str,
    pub title: String,
    pub fingerprint: String,
}

impl SandboxFrame {
    pub fn to_iframe_html(&self) -> String {
        format!(
            r#"<iframe sandbox="{}" title="{}" srcdoc="{}"></iframe>"#,
            self.sandbox,
            escape_attr(&self.title),
            escape_attr(&self.srcdoc)
        )
    }
}

/// Owns the live document. Loading a new script discards the previous one
/// wholesale.
#[derive(Debug)]
pub struct SandboxHost {
    catalog: Arc<ShimCatalog>,
    config: SandboxConfig,
    current: Option<SandboxFrame>,
}

impl SandboxHost {
    pub fn new(catalog: Arc<ShimCatalog>, config: SandboxConfig) -> Self {
        Self {
            catalog,
            config,
            current: None,
        }
    }

    pub fn load(&mut self, script: &NormalizedScript, resolution: &Resolution) -> &SandboxFrame {
        self.current = None;
        let document = ExecutionDocument::build(script, resolution, &self.catalog, &self.config);
        info!(
            fingerprint = %document.fingerprint,
            entry = ?document.entry,
            bytes = document.html.len(),
            "built execution document"
        );
        self.current.insert(SandboxFrame {
            srcdoc: document.html,
            sandbox: SANDBOX_POLICY,
            title: self.config.frame_title.clone(),
            fingerprint: document.fingerprint,
        })
    }

    pub fn unload(&mut self) -> Option<SandboxFrame> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&SandboxFrame> {
        self.current.as_ref()
    }

    pub fn catalog(&self) -> &ShimCatalog {
        &self.catalog
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// The inline script that evaluates, resolves and mounts inside the frame.
pub(crate) fn render_bootstrap(
    script: &NormalizedScript,
    resolution: &Resolution,
    catalog: &ShimCatalog,
    config: &SandboxConfig,
) -> String {
    let shim_names: Vec<&str> = catalog.names().collect();
    BOOTSTRAP_TEMPLATE
        .replace("__SHIM_SOURCE__", &js_literal(&catalog.to_prelude()))
        .replace("__SHIM_NAMES__", &js_literal(&shim_names))
        .replace("__ENTRY__", &js_literal(&resolution.entry()))
        .replace("__RESOLUTION_FAILURE__", &js_literal(RESOLUTION_FAILURE_MESSAGE))
        .replace("__MESSAGE_SOURCE__", &js_literal(SANDBOX_MESSAGE_SOURCE))
        .replace("__REPORT_TO_HOST__", if config.report_to_host { "true" } else { "false" })
        // Generated text goes in last so placeholder-looking text inside it stays untouched.
        .replace("__USER_SOURCE__", &js_literal(script.as_str()))
}

/// JSON is valid JavaScript. Escaping `<` keeps `</script>` and `<!--` inert
/// inside the surrounding script element.
fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..]
        .find('/')
        .map_or(url.len(), |i| scheme_end + i);
    Some(&url[..host_end])
}

fn content_security_policy(config: &SandboxConfig) -> String {
    let mut origins: Vec<&str> = [
        config.react_url.as_str(),
        config.react_dom_url.as_str(),
        config.babel_url.as_str(),
        config.tailwind_url.as_str(),
    ]
    .into_iter()
    .filter_map(origin_of)
    .collect();
    origins.sort_unstable();
    origins.dedup();

    format!(
        "default-src 'none'; script-src 'unsafe-inline' 'unsafe-eval' {}; style-src 'unsafe-inline'; img-src data: https:; font-src data: https:; connect-src 'none'; form-action 'none'; frame-src 'none'; object-src 'none'; base-uri 'none'",
        origins.join(" ")
    )
}

pub fn compute_fingerprint(html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta http-equiv="Content-Security-Policy" content="__CSP__">
  <script src="__TAILWIND_URL__"></script>
  <script crossorigin src="__REACT_URL__"></script>
  <script crossorigin src="__REACT_DOM_URL__"></script>
  <script src="__BABEL_URL__"></script>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { padding: 1rem; font-family: system-ui, -apple-system, sans-serif; background: white; }
    #diagnostic { padding: 20px; color: #ef4444; }
    #diagnostic pre { margin-top: 8px; white-space: pre-wrap; font-size: 13px; }
  </style>
</head>
<body>
  <div id="root"></div>
  <div id="diagnostic" hidden></div>
  <script>
__BOOTSTRAP__
  </script>
</body>
</html>
"#;

const BOOTSTRAP_TEMPLATE: &str = r#"(function () {
  var SHIM_SOURCE = __SHIM_SOURCE__;
  var SHIM_NAMES = __SHIM_NAMES__;
  var USER_SOURCE = __USER_SOURCE__;
  var ENTRY = __ENTRY__;
  var RESOLUTION_FAILURE = __RESOLUTION_FAILURE__;
  var MESSAGE_SOURCE = __MESSAGE_SOURCE__;
  var REPORT_TO_HOST = __REPORT_TO_HOST__;
  var LABELS = { execution: 'Render Error', resolution: 'No component found' };
  var HOOKS = 'const { useState, useEffect, useRef, useMemo, useCallback, useReducer, useContext, createContext, Fragment } = React;\n';
  var BABEL_OPTIONS = { presets: [['react', { runtime: 'classic' }]], parserOpts: { allowReturnOutsideFunction: true } };

  var reported = false;
  function report(phase, message) {
    if (reported) return;
    reported = true;
    var root = document.getElementById('root');
    var panel = document.getElementById('diagnostic');
    var title = document.createElement('strong');
    var body = document.createElement('pre');
    title.textContent = LABELS[phase] || 'Error';
    body.textContent = message;
    panel.replaceChildren(title, body);
    panel.hidden = false;
    root.hidden = true;
    if (REPORT_TO_HOST && window.parent !== window) {
      window.parent.postMessage({ source: MESSAGE_SOURCE, phase: phase, message: message }, '*');
    }
  }

  function messageOf(err) {
    return err && err.message ? String(err.message) : String(err);
  }

  window.addEventListener('error', function (event) {
    report('execution', event.message || 'Unknown error');
  });

  if (typeof React === 'undefined' || typeof ReactDOM === 'undefined' || typeof Babel === 'undefined') {
    report('execution', 'Preview runtime failed to load.');
    return;
  }

  var entry;
  try {
    var shimCode = Babel.transform(HOOKS + SHIM_SOURCE + 'return { ' + SHIM_NAMES.join(', ') + ' };', BABEL_OPTIONS).code;
    var shims = new Function('React', shimCode)(React);

    var slotAssignment = ENTRY
      ? '__slot.entry = typeof ' + ENTRY + " === 'function' ? " + ENTRY + ' : null;'
      : '__slot.entry = null;';
    var userCode = Babel.transform(HOOKS + '{\n' + USER_SOURCE + '\n;' + slotAssignment + '\n}', BABEL_OPTIONS).code;

    var slot = { entry: null };
    var run = Function.apply(null, ['React', 'ReactDOM', '__slot'].concat(SHIM_NAMES, [userCode]));
    run.apply(null, [React, ReactDOM, slot].concat(SHIM_NAMES.map(function (name) { return shims[name]; })));
    entry = slot.entry;
  } catch (err) {
    report('execution', messageOf(err));
    return;
  }

  if (typeof entry !== 'function') {
    report('resolution', RESOLUTION_FAILURE);
    return;
  }

  function Boundary(props) {
    React.Component.call(this, props);
    this.state = { failed: false };
  }
  Boundary.prototype = Object.create(React.Component.prototype);
  Boundary.prototype.constructor = Boundary;
  Boundary.getDerivedStateFromError = function () { return { failed: true }; };
  Boundary.prototype.componentDidCatch = function (err) { report('execution', messageOf(err)); };
  Boundary.prototype.render = function () { return this.state.failed ? null : this.props.children; };

  try {
    var container = document.getElementById('root');
    var element = React.createElement(Boundary, null, React.createElement(entry));
    if (ReactDOM.createRoot) {
      ReactDOM.createRoot(container).render(element);
    } else {
      ReactDOM.render(element, container);
    }
  } catch (err) {
    report('execution', messageOf(err));
  }
})();"#;
