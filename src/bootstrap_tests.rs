//! Bootstrap Execution Tests
//!
//! Runs the in-frame bootstrap in an embedded JS engine with stub `React`,
//! `ReactDOM`, `Babel`, `document` and `window` globals, then reads back what
//! was mounted, what the diagnostic panel shows and what was posted to the host.
//! The Babel stub passes code through untouched, so scripts here avoid JSX.

#[cfg(test)]
mod tests {
    use boa_engine::{Context, Source};
    use serde::Deserialize;

    use crate::config::SandboxConfig;
    use crate::error::{ErrorReporter, RenderPhase};
    use crate::normalize::normalize;
    use crate::resolve::{resolve_entry, RESOLUTION_FAILURE_MESSAGE};
    use crate::sandbox::render_bootstrap;
    use crate::shims::{ShimCatalog, ShimComponent};

    const STUB_GLOBALS: &str = r#"
var posted = [];
var mounted = false;

function makeElement(tag) {
  return {
    tagName: tag,
    hidden: false,
    textContent: '',
    children: [],
    replaceChildren: function () { this.children = Array.prototype.slice.call(arguments); }
  };
}

var elements = { root: makeElement('div'), diagnostic: makeElement('div') };
elements.diagnostic.hidden = true;

var document = {
  getElementById: function (id) { return elements[id] || null; },
  createElement: makeElement
};

var window = {
  addEventListener: function () {},
  parent: { postMessage: function (message) { posted.push(message); } }
};

function Component(props) { this.props = props; }

function renderNode(node) {
  if (node === null || node === undefined || node === true || node === false) return '';
  if (typeof node === 'string' || typeof node === 'number') return String(node);
  if (Array.isArray(node)) return node.map(renderNode).join('');
  var type = node.type;
  var props = node.props;
  if (typeof type === 'string') return renderNode(props.children);
  if (type && type.$$typeof === 'memo') return renderNode({ type: type.type, props: props });
  if (type.prototype && typeof type.prototype.render === 'function') {
    var instance = new type(props);
    try {
      return renderNode(instance.render());
    } catch (err) {
      if (!type.getDerivedStateFromError) throw err;
      instance.state = type.getDerivedStateFromError(err);
      if (instance.componentDidCatch) instance.componentDidCatch(err);
      return renderNode(instance.render());
    }
  }
  return renderNode(type(props));
}

var React = {
  Component: Component,
  createElement: function (type, props) {
    var children = Array.prototype.slice.call(arguments, 2);
    var merged = Object.assign({}, props || {});
    merged.children = children.length === 1 ? children[0] : children;
    return { type: type, props: merged };
  },
  memo: function (type) { return { $$typeof: 'memo', type: type }; },
  useState: function (initial) { return [initial, function () {}]; }
};

var ReactDOM = {
  createRoot: function (container) {
    return {
      render: function (element) {
        container.textContent = renderNode(element);
        mounted = true;
      }
    };
  }
};

var Babel = { transform: function (code) { return { code: code }; } };
"#;

    const READ_OUTCOME: &str = r#"
JSON.stringify({
  mounted: mounted,
  output: elements.root.textContent,
  rootHidden: elements.root.hidden,
  diagnosticHidden: elements.diagnostic.hidden,
  title: elements.diagnostic.children.length > 0 ? elements.diagnostic.children[0].textContent : null,
  message: elements.diagnostic.children.length > 1 ? elements.diagnostic.children[1].textContent : null,
  posted: posted
})
"#;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Outcome {
        mounted: bool,
        output: String,
        root_hidden: bool,
        diagnostic_hidden: bool,
        title: Option<String>,
        message: Option<String>,
        posted: Vec<serde_json::Value>,
    }

    fn catalog() -> ShimCatalog {
        ShimCatalog::from_components([ShimComponent {
            name: "Badge",
            renderer: "(props) => React.createElement('span', null, props.children)",
        }])
    }

    fn run_with(raw: &str, config: &SandboxConfig) -> Outcome {
        let catalog = catalog();
        let script = normalize(raw);
        let resolution = resolve_entry(&script, &catalog);
        let bootstrap = render_bootstrap(&script, &resolution, &catalog, config);

        let mut context = Context::default();
        context
            .eval(Source::from_bytes(STUB_GLOBALS))
            .expect("stub globals evaluate");
        context
            .eval(Source::from_bytes(&bootstrap))
            .expect("bootstrap never throws past its guards");
        let json = context
            .eval(Source::from_bytes(READ_OUTCOME))
            .expect("outcome readable")
            .to_string(&mut context)
            .expect("outcome is a string")
            .to_std_string_escaped();
        serde_json::from_str(&json).expect("outcome is JSON")
    }

    fn run(raw: &str) -> Outcome {
        run_with(raw, &SandboxConfig::default())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // MOUNT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_entry_mounts_with_shims_in_scope() {
        let outcome = run(
            "function Greeting() {\n  return React.createElement('div', null, 'Hi ', React.createElement(Badge, null, 'new'));\n}",
        );
        assert!(outcome.mounted);
        assert_eq!(outcome.output, "Hi new");
        assert!(outcome.diagnostic_hidden);
        assert!(outcome.title.is_none());
        assert!(outcome.posted.is_empty());
    }

    #[test]
    fn test_memo_binding_before_entry_does_not_block_mount() {
        let outcome = run(
            "const Row = React.memo(function Row() { return 'row'; });\nfunction App() { return React.createElement('p', null, React.createElement(Row)); }",
        );
        assert!(outcome.mounted, "diagnostic: {:?}", outcome.message);
        assert_eq!(outcome.output, "row");
    }

    #[test]
    fn test_user_binding_may_shadow_a_shim() {
        let outcome = run(
            "const Badge = (props) => React.createElement('b', null, 'custom');\nfunction Card() { return React.createElement(Badge); }",
        );
        assert!(outcome.mounted, "diagnostic: {:?}", outcome.message);
        assert_eq!(outcome.output, "custom");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_evaluation_error_shows_thrown_message() {
        let outcome = run("function App() { return 'never'; }\nthrow new Error('boom while loading');");
        assert!(!outcome.mounted);
        assert!(outcome.root_hidden);
        assert!(!outcome.diagnostic_hidden);
        assert_eq!(outcome.title.as_deref(), Some("Render Error"));
        assert_eq!(outcome.message.as_deref(), Some("boom while loading"));
    }

    #[test]
    fn test_render_error_is_caught_by_boundary() {
        let outcome = run("function App() { throw new Error('render failed'); }");
        assert_eq!(outcome.title.as_deref(), Some("Render Error"));
        assert_eq!(outcome.message.as_deref(), Some("render failed"));
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_syntax_error_takes_the_execution_path() {
        let outcome = run("function App() { return ( }");
        assert!(!outcome.mounted);
        assert_eq!(outcome.title.as_deref(), Some("Render Error"));
        assert_eq!(outcome.posted[0]["phase"], "execution");
    }

    #[test]
    fn test_no_capitalized_callable_is_a_resolution_failure() {
        let outcome = run("const total = 1 + 2;\nfunction helper() { return total; }");
        assert!(!outcome.mounted);
        assert_eq!(outcome.title.as_deref(), Some("No component found"));
        assert_eq!(outcome.message.as_deref(), Some(RESOLUTION_FAILURE_MESSAGE));
        assert_eq!(outcome.posted[0]["phase"], "resolution");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // HOST CHANNEL
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_posted_diagnostic_reaches_error_reporter() {
        let outcome = run("function App() { throw new Error('render failed'); }");
        assert_eq!(outcome.posted.len(), 1);

        let mut reporter = ErrorReporter::new();
        assert!(reporter.accept_sandbox_message(&outcome.posted[0].to_string()));
        let err = reporter.sandbox_error().expect("sandbox error recorded");
        assert_eq!(err.phase, RenderPhase::Execution);
        assert_eq!(err.message, "render failed");
        assert!(reporter.request_error().is_none());
    }

    #[test]
    fn test_host_reporting_can_be_turned_off() {
        let config = SandboxConfig {
            report_to_host: false,
            ..SandboxConfig::default()
        };
        let outcome = run_with("function App() { throw new Error('quiet'); }", &config);
        assert!(outcome.posted.is_empty());
        assert_eq!(outcome.message.as_deref(), Some("quiet"));
    }
}
