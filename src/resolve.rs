//! Entry component resolution.
//!
//! Picks the binding the sandbox mounts. Top-level declarations are scanned in
//! source order and the first capitalized, callable, non-reserved name wins, so
//! the choice never depends on how a script engine enumerates its globals.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Expression, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::NormalizedScript;
use crate::shims::ShimCatalog;

/// Shown when evaluation succeeds but nothing is mountable.
pub const RESOLUTION_FAILURE_MESSAGE: &str = "Unable to find component. Make sure your code defines a React component with a capitalized name.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum Resolution {
    Entry(String),
    NotFound,
}

impl Resolution {
    pub fn entry(&self) -> Option<&str> {
        match self {
            Resolution::Entry(name) => Some(name),
            Resolution::NotFound => None,
        }
    }
}

pub fn resolve_entry(script: &NormalizedScript, catalog: &ShimCatalog) -> Resolution {
    let candidates = match callable_bindings(script.as_str()) {
        Some(names) => names,
        None => callable_bindings_textual(script.as_str()),
    };

    let resolution = candidates
        .into_iter()
        .find(|name| is_entry_name(name) && !catalog.is_reserved(name))
        .map_or(Resolution::NotFound, Resolution::Entry);

    debug!(?resolution, "resolved entry component");
    resolution
}

fn is_entry_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Top-level callable bindings in source order, or `None` when the script
/// does not parse.
fn callable_bindings(source: &str) -> Option<Vec<String>> {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }

    let mut names = Vec::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::VariableDeclaration(var_decl) => {
                for decl in &var_decl.declarations {
                    let BindingPattern::BindingIdentifier(id) = &decl.id else {
                        continue;
                    };
                    if decl.init.as_ref().is_some_and(is_callable_init) {
                        names.push(id.name.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    Some(names)
}

/// Initialisers whose value is a function by construction. Wrapper calls such
/// as `memo(...)` or `forwardRef(...)` produce objects, so they never qualify.
fn is_callable_init(expr: &Expression) -> bool {
    match expr {
        Expression::ArrowFunctionExpression(_)
        | Expression::FunctionExpression(_)
        | Expression::ClassExpression(_) => true,
        Expression::ParenthesizedExpression(paren) => is_callable_init(&paren.expression),
        _ => false,
    }
}

lazy_static! {
    static ref DECLARATION_RE: Regex = Regex::new(
        r"(?m)^(?:async\s+)?(?:function\s*\*?\s*([A-Za-z_$][\w$]*)|class\s+([A-Za-z_$][\w$]*)|(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\(|function\b|class\b|[A-Za-z_$][\w$]*\s*=>))"
    )
    .unwrap();
}

/// Unindented declarations stand in for "top level" when the script does not
/// parse; evaluation will usually report the syntax error first.
fn callable_bindings_textual(source: &str) -> Vec<String> {
    DECLARATION_RE
        .captures_iter(source)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}
