//! # Normalize Module
//!
//! Turns generated component text into a script body the sandbox can evaluate
//! without a build step.
//!
//! ## Pipeline
//!
//! 1. **Fences**: the wrapping markdown fence pair (with or without a language tag)
//!    is dropped.
//! 2. **Grammar pass**: the text is parsed as module TSX. On a clean parse, every
//!    import, type declaration, annotation, cast, non-null assertion and export
//!    prefix is located by span and cut out of the source text.
//! 3. **Textual pass**: when the parse reports errors the ordered regex rule set
//!    runs instead, so partial generations still get best-effort treatment.
//! 4. **Trim**: surrounding whitespace is removed.
//!
//! Normalization never fails. Syntactic validity is only discovered when the
//! sandbox evaluates the result.

use lazy_static::lazy_static;
use std::borrow::Cow;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Executable script text with import/export and type syntax removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedScript(String);

impl NormalizedScript {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which removal strategy produced the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Grammar,
    Textual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalization {
    pub script: NormalizedScript,
    pub strategy: Strategy,
    pub imports_removed: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn normalize(raw: &str) -> NormalizedScript {
    normalize_with_report(raw).script
}

pub fn normalize_with_report(raw: &str) -> Normalization {
    let unfenced = strip_fences(raw);

    let (text, strategy, imports_removed) = match strip_with_grammar(&unfenced) {
        Some((text, imports)) => (text, Strategy::Grammar, imports),
        None => {
            let (text, imports) = strip_with_patterns(&unfenced);
            (text, Strategy::Textual, imports)
        }
    };

    debug!(
        ?strategy,
        imports_removed,
        input_len = raw.len(),
        output_len = text.trim().len(),
        "normalized generated component"
    );

    Normalization {
        script: NormalizedScript(text.trim().to_string()),
        strategy,
        imports_removed,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEP 1: FENCES
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref FENCE_LINE_RE: Regex = Regex::new(r"^[ \t]*```[\w+-]*[ \t]*$").unwrap();
}

/// Removes the fence pair wrapping the text: an opening marker on the first
/// non-blank line and a bare closing marker on the last. Fence-looking lines
/// anywhere else belong to the code (template literals, comments) and stay.
fn strip_fences(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let (Some(first), Some(last)) = (
        lines.iter().position(|l| !l.trim().is_empty()),
        lines.iter().rposition(|l| !l.trim().is_empty()),
    ) else {
        return raw.to_string();
    };

    let opens = FENCE_LINE_RE.is_match(lines[first]);
    let closes = last > first && lines[last].trim() == "```";
    if !opens && !closes {
        return raw.to_string();
    }

    let start = if opens { first + 1 } else { 0 };
    let end = if closes { last } else { lines.len() };
    lines[start..end.max(start)].join("\n")
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEPS 2-5: GRAMMAR PASS
// ═══════════════════════════════════════════════════════════════════════════════

fn strip_with_grammar(source: &str) -> Option<(String, usize)> {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if !ret.errors.is_empty() {
        debug!(
            errors = ret.errors.len(),
            "grammar pass rejected input, using textual rules"
        );
        return None;
    }

    let mut stripper = TypeSyntaxStripper::new(source);
    stripper.visit_program(&ret.program);
    let imports = stripper.imports;
    Some((stripper.apply(), imports))
}

/// Collects byte ranges of TypeScript and module syntax, then cuts them out
/// of the source back-to-front.
struct TypeSyntaxStripper<'s> {
    source: &'s str,
    edits: Vec<(usize, usize, Cow<'static, str>)>,
    imports: usize,
}

impl<'s> TypeSyntaxStripper<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
            imports: 0,
        }
    }

    fn remove(&mut self, start: u32, end: u32) {
        self.replace(start, end, "");
    }

    fn replace(&mut self, start: u32, end: u32, with: impl Into<Cow<'static, str>>) {
        if start < end {
            self.edits.push((start as usize, end as usize, with.into()));
        }
    }

    /// Removes a whole statement. When the statement is alone on its line(s)
    /// the line break goes with it, so no blank residue is left behind.
    fn remove_statement(&mut self, span: Span) {
        let (mut start, mut end) = (span.start as usize, span.end as usize);
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.source[end..]
            .find('\n')
            .map_or(self.source.len(), |i| end + i + 1);

        if self.source[line_start..start].trim().is_empty()
            && self.source[end..line_end].trim().is_empty()
        {
            start = line_start;
            end = line_end;
        }
        self.edits.push((start, end, Cow::Borrowed("")));
    }

    /// Removes `: Type`, including an optional `?` or definite `!` marker right
    /// before the colon.
    fn remove_annotation(&mut self, span: Span) {
        let mut start = span.start as usize;
        if !self.source[start..].starts_with(':') {
            let before = self.source[..start].trim_end();
            if before.ends_with(':') {
                start = before.len() - 1;
            }
        }
        let before = self.source[..start].trim_end();
        if before.ends_with('?') || before.ends_with('!') {
            start = before.len() - 1;
        }
        self.edits.push((start, span.end as usize, Cow::Borrowed("")));
    }

    /// Strips `public`/`private`/`protected`/`readonly`/`declare`/`override`
    /// from a member or parameter head, keeping `static`, `async` and accessors.
    fn remove_modifiers(&mut self, start: u32, end: u32) {
        let (start, end) = (start as usize, end as usize);
        if start >= end {
            return;
        }
        let head = &self.source[start..end];
        if MODIFIER_RE.is_match(head) {
            let kept = MODIFIER_RE.replace_all(head, "").into_owned();
            self.edits.push((start, end, Cow::Owned(kept)));
        }
    }

    fn apply(mut self) -> String {
        self.edits.sort_unstable_by_key(|&(start, end, _)| (start, end));

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (start, end, with) in self.edits {
            // Nested edits inside an already removed range are dropped.
            if start < cursor {
                continue;
            }
            out.push_str(&self.source[cursor..start]);
            out.push_str(&with);
            cursor = end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// Anonymous default exports have no name to mount, so they get bound to one.
const ANONYMOUS_DEFAULT_BINDING: &str = "const DefaultExport = ";

fn is_anonymous_default(kind: &ExportDefaultDeclarationKind) -> bool {
    match kind {
        ExportDefaultDeclarationKind::FunctionDeclaration(func) => func.id.is_none(),
        ExportDefaultDeclarationKind::ClassDeclaration(class) => class.id.is_none(),
        ExportDefaultDeclarationKind::ArrowFunctionExpression(_)
        | ExportDefaultDeclarationKind::FunctionExpression(_)
        | ExportDefaultDeclarationKind::ClassExpression(_)
        | ExportDefaultDeclarationKind::ParenthesizedExpression(_) => true,
        _ => false,
    }
}

lazy_static! {
    static ref MODIFIER_RE: Regex =
        Regex::new(r"\b(?:public|private|protected|readonly|declare|override)\b\s*").unwrap();
}

fn decorators_end(decorators: &[Decorator], fallback: u32) -> u32 {
    decorators.last().map_or(fallback, |d| d.span.end)
}

/// Plain object standing in for an enum: explicit initializers are copied,
/// the rest count up from the last numeric value.
fn enum_object(source: &str, decl: &TSEnumDeclaration) -> String {
    let mut next = Some(0.0_f64);
    let mut entries = Vec::with_capacity(decl.body.members.len());
    for member in &decl.body.members {
        let key = member.id.span().source_text(source);
        let value = match &member.initializer {
            Some(init) => {
                next = match init {
                    Expression::NumericLiteral(lit) => Some(lit.value + 1.0),
                    _ => None,
                };
                init.span().source_text(source).to_string()
            }
            None => match next {
                Some(n) => {
                    next = Some(n + 1.0);
                    n.to_string()
                }
                None => "undefined".to_string(),
            },
        };
        entries.push(format!("{}: {}", key, value));
    }
    format!("const {} = {{ {} }};", decl.id.name, entries.join(", "))
}

fn is_type_only_declaration(decl: &Declaration) -> bool {
    matches!(
        decl,
        Declaration::TSTypeAliasDeclaration(_) | Declaration::TSInterfaceDeclaration(_)
    )
}

impl<'a> Visit<'a> for TypeSyntaxStripper<'_> {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.imports += 1;
        self.remove_statement(it.span);
    }

    fn visit_ts_type_alias_declaration(&mut self, it: &TSTypeAliasDeclaration<'a>) {
        self.remove_statement(it.span);
    }

    fn visit_ts_interface_declaration(&mut self, it: &TSInterfaceDeclaration<'a>) {
        self.remove_statement(it.span);
    }

    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.declare {
            self.remove_statement(it.span);
            return;
        }
        walk::walk_variable_declaration(self, it);
    }

    fn visit_ts_enum_declaration(&mut self, it: &TSEnumDeclaration<'a>) {
        if it.declare {
            self.remove_statement(it.span);
        } else {
            self.replace(it.span.start, it.span.end, enum_object(self.source, it));
        }
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        if it.declare {
            self.remove_statement(it.span);
            return;
        }
        if it.r#abstract {
            let head = &self.source[it.span.start as usize..];
            if head.starts_with("abstract") {
                let keyword_len = head.len() - head["abstract".len()..].trim_start().len();
                self.remove(it.span.start, it.span.start + keyword_len as u32);
            } else {
                let before = self.source[..it.span.start as usize].trim_end();
                if let Some(stripped) = before.strip_suffix("abstract") {
                    self.remove(stripped.len() as u32, it.span.start);
                }
            }
        }
        if let Some(first) = it.implements.first() {
            let head = &self.source[it.span.start as usize..first.span.start as usize];
            if let Some(at) = head.rfind("implements") {
                self.remove(it.span.start + at as u32, it.body.span.start);
            }
        }
        walk::walk_class(self, it);
    }

    fn visit_property_definition(&mut self, it: &PropertyDefinition<'a>) {
        if it.declare
            || matches!(it.r#type, PropertyDefinitionType::TSAbstractPropertyDefinition)
        {
            self.remove_statement(it.span);
            return;
        }
        self.remove_modifiers(decorators_end(&it.decorators, it.span.start), it.key.span().start);
        walk::walk_property_definition(self, it);
    }

    fn visit_method_definition(&mut self, it: &MethodDefinition<'a>) {
        if matches!(it.r#type, MethodDefinitionType::TSAbstractMethodDefinition)
            || it.value.body.is_none()
        {
            self.remove_statement(it.span);
            return;
        }
        self.remove_modifiers(decorators_end(&it.decorators, it.span.start), it.key.span().start);
        walk::walk_method_definition(self, it);
    }

    fn visit_formal_parameter(&mut self, it: &FormalParameter<'a>) {
        self.remove_modifiers(decorators_end(&it.decorators, it.span.start), it.pattern.span().start);
        walk::walk_formal_parameter(self, it);
    }

    fn visit_ts_module_declaration(&mut self, it: &TSModuleDeclaration<'a>) {
        if it.declare {
            self.remove_statement(it.span);
            return;
        }
        walk::walk_ts_module_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        if let ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) = &it.declaration {
            self.remove_statement(it.span);
            return;
        }
        let prefix_end = it.declaration.span().start;
        if is_anonymous_default(&it.declaration) {
            self.replace(it.span.start, prefix_end, ANONYMOUS_DEFAULT_BINDING);
        } else {
            self.remove(it.span.start, prefix_end);
        }
        self.visit_export_default_declaration_kind(&it.declaration);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        match &it.declaration {
            Some(decl) if is_type_only_declaration(decl) => self.remove_statement(it.span),
            Some(decl) => {
                self.remove(it.span.start, decl.span().start);
                self.visit_declaration(decl);
            }
            // `export { A, B }` and re-exports carry no runtime code of their own.
            None => self.remove_statement(it.span),
        }
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.remove_statement(it.span);
    }

    fn visit_ts_type_annotation(&mut self, it: &TSTypeAnnotation<'a>) {
        self.remove_annotation(it.span);
    }

    fn visit_ts_type_parameter_instantiation(&mut self, it: &TSTypeParameterInstantiation<'a>) {
        self.remove(it.span.start, it.span.end);
    }

    fn visit_ts_type_parameter_declaration(&mut self, it: &TSTypeParameterDeclaration<'a>) {
        self.remove(it.span.start, it.span.end);
    }

    fn visit_ts_as_expression(&mut self, it: &TSAsExpression<'a>) {
        self.remove(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }

    fn visit_ts_satisfies_expression(&mut self, it: &TSSatisfiesExpression<'a>) {
        self.remove(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }

    fn visit_ts_non_null_expression(&mut self, it: &TSNonNullExpression<'a>) {
        self.remove(it.expression.span().end, it.span.end);
        self.visit_expression(&it.expression);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEPS 2-5: TEXTUAL FALLBACK
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    // Default, named-list (possibly multi-line), namespace and type-only imports.
    static ref IMPORT_FROM_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*import\s+(?:type\s+)?[\w$*{}\s,]+?\s*from\s*['"][^'"\n]*['"][ \t]*;?[ \t]*(?:\r?\n|$)"#
    )
    .unwrap();
    static ref IMPORT_SIDE_EFFECT_RE: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s*['"][^'"\n]*['"][ \t]*;?[ \t]*(?:\r?\n|$)"#).unwrap();

    static ref TYPE_OBJECT_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?type\s+\w+(?:<[^>\n]*>)?\s*=\s*\{[^}]*\}[ \t]*;?[ \t]*(?:\r?\n|$)"
    )
    .unwrap();
    static ref TYPE_UNION_RE: Regex =
        Regex::new(r"(?m)^[ \t]*(?:export\s+)?type\s+\w+(?:<[^>\n]*>)?\s*=[^\n]*(?:\r?\n|$)").unwrap();
    static ref INTERFACE_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?interface\s+\w+[^{\n]*\{[^}]*\}[ \t]*(?:\r?\n|$)"
    )
    .unwrap();

    static ref ANNOTATION_RE: Regex =
        Regex::new(r"\??:\s*[\w.]+(?:<[^>\n]+>)?(?:\[\])*(\s*[=)])").unwrap();
    static ref ARRAY_ANNOTATION_RE: Regex = Regex::new(r":\s*\w+(?:\[\])+").unwrap();
    static ref CALL_GENERIC_RE: Regex = Regex::new(r"([\w$])<[^<>()\n]+>\(").unwrap();
    static ref RETURN_TYPE_RE: Regex = Regex::new(
        r"\)\s*:\s*(?:JSX\.Element|React\.ReactElement|React\.ReactNode|ReactNode|void|any|[\w\[\]]+)(\s*(?:\{|=>))"
    )
    .unwrap();
    static ref CAST_RE: Regex = Regex::new(r"\s+as\s+[\w.]+(?:\[\])*").unwrap();
    static ref NON_NULL_RE: Regex = Regex::new(r"([\w$)\]])!([.\[),;])").unwrap();

    static ref EXPORT_DEFAULT_ANONYMOUS_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?function\s*\*?\s*\(|class\s*\{|\()"
    )
    .unwrap();
    static ref EXPORT_DEFAULT_RE: Regex = Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap();
    static ref EXPORT_DECL_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)export\s+(function|const|let|var|class|async)\b").unwrap();
}

/// Ordered regex removals. Each rule is idempotent on its own; the order
/// matters because later rules assume earlier ones already ran.
fn strip_with_patterns(source: &str) -> (String, usize) {
    let imports = IMPORT_FROM_RE.find_iter(source).count();
    let text = IMPORT_FROM_RE.replace_all(source, "");
    let imports = imports + IMPORT_SIDE_EFFECT_RE.find_iter(&text).count();
    let text = IMPORT_SIDE_EFFECT_RE.replace_all(&text, "");

    let text = TYPE_OBJECT_RE.replace_all(&text, "");
    let text = TYPE_UNION_RE.replace_all(&text, "");
    let text = INTERFACE_RE.replace_all(&text, "");

    let text = ANNOTATION_RE.replace_all(&text, "${1}");
    let text = ARRAY_ANNOTATION_RE.replace_all(&text, "");
    let text = CALL_GENERIC_RE.replace_all(&text, "${1}(");
    let text = RETURN_TYPE_RE.replace_all(&text, ")${1}");
    let text = CAST_RE.replace_all(&text, "");
    let text = NON_NULL_RE.replace_all(&text, "${1}${2}");

    let text = EXPORT_DEFAULT_ANONYMOUS_RE.replace_all(&text, "${1}const DefaultExport = ${2}");
    let text = EXPORT_DEFAULT_RE.replace_all(&text, "${1}");
    let text = EXPORT_DECL_RE.replace_all(&text, "${1}${2}");

    (text.into_owned(), imports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_with_language_tag() {
        let raw = "```tsx\nfunction App() { return <div /> }\n```";
        assert_eq!(normalize(raw).as_str(), "function App() { return <div /> }");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\nconst App = () => <p>ok</p>;\n```\n";
        assert_eq!(normalize(raw).as_str(), "const App = () => <p>ok</p>;");
    }

    #[test]
    fn test_grammar_pass_used_for_valid_tsx() {
        let report = normalize_with_report("const x: number = 1;");
        assert_eq!(report.strategy, Strategy::Grammar);
        assert_eq!(report.script.as_str(), "const x = 1;");
    }

    #[test]
    fn test_textual_pass_used_for_partial_code() {
        let raw = "import { Button } from '@/components/ui/button';\nfunction App() {\n  const n: number = 1;\n  return <Button>";
        let report = normalize_with_report(raw);
        assert_eq!(report.strategy, Strategy::Textual);
        assert_eq!(report.imports_removed, 1);
        assert!(!report.script.as_str().contains("import"));
        assert!(report.script.as_str().contains("const n = 1;"));
    }

    #[test]
    fn test_ambient_declarations_are_removed() {
        let raw = "declare const API_URL: string;\nconst App = () => <div />;";
        assert_eq!(normalize(raw).as_str(), "const App = () => <div />;");
    }

    #[test]
    fn test_definite_assignment_marker_is_removed() {
        let raw = "let ready!: boolean;\nready = true;";
        assert_eq!(normalize(raw).as_str(), "let ready;\nready = true;");
    }

    #[test]
    fn test_class_type_syntax_is_removed() {
        let raw = r#"class Store extends Base implements Disposable, Named {
  private readonly items: string[] = [];
  count!: number;
  constructor(private name: string, readonly size = 1) {
    super();
  }
  public static create(): Store { return new Store('x'); }
}"#;
        let expected = r#"class Store extends Base {
  items = [];
  count;
  constructor(name, size = 1) {
    super();
  }
  static create() { return new Store('x'); }
}"#;
        let report = normalize_with_report(raw);
        assert_eq!(report.strategy, Strategy::Grammar);
        assert_eq!(report.script.as_str(), expected);
    }

    #[test]
    fn test_abstract_class_members_are_removed() {
        let raw = "abstract class Shape {\n  abstract area(): number;\n  describe() { return 'shape'; }\n}";
        let script = normalize(raw);
        assert!(!script.as_str().contains("abstract"));
        assert!(script.as_str().starts_with("class Shape {"));
        assert!(script.as_str().contains("describe() { return 'shape'; }"));
    }

    #[test]
    fn test_enum_becomes_plain_object() {
        let raw = "export enum Color { Red, Green = 5, Blue, Named = 'n' }\nconst pick = Color.Blue;";
        assert_eq!(
            normalize(raw).as_str(),
            "const Color = { Red: 0, Green: 5, Blue: 6, Named: 'n' };\nconst pick = Color.Blue;"
        );
    }

    #[test]
    fn test_declared_enum_is_removed() {
        let raw = "declare enum Mode { A, B }\nconst App = () => <div />;";
        assert_eq!(normalize(raw).as_str(), "const App = () => <div />;");
    }

    #[test]
    fn test_fence_lines_inside_code_are_kept() {
        let raw = "const md = `\n```\nx\n```\n`;";
        assert_eq!(strip_fences(raw), raw);
    }

    #[test]
    fn test_textual_call_generic_keeps_callee() {
        let (text, _) = strip_with_patterns("const [v, setV] = useState<string>('');");
        assert_eq!(text, "const [v, setV] = useState('');");
    }

    #[test]
    fn test_textual_return_type() {
        let (text, _) = strip_with_patterns("function App(): JSX.Element {");
        assert_eq!(text, "function App() {");
    }

    #[test]
    fn test_textual_non_null() {
        let (text, _) = strip_with_patterns("ref.current!.focus();");
        assert_eq!(text, "ref.current.focus();");
    }

    #[test]
    fn test_anonymous_default_export_gets_a_binding() {
        let script = normalize("export default function () { return <div /> }");
        assert_eq!(
            script.as_str(),
            "const DefaultExport = function () { return <div /> }"
        );
    }

    #[test]
    fn test_textual_anonymous_default_export() {
        let (text, _) = strip_with_patterns("export default () => <div>");
        assert_eq!(text, "const DefaultExport = () => <div>");
    }

    #[test]
    fn test_textual_export_default() {
        let (text, _) = strip_with_patterns("export default function App() {");
        assert_eq!(text, "function App() {");
    }
}
