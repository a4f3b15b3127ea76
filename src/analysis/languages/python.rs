//! Python language analyzer using tree-sitter.

use std::collections::HashSet;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language as TsLanguage, Node, Parser, Query, QueryCursor};
use tracing::debug;

use crate::analysis::context::AnalysisContext;
use crate::analysis::model::{
    AttributeRecord, CallRecord, ClassRecord, FunctionRecord, ImportRecord, Language,
    ModuleAnalysis, ParameterKind, ParameterRecord, Visibility,
};
use crate::analysis::traits::{LanguageAnalyzer, ParsedFile};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_statement) @import
(import_from_statement) @import_from
"#;

/// Tree-sitter query for call sites.
const CALL_QUERY: &str = r#"
(call
  function: (identifier) @callee
  arguments: (argument_list) @args
) @call

(call
  function: (attribute
    object: (_) @receiver
    attribute: (identifier) @callee)
  arguments: (argument_list) @args
) @call
"#;

const MAX_ARG_TEXT: usize = 80;

pub struct PythonAnalyzer {
    language: TsLanguage,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    pub fn parse(&self, path: &str, source: &str) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", path))?;

        Ok(ParsedFile {
            tree,
            source: source.as_bytes().to_vec(),
            path: path.to_string(),
        })
    }

    fn extract(&self, parsed: &ParsedFile, ctx: &AnalysisContext, out: &mut ModuleAnalysis) -> anyhow::Result<()> {
        let root = parsed.tree.root_node();
        if root.has_error() {
            out.errors.push(format!(
                "{}: syntax errors near line {}",
                parsed.path,
                first_error_line(root)
            ));
        }

        out.imports = self.extract_imports(parsed, ctx)?;
        out.calls = self.extract_calls(parsed)?;

        let mut cursor = root.walk();
        let mut public_names = Vec::new();
        let mut declared_all = None;
        for child in root.named_children(&mut cursor) {
            let def = unwrap_decorated(child);
            match def.kind() {
                "function_definition" => {
                    if let Some(f) = self.function(parsed, def, false) {
                        if !f.name.starts_with('_') {
                            public_names.push(f.name.clone());
                            out.functions.push(f);
                        }
                    }
                }
                "class_definition" => {
                    if let Some(c) = self.class(parsed, def) {
                        if !c.name.starts_with('_') {
                            public_names.push(c.name.clone());
                            out.classes.push(c);
                        }
                    }
                }
                "expression_statement" => {
                    let Some(assign) = def.named_child(0).filter(|n| n.kind() == "assignment") else {
                        continue;
                    };
                    let Some(left) = assign.child_by_field_name("left") else {
                        continue;
                    };
                    let name = parsed.node_text(left);
                    if name == "__all__" {
                        declared_all = assign
                            .child_by_field_name("right")
                            .map(|r| string_items(parsed, r));
                    } else if left.kind() == "identifier" && !name.starts_with('_') {
                        public_names.push(name.to_string());
                    }
                }
                _ => {}
            }
        }

        out.exports = declared_all.unwrap_or(public_names);
        let exported: HashSet<&str> = out.exports.iter().map(String::as_str).collect();
        for f in &mut out.functions {
            f.is_exported = exported.contains(f.name.as_str());
        }
        for c in &mut out.classes {
            c.is_exported = exported.contains(c.name.as_str());
        }
        Ok(())
    }

    fn extract_imports(&self, parsed: &ParsedFile, ctx: &AnalysisContext) -> anyhow::Result<Vec<ImportRecord>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let line = parsed.line(node);
                let mut walker = node.walk();
                match query.capture_names()[capture.index as usize] {
                    "import" => {
                        for name in node.children_by_field_name("name", &mut walker) {
                            let (module, alias) = aliased(parsed, name);
                            imports.push(ImportRecord {
                                is_internal: ctx.is_internal(&module),
                                imported_name: Some(module.clone()),
                                module,
                                local_alias: alias,
                                is_default: false,
                                is_namespace: true,
                                line,
                            });
                        }
                    }
                    "import_from" => {
                        let module = node
                            .child_by_field_name("module_name")
                            .map(|n| parsed.node_text(n).to_string())
                            .unwrap_or_default();
                        let is_internal = ctx.is_internal(&module);

                        let names: Vec<Node> = node.children_by_field_name("name", &mut walker).collect();
                        if names.is_empty() {
                            // `from x import *`
                            imports.push(ImportRecord {
                                module: module.clone(),
                                imported_name: None,
                                local_alias: None,
                                is_default: false,
                                is_namespace: true,
                                is_internal,
                                line,
                            });
                        }
                        for name in names {
                            let (imported, alias) = aliased(parsed, name);
                            imports.push(ImportRecord {
                                module: module.clone(),
                                imported_name: Some(imported),
                                local_alias: alias,
                                is_default: false,
                                is_namespace: false,
                                is_internal,
                                line,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(imports)
    }

    fn extract_calls(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<CallRecord>> {
        let query = Query::new(&self.language, CALL_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut calls = Vec::new();
        while let Some(m) = matches.next() {
            let mut callee = None;
            let mut receiver = None;
            let mut args = Vec::new();
            let mut line = 0;
            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "callee" => callee = Some(parsed.node_text(capture.node).to_string()),
                    "receiver" => receiver = Some(parsed.node_text(capture.node).to_string()),
                    "args" => {
                        let mut walker = capture.node.walk();
                        args = capture
                            .node
                            .named_children(&mut walker)
                            .filter(|n| n.kind() != "comment")
                            .map(|n| truncate(parsed.node_text(n)))
                            .collect();
                    }
                    "call" => line = parsed.line(capture.node),
                    _ => {}
                }
            }
            if let Some(callee_name) = callee {
                calls.push(CallRecord {
                    callee_name,
                    receiver_name: receiver,
                    args,
                    line,
                });
            }
        }
        Ok(calls)
    }

    fn function(&self, parsed: &ParsedFile, node: Node, is_method: bool) -> Option<FunctionRecord> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.parameters(parsed, p, is_method))
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("return_type")
            .map(|t| canonical_annotation(parsed.node_text(t)));

        Some(FunctionRecord {
            name,
            parameters,
            return_type,
            is_async: parsed.node_text(node).starts_with("async"),
            is_exported: false,
            line: parsed.line(node),
        })
    }

    fn parameters(&self, parsed: &ParsedFile, node: Node, skip_receiver: bool) -> Vec<ParameterRecord> {
        let mut params = Vec::new();
        let mut keyword_only = false;
        let mut cursor = node.walk();

        for (i, p) in node.named_children(&mut cursor).enumerate() {
            let annotation = p
                .child_by_field_name("type")
                .map(|t| canonical_annotation(parsed.node_text(t)));
            let default = p.child_by_field_name("value").map(|v| default_text(parsed, v));

            let (name_node, kind) = match p.kind() {
                "identifier" => (Some(p), None),
                "default_parameter" | "typed_default_parameter" => (p.child_by_field_name("name"), None),
                "typed_parameter" => match p.named_child(0) {
                    Some(inner) if inner.kind() == "list_splat_pattern" => {
                        (Some(inner), Some(ParameterKind::VarPositional))
                    }
                    Some(inner) if inner.kind() == "dictionary_splat_pattern" => {
                        (Some(inner), Some(ParameterKind::VarKeyword))
                    }
                    inner => (inner, None),
                },
                "list_splat_pattern" => (Some(p), Some(ParameterKind::VarPositional)),
                "dictionary_splat_pattern" => (Some(p), Some(ParameterKind::VarKeyword)),
                "keyword_separator" => {
                    keyword_only = true;
                    continue;
                }
                _ => continue,
            };
            let Some(name_node) = name_node else { continue };
            let name = parsed.node_text(name_node).trim_start_matches('*').to_string();

            if i == 0 && skip_receiver && (name == "self" || name == "cls") {
                continue;
            }

            let record = match kind {
                Some(ParameterKind::VarPositional) => {
                    keyword_only = true;
                    ParameterRecord {
                        name,
                        type_annotation: annotation.unwrap_or_else(|| "Any".into()),
                        optional: true,
                        default: None,
                        kind: ParameterKind::VarPositional,
                    }
                }
                Some(ParameterKind::VarKeyword) => ParameterRecord {
                    name,
                    type_annotation: annotation.unwrap_or_else(|| "Dict[str, Any]".into()),
                    optional: true,
                    default: None,
                    kind: ParameterKind::VarKeyword,
                },
                _ => ParameterRecord {
                    name,
                    type_annotation: annotation.unwrap_or_else(|| "Any".into()),
                    optional: default.is_some(),
                    default,
                    kind: if keyword_only {
                        ParameterKind::KeywordOnly
                    } else {
                        ParameterKind::Positional
                    },
                },
            };
            params.push(record);
        }
        params
    }

    fn class(&self, parsed: &ParsedFile, node: Node) -> Option<ClassRecord> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();

        let mut bases: Vec<String> = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            bases = superclasses
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "keyword_argument")
                .map(|n| parsed.node_text(n).to_string())
                .collect();
        }

        let mut methods = Vec::new();
        let mut attributes = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                let def = unwrap_decorated(item);
                match def.kind() {
                    "function_definition" => {
                        let Some(method) = self.function(parsed, def, true) else {
                            continue;
                        };
                        if method.name == "__init__" {
                            if let Some(init_body) = def.child_by_field_name("body") {
                                collect_self_attributes(parsed, init_body, &mut attributes);
                            }
                        }
                        if !method.name.starts_with('_') {
                            methods.push(method);
                        }
                    }
                    "expression_statement" => {
                        if let Some(attr) = class_attribute(parsed, def) {
                            attributes.push(attr);
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut bases = bases.into_iter();
        Some(ClassRecord {
            name,
            methods,
            attributes,
            extends: bases.next(),
            implements: bases.collect(),
            is_exported: false,
            line: parsed.line(node),
        })
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn analyze(&self, rel_path: &str, source: &str, ctx: &AnalysisContext) -> ModuleAnalysis {
        let mut out = ModuleAnalysis::new(rel_path, ctx.module_name(rel_path, Language::Python), Language::Python);
        out.line_count = source.lines().count();

        let result = self
            .parse(rel_path, source)
            .and_then(|parsed| self.extract(&parsed, ctx, &mut out));
        if let Err(e) = result {
            debug!(path = rel_path, error = %e, "python extraction failed");
            out.errors.push(format!("{}: {}", rel_path, e));
        }

        out.finalize();
        out
    }
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| c.has_error())
        .map(first_error_line);
    found.unwrap_or(node.start_position().row + 1)
}

/// `(name, alias)` of a `dotted_name` or `aliased_import` node.
fn aliased(parsed: &ParsedFile, node: Node) -> (String, Option<String>) {
    if node.kind() == "aliased_import" {
        let name = node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string())
            .unwrap_or_default();
        let alias = node
            .child_by_field_name("alias")
            .map(|n| parsed.node_text(n).to_string());
        (name, alias)
    } else {
        (parsed.node_text(node).to_string(), None)
    }
}

/// Class-level `name: Type [= value]`.
fn class_attribute(parsed: &ParsedFile, stmt: Node) -> Option<AttributeRecord> {
    let assign = stmt.named_child(0).filter(|n| n.kind() == "assignment")?;
    let left = assign.child_by_field_name("left").filter(|n| n.kind() == "identifier")?;
    let annotation = assign.child_by_field_name("type")?;
    let name = parsed.node_text(left);
    if name.starts_with('_') {
        return None;
    }
    let type_annotation = canonical_annotation(parsed.node_text(annotation));
    Some(AttributeRecord {
        name: name.to_string(),
        is_static: type_annotation.starts_with("ClassVar"),
        type_annotation: Some(type_annotation),
        visibility: Visibility::Public,
        line: parsed.line(stmt),
    })
}

/// `self.x = ...` assignments directly in an `__init__` body.
fn collect_self_attributes(parsed: &ParsedFile, body: Node, out: &mut Vec<AttributeRecord>) {
    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        let Some(assign) = stmt.named_child(0).filter(|n| n.kind() == "assignment") else {
            continue;
        };
        let Some(left) = assign.child_by_field_name("left").filter(|n| n.kind() == "attribute") else {
            continue;
        };
        let is_self = left
            .child_by_field_name("object")
            .is_some_and(|o| parsed.node_text(o) == "self");
        let Some(attr) = left.child_by_field_name("attribute") else {
            continue;
        };
        let name = parsed.node_text(attr);
        if !is_self || name.starts_with('_') || out.iter().any(|a| a.name == name) {
            continue;
        }
        out.push(AttributeRecord {
            name: name.to_string(),
            type_annotation: assign
                .child_by_field_name("type")
                .map(|t| canonical_annotation(parsed.node_text(t))),
            visibility: Visibility::Public,
            is_static: false,
            line: parsed.line(stmt),
        });
    }
}

/// String items of a list or tuple literal.
fn string_items(parsed: &ParsedFile, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() == "string")
        .map(|n| strip_string_quotes(parsed.node_text(n)).to_string())
        .collect()
}

fn strip_string_quotes(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_matches(|c| c == '"' || c == '\'')
}

/// Source text of a default value, reduced for containers and expressions.
fn default_text(parsed: &ParsedFile, node: Node) -> String {
    match node.kind() {
        "integer" | "float" | "string" | "true" | "false" | "none" | "identifier" | "attribute" => {
            parsed.node_text(node).to_string()
        }
        "unary_operator" => {
            let text = parsed.node_text(node);
            if text.trim_start_matches('-').trim().parse::<f64>().is_ok() {
                text.to_string()
            } else {
                "...".to_string()
            }
        }
        "list" => "[]".to_string(),
        "dictionary" => "{}".to_string(),
        _ => "...".to_string(),
    }
}

/// Collapse a type annotation into one canonical line, e.g. `Dict[str, Any]`.
pub fn canonical_annotation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            c if c.is_whitespace() => {}
            ',' => out.push_str(", "),
            '|' => out.push_str(" | "),
            c => out.push(c),
        }
    }
    out
}

fn truncate(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > MAX_ARG_TEXT {
        let cut: String = text.chars().take(MAX_ARG_TEXT).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> ModuleAnalysis {
        let ctx = AnalysisContext::new("/repo");
        PythonAnalyzer::new().analyze("services/billing.py", source, &ctx)
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import os
import numpy as np
from collections import OrderedDict
from .models import Invoice as Inv, Customer
from . import helpers
"#;
        let analysis = analyze(source);
        let np = analysis.imports.iter().find(|i| i.module == "numpy").unwrap();
        assert_eq!(np.local_name(), Some("np"));
        assert!(!np.is_internal);

        let inv = analysis
            .imports
            .iter()
            .find(|i| i.imported_name.as_deref() == Some("Invoice"))
            .unwrap();
        assert_eq!(inv.module, ".models");
        assert_eq!(inv.local_alias.as_deref(), Some("Inv"));
        assert!(inv.is_internal);
        assert_eq!(inv.line, 5);

        assert!(analysis.imports.iter().any(|i| i.module == "." && i.imported_name.as_deref() == Some("helpers")));
        assert!(!analysis.imports.iter().find(|i| i.module == "os").unwrap().is_internal);
    }

    #[test]
    fn test_functions_and_parameters() {
        let source = r#"
def charge(customer_id: str, amount: int = 0, *args, currency: str = "usd", force, **kwargs) -> Dict[str,
        Any]:
    pass

async def refresh(items: List[ str ] = [], opts = {}, mode=compute()):
    pass

def _private():
    pass
"#;
        let analysis = analyze(source);
        let names: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["charge", "refresh"]);

        let charge = &analysis.functions[0];
        assert_eq!(charge.return_type.as_deref(), Some("Dict[str, Any]"));
        let kinds: Vec<_> = charge.parameters.iter().map(|p| (p.name.as_str(), p.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("customer_id", ParameterKind::Positional),
                ("amount", ParameterKind::Positional),
                ("args", ParameterKind::VarPositional),
                ("currency", ParameterKind::KeywordOnly),
                ("force", ParameterKind::KeywordOnly),
                ("kwargs", ParameterKind::VarKeyword),
            ]
        );
        assert_eq!(charge.parameters[1].default.as_deref(), Some("0"));
        assert!(charge.parameters[1].optional);
        assert_eq!(charge.parameters[2].type_annotation, "Any");
        assert!(charge.parameters[2].optional);
        assert_eq!(charge.parameters[3].default.as_deref(), Some("\"usd\""));
        assert!(!charge.parameters[4].optional);
        assert_eq!(charge.parameters[5].type_annotation, "Dict[str, Any]");

        let refresh = &analysis.functions[1];
        assert!(refresh.is_async);
        assert_eq!(refresh.parameters[0].type_annotation, "List[str]");
        assert_eq!(refresh.parameters[0].default.as_deref(), Some("[]"));
        assert_eq!(refresh.parameters[1].default.as_deref(), Some("{}"));
        assert_eq!(refresh.parameters[2].default.as_deref(), Some("..."));
    }

    #[test]
    fn test_classes_methods_attributes() {
        let source = r#"
class Invoice(BaseModel, Serializable):
    total: int
    _secret: str

    def __init__(self, total):
        self.total = total
        self.currency = "usd"
        self._cache = {}

    @property
    def amount(self) -> int:
        return self.total

    @classmethod
    def build(cls, raw: dict):
        return cls(raw["total"])

    def _helper(self):
        pass
"#;
        let analysis = analyze(source);
        let class = &analysis.classes[0];
        assert_eq!(class.name, "Invoice");
        assert_eq!(class.extends.as_deref(), Some("BaseModel"));
        assert_eq!(class.implements, vec!["Serializable"]);

        let methods: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["amount", "build"]);
        assert!(class.methods[0].parameters.is_empty());
        assert_eq!(class.methods[1].parameters[0].name, "raw");

        let attrs: Vec<_> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["total", "currency"]);
        assert_eq!(class.attributes[0].type_annotation.as_deref(), Some("int"));
    }

    #[test]
    fn test_exports_and_calls() {
        let source = r#"
__all__ = ["publish"]

def publish(client):
    client.send("topic", payload=1)
    log("sent")

def helper():
    pass
"#;
        let analysis = analyze(source);
        assert_eq!(analysis.exports, vec!["publish"]);
        assert!(analysis.functions.iter().find(|f| f.name == "publish").unwrap().is_exported);
        assert!(!analysis.functions.iter().find(|f| f.name == "helper").unwrap().is_exported);

        let send = analysis.calls.iter().find(|c| c.callee_name == "send").unwrap();
        assert_eq!(send.receiver_name.as_deref(), Some("client"));
        assert_eq!(send.args, vec!["\"topic\"", "payload=1"]);
        assert_eq!(send.line, 5);
        assert!(analysis.calls.iter().any(|c| c.callee_name == "log" && c.receiver_name.is_none()));
    }

    #[test]
    fn test_exports_default_to_public_names() {
        let analysis = analyze("VERSION = 1\n_hidden = 2\n\ndef run():\n    pass\n");
        assert_eq!(analysis.exports, vec!["VERSION", "run"]);
    }

    #[test]
    fn test_syntax_errors_are_recorded() {
        let analysis = analyze("def broken(:\n    pass\n\ndef fine():\n    pass\n");
        assert!(analysis.has_errors());
        assert_eq!(analysis.language(), Language::Python);
        assert_eq!(analysis.module_name, "services.billing");
    }

    #[test]
    fn test_canonical_annotation() {
        assert_eq!(canonical_annotation("Dict[ str ,Any ]"), "Dict[str, Any]");
        assert_eq!(canonical_annotation("int|None"), "int | None");
    }
}
