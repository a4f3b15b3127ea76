//! Signature and type-consistency checks over one script file.
//!
//! Extraction is line-oriented: declarations and usages are recovered with
//! patterns, which is enough to check that referenced type names exist and
//! that calls to locally declared functions respect their arity.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::text::{balanced_inner, count_word, is_comment_line, is_inside_string_literal, split_args, split_top_level};
use super::types::{DetectionKind, Severity};
use super::value::line_of;

/// Built-in, DOM and framework types that never need a local declaration.
const BUILTIN_TYPES: &[&str] = &[
    "Object", "Array", "ReadonlyArray", "Promise", "PromiseLike", "Date", "RegExp", "Error",
    "Map", "Set", "WeakMap", "WeakSet", "Function", "CallableFunction", "NewableFunction",
    "Symbol", "Number", "String", "Boolean", "BigInt", "JSON", "Math", "Iterable", "Iterator",
    "AsyncIterable", "Generator", "AsyncGenerator", "ArrayBuffer", "Uint8Array", "Blob", "File",
    "FormData", "Headers", "Request", "Response", "URL", "URLSearchParams", "AbortSignal",
    "ReactNode", "ReactElement", "ReactChild", "ReactChildren", "ReactFragment", "ReactPortal",
    "ComponentType", "FunctionComponent", "FC", "Component", "PureComponent", "RefObject",
    "MutableRefObject", "Ref", "ForwardedRef", "CSSProperties", "PropsWithChildren",
    "ComponentProps", "ComponentPropsWithoutRef", "Dispatch", "SetStateAction", "Context",
    "ChangeEvent", "FormEvent", "MouseEvent", "KeyboardEvent", "FocusEvent", "SyntheticEvent",
    "Event", "HTMLElement", "HTMLDivElement", "HTMLInputElement", "HTMLButtonElement",
    "HTMLFormElement", "HTMLTextAreaElement", "HTMLSelectElement", "HTMLAnchorElement",
    "Element", "Node", "Window", "Document", "Partial", "Required", "Readonly", "Record", "Pick",
    "Omit", "Exclude", "Extract", "NonNullable", "ReturnType", "Parameters", "Awaited",
    "InstanceType", "NextPage", "NextApiRequest", "NextApiResponse", "GetServerSideProps",
    "GetStaticProps", "GetStaticPaths", "AppProps", "Metadata",
];

/// Namespaces whose members are accepted without further checks.
const BUILTIN_NAMESPACES: &[&str] = &["React", "JSX", "NodeJS", "Express", "Next"];

const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "await", "new",
    "super", "import", "require", "constructor",
];

lazy_static! {
    static ref FUNCTION_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(<[^>(]*>)?\s*\("
    ).unwrap();

    static ref ARROW_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(async\s+)?(<[^>(]*>\s*)?\("
    ).unwrap();

    static ref INTERFACE_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)\s*(<[^{]*>)?"
    ).unwrap();

    static ref TYPE_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)\s*(<[^=]*>)?\s*="
    ).unwrap();

    static ref OTHER_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:const\s+)?(?:class|enum|namespace)\s+([A-Za-z_$][\w$]*)"
    ).unwrap();

    static ref VALUE_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)"
    ).unwrap();

    static ref IMPORT_CLAUSE: Regex = Regex::new(
        r#"(?ms)^[ \t]*import\s+(?:type\s+)?(.+?)\s+from\s+['"][^'"]+['"]"#
    ).unwrap();

    static ref TYPE_USAGE: Regex = Regex::new(
        r"(?:\)\s*:|[\w$?\]}]\s*:|\bas\s|\bextends\s|\bimplements\s|\bkeyof\s|[\w$]<|[^|]\|)\s*([A-Z][\w$]*(?:\.[A-Za-z_$][\w$]*)?)"
    ).unwrap();

    static ref CALL_SITE: Regex = Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap();

    static ref EXPORT_LIST: Regex = Regex::new(r"(?m)^[ \t]*export\s*\{([^}]*)\}").unwrap();
}

/// What a signature check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureIssueKind {
    TypeNotDefined,
    MissingArguments,
    TooManyArguments,
    UnusedType,
    UnusedFunction,
    UnusedComponent,
}

impl SignatureIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureIssueKind::TypeNotDefined => "TYPE_NOT_DEFINED",
            SignatureIssueKind::MissingArguments => "MISSING_ARGUMENTS",
            SignatureIssueKind::TooManyArguments => "TOO_MANY_ARGUMENTS",
            SignatureIssueKind::UnusedType => "UNUSED_TYPE",
            SignatureIssueKind::UnusedFunction => "UNUSED_FUNCTION",
            SignatureIssueKind::UnusedComponent => "UNUSED_COMPONENT",
        }
    }

    pub fn detection_kind(&self) -> DetectionKind {
        match self {
            SignatureIssueKind::TypeNotDefined => DetectionKind::InvalidType,
            SignatureIssueKind::MissingArguments | SignatureIssueKind::TooManyArguments => {
                DetectionKind::IncorrectSignature
            }
            SignatureIssueKind::UnusedType
            | SignatureIssueKind::UnusedFunction
            | SignatureIssueKind::UnusedComponent => DetectionKind::BadPractice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureIssue {
    pub kind: SignatureIssueKind,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub suggestion: Option<String>,
}

/// One declared parameter of a local function.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredParam {
    pub name: String,
    pub type_annotation: Option<String>,
    pub optional: bool,
    pub rest: bool,
}

/// A function or component declared in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredFunction {
    pub name: String,
    pub params: Vec<DeclaredParam>,
    pub generics: Vec<String>,
    pub exported: bool,
    pub line: usize,
}

impl DeclaredFunction {
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional && !p.rest).count()
    }

    /// `None` when a rest parameter accepts any number of arguments.
    pub fn max_count(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.rest) {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn is_component(&self) -> bool {
        self.name.starts_with(|c: char| c.is_ascii_uppercase())
    }

    pub fn is_hook(&self) -> bool {
        self.name.len() > 3
            && self.name.starts_with("use")
            && self.name[3..].starts_with(|c: char| c.is_ascii_uppercase())
    }

    /// Human-readable signature used in suggestions.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let mut s = String::new();
                if p.rest {
                    s.push_str("...");
                }
                s.push_str(&p.name);
                if p.optional && !p.rest {
                    s.push('?');
                }
                if let Some(t) = &p.type_annotation {
                    s.push_str(": ");
                    s.push_str(t);
                }
                s
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DeclaredType {
    name: String,
    exported: bool,
    line: usize,
}

/// Declarations and usages recovered from one file.
#[derive(Debug, Default)]
struct FileFacts {
    functions: BTreeMap<String, DeclaredFunction>,
    types: BTreeMap<String, DeclaredType>,
    /// Every name bound in the file: declarations, imports, generics.
    known: HashSet<String>,
    exported: HashSet<String>,
    /// Referenced type names with their first line.
    type_usages: BTreeMap<String, usize>,
    calls: Vec<(String, usize, usize)>,
}

/// Cross-references declarations and usages within one script file.
#[derive(Debug, Default, Clone)]
pub struct SignatureValidator {
    report_unused: bool,
}

impl SignatureValidator {
    pub fn new() -> Self {
        Self { report_unused: true }
    }

    /// Skip the LOW-severity "declared but never used" findings.
    pub fn without_unused_checks(mut self) -> Self {
        self.report_unused = false;
        self
    }

    pub fn validate(&self, content: &str) -> Vec<SignatureIssue> {
        let facts = extract(content);
        let mut issues = Vec::new();

        check_type_usages(&facts, &mut issues);
        check_call_arity(&facts, &mut issues);
        if self.report_unused {
            check_unused(&facts, content, &mut issues);
        }

        issues.sort_by_key(|i| i.line);
        issues
    }

    /// Declared functions, exposed for the orchestrator's component checks.
    pub fn declared_functions(&self, content: &str) -> Vec<DeclaredFunction> {
        extract(content).functions.into_values().collect()
    }
}

fn extract(content: &str) -> FileFacts {
    let mut facts = FileFacts::default();

    for caps in IMPORT_CLAUSE.captures_iter(content) {
        for name in imported_names(&caps[1]) {
            facts.known.insert(name);
        }
    }

    for caps in FUNCTION_DECL.captures_iter(content) {
        let open = caps.get(0).map(|m| m.end() - 1).unwrap_or(0);
        let exported = caps.get(1).is_some();
        let generics = caps.get(5).map(|m| parse_generics(m.as_str())).unwrap_or_default();
        let line = line_of(content, caps.get(4).map(|m| m.start()).unwrap_or(0));
        if let Some(inner) = balanced_inner(content, open) {
            record_function(&mut facts, &caps[4], inner, generics, exported, line);
        }
    }

    for caps in ARROW_DECL.captures_iter(content) {
        let open = caps.get(0).map(|m| m.end() - 1).unwrap_or(0);
        let Some(inner) = balanced_inner(content, open) else {
            continue;
        };
        // `const x = (a + b) * c` is not a function.
        let after = content[open + inner.len() + 2..].trim_start();
        if !(after.starts_with("=>") || after.starts_with(':')) {
            continue;
        }
        let generics = caps.get(4).map(|m| parse_generics(m.as_str())).unwrap_or_default();
        let line = line_of(content, caps.get(2).map(|m| m.start()).unwrap_or(0));
        record_function(&mut facts, &caps[2], inner, generics, caps.get(1).is_some(), line);
    }

    for re in [&*INTERFACE_DECL, &*TYPE_DECL] {
        for caps in re.captures_iter(content) {
            let Some(name) = caps.get(2) else { continue };
            let line = line_of(content, name.start());
            if let Some(g) = caps.get(3) {
                facts.known.extend(parse_generics(g.as_str()));
            }
            let exported = caps.get(1).is_some();
            facts.types.entry(name.as_str().to_string()).or_insert(DeclaredType {
                name: name.as_str().to_string(),
                exported,
                line,
            });
            facts.known.insert(name.as_str().to_string());
            if exported {
                facts.exported.insert(name.as_str().to_string());
            }
        }
    }

    for re in [&*OTHER_DECL, &*VALUE_DECL] {
        for caps in re.captures_iter(content) {
            facts.known.insert(caps[1].to_string());
        }
    }

    for caps in EXPORT_LIST.captures_iter(content) {
        for item in caps[1].split(',') {
            let local = item.split_whitespace().next().unwrap_or("");
            if !local.is_empty() {
                facts.exported.insert(local.to_string());
            }
        }
    }
    for line in content.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("export default ") {
            let name = rest.trim().trim_end_matches(';');
            if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
                facts.exported.insert(name.to_string());
            }
        }
    }

    let mut offset = 0;
    for (idx, raw) in content.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let line_start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        if is_comment_line(line) || line.trim_start().starts_with("import ") {
            continue;
        }

        for caps in TYPE_USAGE.captures_iter(line) {
            let Some(m) = caps.get(1) else { continue };
            if is_inside_string_literal(line, m.start()) {
                continue;
            }
            facts
                .type_usages
                .entry(m.as_str().to_string())
                .or_insert(line_no);
        }

        for caps in CALL_SITE.captures_iter(line) {
            let Some(name) = caps.get(1) else { continue };
            if CALL_KEYWORDS.contains(&name.as_str())
                || is_inside_string_literal(line, name.start())
                || line[..name.start()].ends_with('.')
                || line[..name.start()].trim_end().ends_with("function")
            {
                continue;
            }
            let open = line_start + caps.get(0).map(|m| m.end() - 1).unwrap_or(0);
            let Some(inner) = balanced_inner(content, open) else {
                continue;
            };
            // A method or function definition, not a call.
            let after = content[open + inner.len() + 2..].trim_start();
            if after.starts_with('{') || after.starts_with("=>") || after.starts_with(':') {
                continue;
            }
            facts
                .calls
                .push((name.as_str().to_string(), split_args(inner).len(), line_no));
        }
    }

    facts
}

fn record_function(
    facts: &mut FileFacts,
    name: &str,
    params: &str,
    generics: Vec<String>,
    exported: bool,
    line: usize,
) {
    facts.known.insert(name.to_string());
    facts.known.extend(generics.iter().cloned());
    if exported {
        facts.exported.insert(name.to_string());
    }
    let params = parse_params(params);
    for p in &params {
        facts.known.insert(p.name.clone());
    }
    facts.functions.entry(name.to_string()).or_insert(DeclaredFunction {
        name: name.to_string(),
        params,
        generics,
        exported,
        line,
    });
}

fn parse_params(text: &str) -> Vec<DeclaredParam> {
    split_top_level(text)
        .into_iter()
        .map(|part| {
            let (rest, part) = match part.strip_prefix("...") {
                Some(p) => (true, p.trim()),
                None => (false, part),
            };
            let (binding, default) = split_default(part);
            let (name_part, type_part) = split_annotation(binding);
            let optional = name_part.ends_with('?') || default.is_some();
            DeclaredParam {
                name: name_part.trim_end_matches('?').trim().to_string(),
                type_annotation: type_part.map(|t| t.trim().to_string()),
                optional,
                rest,
            }
        })
        .collect()
}

/// Split `name: T = value` at the top-level `=`, ignoring `=>`.
fn split_default(part: &str) -> (&str, Option<&str>) {
    let bytes = part.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            b'=' if depth == 0 && bytes.get(i + 1) != Some(&b'>') => {
                return (part[..i].trim(), Some(part[i + 1..].trim()));
            }
            _ => {}
        }
    }
    (part.trim(), None)
}

/// Split `name: Type` at the top-level colon.
fn split_annotation(binding: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (i, ch) in binding.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ':' if depth == 0 => return (binding[..i].trim(), Some(&binding[i + 1..])),
            _ => {}
        }
    }
    (binding.trim(), None)
}

fn parse_generics(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('<').trim_end_matches('>');
    split_top_level(inner)
        .into_iter()
        .filter_map(|g| g.split_whitespace().next())
        .map(|g| g.trim_end_matches(',').to_string())
        .filter(|g| !g.is_empty())
        .collect()
}

/// Local names bound by an import clause (`React, { useState as s }`, `* as ns`).
fn imported_names(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = clause.trim();

    if let Some(open) = rest.find('{') {
        if let Some(inner) = balanced_inner(rest, open) {
            for item in inner.split(',') {
                let item = item.trim().trim_start_matches("type ").trim();
                let local = item.rsplit(" as ").next().unwrap_or(item).trim();
                if !local.is_empty() {
                    names.push(local.to_string());
                }
            }
        }
        rest = rest[..open].trim().trim_end_matches(',');
    }
    for part in rest.split(',') {
        let part = part.trim();
        let local = part.strip_prefix("* as ").unwrap_or(part).trim();
        if !local.is_empty() {
            names.push(local.to_string());
        }
    }
    names
}

fn is_known_type(facts: &FileFacts, name: &str) -> bool {
    if let Some((ns, _)) = name.split_once('.') {
        return BUILTIN_NAMESPACES.contains(&ns) || facts.known.contains(ns);
    }
    BUILTIN_TYPES.contains(&name) || facts.known.contains(name) || facts.types.contains_key(name)
}

fn check_type_usages(facts: &FileFacts, issues: &mut Vec<SignatureIssue>) {
    for (name, &line) in &facts.type_usages {
        if is_known_type(facts, name) {
            continue;
        }
        issues.push(SignatureIssue {
            kind: SignatureIssueKind::TypeNotDefined,
            severity: Severity::High,
            message: format!("Type '{}' is used but not defined", name),
            line,
            expected: None,
            actual: Some(name.clone()),
            suggestion: Some(format!(
                "Define interface or type for '{}' or check import statements",
                name
            )),
        });
    }
}

fn check_call_arity(facts: &FileFacts, issues: &mut Vec<SignatureIssue>) {
    for (name, provided, line) in &facts.calls {
        let Some(decl) = facts.functions.get(name) else {
            continue;
        };
        // Skip the declaration line itself.
        if decl.line == *line {
            continue;
        }
        let required = decl.required_count();
        if *provided < required {
            issues.push(SignatureIssue {
                kind: SignatureIssueKind::MissingArguments,
                severity: Severity::High,
                message: format!(
                    "Function '{}' expects at least {} arguments, got {}",
                    name, required, provided
                ),
                line: *line,
                expected: Some(format!("{}+ arguments", required)),
                actual: Some(format!("{} arguments", provided)),
                suggestion: Some(decl.signature()),
            });
        } else if let Some(max) = decl.max_count().filter(|max| provided > max) {
            issues.push(SignatureIssue {
                kind: SignatureIssueKind::TooManyArguments,
                severity: Severity::Medium,
                message: format!(
                    "Function '{}' expects at most {} arguments, got {}",
                    name, max, provided
                ),
                line: *line,
                expected: Some(format!("at most {} arguments", max)),
                actual: Some(format!("{} arguments", provided)),
                suggestion: Some(decl.signature()),
            });
        }
    }
}

fn check_unused(facts: &FileFacts, content: &str, issues: &mut Vec<SignatureIssue>) {
    for decl in facts.types.values() {
        if decl.exported || facts.exported.contains(&decl.name) {
            continue;
        }
        if count_word(content, &decl.name) <= 1 {
            issues.push(SignatureIssue {
                kind: SignatureIssueKind::UnusedType,
                severity: Severity::Low,
                message: format!("Type '{}' is defined but never used", decl.name),
                line: decl.line,
                expected: None,
                actual: None,
                suggestion: Some(
                    "Remove unused type definition or export it if it's meant to be used elsewhere"
                        .to_string(),
                ),
            });
        }
    }

    for decl in facts.functions.values() {
        if decl.exported || facts.exported.contains(&decl.name) {
            continue;
        }
        if count_word(content, &decl.name) > 1 {
            continue;
        }
        let (kind, what) = if decl.is_component() {
            (SignatureIssueKind::UnusedComponent, "Component")
        } else {
            (SignatureIssueKind::UnusedFunction, "Function")
        };
        issues.push(SignatureIssue {
            kind,
            severity: Severity::Low,
            message: format!("{} '{}' is defined but never used", what, decl.name),
            line: decl.line,
            expected: None,
            actual: None,
            suggestion: Some(
                "Remove it or export it if it's meant to be used elsewhere".to_string(),
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(issues: &[SignatureIssue]) -> Vec<SignatureIssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params("a: string, b?: number, c = 3, ...rest: string[]");
        assert_eq!(params.len(), 4);
        assert!(!params[0].optional);
        assert!(params[1].optional);
        assert!(params[2].optional);
        assert!(params[3].rest);
        assert_eq!(params[3].type_annotation.as_deref(), Some("string[]"));

        let destructured = parse_params("{ title, onClose }: ModalProps, cb: (x: number) => void");
        assert_eq!(destructured.len(), 2);
        assert_eq!(destructured[1].type_annotation.as_deref(), Some("(x: number) => void"));
    }

    #[test]
    fn test_imported_names() {
        let names = imported_names("React, { useState, type FC, useEffect as effect }");
        assert_eq!(names, vec!["useState", "FC", "effect", "React"]);
        assert_eq!(imported_names("* as utils"), vec!["utils"]);
    }

    #[test]
    fn test_call_arity() {
        let content = r#"
function formatPrice(amount: number, currency: string, locale?: string): string {
  return amount.toFixed(2) + currency;
}

export function Price() {
  const a = formatPrice(10);
  const b = formatPrice(10, "EUR", "fr", true);
  const c = formatPrice(10, "EUR");
  return a + b + c;
}
"#;
        let issues = SignatureValidator::new().validate(content);
        let arity: Vec<_> = issues
            .iter()
            .filter(|i| i.detection_kind_is(DetectionKind::IncorrectSignature))
            .collect();
        assert_eq!(arity.len(), 2);
        assert_eq!(arity[0].kind, SignatureIssueKind::MissingArguments);
        assert_eq!(arity[0].line, 7);
        assert_eq!(arity[1].kind, SignatureIssueKind::TooManyArguments);
        assert_eq!(
            arity[1].suggestion.as_deref(),
            Some("formatPrice(amount: number, currency: string, locale?: string)")
        );
    }

    #[test]
    fn test_call_arity_crlf() {
        let content = "// ééééé\r\n// ééééé\r\nfunction pair(a: number, b: number) {\r\n  return a + b;\r\n}\r\nexport const x = pair(1);\r\n";
        let issues = SignatureValidator::new().validate(content);
        let arity: Vec<_> = issues
            .iter()
            .filter(|i| i.detection_kind_is(DetectionKind::IncorrectSignature))
            .collect();
        assert_eq!(arity.len(), 1);
        assert_eq!(arity[0].kind, SignatureIssueKind::MissingArguments);
        assert_eq!(arity[0].line, 6);
    }

    #[test]
    fn test_rest_params_accept_any_count() {
        let content = "const log = (...parts: string[]) => parts.join(' ');\nexport const x = log('a', 'b', 'c', 'd');\n";
        let issues = SignatureValidator::new().validate(content);
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_undefined_type() {
        let content = r#"import { User } from './types';

interface CardProps {
  user: User;
  profile: UserProfile;
  onClick: (e: React.MouseEvent) => void;
}

export function Card({ user }: CardProps) {
  return null;
}
"#;
        let issues = SignatureValidator::new().validate(content);
        assert_eq!(kinds(&issues), vec![SignatureIssueKind::TypeNotDefined]);
        assert_eq!(issues[0].message, "Type 'UserProfile' is used but not defined");
        assert_eq!(issues[0].line, 5);
    }

    #[test]
    fn test_unused_declarations() {
        let content = r#"type Legacy = { id: string };
interface Used { id: string }

function helper(x: number) {
  return x * 2;
}

export const value: Used = { id: "1" };
"#;
        let issues = SignatureValidator::new().validate(content);
        assert_eq!(
            kinds(&issues),
            vec![SignatureIssueKind::UnusedType, SignatureIssueKind::UnusedFunction]
        );
        assert!(issues.iter().all(|i| i.severity == Severity::Low));

        let quiet = SignatureValidator::new().without_unused_checks().validate(content);
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_generics_are_known() {
        let content = "export function first<T>(items: T[]): T | undefined {\n  return items[0];\n}\n";
        assert!(SignatureValidator::new().validate(content).is_empty());
    }

    impl SignatureIssue {
        fn detection_kind_is(&self, kind: DetectionKind) -> bool {
            self.kind.detection_kind() == kind
        }
    }
}
