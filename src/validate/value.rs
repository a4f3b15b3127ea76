//! Call-site argument values and their textual extraction.
//!
//! RPC arguments in analyzed code are untyped literals or identifiers. They
//! are represented as a tagged [`ParamValue`] so every check matches on the
//! variant explicitly instead of guessing at runtime.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::ParamType;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static TIMESTAMP_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z?$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z?$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?[+-]\d{2}:\d{2}$",
        r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static RPC_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\.rpc\s*\(\s*['"`]([A-Za-z_][\w.]*)['"`]"#).unwrap());

static FROM_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:([A-Za-z_$][\w$]*)\s*)?\.from\s*\(\s*['"`]([A-Za-z_][\w.-]*)['"`]\s*\)"#)
        .unwrap()
});

static KEY_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]?(\w+)['"]?\s*:\s*([^,}\n]+)"#).unwrap());

/// Receivers whose `.from(...)` is not a table access.
const NON_TABLE_RECEIVERS: &[&str] = &[
    "Array", "Buffer", "Object", "Set", "Map", "Promise", "Observable", "Rx", "Uint8Array",
    "String", "Int32Array", "Float32Array", "Stream", "Readable",
];

/// Prefix marking a bareword identifier during object-literal conversion.
const VARIABLE_SENTINEL: &str = "\u{0}var:";

/// A value supplied for one parameter at a call site.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Bool(bool),
    /// Objects, arrays, and any other structured literal.
    Json(Value),
    /// An identifier or expression whose runtime value is unknown.
    UnresolvedVariable(String),
}

impl ParamValue {
    /// Build a value from a decoded JSON literal.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => match s.strip_prefix(VARIABLE_SENTINEL) {
                Some(name) => ParamValue::UnresolvedVariable(name.to_string()),
                None => ParamValue::String(s),
            },
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Json(Value::Number(n)),
            },
            other => ParamValue::Json(other),
        }
    }

    /// Build a value from a raw source fragment (used by the regex fallback).
    pub fn from_source(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = strip_quotes(raw) {
            return ParamValue::String(inner.to_string());
        }
        match raw {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            "null" | "undefined" => return ParamValue::Json(Value::Null),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if raw.starts_with('{') || raw.starts_with('[') {
            if let Ok(v) = serde_json::from_str::<Value>(raw) {
                return ParamValue::Json(v);
            }
        }
        if is_expression_start(raw) {
            return ParamValue::UnresolvedVariable(raw.to_string());
        }
        ParamValue::String(raw.to_string())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, ParamValue::UnresolvedVariable(_))
    }

    /// Stringified form used for enum membership and messages.
    pub fn display(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Json(v) => v.to_string(),
            ParamValue::UnresolvedVariable(name) => name.clone(),
        }
    }

    /// Whether an unresolved variable's name suggests it holds an identifier.
    ///
    /// `userId`, `user_id`, `post.id` and `uuid` qualify; `valid` does not.
    pub fn looks_like_identifier(&self) -> bool {
        let ParamValue::UnresolvedVariable(expr) = self else {
            return false;
        };
        let last = expr
            .rsplit(['.', '?'])
            .find(|s| !s.is_empty())
            .unwrap_or(expr)
            .trim_end_matches("()");
        let lower = last.to_lowercase();
        lower == "id"
            || lower.contains("uuid")
            || lower.ends_with("_id")
            || last.ends_with("Id")
            || last.ends_with("ID")
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Whether a nested JSON value stands for an unresolved variable.
pub fn is_variable_marker(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.starts_with(VARIABLE_SENTINEL))
}

/// Parameters provided at one call site, keyed by name.
pub type ProvidedParams = BTreeMap<String, ParamValue>;

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub fn is_uuid_str(s: &str) -> bool {
    UUID_RE.is_match(s)
}

pub fn is_timestamp_str(s: &str) -> bool {
    TIMESTAMP_RES.iter().any(|re| re.is_match(s))
}

/// UUID check. Identifier-like variables count as placeholder UUIDs.
pub fn is_valid_uuid(value: &ParamValue) -> bool {
    match value {
        ParamValue::String(s) => is_uuid_str(s),
        v @ ParamValue::UnresolvedVariable(_) => v.looks_like_identifier(),
        _ => false,
    }
}

pub fn is_valid_integer(value: &ParamValue) -> bool {
    match value {
        ParamValue::Int(_) => true,
        ParamValue::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

pub fn is_valid_boolean(value: &ParamValue) -> bool {
    match value {
        ParamValue::Bool(_) => true,
        ParamValue::String(s) => {
            matches!(s.to_lowercase().as_str(), "true" | "false" | "0" | "1")
        }
        _ => false,
    }
}

pub fn is_valid_timestamp(value: &ParamValue) -> bool {
    match value {
        ParamValue::String(s) => is_timestamp_str(s),
        _ => false,
    }
}

/// Object or array, either literal or as a JSON-encoded string.
pub fn is_valid_json_structure(value: &ParamValue) -> bool {
    match value {
        ParamValue::Json(v) => v.is_object() || v.is_array(),
        ParamValue::String(s) => serde_json::from_str::<Value>(s)
            .map(|v| v.is_object() || v.is_array())
            .unwrap_or(false),
        _ => false,
    }
}

/// Infer a type for diagnostic display only.
pub fn infer_type(value: &ParamValue) -> ParamType {
    match value {
        ParamValue::Bool(_) => ParamType::Boolean,
        ParamValue::Int(_) => ParamType::Integer,
        ParamValue::String(s) if is_uuid_str(s) => ParamType::Uuid,
        ParamValue::String(s) if is_timestamp_str(s) => ParamType::Timestamp,
        ParamValue::String(_) => ParamType::String,
        ParamValue::Json(v) if v.is_object() || v.is_array() => ParamType::Json,
        ParamValue::Json(v) if v.is_number() => ParamType::Numeric,
        ParamValue::Json(_) => ParamType::String,
        v @ ParamValue::UnresolvedVariable(_) if v.looks_like_identifier() => ParamType::Uuid,
        ParamValue::UnresolvedVariable(_) => ParamType::String,
    }
}

// ---------------------------------------------------------------------------
// Call-site extraction
// ---------------------------------------------------------------------------

/// One `.rpc('name', args)` call found in source text.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCallSite {
    pub function_name: String,
    /// Raw text of the argument expression, if any.
    pub args_text: Option<String>,
    pub line: usize,
}

impl RpcCallSite {
    /// Parameters supplied at this site; never fails.
    pub fn parameters(&self) -> ProvidedParams {
        self.args_text
            .as_deref()
            .map(parse_object_literal)
            .unwrap_or_default()
    }
}

/// One `.from('table')` access found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub receiver: Option<String>,
    pub line: usize,
}

/// 1-based line of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}

/// Find every `.rpc(...)` call in a file.
pub fn find_rpc_calls(source: &str) -> Vec<RpcCallSite> {
    RPC_CALL_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_string();
            let rest = &source[whole.end()..];
            let trimmed = rest.trim_start();
            let args_text = trimmed
                .strip_prefix(',')
                .and_then(|after| take_expression(after.trim_start()))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Some(RpcCallSite {
                function_name: name,
                args_text,
                line: line_of(source, whole.start()),
            })
        })
        .collect()
}

/// Find every `.from('table')` access, skipping well-known non-table receivers.
pub fn find_table_refs(source: &str) -> Vec<TableRef> {
    FROM_CALL_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let receiver = caps.get(1).map(|m| m.as_str().to_string());
            if receiver
                .as_deref()
                .is_some_and(|r| NON_TABLE_RECEIVERS.contains(&r))
            {
                return None;
            }
            let table = caps.get(2)?;
            Some(TableRef {
                table: table.as_str().to_string(),
                receiver,
                line: line_of(source, table.start()),
            })
        })
        .collect()
}

/// Extract the parameters passed to `function_name` near `line`.
///
/// Picks the call on `line` when there is one, otherwise the first call to
/// that function. Returns an empty set when nothing can be recovered.
pub fn parse_rpc_parameters(source: &str, function_name: &str, line: usize) -> ProvidedParams {
    let calls: Vec<RpcCallSite> = find_rpc_calls(source)
        .into_iter()
        .filter(|c| c.function_name == function_name)
        .collect();
    calls
        .iter()
        .find(|c| c.line == line)
        .or_else(|| calls.first())
        .map(RpcCallSite::parameters)
        .unwrap_or_default()
}

/// Best-effort decode of an object literal such as `{ user_id: id, range: '7d' }`.
///
/// Bareword keys are quoted and identifier values become
/// [`ParamValue::UnresolvedVariable`]. When the literal cannot be converted a
/// `key: value` regex pass is used instead; the result is empty, never an error.
pub fn parse_object_literal(text: &str) -> ProvidedParams {
    let text = text.trim();
    let Some(rest) = text.strip_prefix('{') else {
        return ProvidedParams::new();
    };

    if let Some(json) = literal_to_json(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&json) {
            return map
                .into_iter()
                .map(|(k, v)| (k, ParamValue::from_json(v)))
                .collect();
        }
    }

    // Only scan the first nesting level of the literal.
    let inner = rest.strip_suffix('}').unwrap_or(rest);
    KEY_VALUE_RE
        .captures_iter(inner)
        .map(|caps| (caps[1].to_string(), ParamValue::from_source(&caps[2])))
        .collect()
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && matches!(first, b'\'' | b'"' | b'`') {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}

fn is_expression_start(raw: &str) -> bool {
    raw.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
}

/// Take one expression up to the first top-level `,` or closing bracket.
fn take_expression(text: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                skip_string(&mut chars, c);
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    return Some(&text[..i]);
                }
                depth -= 1;
            }
            ',' if depth == 0 => return Some(&text[..i]),
            _ => {}
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn skip_string<I: Iterator<Item = (usize, char)>>(chars: &mut I, quote: char) -> String {
    let mut out = String::new();
    let mut escaped = false;
    for (_, c) in chars.by_ref() {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            break;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq)]
enum Frame {
    Object { expect_key: bool },
    Array,
}

/// Convert a JavaScript object literal into JSON text.
fn literal_to_json(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + 16);
    let mut stack: Vec<Frame> = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' if text[i..].starts_with("//") => {
                while let Some((_, c)) = chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if text[i..].starts_with("/*") => {
                let end = text[i + 2..].find("*/")? + i + 4;
                while chars.peek().is_some_and(|&(j, _)| j < end) {
                    chars.next();
                }
            }
            '{' => {
                chars.next();
                out.push('{');
                stack.push(Frame::Object { expect_key: true });
            }
            '[' => {
                chars.next();
                out.push('[');
                stack.push(Frame::Array);
            }
            '}' | ']' => {
                chars.next();
                trim_trailing_comma(&mut out);
                out.push(c);
                stack.pop()?;
                if stack.is_empty() {
                    break;
                }
            }
            ',' => {
                chars.next();
                out.push(',');
                if let Some(Frame::Object { expect_key }) = stack.last_mut() {
                    *expect_key = true;
                }
            }
            ':' => {
                chars.next();
                out.push(':');
                if let Some(Frame::Object { expect_key }) = stack.last_mut() {
                    *expect_key = false;
                }
            }
            '\'' | '"' | '`' => {
                chars.next();
                let s = skip_string(&mut chars, c);
                if c == '`' && s.contains("${") {
                    out.push_str(&serde_json::to_string(&format!("{VARIABLE_SENTINEL}`{s}`")).ok()?);
                } else {
                    out.push_str(&serde_json::to_string(&s).ok()?);
                }
            }
            '.' if text[i..].starts_with("...") => {
                // Spread entries cannot be resolved; skip to the next entry.
                let rest = take_expression(&text[i..]).unwrap_or("");
                let end = i + rest.len();
                while chars.peek().is_some_and(|&(j, _)| j < end) {
                    chars.next();
                }
                if chars.peek().is_some_and(|&(_, c)| c == ',') {
                    chars.next();
                }
            }
            _ => {
                let expect_key = matches!(stack.last(), Some(Frame::Object { expect_key: true }));
                if expect_key {
                    let start = i;
                    while chars
                        .peek()
                        .is_some_and(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '$')
                    {
                        chars.next();
                    }
                    let end = chars.peek().map(|&(j, _)| j).unwrap_or(text.len());
                    let key = &text[start..end];
                    if key.is_empty() {
                        return None;
                    }
                    out.push_str(&serde_json::to_string(key).ok()?);

                    // Shorthand `{ userId }` binds a variable of the same name.
                    let next = text[end..].trim_start().chars().next();
                    if matches!(next, Some(',') | Some('}')) {
                        out.push(':');
                        out.push_str(
                            &serde_json::to_string(&format!("{VARIABLE_SENTINEL}{key}")).ok()?,
                        );
                    }
                } else {
                    let expr = take_expression(&text[i..])?;
                    let end = i + expr.len();
                    while chars.peek().is_some_and(|&(j, _)| j < end) {
                        chars.next();
                    }
                    out.push_str(&value_token(expr.trim())?);
                }
            }
        }
    }

    if stack.is_empty() {
        Some(out)
    } else {
        None
    }
}

fn value_token(expr: &str) -> Option<String> {
    match expr {
        "true" | "false" | "null" => return Some(expr.to_string()),
        "undefined" => return Some("null".to_string()),
        _ => {}
    }
    let numeric = expr.replace('_', "");
    let starts_numeric = numeric
        .trim_start_matches('-')
        .starts_with(|c: char| c.is_ascii_digit());
    if starts_numeric && numeric.parse::<f64>().is_ok() {
        return Some(numeric);
    }
    if expr.is_empty() {
        return None;
    }
    serde_json::to_string(&format!("{VARIABLE_SENTINEL}{expr}")).ok()
}

fn trim_trailing_comma(out: &mut String) {
    while out.ends_with(char::is_whitespace) {
        out.pop();
    }
    if out.ends_with(',') {
        out.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_predicate() {
        assert!(is_valid_uuid(&ParamValue::String(
            "123e4567-e89b-12d3-a456-426614174000".into()
        )));
        assert!(!is_valid_uuid(&ParamValue::String("not-a-uuid".into())));
        assert!(!is_valid_uuid(&ParamValue::Int(5)));
    }

    #[test]
    fn test_boolean_predicate() {
        assert!(is_valid_boolean(&ParamValue::Bool(true)));
        assert!(is_valid_boolean(&ParamValue::String("true".into())));
        assert!(is_valid_boolean(&ParamValue::String("1".into())));
        assert!(!is_valid_boolean(&ParamValue::String("maybe".into())));
    }

    #[test]
    fn test_integer_and_timestamp_predicates() {
        assert!(is_valid_integer(&ParamValue::String("42".into())));
        assert!(!is_valid_integer(&ParamValue::String("4.2".into())));
        assert!(is_valid_timestamp(&ParamValue::String("2024-01-01T00:00:00Z".into())));
        assert!(is_valid_timestamp(&ParamValue::String("2024-01-01 10:00:00".into())));
        assert!(!is_valid_timestamp(&ParamValue::String("yesterday".into())));
    }

    #[test]
    fn test_json_structure_predicate() {
        assert!(is_valid_json_structure(&ParamValue::Json(serde_json::json!({"a": 1}))));
        assert!(is_valid_json_structure(&ParamValue::String("[1,2]".into())));
        assert!(!is_valid_json_structure(&ParamValue::String("not-json".into())));
        assert!(!is_valid_json_structure(&ParamValue::String("12".into())));
    }

    #[test]
    fn test_identifier_like_variables() {
        let v = |s: &str| ParamValue::UnresolvedVariable(s.to_string());
        assert!(v("userId").looks_like_identifier());
        assert!(v("user.id").looks_like_identifier());
        assert!(v("profile_id").looks_like_identifier());
        assert!(!v("valid").looks_like_identifier());
        assert!(!v("range").looks_like_identifier());
    }

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type(&ParamValue::Bool(false)), ParamType::Boolean);
        assert_eq!(infer_type(&ParamValue::Int(3)), ParamType::Integer);
        assert_eq!(
            infer_type(&ParamValue::String("123e4567-e89b-12d3-a456-426614174000".into())),
            ParamType::Uuid
        );
        assert_eq!(infer_type(&ParamValue::Json(serde_json::json!([]))), ParamType::Json);
    }

    #[test]
    fn test_parse_object_literal_mixed() {
        let params = parse_object_literal(
            "{ user_id: user.id, range: '30d', limit: 10, active: true, meta: { a: 1 }, }",
        );
        assert_eq!(
            params.get("user_id"),
            Some(&ParamValue::UnresolvedVariable("user.id".into()))
        );
        assert_eq!(params.get("range"), Some(&ParamValue::String("30d".into())));
        assert_eq!(params.get("limit"), Some(&ParamValue::Int(10)));
        assert_eq!(params.get("active"), Some(&ParamValue::Bool(true)));
        assert!(matches!(params.get("meta"), Some(ParamValue::Json(_))));
    }

    #[test]
    fn test_parse_object_literal_shorthand_and_calls() {
        let params = parse_object_literal("{ userId, since: new Date().toISOString(), ...rest }");
        assert_eq!(
            params.get("userId"),
            Some(&ParamValue::UnresolvedVariable("userId".into()))
        );
        assert!(params.get("since").unwrap().is_variable());
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_object_literal_never_fails() {
        assert!(parse_object_literal("{ broken: ").is_empty());
        assert!(parse_object_literal("params").is_empty());
        assert!(parse_object_literal("").is_empty());
        assert!(parse_object_literal("{").is_empty());
        assert!(parse_object_literal("{ }").is_empty());
    }

    #[test]
    fn test_parse_object_literal_unterminated_multibyte() {
        let params = parse_object_literal("{ name: café");
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("name"));

        let params = parse_object_literal("{ city: 'Zürich', code: ü");
        assert!(params.contains_key("city"));
    }

    #[test]
    fn test_find_rpc_calls() {
        let source = "const a = 1;\nconst { data } = await supabase.rpc('get_stats', {\n  user_id: id,\n  range: \"7d\"\n});\nawait supabase.rpc(\"ping\");\n";
        let calls = find_rpc_calls(source);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function_name, "get_stats");
        assert_eq!(calls[0].line, 2);
        assert_eq!(calls[0].parameters().len(), 2);
        assert_eq!(calls[1].args_text, None);
        assert!(calls[1].parameters().is_empty());

        let params = parse_rpc_parameters(source, "get_stats", 2);
        assert_eq!(params.get("range"), Some(&ParamValue::String("7d".into())));
    }

    #[test]
    fn test_find_rpc_calls_truncated_at_eof() {
        let calls = find_rpc_calls("await supabase.rpc('get_stats', {");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args_text.as_deref(), Some("{"));
        assert!(calls[0].parameters().is_empty());
    }

    #[test]
    fn test_find_table_refs_skips_array_from() {
        let source = "supabase.from('profiles').select('*')\nArray.from('abc')\nclient\n  .from(\"posts\")";
        let refs = find_table_refs(source);
        let tables: Vec<_> = refs.iter().map(|r| (r.table.as_str(), r.line)).collect();
        assert_eq!(tables, vec![("profiles", 1), ("posts", 4)]);
    }
}
