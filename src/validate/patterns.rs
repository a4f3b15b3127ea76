//! Anti-pattern detection over script text.
//!
//! Two tiers: a declarative rule table applied uniformly to the file text,
//! and a registered set of contextual rules that need a little structural
//! reasoning. Each contextual rule runs in isolation; an error in one is
//! logged and never suppresses the others.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use super::text::{balanced_inner, count_word, is_comment_line, is_inside_string_literal, split_args};
use super::types::{DetectionKind, Severity};
use super::value::line_of;
use crate::analysis::{catch_panic, Language};

/// Family a pattern rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternCategory {
    ImportInconsistency,
    HookViolation,
    PerformanceIssue,
    SecurityRisk,
    AntiPattern,
    MemoryLeak,
    TypeSafety,
    Accessibility,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::ImportInconsistency => "IMPORT_INCONSISTENCY",
            PatternCategory::HookViolation => "HOOK_VIOLATION",
            PatternCategory::PerformanceIssue => "PERFORMANCE_ISSUE",
            PatternCategory::SecurityRisk => "SECURITY_RISK",
            PatternCategory::AntiPattern => "ANTI_PATTERN",
            PatternCategory::MemoryLeak => "MEMORY_LEAK",
            PatternCategory::TypeSafety => "TYPE_SAFETY",
            PatternCategory::Accessibility => "ACCESSIBILITY",
        }
    }

    pub fn detection_kind(&self) -> DetectionKind {
        match self {
            PatternCategory::HookViolation => DetectionKind::IncorrectSignature,
            PatternCategory::TypeSafety => DetectionKind::InvalidType,
            PatternCategory::ImportInconsistency
            | PatternCategory::PerformanceIssue
            | PatternCategory::SecurityRisk
            | PatternCategory::AntiPattern
            | PatternCategory::MemoryLeak
            | PatternCategory::Accessibility => DetectionKind::BadPractice,
        }
    }
}

/// One pattern match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternFinding {
    pub rule: &'static str,
    pub category: PatternCategory,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub confidence: f64,
    pub suggestion: Option<String>,
    pub snippet: String,
}

/// Shared, precomputed view of the file handed to every rule.
pub struct RuleInput<'a> {
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    pub language: Language,
    /// Variables bound through `const [x, setX] = useState(...)` or `useReducer`.
    pub state_vars: HashSet<String>,
}

impl<'a> RuleInput<'a> {
    pub fn new(content: &'a str, language: Language) -> Self {
        static STATE_DECL: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"const\s*\[\s*([A-Za-z_$][\w$]*)\s*,\s*[A-Za-z_$][\w$]*\s*\]\s*=\s*(?:React\.)?use(?:State|Reducer)\b")
                .unwrap()
        });

        Self {
            content,
            lines: content.lines().collect(),
            language,
            state_vars: STATE_DECL
                .captures_iter(content)
                .map(|c| c[1].to_string())
                .collect(),
        }
    }

    fn snippet(&self, line: usize) -> String {
        self.lines
            .get(line.saturating_sub(1))
            .map(|l| l.trim().to_string())
            .unwrap_or_default()
    }

    /// Whether the byte offset sits in a comment line or a string literal.
    fn is_masked(&self, offset: usize) -> bool {
        let line_no = line_of(self.content, offset);
        let Some(line) = self.lines.get(line_no - 1) else {
            return false;
        };
        let line_start = self.content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        is_comment_line(line) || is_inside_string_literal(line, offset - line_start)
    }

    fn looks_like_state(&self, name: &str) -> bool {
        self.state_vars.contains(name) || name == "state" || name.ends_with("State")
    }

    fn finding(
        &self,
        rule: &'static str,
        category: PatternCategory,
        severity: Severity,
        message: String,
        line: usize,
        confidence: f64,
        suggestion: &str,
    ) -> PatternFinding {
        PatternFinding {
            rule,
            category,
            severity,
            message,
            line,
            confidence,
            suggestion: Some(suggestion.to_string()),
            snippet: self.snippet(line),
        }
    }
}

type Guard = fn(&RuleInput<'_>, &Captures<'_>) -> bool;

/// A declarative pattern rule.
pub struct PatternRule {
    pub id: &'static str,
    pub category: PatternCategory,
    pub severity: Severity,
    pub message: &'static str,
    pub remedy: &'static str,
    pub typescript_only: bool,
    regex: Regex,
    guard: Option<Guard>,
}

fn rule(
    id: &'static str,
    category: PatternCategory,
    severity: Severity,
    pattern: &str,
    message: &'static str,
    remedy: &'static str,
) -> PatternRule {
    PatternRule {
        id,
        category,
        severity,
        message,
        remedy,
        typescript_only: false,
        regex: Regex::new(pattern).unwrap(),
        guard: None,
    }
}

impl PatternRule {
    fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    fn typescript_only(mut self) -> Self {
        self.typescript_only = true;
        self
    }
}

static RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    use PatternCategory::*;
    vec![
        rule(
            "hooks_conditional",
            HookViolation,
            Severity::Critical,
            r"(?s)\bif\s*\([^)]*\)\s*\{[^}]*?\buse[A-Z]\w*\s*\(",
            "React hooks cannot be called conditionally",
            "Move hook call outside conditional or use conditional logic inside hook",
        ),
        rule(
            "hooks_in_loop",
            HookViolation,
            Severity::Critical,
            r"(?s)\b(?:for|while)\s*\([^)]*\)\s*\{[^}]*?\buse[A-Z]\w*\s*\(",
            "React hooks cannot be called inside loops",
            "Move hook call outside loop or restructure logic",
        ),
        rule(
            "hooks_in_function",
            HookViolation,
            Severity::High,
            r"(?s)\bfunction\s+([a-z]\w*)\s*\([^)]*\)\s*\{[^}]*?\buse[A-Z]\w*\s*\(",
            "React hooks should only be called in components or custom hooks",
            "Move to component or create custom hook",
        )
        .guarded(|_, caps| !caps[1].starts_with("use")),
        rule(
            "inline_object_prop",
            PerformanceIssue,
            Severity::Medium,
            r"\b(\w+)=\{\{[^}]+\}\}",
            "Inline object creation causes unnecessary re-renders",
            "Move object creation outside render or use useMemo",
        )
        .guarded(|_, caps| !matches!(&caps[1], "style" | "dangerouslySetInnerHTML")),
        rule(
            "inline_function_prop",
            PerformanceIssue,
            Severity::Medium,
            r"\b(\w+)=\{\s*(?:async\s*)?\(?[\w\s,]*\)?\s*=>",
            "Inline function creation causes unnecessary re-renders",
            "Use useCallback or move function outside component",
        ),
        rule(
            "missing_key_prop",
            PerformanceIssue,
            Severity::High,
            r"\.map\s*\(\s*\(?[\w\s,{}]*\)?\s*=>\s*\(?\s*<([A-Za-z][\w.]*)([^>]*)>",
            "Missing key prop in list rendering",
            "Add unique key prop to each list item",
        )
        .guarded(|_, caps| !caps[2].contains("key=")),
        rule(
            "dangerous_html",
            SecurityRisk,
            Severity::High,
            r"dangerouslySetInnerHTML\s*=\s*\{\{([^}]*)\}\}",
            "Potential XSS vulnerability with dangerouslySetInnerHTML",
            "Sanitize HTML content or use safer alternatives",
        )
        .guarded(|_, caps| {
            let inner = caps[1].to_lowercase();
            !inner.contains("sanitize") && !inner.contains("dompurify")
        }),
        rule(
            "eval_usage",
            SecurityRisk,
            Severity::Critical,
            r"\beval\s*\(",
            "Use of eval() is dangerous and should be avoided",
            "Use safer alternatives like JSON.parse() or proper parsing",
        ),
        rule(
            "document_write",
            SecurityRisk,
            Severity::High,
            r"\bdocument\.write(?:ln)?\s*\(",
            "document.write can cause security issues",
            "Use modern DOM manipulation methods",
        ),
        rule(
            "direct_state_mutation",
            AntiPattern,
            Severity::High,
            r"\b([A-Za-z_$][\w$]*)(?:\.(?:push|pop|splice|shift|unshift|sort|reverse)\s*\(|\[\d+\]\s*=[^=])",
            "Direct state mutation detected",
            "Use immutable update patterns or setState callback",
        )
        .guarded(|input, caps| input.looks_like_state(&caps[1])),
        rule(
            "missing_cleanup",
            MemoryLeak,
            Severity::High,
            r"\buseEffect\s*\(",
            "Potential memory leak - missing cleanup in useEffect",
            "Return cleanup function from useEffect",
        )
        .guarded(|input, caps| {
            let Some(m) = caps.get(0) else { return false };
            let Some(body) = balanced_inner(input.content, m.end() - 1) else {
                return false;
            };
            let starts_timer = body.contains("setInterval") || body.contains("setTimeout");
            let clears = body.contains("clearInterval") || body.contains("clearTimeout");
            starts_timer && !clears
        }),
        rule(
            "event_listener_leak",
            MemoryLeak,
            Severity::Medium,
            r"\baddEventListener\s*\(",
            "Event listener added without cleanup",
            "Remove event listener in cleanup function",
        )
        .guarded(|input, _| !input.content.contains("removeEventListener")),
        rule(
            "unused_import",
            ImportInconsistency,
            Severity::Low,
            r"(?m)^[ \t]*import\s+(?:type\s+)?\{([^}]+)\}\s+from",
            "Potentially unused import",
            "Remove unused imports",
        )
        .guarded(|input, caps| {
            caps[1].split(',').any(|item| {
                let local = item.rsplit(" as ").next().unwrap_or(item).trim();
                let local = local.trim_start_matches("type ").trim();
                !local.is_empty() && count_word(input.content, local) <= 1
            })
        }),
        rule(
            "relative_import_depth",
            ImportInconsistency,
            Severity::Medium,
            r#"from\s+['"](?:\.\./){3,}"#,
            "Deep relative import path",
            "Consider using absolute imports or path mapping",
        ),
        rule(
            "any_type_usage",
            TypeSafety,
            Severity::Medium,
            r"(?::\s*|\bas\s+)any\b",
            "Usage of \"any\" type reduces type safety",
            "Use specific types or unknown instead of any",
        )
        .typescript_only(),
        rule(
            "non_null_assertion",
            TypeSafety,
            Severity::Medium,
            r"[\w\)\]]!(?:\.|\[)",
            "Non-null assertion operator used",
            "Add proper null checks or use optional chaining",
        )
        .typescript_only(),
        rule(
            "missing_alt_text",
            Accessibility,
            Severity::Medium,
            r"<img\b([^>]*)>",
            "Image missing alt attribute",
            "Add alt attribute for accessibility",
        )
        .guarded(|_, caps| !caps[1].contains("alt=")),
        rule(
            "missing_aria_label",
            Accessibility,
            Severity::Low,
            r"<button\b([^>]*)/>",
            "Button without accessible label",
            "Add aria-label or text content",
        )
        .guarded(|_, caps| !caps[1].contains("aria-label")),
    ]
});

type ContextualRule = fn(&RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>>;

/// Contextual rules, by id.
const CONTEXTUAL_RULES: &[(&str, ContextualRule)] = &[
    ("this_in_functional_component", this_in_functional_component),
    ("complex_state_mutation", complex_state_mutation),
    ("missing_effect_dependencies", missing_effect_dependencies),
    ("prop_drilling", prop_drilling),
    ("unused_variable", unused_variables),
    ("relative_import_fanout", relative_import_fanout),
    ("empty_interface", empty_interfaces),
    ("inline_styles", inline_styles),
    ("missing_memo", missing_memo),
];

/// Every rule id the detector knows, for configuration validation.
pub fn rule_ids() -> Vec<&'static str> {
    RULES
        .iter()
        .map(|r| r.id)
        .chain(CONTEXTUAL_RULES.iter().map(|(id, _)| *id))
        .collect()
}

/// Runs the rule table and the contextual rules over one file.
#[derive(Debug, Default, Clone)]
pub struct PatternDetector {
    disabled: HashSet<String>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disabled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(ids.into_iter().map(Into::into));
        self
    }

    fn enabled(&self, id: &str) -> bool {
        !self.disabled.contains(id)
    }

    pub fn detect(&self, content: &str, language: Language) -> Vec<PatternFinding> {
        let input = RuleInput::new(content, language);
        let mut findings = self.detect_table(&input);
        findings.extend(self.detect_contextual(CONTEXTUAL_RULES, &input));
        findings.sort_by_key(|f| f.line);
        findings
    }

    fn detect_contextual(&self, rules: &[(&str, ContextualRule)], input: &RuleInput<'_>) -> Vec<PatternFinding> {
        let mut findings = Vec::new();
        for (id, rule_fn) in rules {
            if !self.enabled(id) {
                continue;
            }
            match catch_panic(|| rule_fn(input)) {
                Ok(Ok(found)) => findings.extend(found),
                Ok(Err(e)) => debug!(rule = *id, error = %e, "contextual rule failed"),
                Err(msg) => debug!(rule = *id, error = %msg, "contextual rule panicked"),
            }
        }
        findings
    }

    fn detect_table(&self, input: &RuleInput<'_>) -> Vec<PatternFinding> {
        let is_typescript = input.language == Language::TypeScript;
        let mut findings = Vec::new();

        for rule in RULES.iter() {
            if !self.enabled(rule.id) || (rule.typescript_only && !is_typescript) {
                continue;
            }
            for caps in rule.regex.captures_iter(input.content) {
                let Some(m) = caps.get(0) else { continue };
                if input.is_masked(m.start()) {
                    continue;
                }
                if let Some(guard) = rule.guard {
                    if !guard(input, &caps) {
                        continue;
                    }
                }
                let line = line_of(input.content, m.start());
                findings.push(input.finding(
                    rule.id,
                    rule.category,
                    rule.severity,
                    rule.message.to_string(),
                    line,
                    0.8,
                    rule.remedy,
                ));
            }
        }
        findings
    }
}

// ---------------------------------------------------------------------------
// Contextual rules
// ---------------------------------------------------------------------------

static FUNCTION_COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:const|let)\s+([A-Z][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s*)?\(([^)]*)\)\s*(?::[^=]+)?=>|function\s+([A-Z][\w$]*)\s*\(([^)]*)\)",
    )
    .unwrap()
});

static GLOBAL_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "console", "document", "window", "Math", "JSON", "Date", "Object", "Array", "Promise",
        "setTimeout", "setInterval", "clearTimeout", "clearInterval", "fetch", "localStorage",
        "sessionStorage", "navigator", "location", "undefined", "null", "true", "false", "this",
        "const", "let", "var", "return", "if", "else", "async", "await", "new", "typeof",
        "function", "try", "catch", "finally", "throw", "for", "of", "in", "while", "Error",
        "Number", "String", "Boolean", "process", "require",
    ]
    .into_iter()
    .collect()
});

/// `(name, body offset, body)` for each function component in the file.
fn function_components<'a>(content: &'a str) -> Vec<(String, usize, &'a str)> {
    FUNCTION_COMPONENT
        .captures_iter(content)
        .filter_map(|caps| {
            let name = caps.get(1).or_else(|| caps.get(3))?.as_str().to_string();
            let after = caps.get(0)?.end();
            let open = after + content[after..].find('{')?;
            // Expression-bodied arrows have no braces of their own.
            if content[after..open].trim().len() > 1 {
                return None;
            }
            let body = balanced_inner(content, open)?;
            Some((name, open + 1, body))
        })
        .collect()
}

fn this_in_functional_component(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static THIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\b").unwrap());

    let mut findings = Vec::new();
    for (name, offset, body) in function_components(input.content) {
        for m in THIS.find_iter(body) {
            let at = offset + m.start();
            if input.is_masked(at) {
                continue;
            }
            findings.push(input.finding(
                "this_in_functional_component",
                PatternCategory::AntiPattern,
                Severity::High,
                format!("Usage of 'this' in functional component '{}'", name),
                line_of(input.content, at),
                0.9,
                "Remove 'this' - not available in functional components",
            ));
        }
    }
    Ok(findings)
}

fn complex_state_mutation(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static MUTATION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b([A-Za-z_$][\w$]*)\.([\w$.\[\]]+)\s*=[^=>]").unwrap());

    if input.state_vars.is_empty() {
        return Ok(Vec::new());
    }
    let mut findings = Vec::new();
    for caps in MUTATION.captures_iter(input.content) {
        let Some(m) = caps.get(0) else { continue };
        if !input.state_vars.contains(&caps[1]) || input.is_masked(m.start()) {
            continue;
        }
        let line = line_of(input.content, m.start());
        findings.push(input.finding(
            "complex_state_mutation",
            PatternCategory::AntiPattern,
            Severity::High,
            format!("Potential direct state mutation: {}.{}", &caps[1], &caps[2]),
            line,
            0.7,
            "Use setState or state setter function for immutable updates",
        ));
    }
    Ok(findings)
}

fn missing_effect_dependencies(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static EFFECT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\buse(?:Layout)?Effect\s*\(").unwrap());
    static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_$][\w$]*").unwrap());
    static LOCAL_DECL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:const|let|var)\s+([A-Za-z_$][\w$]*)").unwrap());
    static PROPS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?:function\s+[A-Z]\w*|(?:const|let)\s+[A-Z]\w*\s*(?::[^=]+)?=\s*)\s*\(\s*\{([^}]*)\}").unwrap()
    });

    // Component-scope names an effect can depend on.
    let mut scoped: HashSet<String> = input.state_vars.clone();
    for caps in PROPS.captures_iter(input.content) {
        for prop in caps[1].split(',') {
            let name = prop.split([':', '=']).next().unwrap_or("").trim();
            if !name.is_empty() && !name.starts_with("...") {
                scoped.insert(name.to_string());
            }
        }
    }

    let mut findings = Vec::new();
    for m in EFFECT.find_iter(input.content) {
        if input.is_masked(m.start()) {
            continue;
        }
        let Some(args) = balanced_inner(input.content, m.end() - 1) else {
            continue;
        };
        let parts = split_args(args);
        let (Some(callback), Some(deps)) = (parts.first(), parts.get(1)) else {
            continue;
        };
        let Some(deps) = deps.strip_prefix('[').and_then(|d| d.strip_suffix(']')) else {
            continue;
        };

        let declared: HashSet<&str> = IDENT.find_iter(deps).map(|m| m.as_str()).collect();
        let local: HashSet<&str> = LOCAL_DECL
            .captures_iter(callback)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        let missing: BTreeSet<&str> = IDENT
            .find_iter(callback)
            .filter(|id| !callback[..id.start()].ends_with('.'))
            .map(|id| id.as_str())
            .filter(|id| {
                scoped.contains(*id)
                    && !declared.contains(id)
                    && !local.contains(id)
                    && !GLOBAL_NAMES.contains(id)
            })
            .collect();

        if missing.is_empty() {
            continue;
        }
        let names: Vec<&str> = missing.into_iter().collect();
        let mut finding = input.finding(
            "missing_effect_dependencies",
            PatternCategory::HookViolation,
            Severity::Medium,
            format!(
                "Potentially missing dependencies in useEffect: {}",
                names.join(", ")
            ),
            line_of(input.content, m.start()),
            0.6,
            "",
        );
        finding.suggestion = Some(format!("Add missing dependencies: [{}]", names.join(", ")));
        findings.push(finding);
    }
    Ok(findings)
}

fn prop_drilling(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static PASSAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+=\{(\w+)\}").unwrap());

    let mut usage: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for caps in PASSAGE.captures_iter(input.content) {
        let (Some(m), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let entry = usage.entry(value.as_str()).or_insert((0, m.start()));
        entry.0 += 1;
    }

    Ok(usage
        .into_iter()
        .filter(|(_, (count, _))| *count > 3)
        .map(|(prop, (count, first))| {
            input.finding(
                "prop_drilling",
                PatternCategory::AntiPattern,
                Severity::Low,
                format!(
                    "Potential prop drilling detected for '{}' (passed {} times)",
                    prop, count
                ),
                line_of(input.content, first),
                0.5,
                "Consider using Context API or state management library",
            )
        })
        .collect())
}

fn unused_variables(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static DECL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*[=:;]").unwrap());

    let mut findings = Vec::new();
    let mut seen = HashSet::new();
    for caps in DECL.captures_iter(input.content) {
        let (Some(m), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if name.starts_with('_') || !seen.insert(name) || input.is_masked(m.start()) {
            continue;
        }
        let line = line_of(input.content, m.start());
        // Exported bindings are used by other modules.
        if input
            .lines
            .get(line - 1)
            .is_some_and(|l| l.trim_start().starts_with("export"))
        {
            continue;
        }
        if count_word(input.content, name) > 1 {
            continue;
        }
        findings.push(input.finding(
            "unused_variable",
            PatternCategory::ImportInconsistency,
            Severity::Low,
            format!("Variable '{}' is declared but never used", name),
            line,
            0.8,
            &format!("Remove unused variable or prefix with underscore: _{}", name),
        ));
    }
    Ok(findings)
}

fn relative_import_fanout(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static RELATIVE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?m)^[ \t]*import\s[^'"]*?from\s+['"](\.[^'"]*)['"]"#).unwrap()
    });

    let count = RELATIVE.captures_iter(input.content).count();
    if count <= 5 {
        return Ok(Vec::new());
    }
    let mut finding = input.finding(
        "relative_import_fanout",
        PatternCategory::ImportInconsistency,
        Severity::Medium,
        format!(
            "High number of relative imports ({}) may indicate architectural issues",
            count
        ),
        1,
        0.4,
        "Consider restructuring modules to reduce coupling",
    );
    finding.snippet.clear();
    Ok(vec![finding])
}

fn empty_interfaces(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static EMPTY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\binterface\s+([A-Za-z_$][\w$]*)\s*\{\s*\}").unwrap());

    Ok(EMPTY
        .captures_iter(input.content)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            Some(input.finding(
                "empty_interface",
                PatternCategory::TypeSafety,
                Severity::Low,
                format!("Empty interface '{}' provides no type safety", &caps[1]),
                line_of(input.content, m.start()),
                0.9,
                "Add properties to interface or use type alias instead",
            ))
        })
        .collect())
}

fn inline_styles(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    static STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bstyle=\{\{[^}]+\}\}").unwrap());

    Ok(STYLE
        .find_iter(input.content)
        .map(|m| {
            input.finding(
                "inline_styles",
                PatternCategory::PerformanceIssue,
                Severity::Low,
                "Inline styles cause component re-renders".to_string(),
                line_of(input.content, m.start()),
                0.7,
                "Move styles to CSS classes or use styled-components",
            )
        })
        .collect())
}

fn missing_memo(input: &RuleInput<'_>) -> anyhow::Result<Vec<PatternFinding>> {
    if input.content.contains("memo(") {
        return Ok(Vec::new());
    }
    Ok(FUNCTION_COMPONENT
        .captures_iter(input.content)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let props = caps.get(2)?;
            if props.as_str().len() <= 50 {
                return None;
            }
            Some(input.finding(
                "missing_memo",
                PatternCategory::PerformanceIssue,
                Severity::Low,
                format!(
                    "Component '{}' with complex props should consider using React.memo",
                    name.as_str()
                ),
                line_of(input.content, name.start()),
                0.5,
                "Wrap component with React.memo() if props don't change frequently",
            ))
        })
        .collect())
}
