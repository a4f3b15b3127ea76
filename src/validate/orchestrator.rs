//! Per-file validation pipeline.
//!
//! For each file: structural analysis, then framework/component/hook
//! checks, backend (table and RPC) checks against the catalog, signature
//! and pattern validation, and generic best practices. Every sub-validator's
//! findings are mapped into [`Detection`]s on one [`ValidationReport`].

use anyhow::{anyhow, bail, Context};
use indicatif::ProgressBar;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::patterns::PatternDetector;
use super::report::{BackendUsage, ValidationReport};
use super::rpc::RpcValidator;
use super::signature::SignatureValidator;
use super::text::is_comment_line;
use super::types::{Detection, DetectionKind, Severity};
use super::value::{find_rpc_calls, find_table_refs};
use crate::analysis::{
    catch_panic, detect_frameworks, AnalysisContext, Analyzers, ComponentKind, Language, ModuleAnalysis,
    REACT_HOOKS,
};
use crate::config::ValidationConfig;
use crate::schema::SchemaCatalog;

/// Parameter lists of the built-in hooks, used for max-arity checks.
const HOOK_SIGNATURES: &[(&str, &[&str])] = &[
    ("useState", &["initialValue?"]),
    ("useEffect", &["effect", "deps?"]),
    ("useContext", &["context"]),
    ("useReducer", &["reducer", "initialState", "init?"]),
    ("useCallback", &["callback", "deps"]),
    ("useMemo", &["factory", "deps"]),
    ("useRef", &["initialValue?"]),
    ("useImperativeHandle", &["ref", "createHandle", "deps?"]),
    ("useLayoutEffect", &["effect", "deps?"]),
    ("useDebugValue", &["value", "format?"]),
    ("useDeferredValue", &["value"]),
    ("useTransition", &[]),
    ("useId", &[]),
];

/// Next.js data functions and their exact parameter lists.
const NEXT_SIGNATURES: &[(&str, &[&str])] = &[
    ("getServerSideProps", &["context"]),
    ("getStaticProps", &["context"]),
    ("getStaticPaths", &[]),
    ("getInitialProps", &["context"]),
];

/// Elements React provides without an import of their own.
const BUILTIN_ELEMENTS: &[&str] = &["Fragment", "Suspense", "StrictMode", "Profiler"];

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "d.ts", "json"];

lazy_static! {
    static ref JSX_ELEMENT: Regex =
        Regex::new(r"(?:^|[^\w$.])<([A-Z][\w$]*)(?:\.[\w$]+)*[\s/>]").unwrap();

    static ref LOCAL_BINDING: Regex = Regex::new(
        r"(?m)(?:const|let|var|class|function\*?|enum)\s+([A-Za-z_$][\w$]*)"
    ).unwrap();
}

fn slice_suggestion(label: &str, names: &[&str]) -> String {
    let shown: Vec<&str> = names.iter().take(5).copied().collect();
    let more = if names.len() > 5 { "..." } else { "" };
    format!("Available {}: {}{}", label, shown.join(", "), more)
}

/// Drives every check for one file.
pub struct Validator {
    analyzers: Analyzers,
    ctx: AnalysisContext,
    catalog: Option<Arc<SchemaCatalog>>,
    rpc: Option<RpcValidator>,
    signature: SignatureValidator,
    patterns: PatternDetector,
    max_component_props: usize,
    rpc_severity: Severity,
}

impl Validator {
    pub fn new(analyzers: Analyzers, ctx: AnalysisContext) -> Self {
        Self {
            analyzers,
            ctx,
            catalog: None,
            rpc: None,
            signature: SignatureValidator::new(),
            patterns: PatternDetector::new(),
            max_component_props: 10,
            rpc_severity: Severity::High,
        }
    }

    pub fn with_config(mut self, config: &ValidationConfig) -> Self {
        self.patterns = PatternDetector::new().with_disabled(config.disabled_rules.iter().cloned());
        self.max_component_props = config.max_component_props;
        self.rpc_severity = config.rpc_severity();
        if let Some(catalog) = self.catalog.clone() {
            self.rpc = Some(RpcValidator::new(catalog).with_severity(self.rpc_severity));
        }
        self
    }

    /// Enable table and RPC checks against `catalog`.
    pub fn with_catalog(mut self, catalog: Arc<SchemaCatalog>) -> Self {
        self.rpc = Some(RpcValidator::new(catalog.clone()).with_severity(self.rpc_severity));
        self.catalog = Some(catalog);
        self
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Validate a file on disk. Never fails: problems become detections.
    pub fn validate_file(&self, path: &Path) -> ValidationReport {
        let rel_path = self.ctx.relative_path(path);
        let language = Language::from_path(path);
        let source = match std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))
        {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return self.failure(&rel_path, language, &e),
        };
        match self.run_contained(&rel_path, &source, Some(path)) {
            Ok(report) => report,
            Err(e) => self.failure(&rel_path, language, &e),
        }
    }

    /// Validate in-memory source. Relative imports are not resolved.
    pub fn validate_source(&self, rel_path: &str, source: &str) -> ValidationReport {
        match self.run_contained(rel_path, source, None) {
            Ok(report) => report,
            Err(e) => self.failure(rel_path, Language::from_path(Path::new(rel_path)), &e),
        }
    }

    /// Validate `paths` on a pool of `workers` threads, in input order.
    pub fn validate_files(
        &self,
        paths: &[PathBuf],
        workers: usize,
        progress: Option<&ProgressBar>,
    ) -> anyhow::Result<Vec<ValidationReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("failed to build validation worker pool")?;

        Ok(pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let report = self.validate_file(path);
                    if let Some(bar) = progress {
                        bar.inc(1);
                    }
                    report
                })
                .collect()
        }))
    }

    fn failure(&self, rel_path: &str, language: Language, error: &anyhow::Error) -> ValidationReport {
        warn!(path = rel_path, error = %error, "validation failed");
        ValidationReport::failed(rel_path, language, &format!("{:#}", error))
    }

    fn run_contained(
        &self,
        rel_path: &str,
        source: &str,
        on_disk: Option<&Path>,
    ) -> anyhow::Result<ValidationReport> {
        catch_panic(|| self.run(rel_path, source, on_disk))
            .map_err(|msg| anyhow!("validator panicked: {}", msg))?
    }

    fn run(&self, rel_path: &str, source: &str, on_disk: Option<&Path>) -> anyhow::Result<ValidationReport> {
        let Some(analyzer) = self.analyzers.for_path(Path::new(rel_path)) else {
            bail!("unsupported file type: {}", rel_path);
        };
        let analysis = analyzer.analyze(rel_path, source, &self.ctx);
        let language = analysis.language();
        let frameworks = detect_frameworks(&analysis.imports);

        let mut checks = FileChecks {
            analysis: &analysis,
            source,
            detections: Vec::new(),
        };

        checks.parse_errors();
        if language.is_script() {
            checks.hooks();
            checks.components();
            if frameworks.contains("next") {
                checks.next_signatures();
            }
            checks.undeclared_references();
        }
        if let Some(file) = on_disk {
            checks.relative_imports(file);
        }
        let usage = match (&self.catalog, &self.rpc) {
            (Some(catalog), Some(rpc)) => checks.backend(catalog, rpc),
            _ => BackendUsage::default(),
        };
        if language.is_script() {
            checks.signatures(&self.signature);
            checks.patterns(&self.patterns);
            checks.best_practices(self.max_component_props);
        }

        let mut report = ValidationReport::new(rel_path, language);
        report.detections = checks.detections;
        report.finish(&frameworks, usage);
        debug!(
            path = rel_path,
            detections = report.detections.len(),
            confidence = report.overall_confidence,
            "validated"
        );
        Ok(report)
    }
}

/// Checks over one analyzed file, accumulating detections.
struct FileChecks<'a> {
    analysis: &'a ModuleAnalysis,
    source: &'a str,
    detections: Vec<Detection>,
}

impl<'a> FileChecks<'a> {
    fn add(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    fn detection(&self, kind: DetectionKind, severity: Severity, message: String, line: usize) -> Detection {
        Detection::new(kind, severity, message, self.analysis.path.clone(), line)
    }

    /// Syntax errors reported by a tree parser. Fallback analyses carry
    /// their bridge error instead, which is not a property of the file.
    fn parse_errors(&mut self) {
        let analysis = self.analysis;
        if analysis.used_fallback {
            return;
        }
        for error in &analysis.errors {
            let d = self
                .detection(DetectionKind::InvalidType, Severity::High, format!("Syntax error: {}", error), 1)
                .with_confidence(1.0);
            self.add(d);
        }
    }

    fn hooks(&mut self) {
        let analysis = self.analysis;
        let declared = self.declared_names();
        for hook in &analysis.hook_calls {
            let Some((_, expected)) = HOOK_SIGNATURES.iter().find(|(n, _)| *n == hook.hook_name) else {
                continue;
            };
            if hook.args.len() > expected.len() {
                let d = self
                    .detection(
                        DetectionKind::IncorrectSignature,
                        Severity::Medium,
                        format!(
                            "Hook '{}' expects at most {} arguments, got {}",
                            hook.hook_name,
                            expected.len(),
                            hook.args.len()
                        ),
                        hook.line,
                    )
                    .with_confidence(0.8)
                    .with_suggestion(format!("Expected signature: {}({})", hook.hook_name, expected.join(", ")))
                    .with_context("hook_name", hook.hook_name.clone())
                    .with_context("provided_args", hook.args.join(", "));
                self.add(d);
            }
        }

        // `usedata()` style helpers the file declares or imports.
        let mut seen = HashSet::new();
        for call in &analysis.calls {
            let name = call.callee_name.as_str();
            let lower_hook = name.len() > 3
                && name.starts_with("use")
                && name[3..].starts_with(|c: char| c.is_ascii_lowercase());
            if call.receiver_name.is_some() || !lower_hook || !declared.contains(name) {
                continue;
            }
            if !seen.insert(name.to_string()) {
                continue;
            }
            let mut fixed = name[3..].to_string();
            fixed[..1].make_ascii_uppercase();
            let d = self
                .detection(
                    DetectionKind::BadPractice,
                    Severity::Low,
                    format!("Custom hook '{}' should start with 'use' followed by a capital letter", name),
                    call.line,
                )
                .with_confidence(0.9)
                .with_suggestion(format!("Rename to 'use{}'", fixed))
                .with_context("hook_name", name);
            self.add(d);
        }
    }

    fn components(&mut self) {
        let analysis = self.analysis;
        for component in &analysis.components {
            if component.name.starts_with(|c: char| c.is_ascii_lowercase()) {
                let mut fixed = component.name.clone();
                fixed[..1].make_ascii_uppercase();
                let d = self
                    .detection(
                        DetectionKind::BadPractice,
                        Severity::Medium,
                        format!("React component '{}' should start with a capital letter", component.name),
                        component.line,
                    )
                    .with_confidence(0.95)
                    .with_suggestion(format!("Rename to '{}'", fixed))
                    .with_context("component_name", component.name.clone())
                    .with_context("component_type", component.kind.as_str());
                self.add(d);
            }
            if component.kind == ComponentKind::Class && !component.hooks_used.is_empty() {
                let d = self
                    .detection(
                        DetectionKind::BadPractice,
                        Severity::High,
                        format!("Class component '{}' cannot use hooks", component.name),
                        component.line,
                    )
                    .with_confidence(1.0)
                    .with_suggestion("Convert to function component or use class lifecycle methods")
                    .with_context("component_name", component.name.clone())
                    .with_context("hooks_used", component.hooks_used.join(", "));
                self.add(d);
            }
        }
    }

    fn next_signatures(&mut self) {
        let analysis = self.analysis;
        for call in &analysis.calls {
            if call.receiver_name.is_some() {
                continue;
            }
            let Some((name, expected)) = NEXT_SIGNATURES.iter().find(|(n, _)| *n == call.callee_name) else {
                continue;
            };
            if call.args.len() != expected.len() {
                let d = self
                    .detection(
                        DetectionKind::IncorrectSignature,
                        Severity::High,
                        format!(
                            "Next.js function '{}' expects {} arguments, got {}",
                            name,
                            expected.len(),
                            call.args.len()
                        ),
                        call.line,
                    )
                    .with_confidence(0.9)
                    .with_suggestion(format!("Expected signature: {}({})", name, expected.join(", ")))
                    .with_context("function_name", *name);
                self.add(d);
            }
        }
    }

    /// Names bound in this file: declarations, imports and local bindings.
    fn declared_names(&self) -> HashSet<String> {
        let a = self.analysis;
        let mut names: HashSet<String> = a
            .functions
            .iter()
            .map(|f| f.name.clone())
            .chain(a.classes.iter().map(|c| c.name.clone()))
            .chain(a.components.iter().map(|c| c.name.clone()))
            .chain(a.interfaces.iter().map(|t| t.name.clone()))
            .chain(a.type_aliases.iter().map(|t| t.name.clone()))
            .chain(a.imports.iter().filter_map(|i| i.local_name().map(str::to_string)))
            .collect();
        for caps in LOCAL_BINDING.captures_iter(self.source) {
            names.insert(caps[1].to_string());
        }
        names
    }

    /// JSX elements and custom hooks that nothing in the file declares.
    fn undeclared_references(&mut self) {
        let declared = self.declared_names();

        let mut first_use: BTreeMap<String, usize> = BTreeMap::new();
        for (index, line) in self.source.lines().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            for caps in JSX_ELEMENT.captures_iter(line) {
                first_use.entry(caps[1].to_string()).or_insert(index + 1);
            }
        }
        let mut missing: Vec<(String, usize)> = first_use
            .into_iter()
            .filter(|(name, _)| !declared.contains(name) && !BUILTIN_ELEMENTS.contains(&name.as_str()))
            .collect();
        missing.sort_by_key(|(_, line)| *line);
        for (name, line) in missing {
            let d = self
                .detection(
                    DetectionKind::ComponentNotFound,
                    Severity::High,
                    format!("Component '{}' is used but never declared or imported", name),
                    line,
                )
                .with_confidence(0.7)
                .with_suggestion(format!("Import '{}' or check the component name for typos", name))
                .with_context("component_name", name);
            self.add(d);
        }

        let analysis = self.analysis;
        let mut reported = HashSet::new();
        for hook in &analysis.hook_calls {
            let name = hook.hook_name.as_str();
            if REACT_HOOKS.contains(&name) || declared.contains(name) || !reported.insert(name) {
                continue;
            }
            let d = self
                .detection(
                    DetectionKind::HookNotFound,
                    Severity::High,
                    format!("Hook '{}' is called but never declared or imported", name),
                    hook.line,
                )
                .with_confidence(0.8)
                .with_suggestion(format!("Import '{}' from the module that defines it", name))
                .with_context("hook_name", name);
            self.add(d);
        }
    }

    fn relative_imports(&mut self, file: &Path) {
        let Some(dir) = file.parent() else { return };
        let analysis = self.analysis;
        let language = analysis.language();
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for import in &analysis.imports {
            if !import.module.starts_with('.') || !seen.insert(import.module.as_str()) {
                continue;
            }
            let resolves = match language {
                Language::Python => python_relative_exists(dir, &import.module),
                _ => script_relative_exists(dir, &import.module),
            };
            if !resolves {
                missing.push((import.module.clone(), import.line));
            }
        }
        for (module, line) in missing {
            let d = self
                .detection(
                    DetectionKind::ImportNotFound,
                    Severity::High,
                    format!("Relative import '{}' does not resolve to a file", module),
                    line,
                )
                .with_confidence(0.9)
                .with_suggestion("Check the import path and file name")
                .with_context("module", module);
            self.add(d);
        }
    }

    /// Table and RPC checks. Returns how many accesses the file makes.
    fn backend(&mut self, catalog: &SchemaCatalog, rpc: &RpcValidator) -> BackendUsage {
        let tables = find_table_refs(self.source);
        let calls = find_rpc_calls(self.source);
        let relation_names = catalog.relation_names();
        let function_names = {
            let mut names = catalog.function_names();
            names.sort_unstable();
            names
        };

        for table in &tables {
            if catalog.has_relation(&table.table) {
                continue;
            }
            let d = self
                .detection(
                    DetectionKind::SupabaseTableNotFound,
                    Severity::High,
                    format!("Supabase table '{}' not found in database schema", table.table),
                    table.line,
                )
                .with_confidence(0.85)
                .with_suggestion(slice_suggestion("tables", &relation_names))
                .with_context("table_name", table.table.clone());
            self.add(d);
        }

        for call in &calls {
            if catalog.function(&call.function_name).is_none() {
                let d = self
                    .detection(
                        DetectionKind::SupabaseFunctionNotFound,
                        Severity::High,
                        format!("Supabase RPC function '{}' not found in database schema", call.function_name),
                        call.line,
                    )
                    .with_confidence(0.85)
                    .with_suggestion(slice_suggestion("functions", &function_names))
                    .with_context("function_name", call.function_name.clone());
                self.add(d);
                continue;
            }
            for issue in rpc.validate_call(call) {
                let mut d = self
                    .detection(issue.kind.detection_kind(), issue.severity, issue.message, issue.line)
                    .with_confidence(0.9)
                    .with_context("function_name", issue.function)
                    .with_context("validation_type", issue.kind.as_str());
                if let Some(s) = issue.suggestion {
                    d = d.with_suggestion(s);
                }
                if let Some(p) = issue.parameter {
                    d = d.with_context("parameter_name", p);
                }
                if let Some(e) = issue.expected {
                    d = d.with_context("expected", e);
                }
                if let Some(a) = issue.actual {
                    d = d.with_context("actual", a);
                }
                self.add(d);
            }
        }

        BackendUsage {
            tables: tables.len(),
            functions: calls.len(),
        }
    }

    fn signatures(&mut self, validator: &SignatureValidator) {
        for issue in validator.validate(self.source) {
            let mut d = self
                .detection(issue.kind.detection_kind(), issue.severity, issue.message, issue.line)
                .with_confidence(0.8)
                .with_context("source", "signature_validator");
            if let Some(s) = issue.suggestion {
                d = d.with_suggestion(s);
            }
            if let Some(e) = issue.expected {
                d = d.with_context("expected", e);
            }
            if let Some(a) = issue.actual {
                d = d.with_context("actual", a);
            }
            self.add(d);
        }
    }

    fn patterns(&mut self, detector: &PatternDetector) {
        for finding in detector.detect(self.source, self.analysis.language()) {
            let mut d = self
                .detection(finding.category.detection_kind(), finding.severity, finding.message, finding.line)
                .with_confidence(finding.confidence)
                .with_context("source", "patterns_detector")
                .with_context("rule_name", finding.rule)
                .with_context("category", finding.category.as_str());
            if !finding.snippet.is_empty() {
                d = d.with_context("code_snippet", finding.snippet);
            }
            if let Some(s) = finding.suggestion {
                d = d.with_suggestion(s);
            }
            self.add(d);
        }
    }

    fn best_practices(&mut self, max_props: usize) {
        let analysis = self.analysis;
        for component in &analysis.components {
            let capitalised = component.name.starts_with(|c: char| c.is_ascii_uppercase());
            if capitalised && !component.is_exported {
                let d = self
                    .detection(
                        DetectionKind::BadPractice,
                        Severity::Low,
                        format!("React component '{}' is not exported", component.name),
                        component.line,
                    )
                    .with_confidence(0.7)
                    .with_suggestion("Consider exporting the component if it should be reusable")
                    .with_context("component_name", component.name.clone());
                self.add(d);
            }
            if component.props.len() > max_props {
                let d = self
                    .detection(
                        DetectionKind::BadPractice,
                        Severity::Medium,
                        format!("Component '{}' has too many props ({})", component.name, component.props.len()),
                        component.line,
                    )
                    .with_confidence(0.8)
                    .with_suggestion("Consider grouping related props into objects or using composition")
                    .with_context("component_name", component.name.clone())
                    .with_context("props_count", component.props.len().to_string());
                self.add(d);
            }
        }
    }
}

fn script_relative_exists(dir: &Path, module: &str) -> bool {
    let base = dir.join(module);
    if base.is_file() {
        return true;
    }
    let stem = base.to_string_lossy();
    SCRIPT_EXTENSIONS.iter().any(|ext| {
        Path::new(&format!("{}.{}", stem, ext)).is_file()
            || base.join(format!("index.{}", ext)).is_file()
    })
}

/// `.models` and `..core.db` style imports, relative to the importing file.
fn python_relative_exists(dir: &Path, module: &str) -> bool {
    let dots = module.chars().take_while(|c| *c == '.').count();
    let rest = &module[dots..];
    let mut base = dir.to_path_buf();
    for _ in 1..dots {
        if !base.pop() {
            return false;
        }
    }
    if rest.is_empty() {
        return base.is_dir();
    }
    let target = rest.split('.').fold(base, |p, part| p.join(part));
    target.with_extension("py").is_file() || target.join("__init__.py").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FunctionInfo, FunctionParam, TableInfo};
    use std::fs;
    use tempfile::TempDir;

    fn validator() -> Validator {
        Validator::new(Analyzers::default(), AnalysisContext::new("/repo"))
    }

    fn catalog() -> Arc<SchemaCatalog> {
        let mut c = SchemaCatalog::empty("test");
        c.tables.push(TableInfo::new("public", "profiles"));
        let mut f = FunctionInfo::new("public", "get_profile");
        f.parameters.push(FunctionParam::new("user_id", "uuid", 1));
        c.functions.push(f);
        Arc::new(c)
    }

    fn kinds(report: &ValidationReport) -> Vec<DetectionKind> {
        report.detections.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_hook_arity_and_undeclared_names() {
        let source = r#"import React, { useState } from 'react';

export function Panel() {
  const [open, setOpen] = useState(false, true);
  const user = useCurrentUser();
  return <Card open={open} />;
}
"#;
        let report = validator().validate_source("src/Panel.tsx", source);

        let arity = report
            .detections
            .iter()
            .find(|d| d.kind == DetectionKind::IncorrectSignature && d.message.contains("useState"))
            .unwrap();
        assert_eq!(arity.line(), 4);
        assert_eq!(arity.severity, Severity::Medium);

        let hook = report
            .detections
            .iter()
            .find(|d| d.kind == DetectionKind::HookNotFound)
            .unwrap();
        assert!(hook.message.contains("useCurrentUser"));

        let component = report
            .detections
            .iter()
            .find(|d| d.kind == DetectionKind::ComponentNotFound)
            .unwrap();
        assert!(component.message.contains("'Card'"));
        assert_eq!(component.line(), 6);
        assert!(report.has_framework("react"));
    }

    #[test]
    fn test_generic_arguments_are_not_elements() {
        let source = "import { useState } from 'react';\ninterface User { id: string }\nexport function useUser() {\n  return useState<User>(null);\n}\n";
        let report = validator().validate_source("src/useUser.ts", source);
        assert!(!kinds(&report).contains(&DetectionKind::ComponentNotFound));
    }

    #[test]
    fn test_backend_checks_with_catalog() {
        let source = r#"export async function load(supabase, id) {
  await supabase.from('profiles').select('*');
  await supabase.from('profils').select('*');
  await supabase.rpc('get_profil', { user_id: id });
  return supabase.rpc('get_profile', {});
}
"#;
        let v = validator().with_catalog(catalog());
        let report = v.validate_source("src/load.js", source);
        let ks = kinds(&report);

        assert!(ks.contains(&DetectionKind::SupabaseTableNotFound));
        assert!(ks.contains(&DetectionKind::SupabaseFunctionNotFound));
        assert!(ks.contains(&DetectionKind::RpcMissingRequiredParam));
        let table = report
            .detections
            .iter()
            .find(|d| d.kind == DetectionKind::SupabaseTableNotFound)
            .unwrap();
        assert_eq!(table.line(), 3);
        assert_eq!(table.suggestion.as_deref(), Some("Available tables: profiles"));
        assert_eq!(report.statistics["supabase_tables"], 2);
        assert_eq!(report.statistics["supabase_functions"], 2);
    }

    #[test]
    fn test_backend_checks_skipped_without_catalog() {
        let source = "export const q = (s) => s.from('nope').select();\n";
        let report = validator().validate_source("src/q.js", source);
        assert!(!kinds(&report).contains(&DetectionKind::SupabaseTableNotFound));
        assert!(!report.statistics.contains_key("supabase_tables"));
    }

    #[test]
    fn test_best_practices() {
        let props: Vec<String> = (0..12).map(|i| format!("p{}", i)).collect();
        let source = format!(
            "function Hidden() {{ return null; }}\nexport function Wide({{ {} }}) {{ return null; }}\n",
            props.join(", ")
        );
        let report = validator().validate_source("src/Wide.jsx", &source);
        let messages: Vec<&str> = report.detections.iter().map(|d| d.message.as_str()).collect();
        assert!(messages.contains(&"React component 'Hidden' is not exported"));
        assert!(messages.contains(&"Component 'Wide' has too many props (12)"));
    }

    #[test]
    fn test_missing_relative_import_on_disk() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::write(root.join("src/lib/api.ts"), "export const api = 1;\n").unwrap();
        fs::write(
            root.join("src/App.ts"),
            "import { api } from './lib/api';\nimport { gone } from './lib/gone';\nexport const x = api + gone;\n",
        )
        .unwrap();

        let v = Validator::new(Analyzers::default(), AnalysisContext::new(root));
        let report = v.validate_file(&root.join("src/App.ts"));
        let missing: Vec<&Detection> = report
            .detections
            .iter()
            .filter(|d| d.kind == DetectionKind::ImportNotFound)
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains("./lib/gone"));
        assert_eq!(report.script_path, "src/App.ts");
    }

    #[test]
    fn test_python_relative_imports() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("app");
        fs::create_dir_all(pkg.join("core")).unwrap();
        fs::write(pkg.join("models.py"), "").unwrap();
        fs::write(pkg.join("core/__init__.py"), "").unwrap();

        assert!(python_relative_exists(&pkg, ".models"));
        assert!(python_relative_exists(&pkg, ".core"));
        assert!(python_relative_exists(&pkg.join("core"), "..models"));
        assert!(!python_relative_exists(&pkg, ".missing"));
        assert!(python_relative_exists(&pkg, "."));
    }

    #[test]
    fn test_unreadable_file_becomes_critical_detection() {
        let v = validator();
        let report = v.validate_file(Path::new("/repo/definitely/missing.ts"));
        assert_eq!(report.detections.len(), 1);
        assert_eq!(report.detections[0].kind, DetectionKind::AnalysisFailure);
        assert_eq!(report.detections[0].severity, Severity::Critical);
    }

    #[test]
    fn test_unsupported_source_is_failure_report() {
        let report = validator().validate_source("notes.md", "# notes");
        assert_eq!(report.count_kind(DetectionKind::AnalysisFailure), 1);
    }
}
