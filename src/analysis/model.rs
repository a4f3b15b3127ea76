//! Normalized entity model produced by every language analyzer.
//!
//! A [`ModuleAnalysis`] is the only thing downstream stages (graph builder,
//! validators) ever see of a source file, so both the Babel walker and the
//! tree-sitter walker converge on these records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Source language of an analyzed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Unknown,
}

impl Language {
    /// Determine the language from a file extension (without dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" => Language::Python,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Unknown => "unknown",
        }
    }

    /// Whether the component-oriented (JSX/TSX) walker handles this language.
    pub fn is_script(&self) -> bool {
        matches!(self, Language::TypeScript | Language::JavaScript)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One import binding.
///
/// Side-effect imports (`import './styles.css'`) produce a record with no
/// imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub module: String,
    pub imported_name: Option<String>,
    pub local_alias: Option<String>,
    pub is_default: bool,
    pub is_namespace: bool,
    /// Whether the module resolves inside the repository.
    pub is_internal: bool,
    pub line: usize,
}

impl ImportRecord {
    /// The name this import binds in the importing file.
    pub fn local_name(&self) -> Option<&str> {
        self.local_alias
            .as_deref()
            .or(self.imported_name.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Positional,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Positional => "positional",
            ParameterKind::VarPositional => "var_positional",
            ParameterKind::KeywordOnly => "keyword_only",
            ParameterKind::VarKeyword => "var_keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRecord {
    pub name: String,
    /// Canonical annotation string, e.g. `Dict[str, Any]` or `string[]`.
    #[serde(rename = "type")]
    pub type_annotation: String,
    pub optional: bool,
    pub default: Option<String>,
    pub kind: ParameterKind,
}

impl ParameterRecord {
    pub fn positional(name: impl Into<String>, type_annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: type_annotation.into(),
            optional: false,
            default: None,
            kind: ParameterKind::Positional,
        }
    }

    /// Compact `name: type` rendering used in graph properties.
    pub fn signature(&self) -> String {
        let prefix = match self.kind {
            ParameterKind::VarPositional => "*",
            ParameterKind::VarKeyword => "**",
            _ => "",
        };
        let mut out = format!("{}{}: {}", prefix, self.name, self.type_annotation);
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub name: String,
    pub parameters: Vec<ParameterRecord>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub is_exported: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_annotation: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub name: String,
    pub methods: Vec<FunctionRecord>,
    pub attributes: Vec<AttributeRecord>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub is_exported: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Function,
    Class,
    Arrow,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Function => "function",
            ComponentKind::Class => "class",
            ComponentKind::Arrow => "arrow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub name: String,
    pub kind: ComponentKind,
    pub props: Vec<String>,
    pub hooks_used: Vec<String>,
    pub is_exported: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookCallRecord {
    pub hook_name: String,
    pub args: Vec<String>,
    pub bound_variable: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub callee_name: String,
    pub receiver_name: Option<String>,
    pub args: Vec<String>,
    pub line: usize,
}

/// A TypeScript `interface` or `type` alias declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDeclRecord {
    pub name: String,
    pub type_parameters: Option<String>,
    pub is_exported: bool,
    pub line: usize,
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAnalysis {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub module_name: String,
    pub language: Option<Language>,
    pub imports: Vec<ImportRecord>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub components: Vec<ComponentRecord>,
    pub hook_calls: Vec<HookCallRecord>,
    pub calls: Vec<CallRecord>,
    pub interfaces: Vec<TypeDeclRecord>,
    pub type_aliases: Vec<TypeDeclRecord>,
    pub exports: Vec<String>,
    pub line_count: usize,
    /// Non-fatal problems met while extracting (parse errors, bridge failures).
    pub errors: Vec<String>,
    /// Set when the low-fidelity regex pass produced this analysis.
    pub used_fallback: bool,
}

impl ModuleAnalysis {
    pub fn new(path: impl Into<String>, module_name: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            module_name: module_name.into(),
            language: Some(language),
            ..Default::default()
        }
    }

    pub fn language(&self) -> Language {
        self.language.unwrap_or(Language::Unknown)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Internal imports only.
    pub fn internal_imports(&self) -> impl Iterator<Item = &ImportRecord> {
        self.imports.iter().filter(|i| i.is_internal)
    }

    /// Whether a top-level name is exported from this module.
    pub fn is_exported(&self, name: &str) -> bool {
        self.exports.iter().any(|e| e == name)
    }

    /// Sort every list into source order and drop repeated declarations.
    ///
    /// Keeps the first declaration of each (name, kind) pair, so graph keys
    /// derived from this analysis are unique within the file.
    pub fn finalize(&mut self) {
        self.imports.sort_by_key(|i| i.line);
        self.hook_calls.sort_by_key(|h| h.line);
        self.calls.sort_by_key(|c| c.line);

        dedup_by_name(&mut self.functions, |f| &f.name, |f| f.line);
        dedup_by_name(&mut self.classes, |c| &c.name, |c| c.line);
        dedup_by_name(&mut self.components, |c| &c.name, |c| c.line);
        dedup_by_name(&mut self.interfaces, |t| &t.name, |t| t.line);
        dedup_by_name(&mut self.type_aliases, |t| &t.name, |t| t.line);

        for class in &mut self.classes {
            dedup_by_name(&mut class.methods, |m| &m.name, |m| m.line);
            dedup_by_name(&mut class.attributes, |a| &a.name, |a| a.line);
        }
        for component in &mut self.components {
            dedup_strings(&mut component.hooks_used);
            dedup_strings(&mut component.props);
        }
        dedup_strings(&mut self.exports);
    }
}

fn dedup_by_name<T>(items: &mut Vec<T>, name: impl Fn(&T) -> &String, line: impl Fn(&T) -> usize) {
    items.sort_by_key(|item| line(item));
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(name(item).clone()));
}

fn dedup_strings(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|s| !s.is_empty() && seen.insert(s.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, line: usize) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            parameters: vec![],
            return_type: None,
            is_async: false,
            is_exported: false,
            line,
        }
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("mjs"), Language::JavaScript);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("rb"), Language::Unknown);
        assert!(Language::from_path(Path::new("src/App.jsx")).is_script());
    }

    #[test]
    fn test_finalize_sorts_and_dedups() {
        let mut analysis = ModuleAnalysis::new("a.ts", "a", Language::TypeScript);
        analysis.functions = vec![function("b", 9), function("a", 2), function("b", 4)];
        analysis.exports = vec!["a".into(), "a".into(), "b".into()];
        analysis.finalize();

        let names: Vec<_> = analysis.functions.iter().map(|f| (f.name.as_str(), f.line)).collect();
        assert_eq!(names, vec![("a", 2), ("b", 4)]);
        assert_eq!(analysis.exports, vec!["a", "b"]);
    }

    #[test]
    fn test_parameter_signature() {
        let mut p = ParameterRecord::positional("kwargs", "Dict[str, Any]");
        p.kind = ParameterKind::VarKeyword;
        assert_eq!(p.signature(), "**kwargs: Dict[str, Any]");

        let mut q = ParameterRecord::positional("limit", "int");
        q.default = Some("10".into());
        assert_eq!(q.signature(), "limit: int = 10");
    }
}
