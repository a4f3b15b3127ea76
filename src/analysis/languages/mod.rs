//! Language-specific analyzer implementations.

mod python;
pub mod typescript;

pub use python::{canonical_annotation, PythonAnalyzer};
pub use typescript::{is_hook_name, BabelBridge, BridgeError, TypeScriptAnalyzer, REACT_HOOKS};

use std::path::Path;
use std::sync::Arc;

use super::model::Language;
use super::LanguageAnalyzer;

/// The analyzers of one scan, selected by file extension.
pub struct Analyzers {
    typescript: TypeScriptAnalyzer,
    python: PythonAnalyzer,
}

impl Analyzers {
    /// Script files go through `bridge` when one is given, else the fallback.
    pub fn new(bridge: Option<Arc<BabelBridge>>) -> Self {
        Self {
            typescript: TypeScriptAnalyzer::new(bridge),
            python: PythonAnalyzer::new(),
        }
    }

    /// Get the analyzer for a file, or `None` for unsupported extensions.
    pub fn for_path(&self, path: &Path) -> Option<&dyn LanguageAnalyzer> {
        match Language::from_path(path) {
            Language::TypeScript | Language::JavaScript => Some(&self.typescript),
            Language::Python => Some(&self.python),
            Language::Unknown => None,
        }
    }

    /// Whether script files are parsed through the bridge.
    pub fn has_bridge(&self) -> bool {
        self.typescript.has_bridge()
    }

    pub fn all(&self) -> [&dyn LanguageAnalyzer; 2] {
        [&self.typescript, &self.python]
    }

    /// Every file extension some analyzer handles.
    pub fn extensions(&self) -> Vec<&'static str> {
        self.all()
            .iter()
            .flat_map(|a| a.file_extensions().iter().copied())
            .collect()
    }
}

impl Default for Analyzers {
    fn default() -> Self {
        Self::new(None)
    }
}
