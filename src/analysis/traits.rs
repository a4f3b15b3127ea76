//! Core traits for language analysis.

use super::context::AnalysisContext;
use super::model::{Language, ModuleAnalysis};

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// 1-based line of a node.
    pub fn line(&self, node: tree_sitter::Node) -> usize {
        node.start_position().row + 1
    }
}

/// Language-specific structural analyzer.
///
/// `analyze` never fails: anything that goes wrong while extracting is
/// recorded in [`ModuleAnalysis::errors`] and the caller gets whatever
/// could be recovered.
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create parsers
/// per call.
pub trait LanguageAnalyzer: Send + Sync {
    fn language(&self) -> Language;

    /// File extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Extract a [`ModuleAnalysis`] from one file's source.
    fn analyze(&self, rel_path: &str, source: &str, ctx: &AnalysisContext) -> ModuleAnalysis;

    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
