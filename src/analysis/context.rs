//! Per-scan analysis context and source file discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::model::Language;
use super::resolve;
use crate::config::AnalysisConfig;

/// Inputs shared by every file of one scan.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Repository root all relative paths are taken against.
    pub root: PathBuf,
    /// Top-level module names known to live in the repository.
    pub project_modules: HashSet<String>,
}

impl AnalysisContext {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            project_modules: HashSet::new(),
        }
    }

    /// Build a context whose project modules come from the given files.
    pub fn for_files<P: AsRef<Path>>(root: P, files: &[PathBuf]) -> Self {
        let mut ctx = Self::new(root);
        let rel: Vec<String> = files.iter().map(|f| ctx.relative_path(f)).collect();
        ctx.project_modules = resolve::discover_project_modules(&ctx.root, &rel);
        ctx
    }

    /// `/`-separated path relative to the root.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    pub fn is_internal(&self, import: &str) -> bool {
        resolve::is_likely_internal(import, &self.project_modules)
    }

    pub fn module_name(&self, rel_path: &str, language: Language) -> String {
        resolve::module_name_for(&self.root, rel_path, language)
    }
}

/// Build-tool config files that are never analyzed.
const BUILD_CONFIG_PREFIXES: &[&str] = &[
    "webpack", "vite", "next", "tailwind", "jest", "babel", "rollup", "eslint", "prettier",
    "postcss",
];

/// Whether a file name denotes a test or spec file.
pub fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let in_tests_dir = path
        .components()
        .any(|c| c.as_os_str() == "__tests__");

    in_tests_dir
        || (name.starts_with("test_") && name.ends_with(".py"))
        || name.ends_with("_test.py")
        || name.contains(".test.")
        || name.contains(".spec.")
}

fn is_build_config(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.contains(".config.")
        && BUILD_CONFIG_PREFIXES
            .iter()
            .any(|p| name.starts_with(p))
}

/// Collect analyzable source files under `root`, sorted by path.
///
/// A single file is returned as-is when its language is supported.
pub fn collect_files(root: &Path, config: &AnalysisConfig) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        let supported = Language::from_path(root) != Language::Unknown;
        return Ok(if supported { vec![root.to_path_buf()] } else { Vec::new() });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !config.skip_dirs.iter().any(|d| *d == name)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if Language::from_path(path) == Language::Unknown {
            continue;
        }
        if !config.include_test_files && is_test_file(path) {
            continue;
        }
        if is_build_config(path) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if config.is_path_excluded(rel) {
            continue;
        }
        if entry.metadata().map(|m| m.len()).unwrap_or(0) > config.max_file_size {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_files_filters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "src/App.tsx", "export const App = () => null;");
        touch(root, "src/App.test.tsx", "");
        touch(root, "src/__tests__/util.ts", "");
        touch(root, "src/generated/api.ts", "");
        touch(root, "node_modules/react/index.js", "");
        touch(root, "vite.config.ts", "");
        touch(root, "app/services.py", "def run():\n    pass\n");
        touch(root, "app/test_services.py", "");
        touch(root, "README.md", "");
        touch(root, "big.js", &"x".repeat(2_000));

        let mut config = AnalysisConfig::default();
        config.excluded_paths = vec!["**/generated/**".into()];
        config.max_file_size = 1_000;

        let files = collect_files(root, &config).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["app/services.py", "src/App.tsx"]);

        config.include_test_files = true;
        let with_tests = collect_files(root, &config).unwrap();
        assert_eq!(with_tests.len(), 5);
    }

    #[test]
    fn test_context_relative_paths_and_modules() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let files = vec![root.join("src/App.tsx"), root.join("lib/db.py")];
        let ctx = AnalysisContext::for_files(root, &files);

        assert_eq!(ctx.relative_path(&files[0]), "src/App.tsx");
        assert!(ctx.project_modules.contains("src"));
        assert!(ctx.project_modules.contains("db"));
        assert!(ctx.is_internal("lib.db"));
        assert!(!ctx.is_internal("react"));
    }
}
