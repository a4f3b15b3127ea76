//! Structural analysis of source files.
//!
//! Every supported file is reduced to a [`ModuleAnalysis`]: imports,
//! functions, classes, UI components, hook calls, call sites and exports,
//! all with 1-based line numbers. Downstream stages never look at syntax
//! trees directly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌────────────────┐
//! │ Source files │────▶│ Analyzers          │────▶│ ModuleAnalysis │
//! └──────────────┘     │  .ts/.tsx/.js/.jsx │     └────────────────┘
//!                      │   bridge → walker  │             │
//!                      │   (regex fallback) │             ▼
//!                      │  .py  tree-sitter  │     graph / validate
//!                      └────────────────────┘
//! ```
//!
//! Analysis never fails for a readable file: parse problems are recorded in
//! [`ModuleAnalysis::errors`]. Only I/O errors surface as failures.

mod context;
pub mod languages;
pub mod model;
pub mod resolve;
mod traits;

pub use context::{collect_files, is_test_file, AnalysisContext};
pub use languages::{
    canonical_annotation, is_hook_name, Analyzers, BabelBridge, BridgeError, PythonAnalyzer,
    TypeScriptAnalyzer, REACT_HOOKS,
};
pub use model::{
    AttributeRecord, CallRecord, ClassRecord, ComponentKind, ComponentRecord, FunctionRecord,
    HookCallRecord, ImportRecord, Language, ModuleAnalysis, ParameterKind, ParameterRecord,
    TypeDeclRecord, Visibility,
};
pub use resolve::{detect_frameworks, discover_project_modules, is_likely_internal, module_name_for};
pub use traits::{LanguageAnalyzer, ParsedFile};

use anyhow::{anyhow, bail, Context};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;

/// A file that could not be analyzed at all.
#[derive(Debug, Clone)]
pub struct AnalysisFailure {
    pub path: String,
    pub error: String,
}

/// Result of analyzing a set of files.
#[derive(Debug, Default)]
pub struct AnalysisBatch {
    /// Analyses in input order.
    pub analyses: Vec<ModuleAnalysis>,
    pub failures: Vec<AnalysisFailure>,
}

impl AnalysisBatch {
    pub fn fallback_count(&self) -> usize {
        self.analyses.iter().filter(|a| a.used_fallback).count()
    }
}

/// Build the analyzers for a scan rooted at `root`.
///
/// The bridge is probed once; a bridge that cannot be set up or started is
/// logged and replaced by the fallback.
pub fn analyzers_for(config: &AnalysisConfig, root: &Path) -> Analyzers {
    if !config.bridge.enabled {
        return Analyzers::new(None);
    }
    let bridge = BabelBridge::new(&config.bridge).map(|b| b.with_working_dir(root));
    match bridge.and_then(|b| b.probe().map(|_| b)) {
        Ok(bridge) => Analyzers::new(Some(Arc::new(bridge))),
        Err(e) => {
            warn!(error = %e, "parser bridge unavailable, script files use the fallback extractor");
            Analyzers::new(None)
        }
    }
}

/// Run `f`, turning a panic into its message.
///
/// Used at per-file and per-rule boundaries so one bad input cannot unwind
/// through a whole batch.
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

/// Analyze in-memory source. `None` when no analyzer handles the path.
pub fn analyze_source(
    analyzers: &Analyzers,
    ctx: &AnalysisContext,
    rel_path: &str,
    source: &str,
) -> Option<ModuleAnalysis> {
    let analyzer = analyzers.for_path(Path::new(rel_path))?;
    Some(analyzer.analyze(rel_path, source, ctx))
}

/// Read and analyze one file.
pub fn analyze_file(
    analyzers: &Analyzers,
    ctx: &AnalysisContext,
    path: &Path,
) -> anyhow::Result<ModuleAnalysis> {
    let rel_path = ctx.relative_path(path);
    let Some(analyzer) = analyzers.for_path(path) else {
        bail!("unsupported file type: {}", rel_path);
    };
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let source = String::from_utf8_lossy(&bytes);

    let analysis = catch_panic(|| analyzer.analyze(&rel_path, &source, ctx))
        .map_err(|msg| anyhow!("analyzer panicked on {}: {}", rel_path, msg))?;
    if analysis.used_fallback && analysis.has_errors() {
        debug!(path = %rel_path, errors = analysis.errors.len(), "analyzed with fallback");
    }
    Ok(analysis)
}

/// Analyze `paths` on a pool of `workers` threads (0 = one per core).
///
/// A file that fails is logged and reported in
/// [`AnalysisBatch::failures`]; the others still complete.
pub fn analyze_files(
    analyzers: &Analyzers,
    ctx: &AnalysisContext,
    paths: &[PathBuf],
    workers: usize,
    progress: Option<&ProgressBar>,
) -> anyhow::Result<AnalysisBatch> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to build analysis worker pool")?;

    let results: Vec<Result<ModuleAnalysis, AnalysisFailure>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let result = analyze_file(analyzers, ctx, path).map_err(|e| {
                    let failure = AnalysisFailure {
                        path: ctx.relative_path(path),
                        error: format!("{:#}", e),
                    };
                    warn!(path = %failure.path, error = %failure.error, "analysis failed");
                    failure
                });
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                result
            })
            .collect()
    });

    let mut batch = AnalysisBatch::default();
    for result in results {
        match result {
            Ok(analysis) => batch.analyses.push(analysis),
            Err(failure) => batch.failures.push(failure),
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_files_mixed_languages() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(
            root.join("src/Hello.tsx"),
            "export const Hello = ({ name }: { name: string }) => <p>{name}</p>;\n",
        )
        .unwrap();
        fs::write(root.join("app/util.py"), "def greet(name: str) -> str:\n    return name\n")
            .unwrap();

        let files = collect_files(root, &AnalysisConfig::default()).unwrap();
        let ctx = AnalysisContext::for_files(root, &files);
        let batch = analyze_files(&Analyzers::default(), &ctx, &files, 2, None).unwrap();

        assert!(batch.failures.is_empty());
        assert_eq!(batch.analyses.len(), 2);
        assert_eq!(batch.analyses[0].path, "app/util.py");
        assert_eq!(batch.analyses[0].functions[0].name, "greet");
        assert_eq!(batch.analyses[1].components[0].name, "Hello");
        assert_eq!(batch.fallback_count(), 1);
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("ok.py"), "def ok():\n    pass\n").unwrap();
        let files = vec![root.join("ok.py"), root.join("gone.py")];
        let ctx = AnalysisContext::new(root);

        let batch = analyze_files(&Analyzers::default(), &ctx, &files, 1, None).unwrap();
        assert_eq!(batch.analyses.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].path, "gone.py");
    }

    #[test]
    fn test_unusable_bridge_falls_back_once() {
        let dir = TempDir::new().unwrap();
        let mut config = AnalysisConfig::default();
        config.bridge.node_binary = "groundcheck-no-such-node-binary".into();

        let analyzers = analyzers_for(&config, dir.path());
        assert!(!analyzers.has_bridge());

        let ctx = AnalysisContext::new(dir.path());
        let analysis = analyze_source(&analyzers, &ctx, "src/A.tsx", "export const A = () => null;\n").unwrap();
        assert!(analysis.used_fallback);
        assert!(analysis.errors.is_empty());

        config.bridge.enabled = false;
        assert!(!analyzers_for(&config, dir.path()).has_bridge());
    }

    #[test]
    fn test_catch_panic() {
        assert_eq!(catch_panic(|| 7), Ok(7));
        assert_eq!(catch_panic(|| -> usize { panic!("bad offset") }), Err("bad offset".to_string()));
        let n = 3;
        let formatted: Result<(), String> = catch_panic(|| panic!("index {} out of range", n));
        assert_eq!(formatted, Err("index 3 out of range".to_string()));
    }

    #[test]
    fn test_analyze_source_unsupported() {
        let ctx = AnalysisContext::new("/repo");
        assert!(analyze_source(&Analyzers::default(), &ctx, "notes.md", "# hi").is_none());
    }
}
