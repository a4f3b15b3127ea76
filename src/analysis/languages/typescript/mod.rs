//! TypeScript / JavaScript analyzer.
//!
//! Sources are parsed out of process by [`BabelBridge`] and the resulting
//! program tree is walked in [`estree`]. When the bridge is disabled or a
//! parse fails, the line-oriented [`fallback`] extractor runs instead and
//! the analysis is flagged with `used_fallback`.

pub mod bridge;
pub mod estree;
pub mod fallback;

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub use bridge::{BabelBridge, BridgeError};

use crate::analysis::context::AnalysisContext;
use crate::analysis::model::{Language, ModuleAnalysis};
use crate::analysis::traits::LanguageAnalyzer;

/// Built-in React hooks.
pub const REACT_HOOKS: &[&str] = &[
    "useState",
    "useEffect",
    "useContext",
    "useReducer",
    "useCallback",
    "useMemo",
    "useRef",
    "useImperativeHandle",
    "useLayoutEffect",
    "useDebugValue",
    "useDeferredValue",
    "useTransition",
    "useId",
    "useSyncExternalStore",
    "useInsertionEffect",
    "useOptimistic",
];

/// Built-in hooks and anything following the `useXxx` convention.
pub fn is_hook_name(name: &str) -> bool {
    REACT_HOOKS.contains(&name)
        || (name.len() > 3
            && name.starts_with("use")
            && name[3..].starts_with(|c: char| c.is_ascii_uppercase()))
}

pub struct TypeScriptAnalyzer {
    bridge: Option<Arc<BabelBridge>>,
}

impl TypeScriptAnalyzer {
    pub fn new(bridge: Option<Arc<BabelBridge>>) -> Self {
        Self { bridge }
    }

    /// Analyzer that only ever uses the line-oriented extractor.
    pub fn fallback_only() -> Self {
        Self { bridge: None }
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn analyze(&self, rel_path: &str, source: &str, ctx: &AnalysisContext) -> ModuleAnalysis {
        let language = match Language::from_path(Path::new(rel_path)) {
            Language::JavaScript => Language::JavaScript,
            _ => Language::TypeScript,
        };
        let mut out = ModuleAnalysis::new(rel_path, ctx.module_name(rel_path, language), language);
        out.line_count = source.lines().count();

        if let Some(bridge) = &self.bridge {
            match bridge.parse(source) {
                Ok(program) => {
                    let mut analysis = estree::extract(&program, ctx, out);
                    analysis.finalize();
                    return analysis;
                }
                Err(e) => {
                    debug!(path = rel_path, error = %e, "parser bridge failed, using fallback");
                    out.errors.push(format!("{}: {}", rel_path, e));
                }
            }
        }

        let mut analysis = fallback::extract(source, ctx, out);
        analysis.used_fallback = true;
        analysis.finalize();
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[test]
    fn test_hook_names() {
        assert!(is_hook_name("useState"));
        assert!(is_hook_name("useAuth"));
        assert!(!is_hook_name("user"));
        assert!(!is_hook_name("use"));
        assert!(!is_hook_name("useless_thing"));
    }

    #[test]
    fn test_fallback_only_analysis() {
        let analyzer = TypeScriptAnalyzer::fallback_only();
        let ctx = AnalysisContext::new("/repo");
        let analysis = analyzer.analyze(
            "src/components/Button.jsx",
            "export function Button({ label }) { return <button>{label}</button>; }\n",
            &ctx,
        );

        assert!(analysis.used_fallback);
        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.language(), Language::JavaScript);
        assert_eq!(analysis.module_name, "src/components/Button");
        assert_eq!(analysis.components[0].name, "Button");
        assert_eq!(analysis.line_count, 1);
    }

    #[test]
    fn test_bridge_failure_records_error_and_falls_back() {
        let config = BridgeConfig {
            node_binary: "groundcheck-no-such-node-binary".into(),
            ..BridgeConfig::default()
        };
        let bridge = Arc::new(BabelBridge::new(&config).unwrap());
        let analyzer = TypeScriptAnalyzer::new(Some(bridge));
        let ctx = AnalysisContext::new("/repo");

        let analysis = analyzer.analyze("src/Broken.tsx", "export const Broken = ( => {", &ctx);
        assert!(analysis.used_fallback);
        assert_eq!(analysis.errors.len(), 1);
        assert!(analysis.errors[0].starts_with("src/Broken.tsx"));
    }
}
