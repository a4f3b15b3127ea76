//! Module naming and import resolution.
//!
//! Decides whether an import points inside the repository and derives the
//! importable module name of each scanned file.

use phf::phf_set;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use super::model::{ImportRecord, Language};

/// Packages that are never part of the scanned repository.
static THIRD_PARTY: phf::Set<&'static str> = phf_set! {
    // React ecosystem
    "react", "react-dom", "react-router", "react-router-dom", "react-query",
    "react-hook-form", "react-table", "react-select", "react-spring", "framer-motion",
    // Meta-frameworks and bundlers
    "next", "gatsby", "remix", "@remix-run", "nuxt", "vite", "create-react-app",
    // State management
    "redux", "@reduxjs", "mobx", "zustand", "jotai", "recoil", "context",
    // UI libraries
    "antd", "@ant-design", "material-ui", "@mui", "chakra-ui", "@chakra-ui", "react-bootstrap",
    "semantic-ui-react", "styled-components", "@emotion", "tailwindcss",
    // Utilities
    "lodash", "ramda", "date-fns", "moment", "dayjs", "uuid", "classnames", "clsx",
    // HTTP and data
    "axios", "fetch", "swr", "apollo-client", "@apollo", "graphql", "socket.io-client", "ws",
    "@supabase", "@tanstack",
    // Tooling
    "typescript", "@types", "webpack", "rollup", "parcel", "babel", "@babel",
    "prettier", "eslint", "@typescript-eslint", "jest", "@testing-library",
    // Node built-ins
    "fs", "path", "os", "crypto", "buffer", "stream", "events", "util",
    "url", "querystring", "http", "https", "net", "cluster", "child_process", "node:fs",
    "node:path",
    // Common server packages
    "express", "fastify", "koa", "helmet", "cors", "morgan", "winston",
    "bcrypt", "jsonwebtoken", "passport", "nodemailer", "multer", "sharp",
    "dotenv", "config", "yup", "joi", "zod", "class-validator",
    // Python standard library
    "abc", "argparse", "ast", "asyncio", "base64", "collections", "contextlib", "copy",
    "csv", "dataclasses", "datetime", "decimal", "enum", "functools", "glob", "hashlib",
    "importlib", "inspect", "io", "itertools", "json", "logging", "math", "pathlib",
    "pickle", "random", "re", "shutil", "signal", "socket", "sqlite3", "string",
    "subprocess", "sys", "tempfile", "threading", "time", "traceback", "types",
    "typing", "unittest", "urllib", "warnings", "weakref",
    // Python third-party
    "numpy", "pandas", "requests", "httpx", "aiohttp", "pydantic", "fastapi", "flask",
    "django", "sqlalchemy", "pytest", "neo4j", "supabase", "yaml",
    "openai", "anthropic",
};

/// Leading directories that are not part of a Python module path.
const PYTHON_SOURCE_ROOTS: &[&str] = &["src", "lib", "source", "python", "pkg", "packages"];

/// Whether an import is likely internal to the repository.
///
/// Relative imports are internal. Known third-party packages are not.
/// Otherwise an import matching a discovered project module is internal,
/// and anything that does not look like a test double is assumed internal.
pub fn is_likely_internal(import: &str, project_modules: &HashSet<String>) -> bool {
    if import.is_empty() {
        return false;
    }
    if import.starts_with('.') || import.starts_with("@/") || import.starts_with("~/") {
        return true;
    }

    let base = package_root(import);
    if THIRD_PARTY.contains(base) || THIRD_PARTY.contains(import) {
        return false;
    }
    if project_modules.iter().any(|m| import.starts_with(m.as_str())) {
        return true;
    }

    let lower = base.to_lowercase();
    !["test", "mock", "fake"].iter().any(|t| lower.contains(t))
        && !base.starts_with('_')
        && base.chars().count() > 2
}

/// The package part of an import path: `@scope` for scoped packages,
/// otherwise the first `/` or `.` separated segment.
fn package_root(import: &str) -> &str {
    if import.starts_with('@') {
        return import.split('/').next().unwrap_or(import);
    }
    import
        .split(['/', '.'])
        .next()
        .unwrap_or(import)
}

/// Importable module name of a file, given its path relative to `root`.
pub fn module_name_for(root: &Path, rel_path: &str, language: Language) -> String {
    let rel_path = rel_path.replace('\\', "/");
    match language {
        Language::Python => python_module_name(root, &rel_path),
        _ => script_module_name(&rel_path),
    }
}

fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    }
}

fn script_module_name(rel_path: &str) -> String {
    let stem = strip_extension(rel_path);
    stem.strip_suffix("/index")
        .unwrap_or(stem)
        .to_string()
}

fn python_module_name(root: &Path, rel_path: &str) -> String {
    let stem = strip_extension(rel_path);
    let parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return String::new();
    }

    // Outermost directory carrying an `__init__.py` starts the package.
    let mut dir = root.to_path_buf();
    for (i, part) in parts[..parts.len() - 1].iter().enumerate() {
        dir.push(part);
        if dir.join("__init__.py").is_file() {
            return parts[i..].join(".");
        }
    }

    let start = parts
        .iter()
        .take(parts.len() - 1)
        .take_while(|p| PYTHON_SOURCE_ROOTS.contains(&p.to_lowercase().as_str()))
        .count();
    parts[start..].join(".")
}

/// Top-level module names of the scanned files, used as internal prefixes.
pub fn discover_project_modules<S: AsRef<str>>(root: &Path, rel_paths: &[S]) -> HashSet<String> {
    let mut modules = HashSet::new();
    for rel in rel_paths {
        let rel = rel.as_ref().replace('\\', "/");
        let language = Language::from_path(Path::new(&rel));

        let first = strip_extension(rel.split('/').next().unwrap_or(""));
        if !first.is_empty() {
            modules.insert(first.to_string());
        }
        if language == Language::Python {
            let name = python_module_name(root, &rel);
            if let Some(top) = name.split('.').next().filter(|t| !t.is_empty()) {
                modules.insert(top.to_string());
            }
        }
    }
    modules
}

/// Frameworks a file depends on, judged by what it imports.
pub fn detect_frameworks(imports: &[ImportRecord]) -> BTreeSet<String> {
    let mut frameworks = BTreeSet::new();
    for import in imports {
        let module = import.module.as_str();
        let root = package_root(module);
        let found: &[&str] = match root {
            "react" | "react-dom" | "react-native" => &["react"],
            "next" => &["next", "react"],
            "vue" | "nuxt" => &["vue"],
            "@angular" => &["angular"],
            "svelte" | "@sveltejs" => &["svelte"],
            "solid-js" => &["solid"],
            "@supabase" | "supabase" => &["supabase"],
            _ => &[],
        };
        frameworks.extend(found.iter().map(|f| f.to_string()));
    }
    frameworks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn modules(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_likely_internal() {
        let project = modules(&["components", "myapp"]);
        assert!(is_likely_internal("./Button", &project));
        assert!(is_likely_internal("../lib/db", &project));
        assert!(is_likely_internal("@/hooks/useAuth", &project));
        assert!(!is_likely_internal("react", &project));
        assert!(!is_likely_internal("react-dom/client", &project));
        assert!(!is_likely_internal("@mui/material", &project));
        assert!(!is_likely_internal("os.path", &project));
        assert!(is_likely_internal("myapp.services.billing", &project));
        assert!(!is_likely_internal("mock_server", &project));
        assert!(!is_likely_internal("_private", &project));
        assert!(!is_likely_internal("ab", &project));
        assert!(is_likely_internal("billing", &project));
        assert!(!is_likely_internal("", &project));
    }

    #[test]
    fn test_script_module_names() {
        let root = Path::new("/repo");
        assert_eq!(
            module_name_for(root, "src/components/Button.tsx", Language::TypeScript),
            "src/components/Button"
        );
        assert_eq!(
            module_name_for(root, "src/hooks/index.ts", Language::TypeScript),
            "src/hooks"
        );
    }

    #[test]
    fn test_python_module_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/myapp/services")).unwrap();
        fs::write(dir.path().join("src/myapp/__init__.py"), "").unwrap();
        fs::write(dir.path().join("src/myapp/services/__init__.py"), "").unwrap();

        assert_eq!(
            module_name_for(dir.path(), "src/myapp/services/billing.py", Language::Python),
            "myapp.services.billing"
        );
        // No packages: leading source roots are dropped.
        assert_eq!(
            module_name_for(dir.path(), "lib/tools/cli.py", Language::Python),
            "tools.cli"
        );
        assert_eq!(module_name_for(dir.path(), "main.py", Language::Python), "main");
    }

    #[test]
    fn test_discover_project_modules() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/myapp")).unwrap();
        fs::write(dir.path().join("src/myapp/__init__.py"), "").unwrap();

        let found = discover_project_modules(
            dir.path(),
            &["src/myapp/core.py", "components/Button.tsx", "app.ts"],
        );
        assert!(found.contains("src"));
        assert!(found.contains("myapp"));
        assert!(found.contains("components"));
        assert!(found.contains("app"));
    }

    #[test]
    fn test_detect_frameworks() {
        let import = |module: &str| ImportRecord {
            module: module.to_string(),
            imported_name: None,
            local_alias: None,
            is_default: false,
            is_namespace: false,
            is_internal: false,
            line: 1,
        };
        let found = detect_frameworks(&[
            import("next/router"),
            import("@supabase/supabase-js"),
            import("./local"),
        ]);
        let found: Vec<_> = found.iter().map(String::as_str).collect();
        assert_eq!(found, vec!["next", "react", "supabase"]);
    }
}
