//! Configuration schema for groundcheck.
//!
//! Loaded from `groundcheck.yaml`; every section is optional. Credentials can
//! be supplied or overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::validate::{patterns, Severity};

/// Config file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["groundcheck.yaml", ".groundcheck.yaml"];

/// Commented template written by `groundcheck init`.
pub const TEMPLATE: &str = include_str!("templates/groundcheck.yaml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicit file, else a discovered one, else defaults; then
    /// apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(discover) {
            Some(path) => Self::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("error parsing {}: {}", path.display(), e))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GROUNDCHECK_NEO4J_URI") {
            self.graph.uri = v;
        }
        if let Some(v) = lookup("GROUNDCHECK_NEO4J_USER") {
            self.graph.user = v;
        }
        if let Some(v) = lookup("GROUNDCHECK_NEO4J_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = lookup("GROUNDCHECK_SCHEMA_URL") {
            self.schema.url = Some(v);
        }
        if let Some(v) = lookup("GROUNDCHECK_SCHEMA_KEY") {
            self.schema.api_key = Some(v);
        }
    }
}

/// Discover a config file in the current directory.
pub fn discover() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Glob patterns for paths to exclude (e.g. "**/generated/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub include_test_files: bool,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
    /// Worker threads; 0 means one per core.
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            excluded_paths: Vec::new(),
            include_test_files: false,
            max_file_size: default_max_file_size(),
            skip_dirs: default_skip_dirs(),
            workers: 0,
            bridge: BridgeConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus()
        } else {
            self.workers
        }
    }
}

fn default_max_file_size() -> u64 {
    500_000
}

fn default_skip_dirs() -> Vec<String> {
    [".git", "node_modules", "__pycache__", ".next", "dist", "build", "venv", ".venv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Out-of-process syntax tree producer for script files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_node_binary")]
    pub node_binary: String,
    #[serde(default = "default_parser_module")]
    pub parser_module: String,
    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
    /// Concurrent parser processes; 0 means twice the core count.
    #[serde(default)]
    pub max_concurrency: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            node_binary: default_node_binary(),
            parser_module: default_parser_module(),
            timeout_secs: default_bridge_timeout(),
            max_concurrency: 0,
        }
    }
}

impl BridgeConfig {
    pub fn concurrency(&self) -> usize {
        if self.max_concurrency == 0 {
            2 * num_cpus()
        } else {
            self.max_concurrency
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_node_binary() -> String {
    "node".to_string()
}

fn default_parser_module() -> String {
    "@babel/parser".to_string()
}

fn default_bridge_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_uri")]
    pub uri: String,
    #[serde(default = "default_graph_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_write_concurrency")]
    pub write_concurrency: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: String::new(),
            write_concurrency: default_write_concurrency(),
        }
    }
}

fn default_graph_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_graph_user() -> String {
    "neo4j".to_string()
}

fn default_write_concurrency() -> usize {
    16
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_schema_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_schema_concurrency")]
    pub max_concurrency: usize,
    /// Tables probed when metadata queries are unavailable.
    #[serde(default = "default_probe_tables")]
    pub probe_tables: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_ms: default_schema_timeout(),
            max_concurrency: default_schema_concurrency(),
            probe_tables: default_probe_tables(),
        }
    }
}

impl SchemaConfig {
    /// Whether enough is configured to reach the backend.
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
            && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

fn default_schema_timeout() -> u64 {
    10_000
}

fn default_schema_concurrency() -> usize {
    4
}

fn default_probe_tables() -> Vec<String> {
    ["users", "profiles", "posts", "comments", "logs", "settings"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Pattern rule ids to skip.
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    #[serde(default = "default_max_component_props")]
    pub max_component_props: usize,
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default = "default_rpc_severity")]
    pub rpc_default_severity: String,
    /// Previously exported catalog to use instead of introspection.
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            disabled_rules: Vec::new(),
            max_component_props: default_max_component_props(),
            min_confidence: 0.0,
            rpc_default_severity: default_rpc_severity(),
            catalog_file: None,
        }
    }
}

impl ValidationConfig {
    pub fn rpc_severity(&self) -> Severity {
        Severity::from_label(&self.rpc_default_severity)
    }
}

fn default_max_component_props() -> usize {
    10
}

fn default_rpc_severity() -> String {
    "HIGH".to_string()
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.analysis.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    let severity = &config.validation.rpc_default_severity;
    if severity.parse::<Severity>().is_err() {
        anyhow::bail!(
            "invalid rpc_default_severity {:?}, must be one of CRITICAL, HIGH, MEDIUM, LOW, INFO",
            severity
        );
    }

    let min = config.validation.min_confidence;
    if !(0.0..=1.0).contains(&min) {
        anyhow::bail!("min_confidence must be between 0 and 1, got {}", min);
    }

    let known = patterns::rule_ids();
    for id in &config.validation.disabled_rules {
        if !known.contains(&id.as_str()) {
            anyhow::bail!("unknown rule id {:?} in disabled_rules", id);
        }
    }

    if config.analysis.bridge.timeout_secs == 0 {
        anyhow::bail!("analysis.bridge.timeout_secs must be positive");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config_defaults() {
        let yaml = r#"
name: "webapp"
validation:
  disabled_rules: [eval_usage]
  min_confidence: 0.7
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "webapp");
        assert_eq!(config.analysis.max_file_size, 500_000);
        assert!(config.analysis.skip_dirs.contains(&"node_modules".to_string()));
        assert!(config.analysis.bridge.enabled);
        assert_eq!(config.analysis.bridge.timeout_secs, 30);
        assert_eq!(config.graph.write_concurrency, 16);
        assert_eq!(config.schema.probe_tables.len(), 6);
        assert_eq!(config.validation.max_component_props, 10);
        assert_eq!(config.validation.rpc_severity(), Severity::High);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_template_parses_and_validates() {
        let config: Config = serde_yaml::from_str(TEMPLATE).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.analysis.excluded_paths = vec!["[".into()];
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.validation.rpc_default_severity = "SEVERE".into();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.validation.min_confidence = 1.5;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.validation.disabled_rules = vec!["no_such_rule".into()];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("no_such_rule"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: Config =
            serde_yaml::from_str("graph:\n  uri: bolt://file:7687\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("GROUNDCHECK_NEO4J_URI", "bolt://env:7687"),
            ("GROUNDCHECK_SCHEMA_URL", "https://db.example.test"),
            ("GROUNDCHECK_SCHEMA_KEY", "anon"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.graph.uri, "bolt://env:7687");
        assert_eq!(config.graph.user, "neo4j");
        assert!(config.schema.is_configured());
    }

    #[test]
    fn test_excluded_paths() {
        let mut config = AnalysisConfig::default();
        config.excluded_paths = vec!["**/generated/**".into()];
        assert!(config.is_path_excluded(Path::new("src/generated/api.ts")));
        assert!(!config.is_path_excluded(Path::new("src/api.ts")));
    }
}
