//! Writes module analyses and schema catalogs into a [`GraphStore`].

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::keys;
use super::store::{GraphStore, Label, NodeRef, NodeSpec, Rel};
use super::GraphError;
use crate::analysis::{ClassRecord, ComponentRecord, ImportRecord, Language, ModuleAnalysis};
use crate::schema::SchemaCatalog;

/// Deletion order for a repository: children before parents.
const CLEAR_ORDER: &[(&[Rel], Label)] = &[
    (&[Rel::Contains, Rel::Defines, Rel::HasMethod], Label::Method),
    (&[Rel::Contains, Rel::Defines, Rel::HasAttribute], Label::Attribute),
    (&[Rel::Contains, Rel::Defines, Rel::UsesHook], Label::Hook),
    (&[Rel::Contains, Rel::Defines, Rel::HasProps], Label::Props),
    (&[Rel::Contains, Rel::Defines], Label::Interface),
    (&[Rel::Contains, Rel::Defines], Label::TypeDefinition),
    (&[Rel::Contains, Rel::Defines], Label::Function),
    (&[Rel::Contains, Rel::Defines], Label::Component),
    (&[Rel::Contains, Rel::Defines], Label::Class),
    (&[Rel::Contains], Label::File),
    (&[], Label::Repository),
];

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub nodes_merged: usize,
    pub edges_merged: usize,
    /// Merges that created a node rather than matching one.
    pub nodes_created: usize,
    pub edges_created: usize,
}

impl IngestStats {
    fn absorb(&mut self, other: &IngestStats) {
        self.nodes_merged += other.nodes_merged;
        self.edges_merged += other.edges_merged;
        self.nodes_created += other.nodes_created;
        self.edges_created += other.edges_created;
    }
}

/// Sequential writer for one file (or one catalog), tallying merges.
struct Writer<'a> {
    store: &'a dyn GraphStore,
    stats: IngestStats,
}

impl<'a> Writer<'a> {
    fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            stats: IngestStats::default(),
        }
    }

    async fn node(&mut self, spec: NodeSpec) -> Result<NodeRef, GraphError> {
        let created = self.store.merge_node(&spec).await?;
        self.stats.nodes_merged += 1;
        if created {
            self.stats.nodes_created += 1;
        }
        Ok(spec.node)
    }

    async fn edge(&mut self, from: &NodeRef, rel: Rel, to: &NodeRef) -> Result<(), GraphError> {
        let created = self.store.merge_edge(from, rel, to).await?;
        self.stats.edges_merged += 1;
        if created {
            self.stats.edges_created += 1;
        }
        Ok(())
    }

    /// Merge `spec` and link it under `parent`.
    async fn child(&mut self, parent: &NodeRef, rel: Rel, spec: NodeSpec) -> Result<NodeRef, GraphError> {
        let node = self.node(spec).await?;
        self.edge(parent, rel, &node).await?;
        Ok(node)
    }
}

/// Module name → file key, for resolving `IMPORTS` edges.
struct ModuleIndex {
    files: HashMap<String, String>,
}

impl ModuleIndex {
    fn build(repository: &str, analyses: &[ModuleAnalysis]) -> Self {
        let mut files = HashMap::new();
        for analysis in analyses {
            let Ok(file_id) = keys::file_id(repository, &analysis.path) else {
                continue;
            };
            let name = analysis.module_name.as_str();
            if let Some(package) = name.strip_suffix(".__init__") {
                files.insert(package.to_string(), file_id.clone());
            }
            files.insert(name.to_string(), file_id);
        }
        Self { files }
    }

    fn resolve(&self, from: &ModuleAnalysis, import: &ImportRecord) -> Option<&str> {
        let candidates = match from.language() {
            Language::Python => python_candidates(from, import),
            _ => script_candidates(from, import),
        };
        candidates
            .iter()
            .find_map(|c| self.files.get(c))
            .map(String::as_str)
    }
}

fn python_candidates(from: &ModuleAnalysis, import: &ImportRecord) -> Vec<String> {
    let module = import.module.as_str();
    let dots = module.chars().take_while(|c| *c == '.').count();
    let base = if dots == 0 {
        module.to_string()
    } else {
        let mut package: Vec<&str> = from.module_name.split('.').collect();
        if !from.path.ends_with("__init__.py") {
            package.pop();
        }
        for _ in 1..dots {
            package.pop();
        }
        let rest = &module[dots..];
        if !rest.is_empty() {
            package.push(rest);
        }
        package.join(".")
    };
    let mut out = Vec::new();
    if let Some(name) = import.imported_name.as_deref().filter(|n| *n != "*") {
        out.push(if base.is_empty() { name.to_string() } else { format!("{}.{}", base, name) });
    }
    if !base.is_empty() {
        out.push(base);
    }
    out
}

fn script_candidates(from: &ModuleAnalysis, import: &ImportRecord) -> Vec<String> {
    let module = import.module.as_str();
    let joined = if module.starts_with('.') {
        let dir = from.path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        format!("{}/{}", dir, module)
    } else if let Some(rest) = module.strip_prefix("@/").or_else(|| module.strip_prefix("~/")) {
        format!("src/{}", rest)
    } else {
        module.to_string()
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    let normalized = parts.join("/");
    let stem = ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
        .iter()
        .find_map(|ext| normalized.strip_suffix(&format!(".{}", ext)))
        .unwrap_or(&normalized);
    let stem = stem.strip_suffix("/index").unwrap_or(stem);
    vec![stem.to_string()]
}

pub struct GraphBuilder {
    store: Arc<dyn GraphStore>,
    write_concurrency: usize,
}

impl GraphBuilder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            write_concurrency: 16,
        }
    }

    pub fn with_write_concurrency(mut self, n: usize) -> Self {
        self.write_concurrency = n.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Declare uniqueness constraints and name indexes. Safe to repeat.
    pub async fn initialize(&self) -> Result<(), GraphError> {
        for label in Label::ALL {
            self.store.ensure_constraint(label).await?;
        }
        for label in Label::NAME_INDEXED {
            self.store.ensure_name_index(label).await?;
        }
        debug!(constraints = Label::ALL.len(), "graph schema declared");
        Ok(())
    }

    /// Merge the repository and every analysis into the graph.
    ///
    /// The repository node is required; a file whose writes fail is logged,
    /// counted in `files_failed`, and skipped.
    pub async fn ingest(&self, repository: &str, analyses: &[ModuleAnalysis]) -> Result<IngestStats, GraphError> {
        let mut stats = IngestStats::default();
        let repo = {
            let mut writer = Writer::new(self.store.as_ref());
            let spec = NodeSpec::new(Label::Repository, keys::repository_id(repository)?)
                .prop("name", repository);
            let node = writer.node(spec).await?;
            stats.absorb(&writer.stats);
            node
        };

        let index = ModuleIndex::build(repository, analyses);
        let index = &index;
        let repo = &repo;

        let results: Vec<(usize, Result<IngestStats, GraphError>)> = stream::iter(analyses.iter().enumerate())
            .map(|(i, analysis)| async move { (i, self.write_file(repository, repo, analysis).await) })
            .buffer_unordered(self.write_concurrency)
            .collect()
            .await;

        let mut written = HashSet::new();
        for (i, result) in results {
            match result {
                Ok(file_stats) => {
                    stats.absorb(&file_stats);
                    stats.files_processed += 1;
                    written.insert(analyses[i].path.as_str());
                }
                Err(e) => {
                    warn!(path = %analyses[i].path, error = %e, "failed to ingest file");
                    stats.files_failed += 1;
                }
            }
        }

        // Imports need both ends present, so they go in after every file.
        let written_keys: HashSet<String> = written
            .iter()
            .filter_map(|path| keys::file_id(repository, path).ok())
            .collect();
        for analysis in analyses.iter().filter(|a| written.contains(a.path.as_str())) {
            match self.write_imports(repository, analysis, index, &written_keys).await {
                Ok(import_stats) => stats.absorb(&import_stats),
                Err(e) => warn!(path = %analysis.path, error = %e, "failed to link imports"),
            }
        }

        info!(
            repository,
            files = stats.files_processed,
            failed = stats.files_failed,
            nodes = stats.nodes_merged,
            edges = stats.edges_merged,
            "ingest complete"
        );
        Ok(stats)
    }

    async fn write_file(&self, repository: &str, repo: &NodeRef, analysis: &ModuleAnalysis) -> Result<IngestStats, GraphError> {
        let mut w = Writer::new(self.store.as_ref());
        let file_key = keys::file_id(repository, &analysis.path)?;
        let name = analysis.path.rsplit('/').next().unwrap_or(&analysis.path);
        let file = w
            .child(
                repo,
                Rel::Contains,
                NodeSpec::new(Label::File, file_key.clone())
                    .prop("name", name)
                    .prop("path", analysis.path.as_str())
                    .prop("module_name", analysis.module_name.as_str())
                    .prop("language", analysis.language().as_str())
                    .prop("line_count", analysis.line_count)
                    .prop("exports", analysis.exports.clone())
                    .prop("used_fallback", analysis.used_fallback),
            )
            .await?;

        for function in &analysis.functions {
            let params: Vec<String> = function.parameters.iter().map(|p| p.signature()).collect();
            w.child(
                &file,
                Rel::Defines,
                NodeSpec::new(Label::Function, keys::function_id(&file_key, &function.name)?)
                    .prop("name", function.name.as_str())
                    .prop("params", params)
                    .opt_prop("return_type", function.return_type.clone())
                    .prop("is_async", function.is_async)
                    .prop("is_exported", function.is_exported)
                    .prop("line", function.line),
            )
            .await?;
        }

        for class in &analysis.classes {
            self.write_class(&mut w, &file, &file_key, class).await?;
        }

        for component in &analysis.components {
            self.write_component(&mut w, &file, &file_key, component, analysis).await?;
        }

        for (records, label) in [(&analysis.interfaces, Label::Interface), (&analysis.type_aliases, Label::TypeDefinition)] {
            for decl in records {
                let key = if label == Label::Interface {
                    keys::interface_id(&file_key, &decl.name)?
                } else {
                    keys::type_id(&file_key, &decl.name)?
                };
                w.child(
                    &file,
                    Rel::Defines,
                    NodeSpec::new(label, key)
                        .prop("name", decl.name.as_str())
                        .opt_prop("type_parameters", decl.type_parameters.clone())
                        .prop("is_exported", decl.is_exported)
                        .prop("line", decl.line),
                )
                .await?;
            }
        }

        debug!(path = %analysis.path, nodes = w.stats.nodes_merged, "file ingested");
        Ok(w.stats)
    }

    async fn write_class(&self, w: &mut Writer<'_>, file: &NodeRef, file_key: &str, class: &ClassRecord) -> Result<(), GraphError> {
        let class_key = keys::class_id(file_key, &class.name)?;
        let node = w
            .child(
                file,
                Rel::Defines,
                NodeSpec::new(Label::Class, class_key.clone())
                    .prop("name", class.name.as_str())
                    .opt_prop("extends", class.extends.clone())
                    .prop("implements", class.implements.clone())
                    .prop("is_exported", class.is_exported)
                    .prop("line", class.line),
            )
            .await?;

        for method in &class.methods {
            let params: Vec<String> = method.parameters.iter().map(|p| p.signature()).collect();
            w.child(
                &node,
                Rel::HasMethod,
                NodeSpec::new(Label::Method, keys::method_id(&class_key, &method.name)?)
                    .prop("name", method.name.as_str())
                    .prop("params", params)
                    .opt_prop("return_type", method.return_type.clone())
                    .prop("is_async", method.is_async)
                    .prop("line", method.line),
            )
            .await?;
        }
        for attr in &class.attributes {
            w.child(
                &node,
                Rel::HasAttribute,
                NodeSpec::new(Label::Attribute, keys::attr_id(&class_key, &attr.name)?)
                    .prop("name", attr.name.as_str())
                    .opt_prop("type", attr.type_annotation.clone())
                    .prop("visibility", attr.visibility.as_str())
                    .prop("is_static", attr.is_static)
                    .prop("line", attr.line),
            )
            .await?;
        }
        Ok(())
    }

    async fn write_component(
        &self,
        w: &mut Writer<'_>,
        file: &NodeRef,
        file_key: &str,
        component: &ComponentRecord,
        analysis: &ModuleAnalysis,
    ) -> Result<(), GraphError> {
        let component_key = keys::component_id(file_key, &component.name)?;
        let node = w
            .child(
                file,
                Rel::Defines,
                NodeSpec::new(Label::Component, component_key.clone())
                    .prop("name", component.name.as_str())
                    .prop("kind", component.kind.as_str())
                    .prop("is_exported", component.is_exported)
                    .prop("line", component.line),
            )
            .await?;

        if !component.props.is_empty() {
            w.child(
                &node,
                Rel::HasProps,
                NodeSpec::new(Label::Props, keys::props_id(&component_key))
                    .prop("component", component.name.as_str())
                    .prop("names", component.props.clone()),
            )
            .await?;
        }

        for hook in &component.hooks_used {
            let calls: Vec<_> = analysis
                .hook_calls
                .iter()
                .filter(|c| &c.hook_name == hook && c.line >= component.line)
                .collect();
            w.child(
                &node,
                Rel::UsesHook,
                NodeSpec::new(Label::Hook, keys::hook_id(&component_key, hook)?)
                    .prop("name", hook.as_str())
                    .prop("component", component.name.as_str())
                    .prop("args", calls.first().map(|c| c.args.clone()).unwrap_or_default())
                    .opt_prop("variable_name", calls.first().and_then(|c| c.bound_variable.clone())),
            )
            .await?;
        }
        Ok(())
    }

    async fn write_imports(
        &self,
        repository: &str,
        analysis: &ModuleAnalysis,
        index: &ModuleIndex,
        written: &HashSet<String>,
    ) -> Result<IngestStats, GraphError> {
        let mut w = Writer::new(self.store.as_ref());
        let from = NodeRef::new(Label::File, keys::file_id(repository, &analysis.path)?);

        for import in analysis.imports.iter().filter(|i| i.is_internal) {
            let Some(target) = index.resolve(analysis, import) else {
                continue;
            };
            if target == from.key || !written.contains(target) {
                continue;
            }
            w.edge(&from, Rel::Imports, &NodeRef::new(Label::File, target)).await?;
        }
        Ok(w.stats)
    }

    /// Remove everything reachable from the repository, children first.
    pub async fn clear_repository(&self, repository: &str) -> Result<usize, GraphError> {
        let mut total = 0;
        for (path, label) in CLEAR_ORDER {
            let deleted = self.store.delete_reachable(repository, path, *label).await?;
            if deleted > 0 {
                debug!(repository, label = label.as_str(), deleted, "cleared");
            }
            total += deleted;
        }
        info!(repository, deleted = total, "repository cleared");
        Ok(total)
    }

    /// Upsert schema nodes for a catalog. These are global, not per repository.
    pub async fn ingest_catalog(&self, catalog: &SchemaCatalog) -> Result<IngestStats, GraphError> {
        let mut w = Writer::new(self.store.as_ref());
        let mut tables = HashMap::new();

        for table in &catalog.tables {
            let key = keys::schema_table_id(&table.schema, &table.name)?;
            let node = w
                .node(
                    NodeSpec::new(Label::SchemaTable, key.clone())
                        .prop("name", table.name.as_str())
                        .prop("schema", table.schema.as_str())
                        .prop("rls_enabled", table.rls_enabled)
                        .prop("primary_keys", table.primary_keys.clone())
                        .prop("probed_only", table.probed_only),
                )
                .await?;
            for column in &table.columns {
                w.child(
                    &node,
                    Rel::HasColumn,
                    NodeSpec::new(Label::SchemaColumn, keys::schema_column_id(&key, &column.name)?)
                        .prop("name", column.name.as_str())
                        .prop("data_type", column.data_type.as_str())
                        .prop("is_nullable", column.is_nullable)
                        .opt_prop("default", column.default.clone()),
                )
                .await?;
            }
            tables.insert((table.schema.as_str(), table.name.as_str()), key);
        }

        for table in &catalog.tables {
            let table_key = keys::schema_table_id(&table.schema, &table.name)?;
            for fk in &table.foreign_keys {
                let Some(target) = tables.get(&(fk.foreign_schema.as_str(), fk.foreign_table.as_str())) else {
                    continue;
                };
                let column = NodeRef::new(Label::SchemaColumn, keys::schema_column_id(&table_key, &fk.column)?);
                let target = NodeRef::new(Label::SchemaTable, target.clone());
                if let Err(e) = w.edge(&column, Rel::References, &target).await {
                    warn!(table = %table.name, column = %fk.column, error = %e, "skipping foreign key");
                }
            }
        }

        for function in &catalog.functions {
            let params: Vec<String> = function
                .parameters
                .iter()
                .map(|p| format!("{} {}", p.name, p.pg_type))
                .collect();
            w.node(
                NodeSpec::new(Label::SchemaFunction, keys::schema_function_id(&function.schema, &function.name)?)
                    .prop("name", function.name.as_str())
                    .prop("schema", function.schema.as_str())
                    .prop("return_type", function.return_type.as_str())
                    .prop("params", params)
                    .prop("language", function.language.as_str())
                    .prop("security_definer", function.security_definer),
            )
            .await?;
        }

        for e in &catalog.enums {
            w.node(
                NodeSpec::new(Label::SchemaEnum, keys::schema_enum_id(&e.name)?)
                    .prop("name", e.name.as_str())
                    .prop("values", e.values.clone()),
            )
            .await?;
        }

        info!(
            tables = catalog.tables.len(),
            functions = catalog.functions.len(),
            enums = catalog.enums.len(),
            "catalog ingested"
        );
        Ok(w.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ImportRecord, ModuleAnalysis};

    fn import(module: &str, name: Option<&str>) -> ImportRecord {
        ImportRecord {
            module: module.into(),
            imported_name: name.map(Into::into),
            local_alias: None,
            is_default: false,
            is_namespace: false,
            is_internal: true,
            line: 1,
        }
    }

    #[test]
    fn test_script_candidates() {
        let from = ModuleAnalysis::new("src/pages/Home.tsx", "src/pages/Home", Language::TypeScript);
        assert_eq!(script_candidates(&from, &import("../lib/api", None)), vec!["src/lib/api"]);
        assert_eq!(script_candidates(&from, &import("./widgets/index.ts", None)), vec!["src/pages/widgets"]);
        assert_eq!(script_candidates(&from, &import("@/hooks/useCart", None)), vec!["src/hooks/useCart"]);
    }

    #[test]
    fn test_python_candidates() {
        let from = ModuleAnalysis::new("app/services/user.py", "app.services.user", Language::Python);
        assert_eq!(
            python_candidates(&from, &import(".models", Some("User"))),
            vec!["app.services.models.User", "app.services.models"]
        );
        assert_eq!(
            python_candidates(&from, &import("..db", None)),
            vec!["app.db"]
        );
        assert_eq!(
            python_candidates(&from, &import("app", Some("config"))),
            vec!["app.config", "app"]
        );
    }
}
