//! Builds a [`SchemaCatalog`] from backend metadata.

use anyhow::bail;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backend::{SchemaBackend, SchemaError};
use super::queries;
use super::{
    ColumnInfo, EnumInfo, ForeignKey, FunctionInfo, FunctionParam, IndexInfo, ParamMode,
    PolicyInfo, SchemaCatalog, TableInfo, ViewInfo,
};

/// Conventionally-named tables probed when metadata access is unavailable.
pub const DEFAULT_PROBE_TABLES: &[&str] =
    &["users", "profiles", "posts", "comments", "logs", "settings"];

const FACETS: &[(&str, &str)] = &[
    ("tables", queries::TABLES),
    ("columns", queries::COLUMNS),
    ("primary_keys", queries::PRIMARY_KEYS),
    ("foreign_keys", queries::FOREIGN_KEYS),
    ("indexes", queries::INDEXES),
    ("rls", queries::RLS),
    ("policies", queries::POLICIES),
    ("functions", queries::FUNCTIONS),
    ("function_params", queries::FUNCTION_PARAMS),
    ("enums", queries::ENUMS),
    ("views", queries::VIEWS),
    ("extensions", queries::EXTENSIONS),
    ("schemas", queries::SCHEMAS),
];

type FacetResults = HashMap<&'static str, Result<Vec<Value>, SchemaError>>;

/// Issues metadata queries against a [`SchemaBackend`].
pub struct Introspector {
    backend: Arc<dyn SchemaBackend>,
    probe_tables: Vec<String>,
    max_concurrency: usize,
}

impl Introspector {
    pub fn new(backend: Arc<dyn SchemaBackend>) -> Self {
        Self {
            backend,
            probe_tables: DEFAULT_PROBE_TABLES.iter().map(|s| s.to_string()).collect(),
            max_concurrency: 4,
        }
    }

    pub fn with_probe_tables(mut self, tables: Vec<String>) -> Self {
        if !tables.is_empty() {
            self.probe_tables = tables;
        }
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Build a catalog snapshot.
    ///
    /// Individual facet failures leave that facet empty. The call only fails
    /// when the backend cannot be reached at all.
    pub async fn build_catalog(&self) -> anyhow::Result<SchemaCatalog> {
        let source = self.backend.source();
        info!("Introspecting schema backend at {}", source);

        match self.backend.run_query(queries::PING).await {
            Ok(_) => Ok(self.build_from_metadata(source).await),
            Err(e) => {
                warn!(error = %e, "metadata queries unavailable, probing conventional tables");
                self.build_from_probes(source).await
            }
        }
    }

    async fn build_from_metadata(&self, source: String) -> SchemaCatalog {
        let backend = &self.backend;
        let mut results: FacetResults = stream::iter(FACETS.iter())
            .map(|(name, template)| async move {
                let sql = queries::render(template);
                (*name, backend.run_query(&sql).await)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut catalog = SchemaCatalog::empty(source);
        let mut take = |name: &'static str| -> Option<Vec<Value>> {
            match results.remove(name) {
                Some(Ok(rows)) => {
                    debug!(facet = name, rows = rows.len(), "facet loaded");
                    Some(rows)
                }
                Some(Err(e)) => {
                    warn!(facet = name, error = %e, "metadata facet failed, leaving it empty");
                    catalog.failed_facets.push(name.to_string());
                    None
                }
                None => None,
            }
        };

        let table_rows = take("tables");
        let column_rows = take("columns").unwrap_or_default();
        let pk_rows = take("primary_keys").unwrap_or_default();
        let fk_rows = take("foreign_keys").unwrap_or_default();
        let index_rows = take("indexes").unwrap_or_default();
        let rls_rows = take("rls").unwrap_or_default();
        let policy_rows = take("policies").unwrap_or_default();
        let function_rows = take("functions").unwrap_or_default();
        let param_rows = take("function_params").unwrap_or_default();
        let enum_rows = take("enums").unwrap_or_default();
        let view_rows = take("views").unwrap_or_default();
        let extension_rows = take("extensions").unwrap_or_default();
        let schema_rows = take("schemas").unwrap_or_default();

        let mut tables: BTreeMap<(String, String), TableInfo> = match table_rows {
            Some(rows) => rows
                .iter()
                .filter_map(|r| {
                    let schema = str_field(r, "table_schema")?;
                    let name = str_field(r, "table_name")?;
                    Some(((schema.clone(), name.clone()), TableInfo::new(schema, name)))
                })
                .collect(),
            None => self
                .probe_existing()
                .await
                .into_iter()
                .map(|t| (("public".to_string(), t.name.clone()), t))
                .collect(),
        };

        attach_table_facets(
            &mut tables,
            &column_rows,
            &pk_rows,
            &fk_rows,
            &index_rows,
            &rls_rows,
            &policy_rows,
        );
        catalog.tables = tables.into_values().collect();
        catalog.functions = assemble_functions(&function_rows, &param_rows);

        catalog.enums = enum_rows
            .iter()
            .filter_map(|r| {
                Some(EnumInfo {
                    name: str_field(r, "enum_name")?,
                    schema: str_field(r, "enum_schema").unwrap_or_default(),
                    values: list_field(r, "enum_values"),
                })
            })
            .collect();

        catalog.views = view_rows
            .iter()
            .filter_map(|r| {
                Some(ViewInfo {
                    name: str_field(r, "table_name")?,
                    schema: str_field(r, "table_schema").unwrap_or_default(),
                    definition: str_field(r, "view_definition"),
                })
            })
            .collect();

        catalog.extensions = extension_rows
            .iter()
            .filter_map(|r| str_field(r, "extname"))
            .collect();
        catalog.schemas = schema_rows
            .iter()
            .filter_map(|r| str_field(r, "schema_name"))
            .collect();

        info!(
            tables = catalog.tables.len(),
            functions = catalog.functions.len(),
            enums = catalog.enums.len(),
            failed_facets = catalog.failed_facets.len(),
            "schema catalog built"
        );
        catalog
    }

    async fn build_from_probes(&self, source: String) -> anyhow::Result<SchemaCatalog> {
        let outcomes = self.probe_all().await;
        if !outcomes.is_empty() && outcomes.iter().all(|(_, r)| r.is_err()) {
            let first = outcomes
                .into_iter()
                .find_map(|(_, r)| r.err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            bail!("schema backend unreachable: {}", first);
        }

        let mut catalog = SchemaCatalog::empty(source);
        catalog.probe_only = true;
        catalog.failed_facets = FACETS.iter().map(|(n, _)| n.to_string()).collect();
        catalog.tables = tables_from_probes(outcomes);

        info!(tables = catalog.tables.len(), "schema catalog built from table probes");
        Ok(catalog)
    }

    async fn probe_all(&self) -> Vec<(String, Result<bool, SchemaError>)> {
        let backend = &self.backend;
        stream::iter(self.probe_tables.iter())
            .map(|table| async move { (table.clone(), backend.probe_table(table).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }

    async fn probe_existing(&self) -> Vec<TableInfo> {
        tables_from_probes(self.probe_all().await)
    }
}

fn tables_from_probes(outcomes: Vec<(String, Result<bool, SchemaError>)>) -> Vec<TableInfo> {
    let mut tables: Vec<TableInfo> = outcomes
        .into_iter()
        .filter_map(|(name, outcome)| match outcome {
            Ok(true) => {
                let mut t = TableInfo::new("public", name);
                t.probed_only = true;
                Some(t)
            }
            Ok(false) => None,
            Err(e) => {
                debug!(table = %name, error = %e, "table probe failed");
                None
            }
        })
        .collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    tables
}

fn attach_table_facets(
    tables: &mut BTreeMap<(String, String), TableInfo>,
    columns: &[Value],
    primary_keys: &[Value],
    foreign_keys: &[Value],
    indexes: &[Value],
    rls: &[Value],
    policies: &[Value],
) {
    for row in columns {
        let Some(table) = table_for(tables, row) else { continue };
        let Some(name) = str_field(row, "column_name") else { continue };
        table.columns.push(ColumnInfo {
            name,
            data_type: str_field(row, "data_type").unwrap_or_default(),
            udt_name: str_field(row, "udt_name"),
            is_nullable: bool_field(row, "is_nullable"),
            default: str_field(row, "column_default"),
            position: int_field(row, "ordinal_position").unwrap_or(0),
        });
    }

    for row in primary_keys {
        if let (Some(table), Some(column)) =
            (table_for(tables, row), str_field(row, "column_name"))
        {
            table.primary_keys.push(column);
        }
    }

    for row in foreign_keys {
        let Some(table) = table_for(tables, row) else { continue };
        if let (Some(column), Some(foreign_table), Some(foreign_column)) = (
            str_field(row, "column_name"),
            str_field(row, "foreign_table"),
            str_field(row, "foreign_column"),
        ) {
            table.foreign_keys.push(ForeignKey {
                column,
                foreign_schema: str_field(row, "foreign_schema")
                    .unwrap_or_else(|| "public".to_string()),
                foreign_table,
                foreign_column,
                constraint_name: str_field(row, "constraint_name"),
            });
        }
    }

    for row in indexes {
        let Some(table) = table_for(tables, row) else { continue };
        if let Some(name) = str_field(row, "index_name") {
            table.indexes.push(IndexInfo {
                name,
                definition: str_field(row, "definition").unwrap_or_default(),
                is_unique: bool_field(row, "is_unique"),
            });
        }
    }

    for row in rls {
        if let Some(table) = table_for(tables, row) {
            table.rls_enabled = bool_field(row, "rls_enabled");
            table.row_estimate = int_field(row, "row_estimate").filter(|n| *n >= 0);
        }
    }

    for row in policies {
        let Some(table) = table_for(tables, row) else { continue };
        if let Some(name) = str_field(row, "policy_name") {
            table.policies.push(PolicyInfo {
                name,
                command: str_field(row, "command").unwrap_or_default(),
                roles: list_field(row, "roles"),
                permissive: bool_field(row, "permissive"),
                using_expr: str_field(row, "using_expr"),
                check_expr: str_field(row, "check_expr"),
            });
        }
    }
}

fn assemble_functions(functions: &[Value], params: &[Value]) -> Vec<FunctionInfo> {
    let mut by_specific: BTreeMap<(String, String), Vec<FunctionParam>> = BTreeMap::new();
    for row in params {
        let (Some(schema), Some(specific)) = (
            str_field(row, "routine_schema"),
            str_field(row, "specific_name"),
        ) else {
            continue;
        };
        let position = int_field(row, "ordinal_position").unwrap_or(0).max(0) as usize;
        let name = str_field(row, "parameter_name")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("param_{}", position));
        let mut param = FunctionParam::new(
            name,
            str_field(row, "pg_type").unwrap_or_else(|| "text".to_string()),
            position,
        );
        param.mode = ParamMode::parse(&str_field(row, "parameter_mode").unwrap_or_default());
        param.default = str_field(row, "parameter_default");
        by_specific.entry((schema, specific)).or_default().push(param);
    }

    let mut seen = std::collections::HashSet::new();
    functions
        .iter()
        .filter_map(|row| {
            let schema = str_field(row, "routine_schema")?;
            let name = str_field(row, "routine_name")?;
            let specific = str_field(row, "specific_name").unwrap_or_else(|| name.clone());
            if !seen.insert((schema.clone(), specific.clone())) {
                return None;
            }

            let mut parameters = by_specific
                .get(&(schema.clone(), specific))
                .cloned()
                .unwrap_or_default();
            parameters.sort_by_key(|p| p.position);

            let mut info = FunctionInfo::new(schema, name);
            info.return_type = str_field(row, "return_type").unwrap_or_default();
            info.language = str_field(row, "language").unwrap_or_default();
            info.security_definer = bool_field(row, "security_definer");
            info.description = str_field(row, "description");
            info.parameters = parameters;
            Some(info)
        })
        .collect()
}

fn table_for<'a>(
    tables: &'a mut BTreeMap<(String, String), TableInfo>,
    row: &Value,
) -> Option<&'a mut TableInfo> {
    let schema = str_field(row, "table_schema")?;
    let name = str_field(row, "table_name")?;
    tables.get_mut(&(schema, name))
}

fn str_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bool_field(row: &Value, key: &str) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "t" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn int_field(row: &Value, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a list that may arrive as a JSON array or a Postgres array literal.
fn list_field(row: &Value, key: &str) -> Vec<String> {
    match row.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => parse_pg_array(s),
        _ => Vec::new(),
    }
}

fn parse_pg_array(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('{').trim_end_matches('}');
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StaticBackend;
    use serde_json::json;

    fn full_backend() -> StaticBackend {
        StaticBackend::new()
            .with_rows(
                "tables",
                vec![
                    json!({"table_schema": "public", "table_name": "profiles"}),
                    json!({"table_schema": "public", "table_name": "posts"}),
                ],
            )
            .with_rows(
                "columns",
                vec![
                    json!({"table_schema": "public", "table_name": "profiles", "column_name": "id",
                           "data_type": "uuid", "udt_name": "uuid", "is_nullable": false, "ordinal_position": 1}),
                    json!({"table_schema": "public", "table_name": "posts", "column_name": "author_id",
                           "data_type": "uuid", "is_nullable": "true", "ordinal_position": "2"}),
                ],
            )
            .with_rows(
                "foreign_keys",
                vec![json!({"table_schema": "public", "table_name": "posts", "column_name": "author_id",
                            "foreign_schema": "public", "foreign_table": "profiles", "foreign_column": "id"})],
            )
            .with_rows(
                "rls",
                vec![json!({"table_schema": "public", "table_name": "profiles", "rls_enabled": true, "row_estimate": -1})],
            )
            .with_rows(
                "functions",
                vec![json!({"routine_schema": "public", "routine_name": "get_stats",
                            "specific_name": "get_stats_1234", "return_type": "json", "language": "plpgsql"})],
            )
            .with_rows(
                "function_params",
                vec![
                    json!({"routine_schema": "public", "specific_name": "get_stats_1234", "parameter_name": "range",
                           "pg_type": "date_range", "parameter_mode": "IN", "ordinal_position": 2}),
                    json!({"routine_schema": "public", "specific_name": "get_stats_1234", "parameter_name": "user_id",
                           "pg_type": "uuid", "parameter_mode": "IN", "ordinal_position": 1}),
                ],
            )
            .with_rows(
                "enums",
                vec![json!({"enum_schema": "public", "enum_name": "date_range", "enum_values": "{7d,30d,90d,1y}"})],
            )
            .with_failing_facet("policies")
    }

    #[tokio::test]
    async fn test_build_catalog_from_metadata() {
        let introspector = Introspector::new(Arc::new(full_backend()));
        let catalog = introspector.build_catalog().await.unwrap();

        assert_eq!(catalog.tables.len(), 2);
        let profiles = catalog.table("profiles").unwrap();
        assert!(profiles.rls_enabled);
        assert_eq!(profiles.row_estimate, None);
        assert_eq!(profiles.columns.len(), 1);

        let posts = catalog.table("posts").unwrap();
        assert!(posts.columns[0].is_nullable);
        assert_eq!(posts.foreign_keys[0].foreign_table, "profiles");

        let f = catalog.function("get_stats").unwrap();
        let names: Vec<_> = f.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["user_id", "range"]);
        assert_eq!(catalog.enum_values("date_range").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_facet_is_empty_not_fatal() {
        let catalog = Introspector::new(Arc::new(full_backend()))
            .build_catalog()
            .await
            .unwrap();
        assert!(catalog.failed_facets.contains(&"policies".to_string()));
        assert!(catalog.tables.iter().all(|t| t.policies.is_empty()));
    }

    #[tokio::test]
    async fn test_tables_facet_failure_falls_back_to_probes() {
        let backend = full_backend()
            .with_failing_facet("tables")
            .with_table("users");
        let catalog = Introspector::new(Arc::new(backend))
            .build_catalog()
            .await
            .unwrap();
        assert_eq!(catalog.relation_names(), vec!["users"]);
        assert!(catalog.tables[0].probed_only);
        assert!(catalog.function("get_stats").is_some());
    }

    #[tokio::test]
    async fn test_probe_fallback_without_metadata_access() {
        let backend = StaticBackend::new()
            .without_metadata_access()
            .with_table("profiles")
            .with_table("posts")
            .with_table("not_probed");
        let catalog = Introspector::new(Arc::new(backend))
            .build_catalog()
            .await
            .unwrap();

        assert!(catalog.probe_only);
        assert_eq!(catalog.relation_names(), vec!["posts", "profiles"]);
        assert!(catalog.tables.iter().all(|t| t.columns.is_empty()));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_fatal() {
        let backend = StaticBackend::new().unreachable();
        let result = Introspector::new(Arc::new(backend)).build_catalog().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_pg_array() {
        assert_eq!(parse_pg_array("{a,\"b c\"}"), vec!["a", "b c"]);
        assert!(parse_pg_array("{}").is_empty());
    }
}
