//! Ground-truth schema catalog for the relational backend.
//!
//! The catalog is an immutable snapshot built once per validation session by
//! [`Introspector::build_catalog`]. Validators only ever hold a shared
//! reference to it.

mod backend;
mod introspect;
mod queries;

pub use backend::{RestBackend, SchemaBackend, SchemaError, StaticBackend};
pub use introspect::Introspector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Normalized parameter type of a callable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Uuid,
    Boolean,
    Json,
    Jsonb,
    Timestamp,
    Date,
    Numeric,
    Array,
    Enum,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "text",
            ParamType::Integer => "bigint",
            ParamType::Uuid => "uuid",
            ParamType::Boolean => "boolean",
            ParamType::Json => "json",
            ParamType::Jsonb => "jsonb",
            ParamType::Timestamp => "timestamp",
            ParamType::Date => "date",
            ParamType::Numeric => "numeric",
            ParamType::Array => "array",
            ParamType::Enum => "enum",
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ParamType::Json | ParamType::Jsonb)
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a PostgreSQL type name to a [`ParamType`], ignoring enums.
///
/// Use [`SchemaCatalog::param_type`] when enum types should be recognized.
pub fn map_pg_type(pg_type: &str) -> ParamType {
    let t = pg_type.trim().to_lowercase();
    if t.ends_with("[]") || t == "array" || t.starts_with('_') {
        return ParamType::Array;
    }
    let base = t.split('(').next().unwrap_or("").trim();
    match base {
        "text" | "varchar" | "char" | "character varying" | "character" | "citext" | "name" => {
            ParamType::String
        }
        "integer" | "int" | "bigint" | "smallint" | "int2" | "int4" | "int8" | "serial"
        | "bigserial" => ParamType::Integer,
        "uuid" => ParamType::Uuid,
        "boolean" | "bool" => ParamType::Boolean,
        "json" => ParamType::Json,
        "jsonb" => ParamType::Jsonb,
        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" => ParamType::Timestamp,
        "date" => ParamType::Date,
        "numeric" | "decimal" | "real" | "double precision" | "float4" | "float8" => {
            ParamType::Numeric
        }
        _ => ParamType::String,
    }
}

/// Strip a `schema.` qualifier from a type or relation name.
fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim_matches('"')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub udt_name: Option<String>,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_schema: String,
    pub foreign_table: String,
    pub foreign_column: String,
    #[serde(default)]
    pub constraint_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub is_unique: bool,
}

/// A row-level security policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissive: bool,
    #[serde(default)]
    pub using_expr: Option<String>,
    #[serde(default)]
    pub check_expr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub policies: Vec<PolicyInfo>,
    #[serde(default)]
    pub row_estimate: Option<i64>,
    /// Known only through a data-access probe; structural facets are absent.
    #[serde(default)]
    pub probed_only: bool,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            rls_enabled: false,
            policies: Vec::new(),
            row_estimate: None,
            probed_only: false,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamMode {
    In,
    Out,
    InOut,
    Variadic,
}

impl ParamMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "OUT" => ParamMode::Out,
            "INOUT" => ParamMode::InOut,
            "VARIADIC" => ParamMode::Variadic,
            _ => ParamMode::In,
        }
    }

    pub fn is_input(&self) -> bool {
        !matches!(self, ParamMode::Out)
    }
}

/// Primitive type of one property in a [`JsonShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonPrimitive {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Any,
}

impl JsonPrimitive {
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match self {
            JsonPrimitive::String => value.is_string(),
            JsonPrimitive::Number => value.is_number(),
            JsonPrimitive::Integer => value.is_i64() || value.is_u64(),
            JsonPrimitive::Boolean => value.is_boolean(),
            JsonPrimitive::Object => value.is_object(),
            JsonPrimitive::Array => matches!(value, Value::Array(_)),
            JsonPrimitive::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonPrimitive::String => "string",
            JsonPrimitive::Number => "number",
            JsonPrimitive::Integer => "integer",
            JsonPrimitive::Boolean => "boolean",
            JsonPrimitive::Object => "object",
            JsonPrimitive::Array => "array",
            JsonPrimitive::Any => "any",
        }
    }
}

/// Known shape of a JSON parameter, checked one level deep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonShape {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, JsonPrimitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    pub pg_type: String,
    pub mode: ParamMode,
    pub position: usize,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub json_shape: Option<JsonShape>,
}

impl FunctionParam {
    pub fn new(name: impl Into<String>, pg_type: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            pg_type: pg_type.into(),
            mode: ParamMode::In,
            position,
            default: None,
            json_shape: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Input parameter without a default value.
    pub fn is_required(&self) -> bool {
        matches!(self.mode, ParamMode::In | ParamMode::InOut) && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<FunctionParam>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub security_definer: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl FunctionInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            return_type: String::new(),
            parameters: Vec::new(),
            language: String::new(),
            security_definer: false,
            description: None,
        }
    }

    /// Parameters a caller may pass, in declaration order.
    pub fn input_parameters(&self) -> impl Iterator<Item = &FunctionParam> {
        self.parameters.iter().filter(|p| p.mode.is_input())
    }

    /// Signature string such as `get_stats(user_id uuid, range text = '7d')`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .input_parameters()
            .map(|p| match &p.default {
                Some(d) => format!("{} {} = {}", p.name, p.pg_type, d),
                None => format!("{} {}", p.name, p.pg_type),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumInfo {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Immutable snapshot of the backend schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub enums: Vec<EnumInfo>,
    #[serde(default)]
    pub views: Vec<ViewInfo>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Facets whose metadata query failed and are therefore empty.
    #[serde(default)]
    pub failed_facets: Vec<String>,
    /// Built from table probes only (no metadata access).
    #[serde(default)]
    pub probe_only: bool,
}

impl SchemaCatalog {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            generated_at: Utc::now(),
            tables: Vec::new(),
            functions: Vec::new(),
            enums: Vec::new(),
            views: Vec::new(),
            extensions: Vec::new(),
            schemas: Vec::new(),
            failed_facets: Vec::new(),
            probe_only: false,
        }
    }

    /// Look up a table or view-backed table by (optionally qualified) name.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        let name = unqualified(name);
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        let bare = unqualified(name);
        self.table(bare).is_some() || self.views.iter().any(|v| v.name == bare)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        let name = unqualified(name);
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn enum_values(&self, type_name: &str) -> Option<&[String]> {
        let name = unqualified(type_name);
        self.enums
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.values.as_slice())
    }

    /// Map a PostgreSQL type, recognizing this catalog's enum types.
    pub fn param_type(&self, pg_type: &str) -> ParamType {
        if self.enum_values(pg_type).is_some() {
            ParamType::Enum
        } else {
            map_pg_type(pg_type)
        }
    }

    /// Table and view names, sorted.
    pub fn relation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.views.iter().map(|v| v.name.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Function names in catalog order.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of tables per schema, for summaries.
    pub fn tables_per_schema(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for t in &self.tables {
            *counts.entry(t.schema.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Export the catalog to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a previously exported catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}
