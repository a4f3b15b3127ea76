//! RPC parameter validation against the schema catalog.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::types::{DetectionKind, Severity};
use super::value::{
    infer_type, is_valid_boolean, is_valid_integer, is_valid_json_structure, is_valid_timestamp,
    is_valid_uuid, is_variable_marker, ParamValue, ProvidedParams, RpcCallSite,
};
use crate::schema::{FunctionInfo, FunctionParam, JsonShape, ParamType, SchemaCatalog};

/// What went wrong with one RPC call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcIssueKind {
    UnknownFunction,
    CountMismatch,
    MissingRequired,
    TypeMismatch,
    InvalidEnum,
    InvalidJson,
}

impl RpcIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcIssueKind::UnknownFunction => "unknown_function",
            RpcIssueKind::CountMismatch => "count_mismatch",
            RpcIssueKind::MissingRequired => "missing_required",
            RpcIssueKind::TypeMismatch => "type_mismatch",
            RpcIssueKind::InvalidEnum => "invalid_enum",
            RpcIssueKind::InvalidJson => "invalid_json",
        }
    }

    pub fn detection_kind(&self) -> DetectionKind {
        match self {
            RpcIssueKind::UnknownFunction => DetectionKind::SupabaseFunctionNotFound,
            RpcIssueKind::CountMismatch => DetectionKind::RpcParameterCountMismatch,
            RpcIssueKind::MissingRequired => DetectionKind::RpcMissingRequiredParam,
            RpcIssueKind::TypeMismatch => DetectionKind::RpcParameterTypeMismatch,
            RpcIssueKind::InvalidEnum => DetectionKind::RpcInvalidEnumValue,
            RpcIssueKind::InvalidJson => DetectionKind::RpcInvalidJsonStructure,
        }
    }
}

/// One problem found at an RPC call site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: RpcIssueKind,
    pub function: String,
    pub parameter: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub line: usize,
    pub suggestion: Option<String>,
}

/// Validates call-site parameters against a catalog snapshot.
pub struct RpcValidator {
    catalog: Arc<SchemaCatalog>,
    severity: Severity,
}

impl RpcValidator {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            severity: Severity::High,
        }
    }

    /// Severity attached to every issue this validator reports.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn validate_call(&self, call: &RpcCallSite) -> Vec<ValidationIssue> {
        self.validate(&call.function_name, &call.parameters(), call.line)
    }

    /// Validate one call. An unknown function yields exactly one issue.
    pub fn validate(
        &self,
        function_name: &str,
        provided: &ProvidedParams,
        line: usize,
    ) -> Vec<ValidationIssue> {
        let Some(function) = self.catalog.function(function_name) else {
            return vec![self.unknown_function(function_name, line)];
        };

        let ctx = CallContext {
            validator: self,
            function,
            line,
        };

        let mut issues = Vec::new();
        ctx.check_count(provided, &mut issues);
        ctx.check_required(provided, &mut issues);
        ctx.check_types(provided, &mut issues);
        ctx.check_enums(provided, &mut issues);
        ctx.check_json(provided, &mut issues);
        issues
    }

    fn unknown_function(&self, name: &str, line: usize) -> ValidationIssue {
        let available: Vec<&str> = self.catalog.function_names().into_iter().take(3).collect();
        ValidationIssue {
            kind: RpcIssueKind::UnknownFunction,
            function: name.to_string(),
            parameter: None,
            expected: None,
            actual: Some(name.to_string()),
            message: format!("RPC function '{}' not found", name),
            severity: self.severity,
            line,
            suggestion: (!available.is_empty())
                .then(|| format!("Available functions: {}", available.join(", "))),
        }
    }
}

struct CallContext<'a> {
    validator: &'a RpcValidator,
    function: &'a FunctionInfo,
    line: usize,
}

impl<'a> CallContext<'a> {
    fn issue(&self, kind: RpcIssueKind, message: String) -> ValidationIssue {
        ValidationIssue {
            kind,
            function: self.function.name.clone(),
            parameter: None,
            expected: None,
            actual: None,
            message,
            severity: self.validator.severity,
            line: self.line,
            suggestion: None,
        }
    }

    fn declared(&self, name: &str) -> Option<&'a FunctionParam> {
        self.function.input_parameters().find(|p| p.name == name)
    }

    fn declared_type(&self, param: &FunctionParam) -> ParamType {
        self.validator.catalog.param_type(&param.pg_type)
    }

    /// Provided parameters paired with their declarations, in name order.
    fn matched<'p>(
        &self,
        provided: &'p ProvidedParams,
    ) -> Vec<(&'p String, &'p ParamValue, &'a FunctionParam)> {
        provided
            .iter()
            .filter_map(|(name, value)| self.declared(name).map(|p| (name, value, p)))
            .collect()
    }

    fn check_count(&self, provided: &ProvidedParams, issues: &mut Vec<ValidationIssue>) {
        let required: Vec<&FunctionParam> = self
            .function
            .input_parameters()
            .filter(|p| p.is_required())
            .collect();
        let total = self.function.input_parameters().count();
        let given = provided.len();

        if given < required.len() {
            let missing: Vec<&str> = required
                .iter()
                .filter(|p| !provided.contains_key(&p.name))
                .map(|p| p.name.as_str())
                .collect();
            let mut issue = self.issue(
                RpcIssueKind::CountMismatch,
                format!(
                    "Missing required parameters. Expected at least {}, got {}",
                    required.len(),
                    given
                ),
            );
            issue.expected = Some(required.len().to_string());
            issue.actual = Some(given.to_string());
            if !missing.is_empty() {
                issue.suggestion = Some(format!(
                    "Add missing required parameters: {}",
                    missing.join(", ")
                ));
            }
            issues.push(issue);
        } else if given > total {
            let extra: Vec<&str> = provided
                .keys()
                .filter(|k| self.declared(k).is_none())
                .map(String::as_str)
                .collect();
            let mut issue = self.issue(
                RpcIssueKind::CountMismatch,
                format!(
                    "Too many parameters. Expected at most {}, got {}",
                    total, given
                ),
            );
            issue.expected = Some(total.to_string());
            issue.actual = Some(given.to_string());
            if !extra.is_empty() {
                issue.suggestion = Some(format!(
                    "Remove unexpected parameters: {}",
                    extra.join(", ")
                ));
            }
            issues.push(issue);
        }
    }

    fn check_required(&self, provided: &ProvidedParams, issues: &mut Vec<ValidationIssue>) {
        for param in self.function.input_parameters().filter(|p| p.is_required()) {
            if provided.contains_key(&param.name) {
                continue;
            }
            let mut issue = self.issue(
                RpcIssueKind::MissingRequired,
                format!("Required parameter '{}' is missing", param.name),
            );
            issue.parameter = Some(param.name.clone());
            issue.expected = Some(param.pg_type.clone());
            issue.suggestion = Some(format!(
                "Add required parameter: {}: {}",
                param.name, param.pg_type
            ));
            issues.push(issue);
        }
    }

    fn check_types(&self, provided: &ProvidedParams, issues: &mut Vec<ValidationIssue>) {
        for (name, value, param) in self.matched(provided) {
            let declared = self.declared_type(param);
            let (valid, what, suggestion) = match declared {
                ParamType::Uuid => (
                    is_valid_uuid(value),
                    "a valid UUID",
                    "Use format: 'xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx'",
                ),
                // The remaining predicates need a concrete value.
                _ if value.is_variable() => continue,
                ParamType::Integer => (
                    is_valid_integer(value),
                    "an integer",
                    "Use an integer value like 123",
                ),
                ParamType::Boolean => {
                    (is_valid_boolean(value), "a boolean", "Use true or false")
                }
                ParamType::Timestamp => (
                    is_valid_timestamp(value),
                    "a valid timestamp",
                    "Use ISO format: '2024-01-01T00:00:00Z'",
                ),
                _ => continue,
            };
            if valid {
                continue;
            }
            let mut issue = self.issue(
                RpcIssueKind::TypeMismatch,
                format!("Parameter '{}' must be {}", name, what),
            );
            issue.parameter = Some(name.clone());
            issue.expected = Some(declared.as_str().to_string());
            issue.actual = Some(infer_type(value).as_str().to_string());
            issue.suggestion = Some(suggestion.to_string());
            issues.push(issue);
        }
    }

    fn check_enums(&self, provided: &ProvidedParams, issues: &mut Vec<ValidationIssue>) {
        for (name, value, param) in self.matched(provided) {
            if value.is_variable() {
                continue;
            }
            let Some(values) = self.validator.catalog.enum_values(&param.pg_type) else {
                continue;
            };
            let actual = value.display();
            if values.iter().any(|v| *v == actual) {
                continue;
            }
            let mut issue = self.issue(
                RpcIssueKind::InvalidEnum,
                format!("Parameter '{}' has invalid enum value", name),
            );
            issue.parameter = Some(name.clone());
            issue.expected = Some(values.join(" | "));
            issue.actual = Some(actual);
            let hint: Vec<&str> = values.iter().take(3).map(String::as_str).collect();
            issue.suggestion = Some(format!("Use one of: {}", hint.join(", ")));
            issues.push(issue);
        }
    }

    fn check_json(&self, provided: &ProvidedParams, issues: &mut Vec<ValidationIssue>) {
        for (name, value, param) in self.matched(provided) {
            if value.is_variable() || !self.declared_type(param).is_json() {
                continue;
            }
            if !is_valid_json_structure(value) {
                let mut issue = self.issue(
                    RpcIssueKind::InvalidJson,
                    format!("Parameter '{}' must be a valid JSON object", name),
                );
                issue.parameter = Some(name.clone());
                issue.expected = Some(param.pg_type.clone());
                issue.actual = Some(infer_type(value).as_str().to_string());
                issue.suggestion = Some("Use object format: {key: 'value'}".to_string());
                issues.push(issue);
                continue;
            }
            if let (Some(shape), Some(decoded)) = (&param.json_shape, json_of(value)) {
                issues.extend(self.check_shape(name, shape, &decoded));
            }
        }
    }

    fn check_shape(&self, name: &str, shape: &JsonShape, value: &Value) -> Vec<ValidationIssue> {
        let Some(object) = value.as_object() else {
            return Vec::new();
        };
        let mut issues = Vec::new();

        for prop in &shape.required {
            if object.contains_key(prop) {
                continue;
            }
            let mut issue = self.issue(
                RpcIssueKind::InvalidJson,
                format!(
                    "Parameter '{}' is missing required property '{}'",
                    name, prop
                ),
            );
            issue.parameter = Some(name.to_string());
            issue.suggestion = Some(format!("Add property '{}' to {}", prop, name));
            issues.push(issue);
        }

        for (prop, expected) in &shape.properties {
            let Some(actual) = object.get(prop) else {
                continue;
            };
            // Variables inside the literal have unknown runtime types.
            if is_variable_marker(actual) {
                continue;
            }
            if expected.matches(actual) {
                continue;
            }
            let mut issue = self.issue(
                RpcIssueKind::InvalidJson,
                format!(
                    "Property '{}.{}' must be of type {}",
                    name,
                    prop,
                    expected.as_str()
                ),
            );
            issue.parameter = Some(format!("{}.{}", name, prop));
            issue.expected = Some(expected.as_str().to_string());
            issue.actual = Some(json_kind(actual).to_string());
            issues.push(issue);
        }
        issues
    }
}

fn json_of(value: &ParamValue) -> Option<Value> {
    match value {
        ParamValue::Json(v) => Some(v.clone()),
        ParamValue::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumInfo, JsonPrimitive};
    use serde_json::json;

    const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn catalog() -> Arc<SchemaCatalog> {
        let mut catalog = SchemaCatalog::empty("test");
        catalog.enums.push(EnumInfo {
            name: "date_range".into(),
            schema: "public".into(),
            values: vec!["7d".into(), "30d".into(), "90d".into(), "1y".into()],
        });

        let mut stats = FunctionInfo::new("public", "get_stats");
        stats.parameters = vec![
            FunctionParam::new("user_id", "uuid", 1),
            FunctionParam::new("range", "date_range", 2),
        ];
        catalog.functions.push(stats);

        let mut search = FunctionInfo::new("public", "search_posts");
        let mut filters = FunctionParam::new("filters", "jsonb", 4).with_default("'{}'");
        filters.json_shape = Some(JsonShape {
            required: vec!["query".into()],
            properties: [
                ("query".to_string(), JsonPrimitive::String),
                ("limit".to_string(), JsonPrimitive::Integer),
            ]
            .into_iter()
            .collect(),
        });
        search.parameters = vec![
            FunctionParam::new("author_id", "uuid", 1),
            FunctionParam::new("max_rows", "int4", 2),
            FunctionParam::new("since", "timestamptz", 3).with_default("now()"),
            filters,
        ];
        catalog.functions.push(search);

        Arc::new(catalog)
    }

    fn params(entries: &[(&str, ParamValue)]) -> ProvidedParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn kinds(issues: &[ValidationIssue]) -> Vec<RpcIssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_missing_required_enum_parameter() {
        let validator = RpcValidator::new(catalog());
        let issues = validator.validate(
            "get_stats",
            &params(&[("user_id", ParamValue::String(UUID.into()))]),
            12,
        );

        assert_eq!(issues.len(), 2);
        let missing: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == RpcIssueKind::MissingRequired)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].parameter.as_deref(), Some("range"));
        assert_eq!(
            issues
                .iter()
                .filter(|i| i.kind == RpcIssueKind::CountMismatch)
                .count(),
            1
        );
        assert!(issues.iter().all(|i| i.line == 12));
    }

    #[test]
    fn test_invalid_enum_value() {
        let validator = RpcValidator::new(catalog());
        let issues = validator.validate(
            "get_stats",
            &params(&[
                ("user_id", ParamValue::String(UUID.into())),
                ("range", ParamValue::String("12h".into())),
            ]),
            1,
        );

        assert_eq!(kinds(&issues), vec![RpcIssueKind::InvalidEnum]);
        assert_eq!(issues[0].suggestion.as_deref(), Some("Use one of: 7d, 30d, 90d"));
    }

    #[test]
    fn test_arity_law() {
        let validator = RpcValidator::new(catalog());
        let declared = [
            ("author_id", ParamValue::String(UUID.into())),
            ("max_rows", ParamValue::Int(5)),
            ("since", ParamValue::String("2024-01-01T00:00:00Z".into())),
            ("filters", ParamValue::Json(json!({"query": "rust"}))),
        ];
        let (required, total) = (2, 4);

        for p in 0..total + 3 {
            let mut provided = ProvidedParams::new();
            for (name, value) in declared.iter().take(p) {
                provided.insert(name.to_string(), value.clone());
            }
            for extra in total..p {
                provided.insert(format!("extra_{}", extra), ParamValue::Int(1));
            }
            assert_eq!(provided.len(), p);

            let issues = validator.validate("search_posts", &provided, 1);
            let count_issues = issues
                .iter()
                .filter(|i| i.kind == RpcIssueKind::CountMismatch)
                .count();
            let expect_mismatch = p < required || p > total;
            assert_eq!(count_issues == 1, expect_mismatch, "p = {}", p);
            assert!(count_issues <= 1);
        }
    }

    #[test]
    fn test_unknown_function_short_circuits() {
        let validator = RpcValidator::new(catalog());
        let issues = validator.validate(
            "get_statz",
            &params(&[
                ("a", ParamValue::Int(1)),
                ("b", ParamValue::Bool(false)),
                ("c", ParamValue::String("x".into())),
            ]),
            3,
        );

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, RpcIssueKind::UnknownFunction);
        assert_eq!(
            issues[0].suggestion.as_deref(),
            Some("Available functions: get_stats, search_posts")
        );
    }

    #[test]
    fn test_type_mismatches_are_collected() {
        let validator = RpcValidator::new(catalog());
        let issues = validator.validate(
            "search_posts",
            &params(&[
                ("author_id", ParamValue::String("not-a-uuid".into())),
                ("max_rows", ParamValue::String("ten".into())),
                ("since", ParamValue::String("last week".into())),
            ]),
            7,
        );

        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.kind == RpcIssueKind::TypeMismatch));
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"Parameter 'author_id' must be a valid UUID"));
        assert!(messages.contains(&"Parameter 'max_rows' must be an integer"));
        assert!(messages.contains(&"Parameter 'since' must be a valid timestamp"));
    }

    #[test]
    fn test_variable_placeholders() {
        let validator = RpcValidator::new(catalog());
        let ok = validator.validate(
            "search_posts",
            &params(&[
                ("author_id", ParamValue::UnresolvedVariable("user.id".into())),
                ("max_rows", ParamValue::UnresolvedVariable("limit".into())),
            ]),
            1,
        );
        assert!(ok.is_empty());

        let bad = validator.validate(
            "search_posts",
            &params(&[
                ("author_id", ParamValue::UnresolvedVariable("searchTerm".into())),
                ("max_rows", ParamValue::Int(10)),
            ]),
            1,
        );
        assert_eq!(kinds(&bad), vec![RpcIssueKind::TypeMismatch]);
    }

    #[test]
    fn test_json_structure_and_shape() {
        let validator = RpcValidator::new(catalog());
        let base = [
            ("author_id", ParamValue::String(UUID.into())),
            ("max_rows", ParamValue::Int(10)),
        ];

        let mut not_json = params(&base);
        not_json.insert("filters".into(), ParamValue::String("query=rust".into()));
        let issues = validator.validate("search_posts", &not_json, 1);
        assert_eq!(kinds(&issues), vec![RpcIssueKind::InvalidJson]);
        assert_eq!(
            issues[0].message,
            "Parameter 'filters' must be a valid JSON object"
        );

        let mut bad_shape = params(&base);
        bad_shape.insert("filters".into(), ParamValue::Json(json!({"limit": "ten"})));
        let issues = validator.validate("search_posts", &bad_shape, 1);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == RpcIssueKind::InvalidJson));

        let mut good = params(&base);
        good.insert(
            "filters".into(),
            ParamValue::String(r#"{"query": "rust", "limit": 5}"#.into()),
        );
        assert!(validator.validate("search_posts", &good, 1).is_empty());
    }

    #[test]
    fn test_configured_severity_and_detection_kinds() {
        let validator = RpcValidator::new(catalog()).with_severity(Severity::Medium);
        let issues = validator.validate("get_stats", &ProvidedParams::new(), 1);
        assert!(issues.iter().all(|i| i.severity == Severity::Medium));
        assert_eq!(
            RpcIssueKind::MissingRequired.detection_kind(),
            DetectionKind::RpcMissingRequiredParam
        );
    }
}
