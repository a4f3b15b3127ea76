//! Deterministic composite keys for graph nodes.
//!
//! Every entity node is merged on one of these keys, so the same logical
//! entity always maps to the same node no matter how often a repository is
//! ingested. Parent keys are passed in already built; only the new part of
//! each key is checked.

use super::GraphError;

pub const SEPARATOR: &str = "::";

fn part(value: &str) -> Result<&str, GraphError> {
    if value.is_empty() || value.contains(SEPARATOR) {
        return Err(GraphError::InvalidKey(value.to_string()));
    }
    Ok(value)
}

fn join(parts: &[&str]) -> String {
    parts.join(SEPARATOR)
}

pub fn repository_id(name: &str) -> Result<String, GraphError> {
    Ok(part(name)?.to_string())
}

/// `repo::relpath`
pub fn file_id(repository: &str, rel_path: &str) -> Result<String, GraphError> {
    Ok(join(&[part(repository)?, part(rel_path)?]))
}

/// `file::Name`
pub fn class_id(file_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[file_id, part(name)?]))
}

/// `file::Name`; components live under their own label, so they share the
/// class key shape.
pub fn component_id(file_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[file_id, part(name)?]))
}

pub fn function_id(file_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[file_id, "func", part(name)?]))
}

pub fn interface_id(file_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[file_id, "interface", part(name)?]))
}

pub fn type_id(file_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[file_id, "type", part(name)?]))
}

pub fn method_id(class_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[class_id, "method", part(name)?]))
}

pub fn attr_id(class_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[class_id, "attr", part(name)?]))
}

pub fn hook_id(component_id: &str, name: &str) -> Result<String, GraphError> {
    Ok(join(&[component_id, "hook", part(name)?]))
}

pub fn props_id(component_id: &str) -> String {
    join(&[component_id, "props"])
}

/// `schema::<schema>.<table>`
pub fn schema_table_id(schema: &str, table: &str) -> Result<String, GraphError> {
    Ok(format!("schema{}{}.{}", SEPARATOR, part(schema)?, part(table)?))
}

pub fn schema_column_id(table_id: &str, column: &str) -> Result<String, GraphError> {
    Ok(join(&[table_id, "column", part(column)?]))
}

/// `schema::fn::<schema>.<name>`
pub fn schema_function_id(schema: &str, name: &str) -> Result<String, GraphError> {
    Ok(format!("schema{0}fn{0}{1}.{2}", SEPARATOR, part(schema)?, part(name)?))
}

pub fn schema_enum_id(name: &str) -> Result<String, GraphError> {
    Ok(join(&["schema", "enum", part(name)?]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let file = file_id("shop", "src/components/Cart.tsx").unwrap();
        assert_eq!(file, "shop::src/components/Cart.tsx");
        assert_eq!(file, file_id("shop", "src/components/Cart.tsx").unwrap());

        let component = component_id(&file, "Cart").unwrap();
        assert_eq!(hook_id(&component, "useState").unwrap(), "shop::src/components/Cart.tsx::Cart::hook::useState");
        assert_eq!(props_id(&component), "shop::src/components/Cart.tsx::Cart::props");

        let class = class_id(&file_id("api", "app/models.py").unwrap(), "User").unwrap();
        assert_eq!(method_id(&class, "save").unwrap(), "api::app/models.py::User::method::save");
        assert_eq!(attr_id(&class, "email").unwrap(), "api::app/models.py::User::attr::email");
    }

    #[test]
    fn test_distinct_entities_do_not_collide() {
        let file = file_id("r", "a.py").unwrap();
        let keys = [
            function_id(&file, "run").unwrap(),
            interface_id(&file, "run").unwrap(),
            type_id(&file, "run").unwrap(),
            method_id(&class_id(&file, "func").unwrap(), "run").unwrap(),
            function_id(&file_id("r", "b.py").unwrap(), "run").unwrap(),
            function_id(&file_id("s", "a.py").unwrap(), "run").unwrap(),
        ];
        let unique: std::collections::HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_schema_keys() {
        let table = schema_table_id("public", "profiles").unwrap();
        assert_eq!(table, "schema::public.profiles");
        assert_eq!(schema_column_id(&table, "id").unwrap(), "schema::public.profiles::column::id");
        assert_eq!(schema_function_id("public", "get_stats").unwrap(), "schema::fn::public.get_stats");
        assert_eq!(schema_enum_id("time_range").unwrap(), "schema::enum::time_range");
    }

    #[test]
    fn test_separator_in_part_is_rejected() {
        assert!(matches!(file_id("a::b", "x.py"), Err(GraphError::InvalidKey(p)) if p == "a::b"));
        assert!(function_id("r::x.py", "bad::name").is_err());
        assert!(class_id("r::x.py", "").is_err());
    }
}
