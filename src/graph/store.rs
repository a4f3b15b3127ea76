//! Storage seam for the knowledge graph.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::GraphError;

/// Node labels, each with the property that holds its natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Repository,
    File,
    Class,
    Method,
    Attribute,
    Function,
    Component,
    Hook,
    Props,
    Interface,
    TypeDefinition,
    SchemaTable,
    SchemaColumn,
    SchemaFunction,
    SchemaEnum,
}

impl Label {
    pub const ALL: [Label; 15] = [
        Label::Repository,
        Label::File,
        Label::Class,
        Label::Method,
        Label::Attribute,
        Label::Function,
        Label::Component,
        Label::Hook,
        Label::Props,
        Label::Interface,
        Label::TypeDefinition,
        Label::SchemaTable,
        Label::SchemaColumn,
        Label::SchemaFunction,
        Label::SchemaEnum,
    ];

    /// Labels that get a secondary index on `name`.
    pub const NAME_INDEXED: [Label; 5] = [
        Label::File,
        Label::Class,
        Label::Function,
        Label::Component,
        Label::Method,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Repository => "Repository",
            Label::File => "File",
            Label::Class => "Class",
            Label::Method => "Method",
            Label::Attribute => "Attribute",
            Label::Function => "Function",
            Label::Component => "Component",
            Label::Hook => "Hook",
            Label::Props => "Props",
            Label::Interface => "Interface",
            Label::TypeDefinition => "TypeDefinition",
            Label::SchemaTable => "SchemaTable",
            Label::SchemaColumn => "SchemaColumn",
            Label::SchemaFunction => "SchemaFunction",
            Label::SchemaEnum => "SchemaEnum",
        }
    }

    pub fn key_property(&self) -> &'static str {
        match self {
            Label::Repository => "name",
            Label::File => "file_id",
            Label::Class => "class_id",
            Label::Method => "method_id",
            Label::Attribute => "attr_id",
            Label::Function => "function_id",
            Label::Component => "component_id",
            Label::Hook => "hook_id",
            Label::Props => "props_id",
            Label::Interface => "interface_id",
            Label::TypeDefinition => "type_id",
            Label::SchemaTable => "table_id",
            Label::SchemaColumn => "column_id",
            Label::SchemaFunction => "function_id",
            Label::SchemaEnum => "enum_id",
        }
    }
}

/// Relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rel {
    Contains,
    Defines,
    HasMethod,
    HasAttribute,
    UsesHook,
    HasProps,
    Imports,
    HasColumn,
    References,
}

impl Rel {
    /// Edges that make up a repository's containment tree.
    pub const STRUCTURAL: [Rel; 6] = [
        Rel::Contains,
        Rel::Defines,
        Rel::HasMethod,
        Rel::HasAttribute,
        Rel::UsesHook,
        Rel::HasProps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rel::Contains => "CONTAINS",
            Rel::Defines => "DEFINES",
            Rel::HasMethod => "HAS_METHOD",
            Rel::HasAttribute => "HAS_ATTRIBUTE",
            Rel::UsesHook => "USES_HOOK",
            Rel::HasProps => "HAS_PROPS",
            Rel::Imports => "IMPORTS",
            Rel::HasColumn => "HAS_COLUMN",
            Rel::References => "REFERENCES",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Text(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Text(value.to_string())
    }
}

impl From<usize> for Property {
    fn from(value: usize) -> Self {
        Property::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Property::Bool(value)
    }
}

impl From<Vec<String>> for Property {
    fn from(value: Vec<String>) -> Self {
        Property::List(value)
    }
}

/// A node identified by label and natural key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub label: Label,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: Label, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }
}

/// A node upsert: match on the key, then overwrite `properties`.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub node: NodeRef,
    pub properties: BTreeMap<&'static str, Property>,
}

impl NodeSpec {
    pub fn new(label: Label, key: impl Into<String>) -> Self {
        Self {
            node: NodeRef::new(label, key),
            properties: BTreeMap::new(),
        }
    }

    pub fn prop(mut self, name: &'static str, value: impl Into<Property>) -> Self {
        self.properties.insert(name, value.into());
        self
    }

    pub fn opt_prop(self, name: &'static str, value: Option<impl Into<Property>>) -> Self {
        match value {
            Some(v) => self.prop(name, v),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub nodes: usize,
    pub edges: usize,
}

/// Operations the builder needs from a property-graph backend.
///
/// Merges report whether they created something, so callers can tell an
/// idempotent re-run from new data.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Declare a uniqueness constraint on the label's key property.
    async fn ensure_constraint(&self, label: Label) -> Result<(), GraphError>;

    /// Declare a secondary index on the label's `name` property.
    async fn ensure_name_index(&self, label: Label) -> Result<(), GraphError>;

    /// Match-or-create a node. Returns `true` when it was created.
    async fn merge_node(&self, node: &NodeSpec) -> Result<bool, GraphError>;

    /// Match-or-create an edge between two existing nodes.
    async fn merge_edge(&self, from: &NodeRef, rel: Rel, to: &NodeRef) -> Result<bool, GraphError>;

    /// Detach-delete every `target` node reached from the repository by
    /// following `path` exactly. An empty path targets the repository itself.
    async fn delete_reachable(
        &self,
        repository: &str,
        path: &[Rel],
        target: Label,
    ) -> Result<usize, GraphError>;

    /// Nodes reachable from the repository over structural edges.
    async fn reachable_from(&self, repository: &str) -> Result<usize, GraphError>;

    async fn counts(&self) -> Result<GraphCounts, GraphError>;
}
