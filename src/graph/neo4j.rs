//! Neo4j-backed graph store.

use async_trait::async_trait;
use neo4rs::{BoltType, Graph, Query};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::store::{GraphCounts, GraphStore, Label, NodeRef, NodeSpec, Property, Rel};
use super::GraphError;
use crate::config::GraphConfig;

pub struct Neo4jStore {
    graph: Arc<Graph>,
}

fn bolt(value: &Property) -> BoltType {
    match value {
        Property::Text(s) => s.clone().into(),
        Property::Int(i) => (*i).into(),
        Property::Bool(b) => (*b).into(),
        Property::List(items) => items.clone().into(),
    }
}

/// `-[:A]->()-[:B]->` style pattern for an exact relationship path.
fn path_pattern(path: &[Rel], target: Label) -> String {
    let mut pattern = String::from("(r:Repository {name: $repository})");
    for (i, rel) in path.iter().enumerate() {
        if i + 1 == path.len() {
            pattern.push_str(&format!("-[:{}]->(n:{})", rel.as_str(), target.as_str()));
        } else {
            pattern.push_str(&format!("-[:{}]->()", rel.as_str()));
        }
    }
    pattern
}

impl Neo4jStore {
    /// Connect to the server at `config.uri`.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        info!(uri = %config.uri, "connecting to Neo4j");
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await.map_err(GraphError::query)
    }

    /// First column of the first row, as an integer.
    async fn scalar(&self, query: Query, column: &str) -> Result<i64, GraphError> {
        let mut rows = self.graph.execute(query).await.map_err(GraphError::query)?;
        match rows.next().await.map_err(GraphError::query)? {
            Some(row) => row.get::<i64>(column).map_err(GraphError::query),
            None => Ok(0),
        }
    }

    async fn flag(&self, query: Query) -> Result<Option<bool>, GraphError> {
        let mut rows = self.graph.execute(query).await.map_err(GraphError::query)?;
        match rows.next().await.map_err(GraphError::query)? {
            Some(row) => Ok(Some(row.get::<bool>("created").map_err(GraphError::query)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_constraint(&self, label: Label) -> Result<(), GraphError> {
        let name = format!("{}_{}_unique", label.as_str().to_lowercase(), label.key_property());
        let cypher = format!(
            "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
            name,
            label.as_str(),
            label.key_property()
        );
        self.run(Query::new(cypher))
            .await
            .map_err(|e| GraphError::Schema {
                label: label.as_str(),
                reason: e.to_string(),
            })
    }

    async fn ensure_name_index(&self, label: Label) -> Result<(), GraphError> {
        let cypher = format!(
            "CREATE INDEX {}_name IF NOT EXISTS FOR (n:{}) ON (n.name)",
            label.as_str().to_lowercase(),
            label.as_str()
        );
        self.run(Query::new(cypher))
            .await
            .map_err(|e| GraphError::Schema {
                label: label.as_str(),
                reason: e.to_string(),
            })
    }

    async fn merge_node(&self, node: &NodeSpec) -> Result<bool, GraphError> {
        let label = node.node.label;
        let props: HashMap<String, BoltType> = node
            .properties
            .iter()
            .map(|(k, v)| (k.to_string(), bolt(v)))
            .collect();
        let cypher = format!(
            "MERGE (n:{label} {{{key}: $key}})
             ON CREATE SET n.created_at = datetime(), n._new = true
             SET n += $props
             WITH n, coalesce(n._new, false) AS created
             REMOVE n._new
             RETURN created",
            label = label.as_str(),
            key = label.key_property()
        );
        let query = Query::new(cypher)
            .param("key", node.node.key.clone())
            .param("props", props);
        Ok(self.flag(query).await?.unwrap_or(false))
    }

    async fn merge_edge(&self, from: &NodeRef, rel: Rel, to: &NodeRef) -> Result<bool, GraphError> {
        let cypher = format!(
            "MATCH (a:{from_label} {{{from_key}: $from}})
             MATCH (b:{to_label} {{{to_key}: $to}})
             MERGE (a)-[e:{rel}]->(b)
             ON CREATE SET e._new = true
             WITH e, coalesce(e._new, false) AS created
             REMOVE e._new
             RETURN created",
            from_label = from.label.as_str(),
            from_key = from.label.key_property(),
            to_label = to.label.as_str(),
            to_key = to.label.key_property(),
            rel = rel.as_str()
        );
        let query = Query::new(cypher)
            .param("from", from.key.clone())
            .param("to", to.key.clone());
        self.flag(query).await?.ok_or_else(|| GraphError::MissingNode {
            label: from.label.as_str(),
            key: from.key.clone(),
        })
    }

    async fn delete_reachable(
        &self,
        repository: &str,
        path: &[Rel],
        target: Label,
    ) -> Result<usize, GraphError> {
        let pattern = if path.is_empty() {
            "(n:Repository {name: $repository})".to_string()
        } else {
            path_pattern(path, target)
        };
        let cypher = format!(
            "MATCH {} WITH DISTINCT n DETACH DELETE n RETURN count(*) AS deleted",
            pattern
        );
        debug!(repository, target = target.as_str(), "deleting subtree");
        let deleted = self
            .scalar(Query::new(cypher).param("repository", repository), "deleted")
            .await?;
        Ok(usize::try_from(deleted).unwrap_or(0))
    }

    async fn reachable_from(&self, repository: &str) -> Result<usize, GraphError> {
        let rels: Vec<&str> = Rel::STRUCTURAL.iter().map(Rel::as_str).collect();
        let cypher = format!(
            "MATCH (:Repository {{name: $repository}})-[:{}*1..4]->(n) RETURN count(DISTINCT n) AS reachable",
            rels.join("|")
        );
        let n = self
            .scalar(Query::new(cypher).param("repository", repository), "reachable")
            .await?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let nodes = self
            .scalar(Query::new("MATCH (n) RETURN count(n) AS c".to_string()), "c")
            .await?;
        let edges = self
            .scalar(Query::new("MATCH ()-[r]->() RETURN count(r) AS c".to_string()), "c")
            .await?;
        Ok(GraphCounts {
            nodes: usize::try_from(nodes).unwrap_or(0),
            edges: usize::try_from(edges).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_pattern() {
        assert_eq!(
            path_pattern(&[Rel::Contains, Rel::Defines, Rel::HasMethod], Label::Method),
            "(r:Repository {name: $repository})-[:CONTAINS]->()-[:DEFINES]->()-[:HAS_METHOD]->(n:Method)"
        );
        assert_eq!(
            path_pattern(&[Rel::Contains], Label::File),
            "(r:Repository {name: $repository})-[:CONTAINS]->(n:File)"
        );
    }
}
