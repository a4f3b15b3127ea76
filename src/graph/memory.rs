//! In-memory graph store for dry runs and tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::store::{GraphCounts, GraphStore, Label, NodeRef, NodeSpec, Property, Rel};
use super::GraphError;

#[derive(Debug, Default)]
struct MemoryData {
    constraints: BTreeSet<Label>,
    name_indexes: BTreeSet<Label>,
    nodes: BTreeMap<NodeRef, BTreeMap<&'static str, Property>>,
    edges: BTreeSet<(NodeRef, Rel, NodeRef)>,
}

/// Keeps nodes unique per (label, key) and deletes the same subtrees the
/// database store does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryData>, GraphError> {
        self.data
            .lock()
            .map_err(|_| GraphError::Query("memory store lock poisoned".into()))
    }

    pub fn has_constraint(&self, label: Label) -> bool {
        self.lock().map(|d| d.constraints.contains(&label)).unwrap_or(false)
    }

    pub fn has_name_index(&self, label: Label) -> bool {
        self.lock().map(|d| d.name_indexes.contains(&label)).unwrap_or(false)
    }

    pub fn contains(&self, label: Label, key: &str) -> bool {
        self.lock()
            .map(|d| d.nodes.contains_key(&NodeRef::new(label, key)))
            .unwrap_or(false)
    }

    pub fn property(&self, label: Label, key: &str, name: &str) -> Option<Property> {
        let data = self.lock().ok()?;
        data.nodes.get(&NodeRef::new(label, key))?.get(name).cloned()
    }

    pub fn count_label(&self, label: Label) -> usize {
        self.lock()
            .map(|d| d.nodes.keys().filter(|n| n.label == label).count())
            .unwrap_or(0)
    }

    pub fn has_edge(&self, from: &NodeRef, rel: Rel, to: &NodeRef) -> bool {
        self.lock()
            .map(|d| d.edges.contains(&(from.clone(), rel, to.clone())))
            .unwrap_or(false)
    }

    /// Keys of every node with `label`, sorted.
    pub fn keys(&self, label: Label) -> Vec<String> {
        self.lock()
            .map(|d| {
                d.nodes
                    .keys()
                    .filter(|n| n.label == label)
                    .map(|n| n.key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl MemoryData {
    fn step(&self, from: &BTreeSet<NodeRef>, rels: &[Rel]) -> BTreeSet<NodeRef> {
        self.edges
            .iter()
            .filter(|(a, rel, _)| from.contains(a) && rels.contains(rel))
            .map(|(_, _, b)| b.clone())
            .collect()
    }

    fn repository(&self, name: &str) -> BTreeSet<NodeRef> {
        let repo = NodeRef::new(Label::Repository, name);
        if self.nodes.contains_key(&repo) {
            BTreeSet::from([repo])
        } else {
            BTreeSet::new()
        }
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn ensure_constraint(&self, label: Label) -> Result<(), GraphError> {
        self.lock()?.constraints.insert(label);
        Ok(())
    }

    async fn ensure_name_index(&self, label: Label) -> Result<(), GraphError> {
        self.lock()?.name_indexes.insert(label);
        Ok(())
    }

    async fn merge_node(&self, node: &NodeSpec) -> Result<bool, GraphError> {
        let mut data = self.lock()?;
        let created = !data.nodes.contains_key(&node.node);
        let props = data.nodes.entry(node.node.clone()).or_default();
        for (name, value) in &node.properties {
            props.insert(*name, value.clone());
        }
        Ok(created)
    }

    async fn merge_edge(&self, from: &NodeRef, rel: Rel, to: &NodeRef) -> Result<bool, GraphError> {
        let mut data = self.lock()?;
        for end in [from, to] {
            if !data.nodes.contains_key(end) {
                return Err(GraphError::MissingNode {
                    label: end.label.as_str(),
                    key: end.key.clone(),
                });
            }
        }
        Ok(data.edges.insert((from.clone(), rel, to.clone())))
    }

    async fn delete_reachable(
        &self,
        repository: &str,
        path: &[Rel],
        target: Label,
    ) -> Result<usize, GraphError> {
        let mut data = self.lock()?;
        let mut frontier = data.repository(repository);
        for rel in path {
            frontier = data.step(&frontier, std::slice::from_ref(rel));
        }
        frontier.retain(|n| n.label == target);

        for node in &frontier {
            data.nodes.remove(node);
        }
        data.edges
            .retain(|(a, _, b)| !frontier.contains(a) && !frontier.contains(b));
        Ok(frontier.len())
    }

    async fn reachable_from(&self, repository: &str) -> Result<usize, GraphError> {
        let data = self.lock()?;
        let mut seen = BTreeSet::new();
        let mut frontier = data.repository(repository);
        while !frontier.is_empty() {
            frontier = data.step(&frontier, &Rel::STRUCTURAL);
            frontier.retain(|n| !seen.contains(n));
            seen.extend(frontier.iter().cloned());
        }
        Ok(seen.len())
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let data = self.lock()?;
        Ok(GraphCounts {
            nodes: data.nodes.len(),
            edges: data.edges.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_merge_is_idempotent() {
        let store = MemoryStore::new();
        block_on(async {
            let repo = NodeSpec::new(Label::Repository, "r");
            let file = NodeSpec::new(Label::File, "r::a.py").prop("path", "a.py");
            assert!(store.merge_node(&repo).await.unwrap());
            assert!(store.merge_node(&file).await.unwrap());
            assert!(!store.merge_node(&file).await.unwrap());
            assert!(store.merge_edge(&repo.node, Rel::Contains, &file.node).await.unwrap());
            assert!(!store.merge_edge(&repo.node, Rel::Contains, &file.node).await.unwrap());
            assert_eq!(store.counts().await.unwrap(), GraphCounts { nodes: 2, edges: 1 });
        });
        assert_eq!(
            store.property(Label::File, "r::a.py", "path"),
            Some(Property::Text("a.py".into()))
        );
    }

    #[test]
    fn test_edge_needs_both_endpoints() {
        let store = MemoryStore::new();
        let err = block_on(store.merge_edge(
            &NodeRef::new(Label::File, "a"),
            Rel::Imports,
            &NodeRef::new(Label::File, "b"),
        ))
        .unwrap_err();
        assert!(matches!(err, GraphError::MissingNode { label: "File", .. }));
    }

    #[test]
    fn test_delete_follows_exact_path() {
        let store = MemoryStore::new();
        block_on(async {
            let repo = NodeRef::new(Label::Repository, "r");
            let file = NodeRef::new(Label::File, "r::a.py");
            let class = NodeRef::new(Label::Class, "r::a.py::A");
            let method = NodeRef::new(Label::Method, "r::a.py::A::method::m");
            for n in [&repo, &file, &class, &method] {
                store.merge_node(&NodeSpec { node: n.clone(), properties: BTreeMap::new() }).await.unwrap();
            }
            store.merge_edge(&repo, Rel::Contains, &file).await.unwrap();
            store.merge_edge(&file, Rel::Defines, &class).await.unwrap();
            store.merge_edge(&class, Rel::HasMethod, &method).await.unwrap();
            assert_eq!(store.reachable_from("r").await.unwrap(), 3);

            let path = [Rel::Contains, Rel::Defines];
            assert_eq!(store.delete_reachable("r", &path, Label::Method).await.unwrap(), 0);
            assert_eq!(store.delete_reachable("r", &path, Label::Class).await.unwrap(), 1);
            assert_eq!(store.counts().await.unwrap(), GraphCounts { nodes: 3, edges: 1 });
            assert_eq!(store.delete_reachable("r", &[], Label::Repository).await.unwrap(), 1);
            assert_eq!(store.reachable_from("r").await.unwrap(), 0);
        });
    }
}
