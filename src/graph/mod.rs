//! Knowledge graph of a repository's structure.
//!
//! ```text
//! Repository -CONTAINS-> File -DEFINES-> Class     -HAS_METHOD->    Method
//!                          |                       -HAS_ATTRIBUTE-> Attribute
//!                          |            Component  -USES_HOOK->     Hook
//!                          |                       -HAS_PROPS->     Props
//!                          |            Function | Interface | TypeDefinition
//!                          +-IMPORTS-> File
//!
//! SchemaTable -HAS_COLUMN-> SchemaColumn -REFERENCES-> SchemaTable
//! SchemaFunction, SchemaEnum
//! ```
//!
//! Every node is merged on a deterministic key from [`keys`], so ingesting
//! an unchanged repository twice adds nothing.

mod builder;
pub mod keys;
mod memory;
mod neo4j;
mod store;

pub use builder::{GraphBuilder, IngestStats};
pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;
pub use store::{GraphCounts, GraphStore, Label, NodeRef, NodeSpec, Property, Rel};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to connect to graph store: {0}")]
    Connection(String),

    #[error("graph query failed: {0}")]
    Query(String),

    #[error("failed to declare schema for {label}: {reason}")]
    Schema { label: &'static str, reason: String },

    #[error("key part {0:?} is empty or contains the '::' separator")]
    InvalidKey(String),

    #[error("{label} node {key:?} does not exist")]
    MissingNode { label: &'static str, key: String },
}

impl GraphError {
    pub(crate) fn query(e: impl std::fmt::Display) -> Self {
        GraphError::Query(e.to_string())
    }
}
