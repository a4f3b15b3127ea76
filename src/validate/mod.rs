//! File validation: hallucination-style problems in generated code.
//!
//! [`Validator`] runs structural analysis on a file and then every check
//! against it: unknown components and hooks, framework signatures, backend
//! tables and RPC parameters (when a [`crate::schema::SchemaCatalog`] is
//! available), declared-signature consistency and source patterns. The
//! result is one [`ValidationReport`] per file.

pub mod orchestrator;
pub mod patterns;
pub mod report;
pub mod rpc;
pub mod signature;
pub mod text;
pub mod types;
pub mod value;

pub use orchestrator::Validator;
pub use report::{recommendations, statistics, BackendUsage, ValidationReport};
pub use rpc::{RpcIssueKind, RpcValidator, ValidationIssue};
pub use signature::{SignatureIssue, SignatureValidator};
pub use types::{Detection, DetectionKind, Location, Severity};
