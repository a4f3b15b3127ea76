//! Groundcheck - knowledge-graph ingestion and hallucination detection.
//!
//! Groundcheck turns a TypeScript/React or Python repository into a graph of
//! its files, classes, functions, components and hooks, and validates source
//! files against that structure and against a snapshot of the database
//! schema the code talks to. References to things that do not exist, and
//! calls whose parameters do not match, become typed detections with a
//! per-file confidence score.
//!
//! # Architecture
//!
//! - `analysis`: per-language structural analyzers producing [`ModuleAnalysis`]
//! - `graph`: deterministic keys, graph stores and the ingestion builder
//! - `schema`: catalog types and the backend introspector
//! - `validate`: RPC, signature and pattern validators plus the orchestrator
//! - `score`: confidence and grade calculation
//! - `report`: output formatting (pretty, JSON, SARIF)
//! - `config`, `cli`: the YAML config and the command-line driver
//!
//! # Adding a New Language
//!
//! Implement `LanguageAnalyzer` in `src/analysis/languages/` and route its
//! extensions in `Analyzers::for_path`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod graph;
pub mod report;
pub mod schema;
pub mod score;
pub mod validate;

pub use analysis::{analyze_file, analyze_files, AnalysisContext, Analyzers, Language, LanguageAnalyzer, ModuleAnalysis};
pub use config::Config;
pub use graph::{GraphBuilder, GraphError, GraphStore, IngestStats, MemoryStore, Neo4jStore};
pub use schema::{Introspector, SchemaBackend, SchemaCatalog};
pub use validate::{Detection, DetectionKind, Severity, ValidationReport, Validator};
