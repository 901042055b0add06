//! Facade crate for the PCI ID registry mirror.
//!
//! This crate re-exports the core domain types and exposes the SQLite store
//! and the ingestion pipeline behind feature flags.

#![forbid(unsafe_code)]

pub use pcidb_core::{
    AggregateStore, Child, Descendant, GrammarViolation, HashMode, Outcome, ReconcileSummary,
    RepositoryMarker, Root, Section, StoreError, ValidationPolicy, VersionError,
};

#[cfg(feature = "store-sqlite")]
pub use pcidb_core::{SqliteAggregateStore, SqliteAggregateStoreError};

#[cfg(feature = "pipeline")]
pub use pcidb_data::{
    FileRegistrySource, HttpRegistrySource, PipelineError, PipelineOptions, RegistrySource,
    RunReport, SourceUrl, TransportError, run_pipeline,
};
