//! Core domain types and ingestion primitives for the PCI ID registry.
//!
//! The registry is a tab-indented text file holding two three-level
//! hierarchies: vendors, devices and subdevices; device classes, subclasses
//! and programming interfaces. This crate turns that text into [`Root`]
//! aggregates and decides how each one reconciles against an
//! [`AggregateStore`]:
//!
//! - [`grammar`] classifies lines and extracts their fixed-column fields.
//! - [`chunk`] groups a flat line stream into per-entity chunks.
//! - [`tree`] folds chunks into [`Root`] → [`Child`] → [`Descendant`] trees.
//! - [`hash`] digests a tree so unchanged aggregates can be skipped.
//! - [`version`] gates a run on the registry's declared version.
//! - [`reconcile`] inserts, skips or replaces aggregates in a store.
//!
//! Fetching the registry and sequencing a full run live in `pcidb-data`.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aggregate;
pub mod chunk;
pub mod grammar;
pub mod hash;
pub mod lines;
mod marker;
pub mod reconcile;
mod section;
pub mod store;
pub mod tree;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use aggregate::{Child, Descendant, Root};
pub use grammar::{GrammarViolation, ValidationPolicy, ViolationReason};
pub use hash::HashMode;
pub use lines::{Sections, SourceLine, split_sections};
pub use marker::RepositoryMarker;
pub use reconcile::{Outcome, ReconcileSummary, reconcile};
pub use section::Section;
pub use store::{AggregateStore, StoreError};
pub use tree::build_section;
pub use version::{GateDecision, VersionError, check_version};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteAggregateStore, SqliteAggregateStoreError};
