//! Error types emitted by the pcidb CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pcidb_core::{SqliteAggregateStoreError, StoreError};
use pcidb_data::{PipelineError, SourceBuildError};
use thiserror::Error;

/// Errors emitted by the pcidb CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name of the option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Two mutually exclusive options were both set.
    #[error("--{first} and --{second} cannot be combined")]
    ConflictingArguments {
        /// One of the conflicting flags.
        first: &'static str,
        /// The other conflicting flag.
        second: &'static str,
    },
    /// An option carried a value that cannot be used.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidValue {
        /// Long flag name of the option.
        field: &'static str,
        /// Value as supplied.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The database file required by `show` does not exist.
    #[error("database {path:?} does not exist; run `pcidb sync` first")]
    MissingDatabase {
        /// Configured database path.
        path: Utf8PathBuf,
    },
    /// The database location could not be inspected or prepared.
    #[error("failed to prepare database location {path:?}: {source}")]
    PrepareDatabase {
        /// Configured database path.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite aggregate store failed.
    #[error("failed to open aggregate store {path:?}: {source}")]
    OpenStore {
        /// Configured database path.
        path: Utf8PathBuf,
        /// Error raised while opening or migrating the database.
        #[source]
        source: SqliteAggregateStoreError,
    },
    /// Constructing the HTTP registry source failed.
    #[error(transparent)]
    BuildSource(#[from] SourceBuildError),
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// An ingestion pass failed.
    #[error("ingestion failed: {0}")]
    Pipeline(#[from] PipelineError),
    /// Reading from the aggregate store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A requested aggregate is not stored.
    #[error("{what} {id} not found")]
    NotFound {
        /// Kind of aggregate requested.
        what: &'static str,
        /// Requested identifier.
        id: String,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    Serialise(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
