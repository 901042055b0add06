//! Registry acquisition and the end-to-end ingestion pass.
//!
//! [`source`] fetches the registry text over HTTP or from disk, and
//! [`pipeline`] drives a single pass of version gating, validation and
//! reconciliation against an [`AggregateStore`](pcidb_core::AggregateStore).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod pipeline;
pub mod source;

pub use pipeline::{PipelineError, PipelineOptions, RunReport, run_pipeline};
pub use source::{
    FileRegistrySource, HttpRegistrySource, RegistrySource, SourceBuildError, SourceUrl,
    TransportError,
};
