//! One complete ingestion pass.
//!
//! [`run_pipeline`] fetches the registry, gates on its declared version,
//! validates both sections, reconciles classes and then devices root by
//! root, and finally records the new version in the repository marker.
//! There is no intermediate checkpoint: a failed or cancelled pass leaves
//! the marker untouched, so the next pass starts over and skips every root
//! that was already written.

use std::fmt;

use chrono::{NaiveDate, Utc};
use log::{debug, info};
use pcidb_core::reconcile::{apply, decide};
use pcidb_core::{
    AggregateStore, GrammarViolation, HashMode, ReconcileSummary, RepositoryMarker, Section,
    SourceLine, StoreError, ValidationPolicy, VersionError, build_section, check_version,
    split_sections,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::source::{RegistrySource, TransportError};

/// Tunables for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    /// Reject or skip malformed lines.
    pub validation: ValidationPolicy,
    /// Digest layout used for change detection.
    pub hash_mode: HashMode,
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReport {
    /// The store already held this version; nothing was parsed or written.
    Unchanged {
        /// Version declared by the source.
        version: NaiveDate,
    },
    /// Both sections were reconciled and the marker finalized.
    Completed {
        /// Version now recorded in the marker.
        version: NaiveDate,
        /// Outcome counts for the classes section.
        classes: ReconcileSummary,
        /// Outcome counts for the devices section.
        devices: ReconcileSummary,
    },
}

impl RunReport {
    /// Version declared by the fetched registry.
    #[must_use]
    pub const fn version(&self) -> NaiveDate {
        match self {
            Self::Unchanged { version } | Self::Completed { version, .. } => *version,
        }
    }

    /// Number of aggregates written, excluding the marker.
    #[must_use]
    pub const fn writes(&self) -> usize {
        match self {
            Self::Unchanged { .. } => 0,
            Self::Completed {
                classes, devices, ..
            } => classes.writes() + devices.writes(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged { version } => write!(f, "version {version} already ingested"),
            Self::Completed {
                version,
                classes,
                devices,
            } => write!(
                f,
                "ingested version {version}: classes {classes}; devices {devices}"
            ),
        }
    }
}

/// Reasons a run stops before finalizing the marker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The registry could not be fetched.
    #[error("failed to fetch registry: {0}")]
    Fetch(#[from] TransportError),
    /// The registry header carries no usable version.
    #[error("registry version is unusable: {0}")]
    Version(#[from] VersionError),
    /// A line broke the section grammar under strict validation.
    #[error("registry failed validation: {0}")]
    Grammar(#[from] GrammarViolation),
    /// The aggregate store failed.
    #[error("aggregate store failed: {0}")]
    Store(#[from] StoreError),
    /// The run was cancelled.
    #[error("pipeline run cancelled")]
    Cancelled,
}

/// Run one ingestion pass of `source` into `store`.
///
/// `cancel` is honoured while fetching and before every store read or
/// write. Roots committed before a cancellation or failure stay committed.
///
/// # Errors
///
/// Returns [`PipelineError`] when fetching, version detection, validation
/// or the store fails, or when `cancel` fires.
///
/// # Examples
///
/// ```no_run
/// use pcidb_core::SqliteAggregateStore;
/// use pcidb_data::pipeline::{PipelineOptions, run_pipeline};
/// use pcidb_data::source::FileRegistrySource;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let source = FileRegistrySource::new("/usr/share/hwdata/pci.ids");
/// let mut store = SqliteAggregateStore::open("pcidb.sqlite")?;
/// let cancel = CancellationToken::new();
/// let report = run_pipeline(&source, &mut store, PipelineOptions::default(), &cancel).await?;
/// assert!(report.writes() > 0);
/// # Ok(())
/// # }
/// ```
pub async fn run_pipeline<R, S>(
    source: &R,
    store: &mut S,
    options: PipelineOptions,
    cancel: &CancellationToken,
) -> Result<RunReport, PipelineError>
where
    R: RegistrySource + ?Sized,
    S: AggregateStore + ?Sized,
{
    info!("fetching registry from {}", source.location());
    let text = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        fetched = source.fetch() => fetched?,
    };

    ensure_active(cancel)?;
    let marker = store.load_marker()?;
    let gate = check_version(&text, marker.as_ref())?;
    if !gate.proceed {
        return Ok(RunReport::Unchanged {
            version: gate.version,
        });
    }

    let sections = split_sections(&text);
    debug!(
        "registry holds {} device lines and {} class lines",
        sections.devices.len(),
        sections.classes.len()
    );
    if options.validation == ValidationPolicy::Strict {
        Section::Devices
            .grammar()
            .validate(sections.devices.iter().copied())?;
        Section::Classes
            .grammar()
            .validate(sections.classes.iter().copied())?;
    }

    let classes =
        reconcile_section(store, Section::Classes, sections.classes, options, cancel).await?;
    let devices =
        reconcile_section(store, Section::Devices, sections.devices, options, cancel).await?;

    ensure_active(cancel)?;
    store.save_marker(&RepositoryMarker::finalized(gate.version, Utc::now()))?;
    let report = RunReport::Completed {
        version: gate.version,
        classes,
        devices,
    };
    info!("{report}");
    Ok(report)
}

async fn reconcile_section<S>(
    store: &mut S,
    section: Section,
    lines: Vec<SourceLine<'_>>,
    options: PipelineOptions,
    cancel: &CancellationToken,
) -> Result<ReconcileSummary, PipelineError>
where
    S: AggregateStore + ?Sized,
{
    let mut summary = ReconcileSummary::default();
    for built in build_section(section, lines, options.validation) {
        let root = built?.seal(options.hash_mode);
        ensure_active(cancel)?;
        let outcome = {
            let persisted = store.find_root(section, &root.id)?;
            decide(persisted.as_ref(), &root)
        };
        if outcome.writes() {
            ensure_active(cancel)?;
        }
        apply(store, section, &root, outcome)?;
        summary += outcome;
        tokio::task::yield_now().await;
    }
    info!("{section}: {summary}");
    Ok(summary)
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
