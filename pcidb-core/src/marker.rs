use chrono::{DateTime, NaiveDate, Utc};

/// Singleton record describing the last registry version fully ingested.
///
/// A store without a marker behaves as if it held
/// [`RepositoryMarker::default`]: no version, never updated, still
/// refreshing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepositoryMarker {
    /// Version declared by the last successfully processed registry.
    pub version: Option<NaiveDate>,
    /// When that run finished.
    pub last_update: Option<DateTime<Utc>>,
    /// `true` until a run has been finalized.
    pub refreshing: bool,
}

impl Default for RepositoryMarker {
    fn default() -> Self {
        Self {
            version: None,
            last_update: None,
            refreshing: true,
        }
    }
}

impl RepositoryMarker {
    /// Marker written when a run completes.
    #[must_use]
    pub const fn finalized(version: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            version: Some(version),
            last_update: Some(at),
            refreshing: false,
        }
    }
}
