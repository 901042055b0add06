//! Persistence seam for root aggregates and the repository marker.
//!
//! The [`AggregateStore`] trait is the only thing the reconciler and the
//! pipeline know about storage. Aggregates are keyed by `(section, id)` and
//! always read and written whole.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{RepositoryMarker, Root, Section};

#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteAggregateStore, SqliteAggregateStoreError};

/// Keyed access to persisted root aggregates.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use pcidb_core::{AggregateStore, RepositoryMarker, Root, Section, StoreError};
///
/// #[derive(Default)]
/// struct MapStore {
///     roots: BTreeMap<(Section, String), Root>,
///     marker: Option<RepositoryMarker>,
/// }
///
/// impl AggregateStore for MapStore {
///     fn find_root(&self, section: Section, id: &str) -> Result<Option<Root>, StoreError> {
///         Ok(self.roots.get(&(section, id.to_owned())).cloned())
///     }
///     fn insert_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
///         self.roots.insert((section, root.id.clone()), root.clone());
///         Ok(())
///     }
///     fn replace_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
///         self.insert_root(section, root)
///     }
///     fn list_roots(&self, section: Section) -> Result<Vec<Root>, StoreError> {
///         Ok(self
///             .roots
///             .iter()
///             .filter(|((s, _), _)| *s == section)
///             .map(|(_, root)| root.clone())
///             .collect())
///     }
///     fn load_marker(&self) -> Result<Option<RepositoryMarker>, StoreError> {
///         Ok(self.marker.clone())
///     }
///     fn save_marker(&mut self, marker: &RepositoryMarker) -> Result<(), StoreError> {
///         self.marker = Some(marker.clone());
///         Ok(())
///     }
/// }
///
/// let mut store = MapStore::default();
/// store.insert_root(Section::Classes, &Root::new("01", "Mass storage")).unwrap();
/// assert!(store.find_root(Section::Devices, "01").unwrap().is_none());
/// ```
pub trait AggregateStore {
    /// Fetch the aggregate stored under `(section, id)`.
    fn find_root(&self, section: Section, id: &str) -> Result<Option<Root>, StoreError>;

    /// Store a new aggregate. Fails with [`StoreError::Duplicate`] when the
    /// key is taken.
    fn insert_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError>;

    /// Swap the stored aggregate for `root` in one atomic step.
    fn replace_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError>;

    /// Every aggregate of `section`, ordered by id.
    fn list_roots(&self, section: Section) -> Result<Vec<Root>, StoreError>;

    /// The repository marker, or `None` before the first completed run.
    fn load_marker(&self) -> Result<Option<RepositoryMarker>, StoreError>;

    /// Create or overwrite the repository marker.
    fn save_marker(&mut self, marker: &RepositoryMarker) -> Result<(), StoreError>;
}

impl<S: AggregateStore + ?Sized> AggregateStore for &mut S {
    fn find_root(&self, section: Section, id: &str) -> Result<Option<Root>, StoreError> {
        (**self).find_root(section, id)
    }

    fn insert_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        (**self).insert_root(section, root)
    }

    fn replace_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        (**self).replace_root(section, root)
    }

    fn list_roots(&self, section: Section) -> Result<Vec<Root>, StoreError> {
        (**self).list_roots(section)
    }

    fn load_marker(&self) -> Result<Option<RepositoryMarker>, StoreError> {
        (**self).load_marker()
    }

    fn save_marker(&mut self, marker: &RepositoryMarker) -> Result<(), StoreError> {
        (**self).save_marker(marker)
    }
}

/// Failures reported by an [`AggregateStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// An insert hit an existing key.
    #[error("{section} aggregate {id} already exists")]
    Duplicate {
        /// Section of the clashing aggregate.
        section: Section,
        /// Its root id.
        id: String,
    },
    /// A replace targeted a key with nothing stored.
    #[error("{section} aggregate {id} does not exist")]
    Missing {
        /// Section of the absent aggregate.
        section: Section,
        /// Its root id.
        id: String,
    },
    /// The backing storage failed.
    #[error("store failed to {operation}: {source}")]
    Backend {
        /// What the store was doing.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl StoreError {
    /// Wrap a backend failure with the operation that raised it.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}
