//! Insert, skip or replace decisions for freshly built aggregates.

use std::fmt;
use std::ops::AddAssign;

use log::{debug, trace};

use crate::{AggregateStore, Root, Section, StoreError};

/// What happened to one root during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No aggregate existed; the root was written.
    Inserted,
    /// The stored aggregate had the same hash; nothing was written.
    Skipped,
    /// The stored aggregate differed and was overwritten wholesale.
    Replaced,
}

impl Outcome {
    /// Whether the outcome involves a store write.
    #[must_use]
    pub const fn writes(self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Compare a freshly sealed root with whatever is stored under its key.
///
/// ```
/// use pcidb_core::reconcile::decide;
/// use pcidb_core::{HashMode, Outcome, Root};
///
/// let fresh = Root::new("0001", "VendorA").seal(HashMode::Compatible);
/// assert_eq!(decide(None, &fresh), Outcome::Inserted);
/// assert_eq!(decide(Some(&fresh.clone()), &fresh), Outcome::Skipped);
/// ```
#[must_use]
pub fn decide(persisted: Option<&Root>, fresh: &Root) -> Outcome {
    match persisted {
        None => Outcome::Inserted,
        Some(stored) if stored.hash == fresh.hash => Outcome::Skipped,
        Some(_) => Outcome::Replaced,
    }
}

/// Carry out `outcome` for `root`.
///
/// # Errors
///
/// Propagates the store's write failure.
pub fn apply<S>(
    store: &mut S,
    section: Section,
    root: &Root,
    outcome: Outcome,
) -> Result<(), StoreError>
where
    S: AggregateStore + ?Sized,
{
    match outcome {
        Outcome::Inserted => {
            debug!("inserting {section} aggregate {}", root.id);
            store.insert_root(section, root)
        }
        Outcome::Replaced => {
            debug!("replacing {section} aggregate {}", root.id);
            store.replace_root(section, root)
        }
        Outcome::Skipped => {
            trace!("{section} aggregate {} unchanged", root.id);
            Ok(())
        }
    }
}

/// Look up, decide and write one sealed root.
///
/// The stored aggregate is dropped before any write, so at most one copy of
/// a large vendor tree is held beyond the fresh one.
///
/// # Errors
///
/// Propagates store read and write failures.
pub fn reconcile<S>(store: &mut S, section: Section, root: &Root) -> Result<Outcome, StoreError>
where
    S: AggregateStore + ?Sized,
{
    let outcome = {
        let persisted = store.find_root(section, &root.id)?;
        decide(persisted.as_ref(), root)
    };
    apply(store, section, root, outcome)?;
    Ok(outcome)
}

/// Outcome counts for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconcileSummary {
    /// Roots written for the first time.
    pub inserted: usize,
    /// Roots left untouched.
    pub skipped: usize,
    /// Roots overwritten.
    pub replaced: usize,
}

impl ReconcileSummary {
    /// Count one outcome.
    pub const fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Replaced => self.replaced += 1,
        }
    }

    /// Number of roots seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.skipped + self.replaced
    }

    /// Number of roots written.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.inserted + self.replaced
    }
}

impl AddAssign<Outcome> for ReconcileSummary {
    fn add_assign(&mut self, outcome: Outcome) {
        self.record(outcome);
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} replaced, {} unchanged",
            self.inserted, self.replaced, self.skipped
        )
    }
}
