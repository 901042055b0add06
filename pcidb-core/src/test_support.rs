//! Test-only, in-memory `AggregateStore` used by unit and behaviour tests.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::io;

use crate::{AggregateStore, RepositoryMarker, Root, Section, StoreError};

/// In-memory `AggregateStore` that counts reads and writes.
///
/// Failure injection via [`MemoryStore::failing_after`] makes every
/// operation past a threshold return [`StoreError::Backend`].
#[derive(Default, Debug)]
pub struct MemoryStore {
    roots: BTreeMap<(Section, String), Root>,
    marker: Option<RepositoryMarker>,
    reads: Cell<usize>,
    writes: usize,
    fail_after: Option<usize>,
}

impl MemoryStore {
    /// Create a store already holding `root` under `section`.
    #[must_use]
    pub fn with_root(mut self, section: Section, root: Root) -> Self {
        self.roots.insert((section, root.id.clone()), root);
        self
    }

    /// Create a store already holding `marker`.
    #[must_use]
    pub fn with_marker(mut self, marker: RepositoryMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Fail every operation once `operations` reads and writes succeeded.
    #[must_use]
    pub fn failing_after(mut self, operations: usize) -> Self {
        self.fail_after = Some(operations);
        self
    }

    /// Number of read operations served.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of write operations performed.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Peek at a stored root without counting a read.
    #[must_use]
    pub fn root(&self, section: Section, id: &str) -> Option<&Root> {
        self.roots.get(&(section, id.to_owned()))
    }

    /// Peek at the stored marker without counting a read.
    #[must_use]
    pub const fn marker(&self) -> Option<&RepositoryMarker> {
        self.marker.as_ref()
    }

    /// Number of roots stored under `section`.
    #[must_use]
    pub fn len(&self, section: Section) -> usize {
        self.roots.keys().filter(|(s, _)| *s == section).count()
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        match self.fail_after {
            Some(limit) if self.reads.get() + self.writes >= limit => Err(StoreError::backend(
                operation,
                io::Error::other("injected store failure"),
            )),
            _ => Ok(()),
        }
    }

    fn read(&self, operation: &'static str) -> Result<(), StoreError> {
        self.check(operation)?;
        self.reads.set(self.reads.get() + 1);
        Ok(())
    }

    fn write(&mut self, operation: &'static str) -> Result<(), StoreError> {
        self.check(operation)?;
        self.writes += 1;
        Ok(())
    }
}

impl AggregateStore for MemoryStore {
    fn find_root(&self, section: Section, id: &str) -> Result<Option<Root>, StoreError> {
        self.read("read aggregate")?;
        Ok(self.root(section, id).cloned())
    }

    fn insert_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        self.write("insert aggregate")?;
        let key = (section, root.id.clone());
        if self.roots.contains_key(&key) {
            return Err(StoreError::Duplicate {
                section,
                id: root.id.clone(),
            });
        }
        self.roots.insert(key, root.clone());
        Ok(())
    }

    fn replace_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        self.write("replace aggregate")?;
        match self.roots.get_mut(&(section, root.id.clone())) {
            Some(slot) => {
                *slot = root.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                section,
                id: root.id.clone(),
            }),
        }
    }

    fn list_roots(&self, section: Section) -> Result<Vec<Root>, StoreError> {
        self.read("list aggregates")?;
        Ok(self
            .roots
            .iter()
            .filter(|((s, _), _)| *s == section)
            .map(|(_, root)| root.clone())
            .collect())
    }

    fn load_marker(&self) -> Result<Option<RepositoryMarker>, StoreError> {
        self.read("read repository marker")?;
        Ok(self.marker.clone())
    }

    fn save_marker(&mut self, marker: &RepositoryMarker) -> Result<(), StoreError> {
        self.write("write repository marker")?;
        self.marker = Some(marker.clone());
        Ok(())
    }
}
