//! Identity spaces of the registry.

use std::fmt;

use crate::grammar::{CLASSES, DEVICES, SectionGrammar};

/// One of the two independent hierarchies held by the registry.
///
/// Root identifiers are unique only within a section: class `02` and vendor
/// `0002` never collide, and stores key aggregates by `(section, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Section {
    /// Vendors, their devices and subsystem entries.
    Devices,
    /// Device classes, subclasses and programming interfaces.
    Classes,
}

impl Section {
    /// Stable lowercase key used in logs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Classes => "classes",
        }
    }

    /// Column layout and start patterns for this section.
    #[must_use]
    pub fn grammar(self) -> &'static SectionGrammar {
        match self {
            Self::Devices => &DEVICES,
            Self::Classes => &CLASSES,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
