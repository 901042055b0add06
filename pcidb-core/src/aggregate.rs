//! Three-level aggregates built from registry chunks.

use crate::hash::{HashMode, digest};

/// Top-level entity of a section: a vendor or a device class.
///
/// A root owns its whole subtree and is persisted as one unit together with
/// its content [`hash`](Self::hash).
///
/// # Examples
///
/// ```
/// use pcidb_core::{Child, Descendant, HashMode, Root};
///
/// let root = Root::new("0001", "VendorA")
///     .with_child(
///         Child::new("0001", "DeviceA")
///             .with_descendant(Descendant::new("0003", "SubdeviceA").with_aux("0002")),
///     )
///     .seal(HashMode::Compatible);
/// assert_eq!(root.children.len(), 1);
/// assert_eq!(root.hash.len(), 28);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Root {
    /// Hexadecimal natural key.
    pub id: String,
    /// Free-text name.
    pub name: String,
    /// Children in source order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Child>,
    /// Base64 content digest; empty until [`Root::seal`] runs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hash: String,
}

impl Root {
    /// Construct an unsealed root without children.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
            hash: String::new(),
        }
    }

    /// Append a child, keeping source order.
    #[must_use]
    pub fn with_child(mut self, child: Child) -> Self {
        self.children.push(child);
        self
    }

    /// Compute and store the content digest.
    #[must_use]
    pub fn seal(mut self, mode: HashMode) -> Self {
        self.hash = digest(&self, mode);
        self
    }

    /// Look up a direct child by identifier.
    #[must_use]
    pub fn child(&self, id: &str) -> Option<&Child> {
        self.children.iter().find(|child| child.id == id)
    }
}

/// Second-level entity: a device or a subclass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Child {
    /// Hexadecimal key, unique only under its root.
    pub id: String,
    /// Free-text name.
    pub name: String,
    /// Leaf entries in source order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub descendants: Vec<Descendant>,
}

impl Child {
    /// Construct a child without descendants.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            descendants: Vec::new(),
        }
    }

    /// Append a descendant, keeping source order.
    #[must_use]
    pub fn with_descendant(mut self, descendant: Descendant) -> Self {
        self.descendants.push(descendant);
        self
    }
}

/// Leaf entity: a subdevice or a programming interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Descendant {
    /// Hexadecimal key, unique only under its child.
    pub id: String,
    /// Free-text name.
    pub name: String,
    /// Kind-specific extra code (the subvendor of a subdevice).
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub aux: Option<String>,
}

impl Descendant {
    /// Construct a descendant without an auxiliary code.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aux: None,
        }
    }

    /// Attach the auxiliary code.
    #[must_use]
    pub fn with_aux(mut self, aux: impl Into<String>) -> Self {
        self.aux = Some(aux.into());
        self
    }
}
