//! Content digests for change detection.
//!
//! A root's digest is SHA-1 over the concatenated UTF-8 of its fields,
//! encoded as standard padded Base64 (28 characters). Auxiliary codes never
//! contribute. In [`HashMode::Compatible`] each child contributes the
//! *root's* id and name rather than its own, matching digests already held
//! by existing stores; [`HashMode::Corrected`] uses the child's fields.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

use crate::Root;

/// Which fields stand in for each child in the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HashMode {
    /// Repeat the root's id and name for every child.
    #[default]
    Compatible,
    /// Use each child's own id and name.
    Corrected,
}

impl HashMode {
    /// Lowercase configuration value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compatible => "compatible",
            Self::Corrected => "corrected",
        }
    }
}

impl fmt::Display for HashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compatible" => Ok(Self::Compatible),
            "corrected" => Ok(Self::Corrected),
            _ => Err(format!("unknown hash mode '{s}'")),
        }
    }
}

/// Digest `root` and its subtree, ignoring any hash it already carries.
///
/// ```
/// use pcidb_core::{HashMode, Root, hash::digest};
///
/// let root = Root::new("0001", "VendorA");
/// assert_eq!(digest(&root, HashMode::Compatible), "AZqmPMnbuB5o3NsU1JJacc0wvjU=");
/// ```
#[must_use]
pub fn digest(root: &Root, mode: HashMode) -> String {
    let mut hasher = Sha1::new();
    hasher.update(&root.id);
    hasher.update(&root.name);
    for child in &root.children {
        let (id, name) = match mode {
            HashMode::Compatible => (&root.id, &root.name),
            HashMode::Corrected => (&child.id, &child.name),
        };
        hasher.update(id);
        hasher.update(name);
        for descendant in &child.descendants {
            hasher.update(&descendant.id);
            hasher.update(&descendant.name);
        }
    }
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Child, Descendant};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn vendor_a() -> Root {
        Root::new("0001", "VendorA").with_child(
            Child::new("0001", "DeviceA")
                .with_descendant(Descendant::new("0003", "SubdeviceA").with_aux("0002")),
        )
    }

    #[rstest]
    #[case(HashMode::Compatible, "o52HT012ujqqDt4ldNehyC/16e4=")]
    #[case(HashMode::Corrected, "sWeGSF+IxNZJ7wkSZATCIKwphAg=")]
    fn matches_known_digests(vendor_a: Root, #[case] mode: HashMode, #[case] expected: &str) {
        assert_eq!(digest(&vendor_a, mode), expected);
    }

    #[rstest]
    fn class_digest_repeats_class_fields() {
        let class = Root::new("01", "Mass storage controller")
            .with_child(Child::new("00", "SCSI"));
        assert_eq!(
            digest(&class, HashMode::Compatible),
            "TMQ1OJA6kqypmihVnZWNMf0oYl0="
        );
    }

    #[rstest]
    fn aux_does_not_contribute(vendor_a: Root) {
        let mut other = vendor_a.clone();
        other.children[0].descendants[0].aux = Some("ffff".into());
        assert_eq!(
            digest(&vendor_a, HashMode::Compatible),
            digest(&other, HashMode::Compatible)
        );
    }

    #[rstest]
    fn compatible_mode_ignores_child_fields(vendor_a: Root) {
        let mut renamed = vendor_a.clone();
        renamed.children[0].name = "Renamed".into();
        assert_eq!(
            digest(&vendor_a, HashMode::Compatible),
            digest(&renamed, HashMode::Compatible)
        );
        assert_ne!(
            digest(&vendor_a, HashMode::Corrected),
            digest(&renamed, HashMode::Corrected)
        );
    }

    #[fixture]
    fn two_subdevices() -> Root {
        Root::new("0001", "VendorA").with_child(
            Child::new("0001", "DeviceA")
                .with_descendant(Descendant::new("0003", "SubdeviceA").with_aux("0002"))
                .with_descendant(Descendant::new("0004", "SubdeviceB").with_aux("0002")),
        )
    }

    fn rename_root_id(root: &mut Root) {
        root.id = "0002".into();
    }

    fn rename_root(root: &mut Root) {
        root.name = "VendorA Inc.".into();
    }

    fn change_descendant_id(root: &mut Root) {
        root.children[0].descendants[1].id = "0005".into();
    }

    fn rename_descendant(root: &mut Root) {
        root.children[0].descendants[0].name = "SubdeviceC".into();
    }

    fn swap_descendants(root: &mut Root) {
        root.children[0].descendants.swap(0, 1);
    }

    #[rstest]
    #[case::root_id(rename_root_id as fn(&mut Root))]
    #[case::root_name(rename_root as fn(&mut Root))]
    #[case::descendant_id(change_descendant_id as fn(&mut Root))]
    #[case::descendant_name(rename_descendant as fn(&mut Root))]
    #[case::descendant_order(swap_descendants as fn(&mut Root))]
    fn edits_change_the_digest_in_every_mode(
        two_subdevices: Root,
        #[case] edit: fn(&mut Root),
        #[values(HashMode::Compatible, HashMode::Corrected)] mode: HashMode,
    ) {
        let mut edited = two_subdevices.clone();
        edit(&mut edited);
        assert_ne!(digest(&two_subdevices, mode), digest(&edited, mode));
    }

    #[rstest]
    #[case(HashMode::Compatible, false)]
    #[case(HashMode::Corrected, true)]
    fn swapping_bare_children_depends_on_mode(#[case] mode: HashMode, #[case] differs: bool) {
        let original = Root::new("0001", "VendorA")
            .with_child(Child::new("0001", "DeviceA"))
            .with_child(Child::new("0002", "DeviceB"));
        let mut swapped = original.clone();
        swapped.children.swap(0, 1);
        assert_eq!(digest(&original, mode) != digest(&swapped, mode), differs);
    }

    #[rstest]
    #[case(HashMode::Compatible)]
    #[case(HashMode::Corrected)]
    fn swapping_children_with_descendants_changes_the_digest(#[case] mode: HashMode) {
        let original = Root::new("0001", "VendorA")
            .with_child(
                Child::new("0001", "DeviceA").with_descendant(Descendant::new("0003", "SubA")),
            )
            .with_child(
                Child::new("0002", "DeviceB").with_descendant(Descendant::new("0004", "SubB")),
            );
        let mut swapped = original.clone();
        swapped.children.swap(0, 1);
        assert_ne!(digest(&original, mode), digest(&swapped, mode));
    }

    #[rstest]
    fn existing_hash_is_ignored(vendor_a: Root) {
        let sealed = vendor_a.clone().seal(HashMode::Compatible);
        assert_eq!(sealed.hash, digest(&sealed, HashMode::Compatible));
        assert_eq!(sealed.hash, digest(&vendor_a, HashMode::Compatible));
    }

    #[rstest]
    #[case("Corrected", HashMode::Corrected)]
    #[case("compatible", HashMode::Compatible)]
    fn parses_hash_mode(#[case] input: &str, #[case] expected: HashMode) {
        assert_eq!(input.parse::<HashMode>(), Ok(expected));
    }

    proptest! {
        #[test]
        fn digest_is_28_chars_and_deterministic(id in "[0-9a-f]{4}", name in "\\PC{0,40}") {
            let root = Root::new(id, name);
            let first = digest(&root, HashMode::Compatible);
            prop_assert_eq!(first.len(), 28);
            prop_assert_eq!(first, digest(&root.clone(), HashMode::Compatible));
        }

        #[test]
        fn descendant_names_change_the_digest(a in "[a-z]{1,12}", b in "[a-z]{1,12}") {
            prop_assume!(a != b);
            let build = |name: &str| {
                Root::new("0001", "VendorA").with_child(
                    Child::new("0001", "DeviceA").with_descendant(Descendant::new("0003", name)),
                )
            };
            prop_assert_ne!(
                digest(&build(&a), HashMode::Compatible),
                digest(&build(&b), HashMode::Compatible)
            );
        }
    }
}
