//! Fixtures shared by the CLI unit and behaviour tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

pub(super) const VENDOR_A: &str = "0001  VendorA\n\t0001  DeviceA\n\t\t0002 0003  SubdeviceA\n\
\t0002  DeviceB\n";
pub(super) const STORAGE_CLASS: &str =
    "C 01  Mass storage controller\n\t00  SCSI storage controller\n\t\t00  Vendor specific\n";

/// Registry text declaring `version` with one vendor and one class.
pub(super) fn registry(version: &str) -> String {
    format!("#\n#\tList of PCI ID's\n#\n#\tVersion: {version}\n\n{VENDOR_A}\n{STORAGE_CLASS}")
}

/// Temporary workspace holding a registry file and a database location.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace path");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write a registry declaring `version` and return its path.
    pub(super) fn registry_file(&self, version: &str) -> Utf8PathBuf {
        let path = self.root.join("pci.ids");
        fs::write(&path, registry(version)).expect("write registry file");
        path
    }

    /// Database path nested in a directory that does not exist yet.
    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("state").join("pcidb.sqlite")
    }
}

pub(super) fn output_text(buffer: &[u8]) -> String {
    String::from_utf8(buffer.to_vec()).expect("command output should be UTF-8")
}
