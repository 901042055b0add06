//! Capability-based filesystem helpers for registry files and databases.
//!
//! Paths arrive as UTF-8 (`camino`) and every access goes through a
//! `cap-std` directory handle anchored at the filesystem root, a drive
//! prefix, or the current directory.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::io;
use std::path::{Component, MAIN_SEPARATOR};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Read a whole UTF-8 text file, such as a local copy of the registry.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = parent_and_name(path)?;
    dir.read_to_string(name)
}

/// Whether `path` names an existing regular file.
///
/// Missing files and missing parent directories report `false`.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match parent_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create every missing directory above `path` so a database file can be
/// created there.
pub fn create_parent_dirs(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let (anchor, relative) = anchor(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    anchor.create_dir_all(&relative)
}

fn parent_and_name(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let (anchor, relative) = anchor(parent)?;
    let dir = if relative.as_str().is_empty() {
        anchor
    } else {
        anchor.open_dir(&relative)?
    };
    Ok((dir, name))
}

/// Split `dir` into an ambient anchor directory and the path below it.
fn anchor(dir: &Utf8Path) -> io::Result<(Dir, Utf8PathBuf)> {
    let std_dir = dir.as_std_path();
    let base = match std_dir.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(format!("{prefix}{MAIN_SEPARATOR}"))
        }
        Some(Component::RootDir) => Utf8PathBuf::from(MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if base.as_str() == "." {
        dir.to_path_buf()
    } else {
        dir.strip_prefix(&base)
            .map_err(|_| io::Error::other(format!("cannot resolve {dir} below {base}")))?
            .to_path_buf()
    };
    let handle = Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((handle, relative))
}
