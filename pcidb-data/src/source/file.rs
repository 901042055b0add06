use std::io;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use super::{RegistrySource, TransportError};

/// Registry read from a local file, for offline or pinned runs.
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    path: Utf8PathBuf,
}

impl FileRegistrySource {
    /// Construct a source reading `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait(?Send)]
impl RegistrySource for FileRegistrySource {
    fn location(&self) -> &str {
        self.path.as_str()
    }

    async fn fetch(&self) -> Result<String, TransportError> {
        debug!("reading registry from {}", self.path);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || pcidb_fs::read_to_string(&path))
            .await
            .unwrap_or_else(|join| Err(io::Error::other(join)))
            .map_err(|source| TransportError::Read {
                path: self.path.clone(),
                source,
            })
    }
}
