//! Where the registry text comes from.
//!
//! A [`RegistrySource`] yields the complete registry as one string. The
//! pipeline never retries; transport failures surface as
//! [`TransportError`] and abort the run before anything is written.

use std::io;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use thiserror::Error;

mod file;
mod http;
mod types;

#[cfg(any(test, feature = "test-support"))]
mod test_support;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubSource, block_on_for_tests};

pub use file::FileRegistrySource;
pub use http::{DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT, HttpRegistrySource, SourceBuildError};
pub use types::SourceUrl;

/// Supplier of registry text.
#[async_trait(?Send)]
pub trait RegistrySource {
    /// Human-readable origin used in logs, such as a URL or file path.
    fn location(&self) -> &str;

    /// Fetch the full registry text.
    async fn fetch(&self) -> Result<String, TransportError>;
}

#[async_trait(?Send)]
impl<S: RegistrySource + ?Sized> RegistrySource for &S {
    fn location(&self) -> &str {
        (**self).location()
    }

    async fn fetch(&self) -> Result<String, TransportError> {
        (**self).fetch().await
    }
}

/// Transport-level errors encountered while fetching the registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// A local registry file could not be read.
    #[error("failed to read registry file {path}: {source}")]
    Read {
        /// Path of the file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}
