//! Shared fixtures for registry source tests.

use std::cell::Cell;
use std::future::Future;

use async_trait::async_trait;

use super::{RegistrySource, TransportError};

const STUB_LOCATION: &str = "stub://pci.ids";

/// Stub [`RegistrySource`] serving in-memory text and counting fetches.
#[derive(Debug, Clone)]
pub struct StubSource {
    text: String,
    status: Option<u16>,
    fetches: Cell<usize>,
}

impl StubSource {
    /// Serve `text` on every fetch.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: None,
            fetches: Cell::new(0),
        }
    }

    /// Fail every fetch with the given HTTP status.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(String::new())
        }
    }

    /// Number of fetches served so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl RegistrySource for StubSource {
    fn location(&self) -> &str {
        STUB_LOCATION
    }

    async fn fetch(&self) -> Result<String, TransportError> {
        self.fetches.set(self.fetches.get() + 1);
        match self.status {
            Some(status) => Err(TransportError::Http {
                url: STUB_LOCATION.to_owned(),
                status,
                message: "stubbed failure".to_owned(),
            }),
            None => Ok(self.text.clone()),
        }
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be created.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(err) => panic!("failed to create Tokio runtime for tests: {err}"),
    }
}
