use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use thiserror::Error;

use super::{RegistrySource, SourceUrl, TransportError};

/// Canonical location of the PCI ID registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://pci-ids.ucw.cz/v2.2/pci.ids";
/// User agent sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("pcidb/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Failure to construct the HTTP client.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {source}")]
pub struct SourceBuildError {
    #[source]
    source: reqwest::Error,
}

/// HTTP implementation of [`RegistrySource`].
#[derive(Debug)]
pub struct HttpRegistrySource {
    client: Client,
    url: SourceUrl,
    user_agent: String,
    timeout: Duration,
}

impl HttpRegistrySource {
    /// Construct a source downloading from `url`.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(url: SourceUrl) -> Result<Self, SourceBuildError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| SourceBuildError { source })?;
        Ok(Self {
            client,
            url,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Bound the whole request, body included.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait(?Send)]
impl RegistrySource for HttpRegistrySource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String, TransportError> {
        let url = self.url.as_ref();
        debug!("fetching registry from {url}");
        self.client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))?
            .text()
            .await
            .map_err(|err| convert_reqwest_error(err, url))
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
