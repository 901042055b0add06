use std::{fmt, ops::Deref};

use url::Url;

/// Absolute URL of a registry download.
///
/// # Examples
/// ```
/// # use pcidb_data::source::SourceUrl;
/// let url = SourceUrl::try_from("https://pci-ids.ucw.cz/v2.2/pci.ids").expect("valid URL");
/// assert_eq!(url.as_ref(), "https://pci-ids.ucw.cz/v2.2/pci.ids");
/// assert!(SourceUrl::try_from("not a url").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Consume the wrapper and return the inner [`String`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SourceUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SourceUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Url> for SourceUrl {
    fn from(value: Url) -> Self {
        Self(value.into())
    }
}

impl TryFrom<&str> for SourceUrl {
    type Error = url::ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value).map(Into::into)
    }
}
