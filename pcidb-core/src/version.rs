//! Version gating against the persisted repository marker.
//!
//! The registry header is four non-empty lines, the last of which carries
//! the release date:
//!
//! ```text
//! #
//! #	List of PCI ID's
//! #
//! #	Version: 2024.01.01
//! ```

use chrono::NaiveDate;
use log::{debug, info};
use thiserror::Error;

use crate::RepositoryMarker;
use crate::lines::source_lines;

/// Prefix of the version line.
pub const VERSION_PREFIX: &str = "#\tVersion: ";

/// Zero-based position of the version line among non-empty lines.
pub const VERSION_LINE_INDEX: usize = 3;

const DATE_FORMATS: [&str; 3] = ["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Errors raised while locating or parsing the registry version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The source has fewer non-empty lines than the header requires.
    #[error("registry has no version line")]
    Missing,
    /// The line where the version belongs holds something else.
    #[error("expected the version line on line {line} but found '{text}'")]
    Misplaced {
        /// 1-based line number.
        line: usize,
        /// Content of that line.
        text: String,
    },
    /// The version token is not a recognised date.
    #[error("version '{token}' on line {line} is not a date")]
    Unparseable {
        /// 1-based line number.
        line: usize,
        /// The trimmed token after the prefix.
        token: String,
    },
}

/// Result of comparing the source version with the persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether the rest of the pipeline should run.
    pub proceed: bool,
    /// Version declared by the source.
    pub version: NaiveDate,
}

/// Read the version declared by the registry header.
///
/// # Errors
///
/// Returns [`VersionError`] when the version line is missing, misplaced or
/// does not hold a date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use pcidb_core::version::extract_version;
///
/// let text = "#\n#\tList of PCI ID's\n#\n#\tVersion: 2024.01.01\n";
/// assert_eq!(extract_version(text), Ok(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
/// ```
pub fn extract_version(text: &str) -> Result<NaiveDate, VersionError> {
    let line = source_lines(text)
        .filter(|line| !line.text.trim().is_empty())
        .nth(VERSION_LINE_INDEX)
        .ok_or(VersionError::Missing)?;
    let token = line
        .text
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| VersionError::Misplaced {
            line: line.number,
            text: line.text.to_owned(),
        })?
        .trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
        .ok_or_else(|| VersionError::Unparseable {
            line: line.number,
            token: token.to_owned(),
        })
}

/// Decide whether `text` needs processing given the persisted `marker`.
///
/// The run proceeds unless the marker already records the same version.
///
/// # Errors
///
/// Propagates [`extract_version`] failures.
pub fn check_version(
    text: &str,
    marker: Option<&RepositoryMarker>,
) -> Result<GateDecision, VersionError> {
    let version = extract_version(text)?;
    let persisted = marker.and_then(|marker| marker.version);
    info!("registry declares version {version}");
    let proceed = persisted != Some(version);
    if !proceed {
        debug!("version {version} already ingested; skipping run");
    }
    Ok(GateDecision { proceed, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEADER: &str = "#\n#\tList of PCI ID's\n#\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[rstest]
    #[case("#\tVersion: 2024.01.01")]
    #[case("#\tVersion: 2024-01-01")]
    #[case("#\tVersion: 2024/01/01  ")]
    fn accepts_known_date_shapes(#[case] version_line: &str) {
        let text = format!("{HEADER}{version_line}\n0001  VendorA\n");
        assert_eq!(extract_version(&text), Ok(date(2024, 1, 1)));
    }

    #[rstest]
    fn skips_blank_lines_when_locating_header() {
        let text = "\n#\n\n#\tList of PCI ID's\r\n#\n#\tVersion: 2023.12.31\r\n";
        assert_eq!(extract_version(text), Ok(date(2023, 12, 31)));
    }

    #[rstest]
    fn short_source_has_no_version() {
        assert_eq!(extract_version("#\n#\n"), Err(VersionError::Missing));
    }

    #[rstest]
    fn version_on_wrong_line_is_misplaced() {
        let text = "#\tVersion: 2024.01.01\n#\n#\n#\n";
        assert_eq!(
            extract_version(text),
            Err(VersionError::Misplaced {
                line: 4,
                text: "#".into(),
            })
        );
    }

    #[rstest]
    fn garbage_token_is_unparseable() {
        let text = format!("{HEADER}#\tVersion: soon\n");
        assert_eq!(
            extract_version(&text),
            Err(VersionError::Unparseable {
                line: 4,
                token: "soon".into(),
            })
        );
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(RepositoryMarker::default()), true)]
    #[case(Some(RepositoryMarker { version: Some(date(2023, 6, 1)), ..RepositoryMarker::default() }), true)]
    #[case(Some(RepositoryMarker { version: Some(date(2024, 1, 1)), ..RepositoryMarker::default() }), false)]
    fn gate_proceeds_only_on_new_version(
        #[case] marker: Option<RepositoryMarker>,
        #[case] proceed: bool,
    ) {
        let text = format!("{HEADER}#\tVersion: 2024-01-01\n");
        let decision = check_version(&text, marker.as_ref()).expect("valid header");
        assert_eq!(
            decision,
            GateDecision {
                proceed,
                version: date(2024, 1, 1),
            }
        );
    }
}
