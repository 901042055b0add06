//! Numbered source lines and the split into devices and classes sections.

/// One physical line of the registry with its 1-based line number.
///
/// Trailing `\r` is already stripped from [`text`](Self::text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based position in the source text.
    pub number: usize,
    /// Line content without its terminator.
    pub text: &'a str,
}

impl<'a> SourceLine<'a> {
    /// Pair a line with its number.
    #[must_use]
    pub const fn new(number: usize, text: &'a str) -> Self {
        Self { number, text }
    }

    /// Whether the line is a `#` comment or blank.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        self.text.trim().is_empty() || self.text.starts_with('#')
    }
}

/// Number every line of `text`, starting at 1.
///
/// ```
/// use pcidb_core::lines::source_lines;
///
/// let lines: Vec<_> = source_lines("a\r\nb").collect();
/// assert_eq!(lines[1].number, 2);
/// assert_eq!(lines[0].text, "a");
/// ```
pub fn source_lines(text: &str) -> impl Iterator<Item = SourceLine<'_>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| SourceLine::new(index + 1, line))
}

/// The data-bearing lines of a registry, split by section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections<'a> {
    /// Lines before the first class header.
    pub devices: Vec<SourceLine<'a>>,
    /// The first class header and everything after it.
    pub classes: Vec<SourceLine<'a>>,
}

impl Sections<'_> {
    /// Total number of data lines across both sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len() + self.classes.len()
    }

    /// Whether neither section holds any line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.classes.is_empty()
    }
}

/// Drop comments and blank lines, then split at the first line starting
/// with `C`.
pub fn split_sections(text: &str) -> Sections<'_> {
    let mut devices: Vec<_> = source_lines(text)
        .filter(|line| !line.is_ignorable())
        .collect();
    let boundary = devices
        .iter()
        .position(|line| line.text.starts_with('C'))
        .unwrap_or(devices.len());
    let classes = devices.split_off(boundary);
    Sections { devices, classes }
}
