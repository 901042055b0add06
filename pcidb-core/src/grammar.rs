//! Line classification and fixed-column field extraction.
//!
//! Each section of the registry has three levels. A line's level is decided
//! by its leading tabs (and, for classes, a leading `C`); its fields then sit
//! at fixed byte columns given by the level's [`Layout`]:
//!
//! | Shape | Id | Aux | Name |
//! |---|---|---|---|
//! | vendor | `[0,4)` | | `[6,∞)` |
//! | device | `[1,5)` | | `[7,∞)` |
//! | subdevice | `[7,11)` | `[2,6)` | `[13,∞)` |
//! | class | `[2,4)` | | `[6,∞)` |
//! | subclass | `[1,3)` | | `[5,∞)` |
//! | programming interface | `[2,4)` | | `[6,∞)` |
//!
//! Ids and aux codes must be hexadecimal of exactly the column's width.
//! Slicing is checked, so a short line or a column landing inside a
//! multi-byte character is reported as a [`GrammarViolation`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Section;
use crate::lines::SourceLine;

/// Half-open byte range `[start, end)`; `end == None` runs to end of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    start: usize,
    end: Option<usize>,
}

impl Columns {
    const fn fixed(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    const fn open(start: usize) -> Self {
        Self { start, end: None }
    }

    /// Exact width of a fixed range.
    #[must_use]
    pub const fn width(self) -> Option<usize> {
        match self.end {
            Some(end) => Some(end - self.start),
            None => None,
        }
    }

    /// Extract the range from `line`, or `None` when it does not fit.
    #[must_use]
    pub fn slice(self, line: &str) -> Option<&str> {
        match self.end {
            Some(end) => line.get(self.start..end),
            None => line.get(self.start..),
        }
    }
}

/// Depth of a line within its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Vendor or class header.
    Root,
    /// Device or subclass header.
    Child,
    /// Subdevice or programming interface.
    Descendant,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Child => "child",
            Self::Descendant => "descendant",
        })
    }
}

/// Concrete record shape of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Unindented four-digit vendor header.
    Vendor,
    /// One tab, four-digit device id.
    Device,
    /// Two tabs, subvendor and subdevice ids.
    Subdevice,
    /// `C` followed by a two-digit class id.
    Class,
    /// One tab, two-digit subclass id.
    Subclass,
    /// Two tabs, two-digit interface id.
    ProgrammingInterface,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vendor => "vendor",
            Self::Device => "device",
            Self::Subdevice => "subdevice",
            Self::Class => "class",
            Self::Subclass => "subclass",
            Self::ProgrammingInterface => "programming interface",
        })
    }
}

/// Which column of a shape failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Key column.
    Id,
    /// Subvendor column of a subdevice.
    Aux,
    /// Free-text column.
    Name,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Id => "id",
            Self::Aux => "aux",
            Self::Name => "name",
        })
    }
}

/// Column layout of one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    id: Columns,
    aux: Option<Columns>,
    name: Columns,
}

impl Layout {
    /// The shape this layout describes.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    fn hex<'a>(
        &self,
        line: &'a str,
        field: Field,
        columns: Columns,
    ) -> Result<&'a str, ViolationReason> {
        let value = columns.slice(line).ok_or(ViolationReason::MissingColumn {
            shape: self.shape,
            field,
        })?;
        if value.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            Ok(value)
        } else {
            Err(ViolationReason::InvalidHex {
                shape: self.shape,
                field,
                value: value.to_owned(),
                width: columns.width().unwrap_or(value.len()),
            })
        }
    }

    fn extract<'a>(&self, level: Level, line: &'a str) -> Result<Record<'a>, ViolationReason> {
        let id = self.hex(line, Field::Id, self.id)?;
        let aux = self
            .aux
            .map(|columns| self.hex(line, Field::Aux, columns))
            .transpose()?;
        let name = self
            .name
            .slice(line)
            .ok_or(ViolationReason::MissingColumn {
                shape: self.shape,
                field: Field::Name,
            })?;
        Ok(Record {
            level,
            id,
            name,
            aux,
        })
    }
}

/// Fields extracted from one line, borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Level the line was classified at.
    pub level: Level,
    /// Hexadecimal key.
    pub id: &'a str,
    /// Free-text name.
    pub name: &'a str,
    /// Auxiliary code, present only for subdevices.
    pub aux: Option<&'a str>,
}

/// How a root header is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootStart {
    /// No leading tab.
    Unindented,
    /// Leading `C`.
    ClassPrefix,
}

/// Start patterns and layouts of one section.
#[derive(Debug)]
pub struct SectionGrammar {
    section: Section,
    root_start: RootStart,
    root: Layout,
    child: Layout,
    descendant: Layout,
}

/// Vendors, devices and subdevices.
pub static DEVICES: SectionGrammar = SectionGrammar {
    section: Section::Devices,
    root_start: RootStart::Unindented,
    root: Layout {
        shape: Shape::Vendor,
        id: Columns::fixed(0, 4),
        aux: None,
        name: Columns::open(6),
    },
    child: Layout {
        shape: Shape::Device,
        id: Columns::fixed(1, 5),
        aux: None,
        name: Columns::open(7),
    },
    descendant: Layout {
        shape: Shape::Subdevice,
        id: Columns::fixed(7, 11),
        aux: Some(Columns::fixed(2, 6)),
        name: Columns::open(13),
    },
};

/// Classes, subclasses and programming interfaces.
pub static CLASSES: SectionGrammar = SectionGrammar {
    section: Section::Classes,
    root_start: RootStart::ClassPrefix,
    root: Layout {
        shape: Shape::Class,
        id: Columns::fixed(2, 4),
        aux: None,
        name: Columns::open(6),
    },
    child: Layout {
        shape: Shape::Subclass,
        id: Columns::fixed(1, 3),
        aux: None,
        name: Columns::open(5),
    },
    descendant: Layout {
        shape: Shape::ProgrammingInterface,
        id: Columns::fixed(2, 4),
        aux: None,
        name: Columns::open(6),
    },
};

impl SectionGrammar {
    /// Section this grammar applies to.
    #[must_use]
    pub const fn section(&self) -> Section {
        self.section
    }

    /// Layout used for lines at `level`.
    #[must_use]
    pub const fn layout(&self, level: Level) -> &Layout {
        match level {
            Level::Root => &self.root,
            Level::Child => &self.child,
            Level::Descendant => &self.descendant,
        }
    }

    /// Whether `line` opens a new root chunk.
    #[must_use]
    pub fn starts_root(&self, line: &str) -> bool {
        match self.root_start {
            RootStart::Unindented => !line.is_empty() && !line.starts_with('\t'),
            RootStart::ClassPrefix => line.starts_with('C'),
        }
    }

    /// Whether `line` opens a new child chunk: exactly one leading tab.
    #[must_use]
    pub fn starts_child(&self, line: &str) -> bool {
        line.strip_prefix('\t')
            .is_some_and(|rest| !rest.starts_with('\t'))
    }

    /// Classify `line` by its start pattern, or `None` if no level matches.
    #[must_use]
    pub fn level_of(&self, line: &str) -> Option<Level> {
        if self.starts_root(line) {
            Some(Level::Root)
        } else if self.starts_child(line) {
            Some(Level::Child)
        } else {
            line.strip_prefix("\t\t")
                .filter(|rest| !rest.starts_with('\t'))
                .map(|_| Level::Descendant)
        }
    }

    /// Extract `line`'s fields using the layout of `level`.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarViolation`] when a column is missing or an id is
    /// not hexadecimal.
    pub fn parse_at<'a>(
        &self,
        level: Level,
        line: SourceLine<'a>,
    ) -> Result<Record<'a>, GrammarViolation> {
        self.layout(level)
            .extract(level, line.text)
            .map_err(|reason| self.violation(line, reason))
    }

    /// Classify and extract `line`.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarViolation`] when no shape matches or extraction
    /// fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcidb_core::Section;
    /// use pcidb_core::grammar::Level;
    /// use pcidb_core::lines::SourceLine;
    ///
    /// let grammar = Section::Devices.grammar();
    /// let record = grammar
    ///     .parse_line(SourceLine::new(1, "\t\t0002 0003  SubdeviceA"))
    ///     .expect("valid subdevice");
    /// assert_eq!(record.level, Level::Descendant);
    /// assert_eq!((record.id, record.aux), ("0003", Some("0002")));
    /// assert_eq!(record.name, "SubdeviceA");
    /// ```
    pub fn parse_line<'a>(&self, line: SourceLine<'a>) -> Result<Record<'a>, GrammarViolation> {
        let level = self
            .level_of(line.text)
            .ok_or_else(|| self.violation(line, ViolationReason::UnknownShape))?;
        self.layout(level)
            .extract(level, line.text)
            .map_err(|reason| self.violation(line, reason))
    }

    /// Check every line of the section before anything is built.
    ///
    /// Besides per-line shape checks, a child must follow a root and a
    /// descendant must follow a child.
    ///
    /// # Errors
    ///
    /// Returns the first [`GrammarViolation`] in source order.
    pub fn validate<'a, I>(&self, lines: I) -> Result<(), GrammarViolation>
    where
        I: IntoIterator<Item = SourceLine<'a>>,
    {
        lines
            .into_iter()
            .try_fold(None, |deepest: Option<Level>, line| {
                let record = self.parse_line(line)?;
                let allowed = match deepest {
                    None => Level::Root,
                    Some(Level::Root) => Level::Child,
                    Some(_) => Level::Descendant,
                };
                if record.level > allowed {
                    return Err(self.violation(
                        line,
                        ViolationReason::UnexpectedLevel {
                            expected: allowed,
                            found: record.level,
                        },
                    ));
                }
                Ok(Some(record.level))
            })
            .map(|_| ())
    }

    pub(crate) fn violation(
        &self,
        line: SourceLine<'_>,
        reason: ViolationReason,
    ) -> GrammarViolation {
        GrammarViolation {
            line: line.number,
            section: self.section,
            reason,
        }
    }
}

/// A line that does not conform to its section's grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line} in {section} section: {reason}")]
pub struct GrammarViolation {
    /// 1-based line number in the source text.
    pub line: usize,
    /// Section the line belongs to.
    pub section: Section,
    /// What was wrong with it.
    pub reason: ViolationReason,
}

/// Cause of a [`GrammarViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationReason {
    /// No start pattern of the section matched.
    #[error("line matches no record shape")]
    UnknownShape,
    /// A column starts past the end of the line or inside a character.
    #[error("{shape} line has no {field} column")]
    MissingColumn {
        /// Shape the line was classified as.
        shape: Shape,
        /// Column that could not be read.
        field: Field,
    },
    /// A key column is not hexadecimal of the exact width.
    #[error("{shape} {field} '{value}' is not a {width}-digit hexadecimal code")]
    InvalidHex {
        /// Shape the line was classified as.
        shape: Shape,
        /// Offending column.
        field: Field,
        /// Text found in the column.
        value: String,
        /// Required number of digits.
        width: usize,
    },
    /// A line sits at a level its position does not allow, such as a device
    /// before any vendor.
    #[error("expected at most a {expected} line but found a {found} line")]
    UnexpectedLevel {
        /// Level required, or the deepest allowed, at this position.
        expected: Level,
        /// Level the line was classified at.
        found: Level,
    },
}

/// How grammar violations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValidationPolicy {
    /// Reject the whole input on the first violation.
    #[default]
    Strict,
    /// Log each violation and drop the offending unit.
    Lenient,
}

impl ValidationPolicy {
    /// Lowercase configuration value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(format!("unknown validation policy '{s}'")),
        }
    }
}
