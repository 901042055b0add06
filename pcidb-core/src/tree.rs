//! Assembling root aggregates from a section's lines.
//!
//! Root chunks are cut at root headers, each remainder is cut again at child
//! headers, and the remaining lines of a child chunk are its descendants.
//! The builder is a pair of folds: children accumulate into a [`Root`] and
//! descendants into a [`Child`].

use log::warn;

use crate::chunk::chunk;
use crate::grammar::{
    GrammarViolation, Level, Record, SectionGrammar, ValidationPolicy, ViolationReason,
};
use crate::lines::SourceLine;
use crate::{Child, Descendant, Root, Section};

/// Lazily build the roots of one section, in source order.
///
/// Roots come out unsealed; callers hash them with [`Root::seal`]. Under
/// [`ValidationPolicy::Strict`] the first malformed line yields an error.
/// Under [`ValidationPolicy::Lenient`] malformed units are logged and
/// dropped: a bad root header drops the root chunk, a bad child header drops
/// the child chunk, and a bad descendant drops only its line.
///
/// # Examples
///
/// ```
/// use pcidb_core::lines::split_sections;
/// use pcidb_core::{Section, ValidationPolicy, build_section};
///
/// let text = "0001  VendorA\n\t0001  DeviceA\n\t\t0002 0003  SubdeviceA\n";
/// let sections = split_sections(text);
/// let roots: Vec<_> = build_section(Section::Devices, sections.devices, ValidationPolicy::Strict)
///     .collect::<Result<_, _>>()
///     .expect("well-formed section");
/// assert_eq!(roots[0].children[0].descendants[0].aux.as_deref(), Some("0002"));
/// ```
pub fn build_section<'a, I>(
    section: Section,
    lines: I,
    policy: ValidationPolicy,
) -> impl Iterator<Item = Result<Root, GrammarViolation>> + 'a
where
    I: IntoIterator<Item = SourceLine<'a>>,
    I::IntoIter: 'a,
{
    let grammar = section.grammar();
    chunk(lines, |line| grammar.starts_root(line.text))
        .filter_map(move |root_chunk| build_root(grammar, root_chunk, policy).transpose())
}

fn build_root(
    grammar: &SectionGrammar,
    root_chunk: Vec<SourceLine<'_>>,
    policy: ValidationPolicy,
) -> Result<Option<Root>, GrammarViolation> {
    let mut lines = root_chunk.into_iter();
    let Some(header) = lines.next() else {
        return Ok(None);
    };
    let Some(record) = tolerate(policy, "root chunk", expect_level(grammar, header, Level::Root))?
    else {
        return Ok(None);
    };
    let seed = Root::new(record.id, record.name);
    chunk(lines, |line| grammar.starts_child(line.text))
        .try_fold(seed, |root, child_chunk| {
            Ok::<_, GrammarViolation>(match build_child(grammar, child_chunk, policy)? {
                Some(child) => root.with_child(child),
                None => root,
            })
        })
        .map(Some)
}

fn build_child(
    grammar: &SectionGrammar,
    child_chunk: Vec<SourceLine<'_>>,
    policy: ValidationPolicy,
) -> Result<Option<Child>, GrammarViolation> {
    let mut lines = child_chunk.into_iter();
    let Some(header) = lines.next() else {
        return Ok(None);
    };
    let Some(record) = tolerate(
        policy,
        "child chunk",
        expect_level(grammar, header, Level::Child),
    )?
    else {
        return Ok(None);
    };
    let seed = Child::new(record.id, record.name);
    lines
        .try_fold(seed, |child, line| {
            let parsed = expect_level(grammar, line, Level::Descendant);
            Ok::<_, GrammarViolation>(match tolerate(policy, "descendant line", parsed)? {
                Some(record) => child.with_descendant(descendant(record)),
                None => child,
            })
        })
        .map(Some)
}

fn descendant(record: Record<'_>) -> Descendant {
    let leaf = Descendant::new(record.id, record.name);
    match record.aux {
        Some(aux) => leaf.with_aux(aux),
        None => leaf,
    }
}

fn expect_level<'a>(
    grammar: &SectionGrammar,
    line: SourceLine<'a>,
    expected: Level,
) -> Result<Record<'a>, GrammarViolation> {
    match grammar.level_of(line.text) {
        Some(found) if found == expected => grammar.parse_at(expected, line),
        Some(found) => Err(grammar.violation(
            line,
            ViolationReason::UnexpectedLevel { expected, found },
        )),
        None => Err(grammar.violation(line, ViolationReason::UnknownShape)),
    }
}

fn tolerate<T>(
    policy: ValidationPolicy,
    unit: &str,
    result: Result<T, GrammarViolation>,
) -> Result<Option<T>, GrammarViolation> {
    match (policy, result) {
        (_, Ok(value)) => Ok(Some(value)),
        (ValidationPolicy::Strict, Err(violation)) => Err(violation),
        (ValidationPolicy::Lenient, Err(violation)) => {
            warn!("dropping {unit}: {violation}");
            Ok(None)
        }
    }
}
