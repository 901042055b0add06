//! Grouping a flat line stream into contiguous chunks.

use std::fmt;
use std::iter::{FusedIterator, Peekable};

/// Iterator adapter yielding runs of items that begin at a start item.
///
/// Created by [`chunk`]. Every item lands in exactly one chunk, in order, so
/// concatenating the chunks reproduces the input.
pub struct Chunks<I: Iterator, P> {
    items: Peekable<I>,
    starts: P,
}

/// Split `items` so a new chunk opens at each item matching `starts`.
///
/// The first chunk also absorbs any items before the first match, so it
/// may begin with an item that does not satisfy `starts`.
///
/// ```
/// use pcidb_core::chunk::chunk;
///
/// let chunks: Vec<Vec<_>> = chunk(["x", "A", "a", "B"], |s: &&str| s.starts_with(char::is_uppercase))
///     .collect();
/// assert_eq!(chunks, vec![vec!["x"], vec!["A", "a"], vec!["B"]]);
/// ```
pub fn chunk<I, P>(items: I, starts: P) -> Chunks<I::IntoIter, P>
where
    I: IntoIterator,
    P: FnMut(&I::Item) -> bool,
{
    Chunks {
        items: items.into_iter().peekable(),
        starts,
    }
}

impl<I, P> fmt::Debug for Chunks<I, P>
where
    I: Iterator + fmt::Debug,
    I::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunks")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl<I, P> Iterator for Chunks<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let Self { items, starts } = self;
        let first = items.next()?;
        let mut group = vec![first];
        while let Some(item) = items.next_if(|item| !starts(item)) {
            group.push(item);
        }
        Some(group)
    }
}

impl<I, P> FusedIterator for Chunks<I, P>
where
    I: FusedIterator,
    P: FnMut(&I::Item) -> bool,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn empty_input_yields_no_chunks() {
        assert_eq!(chunk(Vec::<u8>::new(), |_| true).count(), 0);
    }

    #[rstest]
    fn debug_output_skips_the_predicate() {
        let chunks = chunk(vec![1, 10], |n: &i32| *n >= 10);
        let rendered = format!("{chunks:?}");
        assert!(rendered.starts_with("Chunks { items: "), "{rendered}");
        assert!(rendered.ends_with(", .. }"), "{rendered}");
    }

    #[rstest]
    fn leading_items_join_the_first_chunk() {
        let chunks: Vec<_> = chunk([1, 2, 10, 3, 20], |n: &i32| *n >= 10).collect();
        assert_eq!(chunks, vec![vec![1, 2], vec![10, 3], vec![20]]);
    }

    #[rstest]
    fn every_item_starting_gives_singletons() {
        let chunks: Vec<_> = chunk("abc".chars(), |_| true).collect();
        assert_eq!(chunks, vec![vec!['a'], vec!['b'], vec!['c']]);
    }

    #[rstest]
    fn no_match_gives_one_chunk() {
        let chunks: Vec<_> = chunk([1, 2, 3], |_| false).collect();
        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }

    proptest! {
        #[test]
        fn concatenation_reproduces_input(items in proptest::collection::vec(0u8..8, 0..64)) {
            let chunks: Vec<_> = chunk(items.iter().copied(), |n| *n == 0).collect();
            prop_assert!(chunks.iter().all(|group| !group.is_empty()));
            prop_assert!(chunks.iter().skip(1).all(|group| group.first() == Some(&0)));
            let flattened: Vec<u8> = chunks.into_iter().flatten().collect();
            prop_assert_eq!(flattened, items);
        }
    }
}
