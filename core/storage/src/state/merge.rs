// dryrun/core/storage/src/state/merge.rs

// K-way merge of layer ranges for prefix scans
use crate::db::SeekIter;
use crate::types::StorageKey;
use std::collections::BTreeMap;
use std::iter::Peekable;

type SourceIter<'a> = Box<dyn Iterator<Item = (Vec<u8>, Option<Vec<u8>>)> + 'a>;

/// Sorted entries from one level of the chain
pub(crate) struct Source<'a> {
    inner: Peekable<SourceIter<'a>>,
}

impl<'a> Source<'a> {
    pub(crate) fn layer(
        writes: &'a BTreeMap<StorageKey, Option<Vec<u8>>>,
        id: i32,
        prefix: &[u8],
    ) -> Self {
        let start = StorageKey::new(id, prefix.to_vec());
        let prefix = prefix.to_vec();
        let iter: SourceIter<'a> = Box::new(
            writes
                .range(start..)
                .take_while(move |(k, _)| k.matches(id, &prefix))
                .map(|(k, v)| (k.key.clone(), v.clone())),
        );
        Self {
            inner: iter.peekable(),
        }
    }

    pub(crate) fn root(seek: SeekIter<'a>) -> Self {
        let iter: SourceIter<'a> = Box::new(seek.map(|(k, v)| (k, Some(v))));
        Self {
            inner: iter.peekable(),
        }
    }

    fn peek_key(&mut self) -> Option<&Vec<u8>> {
        self.inner.peek().map(|(k, _)| k)
    }
}

/// Lazy, ascending view over the visible slots matching a prefix.
///
/// Sources are ordered nearest layer first. When several sources hold the same
/// key the nearest one wins and the others are skipped; a winning tombstone
/// hides the key entirely.
pub struct FindIter<'a> {
    sources: Vec<Source<'a>>,
}

impl<'a> FindIter<'a> {
    pub(crate) fn new(sources: Vec<Source<'a>>) -> Self {
        Self { sources }
    }
}

impl Iterator for FindIter<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let min_key = self
                .sources
                .iter_mut()
                .filter_map(|s| s.peek_key().cloned())
                .min()?;

            let mut winner = None;
            for source in self.sources.iter_mut() {
                if source.peek_key() == Some(&min_key) {
                    let entry = source.inner.next();
                    if winner.is_none() {
                        winner = entry;
                    }
                }
            }

            if let Some((key, Some(value))) = winner {
                return Some((key, value));
            }
        }
    }
}
