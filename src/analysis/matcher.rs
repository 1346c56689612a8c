//! Pairing of before/after structural nodes by qualified key.

use std::collections::BTreeMap;

use super::{QualifiedKey, SourceUnit, StructuralNode};

/// Association of the nodes sharing one qualified key across two revisions.
///
/// At least one side is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedPair<T> {
    Added { key: QualifiedKey, after: T },
    Removed { key: QualifiedKey, before: T },
    Matched { key: QualifiedKey, before: T, after: T },
}

impl<T> MatchedPair<T> {
    pub fn key(&self) -> &QualifiedKey {
        match self {
            MatchedPair::Added { key, .. }
            | MatchedPair::Removed { key, .. }
            | MatchedPair::Matched { key, .. } => key,
        }
    }

    pub fn before(&self) -> Option<&T> {
        match self {
            MatchedPair::Removed { before, .. } | MatchedPair::Matched { before, .. } => {
                Some(before)
            }
            MatchedPair::Added { .. } => None,
        }
    }

    pub fn after(&self) -> Option<&T> {
        match self {
            MatchedPair::Added { after, .. } | MatchedPair::Matched { after, .. } => Some(after),
            MatchedPair::Removed { .. } => None,
        }
    }
}

/// Pair two keyed collections by exact key equality.
///
/// Results are ordered by key. Keys are assumed unique per side; a repeated
/// key keeps its last item.
pub fn pair_by_key<T>(
    before: impl IntoIterator<Item = (QualifiedKey, T)>,
    after: impl IntoIterator<Item = (QualifiedKey, T)>,
) -> Vec<MatchedPair<T>> {
    let mut slots: BTreeMap<QualifiedKey, (Option<T>, Option<T>)> = BTreeMap::new();
    for (key, item) in before {
        slots.entry(key).or_insert((None, None)).0 = Some(item);
    }
    for (key, item) in after {
        slots.entry(key).or_insert((None, None)).1 = Some(item);
    }

    slots
        .into_iter()
        .filter_map(|(key, sides)| match sides {
            (Some(before), Some(after)) => Some(MatchedPair::Matched { key, before, after }),
            (Some(before), None) => Some(MatchedPair::Removed { key, before }),
            (None, Some(after)) => Some(MatchedPair::Added { key, after }),
            (None, None) => None,
        })
        .collect()
}

/// Pair every structural node of two units of the same file.
///
/// A node whose key appears on both sides is matched no matter where it
/// moved in the file.
pub fn match_units<'a>(
    before: &'a SourceUnit,
    after: &'a SourceUnit,
) -> Vec<MatchedPair<&'a StructuralNode>> {
    pair_by_key(
        before.nodes().map(|n| (n.key.clone(), n)),
        after.nodes().map(|n| (n.key.clone(), n)),
    )
}
