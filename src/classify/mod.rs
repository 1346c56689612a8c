//! Event classification over matched node pairs.
//!
//! The pipeline for one file is: run every applicable [`CATALOG`] rule
//! against each [`MatchedPair`], then hand the drafts to [`assemble`] for
//! deduplication and ordering.

mod assemble;
mod catalog;
mod rules;
mod types;

pub use assemble::{assemble, RuleOutput};
pub use catalog::{
    find_rule, validate_catalog, ClassifyFn, NodeSide, PairContext, Rule, RuleScope, CATALOG,
};
pub use types::{DetailValue, Details, EventDraft, EventType, SemanticEvent};

use crate::analysis::{MatchedPair, SourceUnit, StructuralNode};
use crate::error::VocabularyMismatchError;

/// Run the catalog over one context, tagging each draft with its rule.
pub fn classify_pair(ctx: &PairContext) -> Result<Vec<RuleOutput>, VocabularyMismatchError> {
    let mut outputs = Vec::new();
    for (rule_index, rule) in CATALOG.iter().enumerate() {
        if !rule.applies_to(ctx) {
            continue;
        }
        for draft in (rule.classify)(ctx)? {
            tracing::trace!(key = %ctx.key, rule = rule.name, event = %draft.event_type, "rule fired");
            outputs.push(RuleOutput {
                key: ctx.key.clone(),
                kind: ctx.kind,
                rule_index,
                rule: rule.name,
                draft,
            });
        }
    }
    Ok(outputs)
}

/// Build rule contexts for the matched pairs of two units.
///
/// A key whose node kind changed between revisions (a function replaced by
/// a class of the same name) is treated as a removal plus an addition.
pub fn contexts<'a>(
    before: &'a SourceUnit,
    after: &'a SourceUnit,
    pairs: &'a [MatchedPair<&'a StructuralNode>],
) -> Vec<PairContext<'a>> {
    let side = |unit: &'a SourceUnit, node: &'a StructuralNode| NodeSide { unit, node };
    let mut out = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match pair {
            MatchedPair::Matched { key, before: b, after: a } if b.kind == a.kind => {
                out.push(PairContext {
                    key,
                    kind: a.kind,
                    before: Some(side(before, *b)),
                    after: Some(side(after, *a)),
                });
            }
            MatchedPair::Matched { key, before: b, after: a } => {
                out.push(PairContext {
                    key,
                    kind: b.kind,
                    before: Some(side(before, *b)),
                    after: None,
                });
                out.push(PairContext {
                    key,
                    kind: a.kind,
                    before: None,
                    after: Some(side(after, *a)),
                });
            }
            MatchedPair::Removed { key, before: b } => out.push(PairContext {
                key,
                kind: b.kind,
                before: Some(side(before, *b)),
                after: None,
            }),
            MatchedPair::Added { key, after: a } => out.push(PairContext {
                key,
                kind: a.kind,
                before: None,
                after: Some(side(after, *a)),
            }),
        }
    }
    out
}
