//! Ordering and deduplication of classifier output.

use std::collections::HashSet;

use crate::analysis::{NodeKind, QualifiedKey};

use super::types::{EventDraft, SemanticEvent};

/// One draft together with the pair and rule it came from.
#[derive(Debug, Clone)]
pub struct RuleOutput {
    pub key: QualifiedKey,
    pub kind: NodeKind,
    /// Position of the emitting rule in the catalog.
    pub rule_index: usize,
    pub rule: &'static str,
    pub draft: EventDraft,
}

/// Turn raw rule output for one file into its final event list.
///
/// Identical `(key, event_type, details)` tuples keep only the one from the
/// earliest rule. Events are ordered by key, then rule position, keeping
/// each rule's own emission order.
pub fn assemble(file_path: &str, revision_id: &str, mut outputs: Vec<RuleOutput>) -> Vec<SemanticEvent> {
    outputs.sort_by(|a, b| a.key.cmp(&b.key).then(a.rule_index.cmp(&b.rule_index)));

    let mut seen = HashSet::new();
    outputs.retain(|o| seen.insert((o.key.clone(), o.draft.event_type, o.draft.details.clone())));

    outputs
        .into_iter()
        .enumerate()
        .map(|(order, o)| SemanticEvent {
            event_type: o.draft.event_type,
            qualified_key: o.key,
            file_path: file_path.to_string(),
            node_kind: o.kind,
            details: o.draft.details,
            revision_id: revision_id.to_string(),
            rule: o.rule.to_string(),
            order,
        })
        .collect()
}
