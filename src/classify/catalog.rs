//! Fixed-order catalog of classifier rules.
//!
//! Each rule is a plain function over one matched pair. Rules never see each
//! other's output, and their position in [`CATALOG`] is the tie-break the
//! assembler uses when ordering events for the same node.

use crate::analysis::{Feature, FeatureSnapshot, NodeKind, QualifiedKey, SourceUnit, StructuralNode};
use crate::error::VocabularyMismatchError;

use super::rules;
use super::types::{EventDraft, EventType};

/// Which shape of matched pair a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Node exists only after.
    Added,
    /// Node exists only before.
    Removed,
    /// Node exists on both sides.
    Changed,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Added => "added",
            RuleScope::Removed => "removed",
            RuleScope::Changed => "changed",
        }
    }
}

/// One side of a matched pair.
#[derive(Clone, Copy)]
pub struct NodeSide<'a> {
    pub unit: &'a SourceUnit,
    pub node: &'a StructuralNode,
}

impl<'a> NodeSide<'a> {
    pub fn features(&self) -> &'a FeatureSnapshot {
        self.unit.features(self.node)
    }
}

/// Input handed to a rule.
#[derive(Clone, Copy)]
pub struct PairContext<'a> {
    pub key: &'a QualifiedKey,
    pub kind: NodeKind,
    pub before: Option<NodeSide<'a>>,
    pub after: Option<NodeSide<'a>>,
}

impl<'a> PairContext<'a> {
    pub fn scope(&self) -> RuleScope {
        match (&self.before, &self.after) {
            (Some(_), Some(_)) => RuleScope::Changed,
            (None, _) => RuleScope::Added,
            (Some(_), None) => RuleScope::Removed,
        }
    }

    /// Before and after snapshots, when both sides exist.
    pub fn snapshots(&self) -> Option<(&'a FeatureSnapshot, &'a FeatureSnapshot)> {
        match (self.before, self.after) {
            (Some(b), Some(a)) => Some((b.features(), a.features())),
            _ => None,
        }
    }
}

pub type ClassifyFn = fn(&PairContext) -> Result<Vec<EventDraft>, VocabularyMismatchError>;

/// A classifier rule and its declared contract.
pub struct Rule {
    pub name: &'static str,
    pub scope: RuleScope,
    pub kinds: &'static [NodeKind],
    /// Features the rule reads; checked against the extractor vocabulary.
    pub reads: &'static [Feature],
    pub emits: &'static [EventType],
    pub classify: ClassifyFn,
}

impl Rule {
    pub fn applies_to(&self, ctx: &PairContext) -> bool {
        self.scope == ctx.scope() && self.kinds.contains(&ctx.kind)
    }
}

const ALL_KINDS: &[NodeKind] = &[NodeKind::Module, NodeKind::Class, NodeKind::Function];
const DEFINITIONS: &[NodeKind] = &[NodeKind::Function, NodeKind::Class];
const FUNCTIONS: &[NodeKind] = &[NodeKind::Function];
const CLASSES: &[NodeKind] = &[NodeKind::Class];
const FUNCTIONS_AND_MODULES: &[NodeKind] = &[NodeKind::Function, NodeKind::Module];

/// All rules in execution order.
pub static CATALOG: &[Rule] = &[
    Rule {
        name: "node_added",
        scope: RuleScope::Added,
        kinds: DEFINITIONS,
        reads: &[],
        emits: &[EventType::NodeAdded],
        classify: rules::node_added,
    },
    Rule {
        name: "node_removed",
        scope: RuleScope::Removed,
        kinds: DEFINITIONS,
        reads: &[],
        emits: &[EventType::NodeRemoved],
        classify: rules::node_removed,
    },
    Rule {
        name: "signature",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::Signature],
        emits: &[EventType::SignatureChanged],
        classify: rules::signature,
    },
    Rule {
        name: "decorators",
        scope: RuleScope::Changed,
        kinds: DEFINITIONS,
        reads: &[Feature::DecoratorNames],
        emits: &[EventType::DecoratorAdded, EventType::DecoratorRemoved],
        classify: rules::decorators,
    },
    Rule {
        name: "error_handling",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS_AND_MODULES,
        reads: &[Feature::ExceptionHandlers],
        emits: &[
            EventType::ErrorHandlingIntroduced,
            EventType::ErrorHandlingRemoved,
        ],
        classify: rules::error_handling,
    },
    Rule {
        name: "exception_handling",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS_AND_MODULES,
        reads: &[Feature::ExceptionHandlers, Feature::HandlerTypes],
        emits: &[
            EventType::ExceptionHandlingAdded,
            EventType::ExceptionHandlingRemoved,
        ],
        classify: rules::exception_handling,
    },
    Rule {
        name: "complexity",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::Complexity],
        emits: &[EventType::FunctionComplexityChanged],
        classify: rules::complexity,
    },
    Rule {
        name: "return_pattern",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::Returns],
        emits: &[EventType::ReturnPatternChanged],
        classify: rules::return_pattern,
    },
    Rule {
        name: "yield_pattern",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::Yields],
        emits: &[EventType::YieldPatternChanged],
        classify: rules::yield_pattern,
    },
    Rule {
        name: "functional_style",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::FunctionalMarkers],
        emits: &[
            EventType::FunctionalProgrammingAdopted,
            EventType::FunctionalProgrammingRemoved,
        ],
        classify: rules::functional_style,
    },
    Rule {
        name: "lambda_usage",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::Lambdas],
        emits: &[EventType::LambdaUsageChanged],
        classify: rules::lambda_usage,
    },
    Rule {
        name: "comprehension_usage",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::Comprehensions],
        emits: &[EventType::ComprehensionUsageChanged],
        classify: rules::comprehension_usage,
    },
    Rule {
        name: "type_annotations",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::TypeAnnotations],
        emits: &[
            EventType::TypeAnnotationsIntroduced,
            EventType::TypeAnnotationsRemoved,
        ],
        classify: rules::type_annotations,
    },
    Rule {
        name: "default_parameters",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::DefaultParameters],
        emits: &[
            EventType::DefaultParametersAdded,
            EventType::DefaultParametersRemoved,
            EventType::DefaultParametersChanged,
        ],
        classify: rules::default_parameters,
    },
    Rule {
        name: "starred_expressions",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::StarredExpressions],
        emits: &[EventType::StarredExpressionsChanged],
        classify: rules::starred_expressions,
    },
    Rule {
        name: "slice_usage",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::Slices],
        emits: &[EventType::SliceUsageChanged],
        classify: rules::slice_usage,
    },
    Rule {
        name: "nested_classes",
        scope: RuleScope::Changed,
        kinds: DEFINITIONS,
        reads: &[Feature::NestedClasses],
        emits: &[
            EventType::NestedClassAdded,
            EventType::NestedClassRemoved,
            EventType::NestedClassChanged,
        ],
        classify: rules::nested_classes,
    },
    Rule {
        name: "literal_usage",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[
            Feature::StringLiterals,
            Feature::NumericLiterals,
            Feature::BooleanLiterals,
            Feature::NoneLiterals,
        ],
        emits: &[
            EventType::StringLiteralUsageChanged,
            EventType::NumericLiteralUsageChanged,
            EventType::BooleanLiteralUsageChanged,
            EventType::NoneLiteralUsageChanged,
        ],
        classify: rules::literal_usage,
    },
    Rule {
        name: "assertions",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::Assertions],
        emits: &[EventType::AssertionUsageChanged],
        classify: rules::assertions,
    },
    Rule {
        name: "async_conversion",
        scope: RuleScope::Changed,
        kinds: FUNCTIONS,
        reads: &[Feature::Async],
        emits: &[EventType::FunctionMadeAsync, EventType::FunctionMadeSync],
        classify: rules::async_conversion,
    },
    Rule {
        name: "scope_declarations",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::ScopeDeclarations],
        emits: &[EventType::GlobalUsageChanged],
        classify: rules::scope_declarations,
    },
    Rule {
        name: "inheritance",
        scope: RuleScope::Changed,
        kinds: CLASSES,
        reads: &[Feature::BaseClasses],
        emits: &[EventType::InheritanceChanged],
        classify: rules::inheritance,
    },
    Rule {
        name: "dependencies",
        scope: RuleScope::Changed,
        kinds: ALL_KINDS,
        reads: &[Feature::Imports],
        emits: &[EventType::DependencyAdded, EventType::DependencyRemoved],
        classify: rules::dependencies,
    },
];

/// Check every feature the catalog reads against an extractor vocabulary.
pub fn validate_catalog(vocabulary: &[Feature]) -> Result<(), VocabularyMismatchError> {
    for rule in CATALOG {
        for feature in rule.reads {
            if !vocabulary.contains(feature) {
                tracing::error!(rule = rule.name, feature = %feature, "rule reads unknown feature");
                return Err(VocabularyMismatchError {
                    feature: feature.as_str(),
                    expected: feature.kind(),
                    found: None,
                    version: crate::analysis::VOCABULARY_VERSION,
                });
            }
        }
    }
    Ok(())
}

/// Look up a rule by name.
pub fn find_rule(name: &str) -> Option<(usize, &'static Rule)> {
    CATALOG.iter().enumerate().find(|(_, r)| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_catalog_validates_against_full_vocabulary() {
        assert!(validate_catalog(Feature::ALL).is_ok());
    }

    #[test]
    fn test_missing_feature_is_reported() {
        let vocabulary: Vec<Feature> = Feature::ALL
            .iter()
            .copied()
            .filter(|f| *f != Feature::Complexity)
            .collect();
        let err = validate_catalog(&vocabulary).unwrap_err();
        assert_eq!(err.feature, "complexity");
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_every_event_type_has_one_emitter() {
        let mut seen = BTreeSet::new();
        for rule in CATALOG {
            for event in rule.emits {
                assert!(seen.insert(*event), "{} emitted by two rules", event);
            }
        }
        assert_eq!(seen.len(), EventType::ALL.len());
    }

    #[test]
    fn test_rule_names_unique() {
        let names: BTreeSet<_> = CATALOG.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), CATALOG.len());
        assert_eq!(find_rule("complexity").map(|(i, _)| i), Some(6));
    }

    #[test]
    fn test_only_addition_safe_events_for_added_scope() {
        for rule in CATALOG.iter().filter(|r| r.scope == RuleScope::Added) {
            assert!(rule.emits.iter().all(EventType::is_addition_safe));
        }
    }
}
