//! Closed feature vocabulary shared by extractors and classifiers.
//!
//! Extractors publish the list of features they compute; classifier rules
//! declare the features they read. [`crate::classify::validate_catalog`] checks
//! the two against each other at engine construction, and the typed
//! accessors on [`FeatureSnapshot`] fail with [`VocabularyMismatchError`]
//! instead of silently returning a default.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::VocabularyMismatchError;

/// Bumped whenever a feature is added, removed, or changes meaning.
pub const VOCABULARY_VERSION: u32 = 1;

/// Shape of a feature's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Count,
    Flag,
    /// Name to occurrence count.
    Tally,
    Text,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Count => "count",
            FeatureKind::Flag => "flag",
            FeatureKind::Tally => "tally",
            FeatureKind::Text => "text",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every structural feature the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    ControlFlow,
    Returns,
    Yields,
    ExceptionHandlers,
    Complexity,
    HandlerTypes,
    Lambdas,
    Comprehensions,
    FunctionalMarkers,
    TypeAnnotations,
    Decorators,
    DecoratorNames,
    DefaultParameters,
    StarredExpressions,
    Slices,
    NestedClasses,
    NestedFunctions,
    StringLiterals,
    NumericLiterals,
    BooleanLiterals,
    NoneLiterals,
    Assertions,
    ScopeDeclarations,
    Async,
    Imports,
    Signature,
    BaseClasses,
}

impl Feature {
    pub const ALL: &'static [Feature] = &[
        Feature::ControlFlow,
        Feature::Returns,
        Feature::Yields,
        Feature::ExceptionHandlers,
        Feature::Complexity,
        Feature::HandlerTypes,
        Feature::Lambdas,
        Feature::Comprehensions,
        Feature::FunctionalMarkers,
        Feature::TypeAnnotations,
        Feature::Decorators,
        Feature::DecoratorNames,
        Feature::DefaultParameters,
        Feature::StarredExpressions,
        Feature::Slices,
        Feature::NestedClasses,
        Feature::NestedFunctions,
        Feature::StringLiterals,
        Feature::NumericLiterals,
        Feature::BooleanLiterals,
        Feature::NoneLiterals,
        Feature::Assertions,
        Feature::ScopeDeclarations,
        Feature::Async,
        Feature::Imports,
        Feature::Signature,
        Feature::BaseClasses,
    ];

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::TypeAnnotations | Feature::Async => FeatureKind::Flag,
            Feature::HandlerTypes | Feature::DecoratorNames | Feature::Imports => {
                FeatureKind::Tally
            }
            Feature::Signature | Feature::BaseClasses => FeatureKind::Text,
            _ => FeatureKind::Count,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ControlFlow => "control_flow",
            Feature::Returns => "returns",
            Feature::Yields => "yields",
            Feature::ExceptionHandlers => "exception_handlers",
            Feature::Complexity => "complexity",
            Feature::HandlerTypes => "handler_types",
            Feature::Lambdas => "lambdas",
            Feature::Comprehensions => "comprehensions",
            Feature::FunctionalMarkers => "functional_markers",
            Feature::TypeAnnotations => "type_annotations",
            Feature::Decorators => "decorators",
            Feature::DecoratorNames => "decorator_names",
            Feature::DefaultParameters => "default_parameters",
            Feature::StarredExpressions => "starred_expressions",
            Feature::Slices => "slices",
            Feature::NestedClasses => "nested_classes",
            Feature::NestedFunctions => "nested_functions",
            Feature::StringLiterals => "string_literals",
            Feature::NumericLiterals => "numeric_literals",
            Feature::BooleanLiterals => "boolean_literals",
            Feature::NoneLiterals => "none_literals",
            Feature::Assertions => "assertions",
            Feature::ScopeDeclarations => "scope_declarations",
            Feature::Async => "async",
            Feature::Imports => "imports",
            Feature::Signature => "signature",
            Feature::BaseClasses => "base_classes",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one feature in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Count(u32),
    Flag(bool),
    Tally(BTreeMap<String, u32>),
    Text(String),
}

impl FeatureValue {
    /// Zero value for a feature kind.
    pub fn zero(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Count => FeatureValue::Count(0),
            FeatureKind::Flag => FeatureValue::Flag(false),
            FeatureKind::Tally => FeatureValue::Tally(BTreeMap::new()),
            FeatureKind::Text => FeatureValue::Text(String::new()),
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Count(_) => FeatureKind::Count,
            FeatureValue::Flag(_) => FeatureKind::Flag,
            FeatureValue::Tally(_) => FeatureKind::Tally,
            FeatureValue::Text(_) => FeatureKind::Text,
        }
    }
}

/// Feature values of one structural node at one revision.
///
/// Total over the vocabulary it was created with: every published feature
/// is present, zero-valued unless the extractor set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSnapshot {
    values: BTreeMap<Feature, FeatureValue>,
}

impl FeatureSnapshot {
    /// Zero-valued snapshot over `vocabulary`.
    pub fn new(vocabulary: &[Feature]) -> Self {
        Self {
            values: vocabulary
                .iter()
                .map(|f| (*f, FeatureValue::zero(f.kind())))
                .collect(),
        }
    }

    /// Set a feature value. Values outside the snapshot's vocabulary or of
    /// the wrong kind are rejected.
    pub fn set(&mut self, feature: Feature, value: FeatureValue) -> Result<(), VocabularyMismatchError> {
        match self.values.get_mut(&feature) {
            Some(slot) if slot.kind() == value.kind() => {
                *slot = value;
                Ok(())
            }
            Some(slot) => Err(mismatch(feature, value.kind(), Some(slot.kind()))),
            None => Err(mismatch(feature, value.kind(), None)),
        }
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.values.contains_key(&feature)
    }

    pub fn get(&self, feature: Feature) -> Option<&FeatureValue> {
        self.values.get(&feature)
    }

    pub fn count(&self, feature: Feature) -> Result<u32, VocabularyMismatchError> {
        match self.values.get(&feature) {
            Some(FeatureValue::Count(n)) => Ok(*n),
            other => Err(mismatch(feature, FeatureKind::Count, other.map(FeatureValue::kind))),
        }
    }

    pub fn flag(&self, feature: Feature) -> Result<bool, VocabularyMismatchError> {
        match self.values.get(&feature) {
            Some(FeatureValue::Flag(b)) => Ok(*b),
            other => Err(mismatch(feature, FeatureKind::Flag, other.map(FeatureValue::kind))),
        }
    }

    pub fn tally(&self, feature: Feature) -> Result<&BTreeMap<String, u32>, VocabularyMismatchError> {
        match self.values.get(&feature) {
            Some(FeatureValue::Tally(t)) => Ok(t),
            other => Err(mismatch(feature, FeatureKind::Tally, other.map(FeatureValue::kind))),
        }
    }

    pub fn text(&self, feature: Feature) -> Result<&str, VocabularyMismatchError> {
        match self.values.get(&feature) {
            Some(FeatureValue::Text(t)) => Ok(t),
            other => Err(mismatch(feature, FeatureKind::Text, other.map(FeatureValue::kind))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Feature, &FeatureValue)> {
        self.values.iter()
    }
}

fn mismatch(
    feature: Feature,
    expected: FeatureKind,
    found: Option<FeatureKind>,
) -> VocabularyMismatchError {
    VocabularyMismatchError {
        feature: feature.as_str(),
        expected,
        found,
        version: VOCABULARY_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_are_zero() {
        let snapshot = FeatureSnapshot::new(Feature::ALL);
        assert_eq!(snapshot.count(Feature::Complexity).unwrap(), 0);
        assert!(!snapshot.flag(Feature::TypeAnnotations).unwrap());
        assert!(snapshot.tally(Feature::Imports).unwrap().is_empty());
        assert_eq!(snapshot.text(Feature::Signature).unwrap(), "");
    }

    #[test]
    fn test_wrong_accessor_is_mismatch() {
        let snapshot = FeatureSnapshot::new(Feature::ALL);
        let err = snapshot.flag(Feature::Complexity).unwrap_err();
        assert_eq!(err.feature, "complexity");
        assert_eq!(err.expected, FeatureKind::Flag);
        assert_eq!(err.found, Some(FeatureKind::Count));
    }

    #[test]
    fn test_feature_outside_vocabulary_is_mismatch() {
        let mut snapshot = FeatureSnapshot::new(&[Feature::Returns]);
        let err = snapshot.count(Feature::Yields).unwrap_err();
        assert_eq!(err.found, None);

        assert!(snapshot.set(Feature::Returns, FeatureValue::Count(3)).is_ok());
        assert_eq!(snapshot.count(Feature::Returns).unwrap(), 3);
        assert!(snapshot.set(Feature::Returns, FeatureValue::Flag(true)).is_err());
        assert!(snapshot.set(Feature::Yields, FeatureValue::Count(1)).is_err());
    }

    #[test]
    fn test_all_features_listed_once() {
        let unique: std::collections::BTreeSet<_> = Feature::ALL.iter().collect();
        assert_eq!(unique.len(), Feature::ALL.len());
    }
}
