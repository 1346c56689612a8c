//! Core types for semantic events.

use std::collections::BTreeMap;
use std::fmt;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::analysis::{NodeKind, QualifiedKey};

/// Closed catalog of semantic event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NodeAdded,
    NodeRemoved,
    SignatureChanged,
    DecoratorAdded,
    DecoratorRemoved,
    ErrorHandlingIntroduced,
    ErrorHandlingRemoved,
    ExceptionHandlingAdded,
    ExceptionHandlingRemoved,
    FunctionComplexityChanged,
    ReturnPatternChanged,
    YieldPatternChanged,
    FunctionalProgrammingAdopted,
    FunctionalProgrammingRemoved,
    LambdaUsageChanged,
    ComprehensionUsageChanged,
    TypeAnnotationsIntroduced,
    TypeAnnotationsRemoved,
    DefaultParametersAdded,
    DefaultParametersRemoved,
    DefaultParametersChanged,
    StarredExpressionsChanged,
    SliceUsageChanged,
    NestedClassAdded,
    NestedClassRemoved,
    NestedClassChanged,
    StringLiteralUsageChanged,
    NumericLiteralUsageChanged,
    BooleanLiteralUsageChanged,
    NoneLiteralUsageChanged,
    AssertionUsageChanged,
    FunctionMadeAsync,
    FunctionMadeSync,
    GlobalUsageChanged,
    InheritanceChanged,
    DependencyAdded,
    DependencyRemoved,
}

static EVENT_TYPES: phf::Map<&'static str, EventType> = phf_map! {
    "node_added" => EventType::NodeAdded,
    "node_removed" => EventType::NodeRemoved,
    "signature_changed" => EventType::SignatureChanged,
    "decorator_added" => EventType::DecoratorAdded,
    "decorator_removed" => EventType::DecoratorRemoved,
    "error_handling_introduced" => EventType::ErrorHandlingIntroduced,
    "error_handling_removed" => EventType::ErrorHandlingRemoved,
    "exception_handling_added" => EventType::ExceptionHandlingAdded,
    "exception_handling_removed" => EventType::ExceptionHandlingRemoved,
    "function_complexity_changed" => EventType::FunctionComplexityChanged,
    "return_pattern_changed" => EventType::ReturnPatternChanged,
    "yield_pattern_changed" => EventType::YieldPatternChanged,
    "functional_programming_adopted" => EventType::FunctionalProgrammingAdopted,
    "functional_programming_removed" => EventType::FunctionalProgrammingRemoved,
    "lambda_usage_changed" => EventType::LambdaUsageChanged,
    "comprehension_usage_changed" => EventType::ComprehensionUsageChanged,
    "type_annotations_introduced" => EventType::TypeAnnotationsIntroduced,
    "type_annotations_removed" => EventType::TypeAnnotationsRemoved,
    "default_parameters_added" => EventType::DefaultParametersAdded,
    "default_parameters_removed" => EventType::DefaultParametersRemoved,
    "default_parameters_changed" => EventType::DefaultParametersChanged,
    "starred_expressions_changed" => EventType::StarredExpressionsChanged,
    "slice_usage_changed" => EventType::SliceUsageChanged,
    "nested_class_added" => EventType::NestedClassAdded,
    "nested_class_removed" => EventType::NestedClassRemoved,
    "nested_class_changed" => EventType::NestedClassChanged,
    "string_literal_usage_changed" => EventType::StringLiteralUsageChanged,
    "numeric_literal_usage_changed" => EventType::NumericLiteralUsageChanged,
    "boolean_literal_usage_changed" => EventType::BooleanLiteralUsageChanged,
    "none_literal_usage_changed" => EventType::NoneLiteralUsageChanged,
    "assertion_usage_changed" => EventType::AssertionUsageChanged,
    "function_made_async" => EventType::FunctionMadeAsync,
    "function_made_sync" => EventType::FunctionMadeSync,
    "global_usage_changed" => EventType::GlobalUsageChanged,
    "inheritance_changed" => EventType::InheritanceChanged,
    "dependency_added" => EventType::DependencyAdded,
    "dependency_removed" => EventType::DependencyRemoved,
};

impl EventType {
    pub const ALL: &'static [EventType] = &[
        EventType::NodeAdded,
        EventType::NodeRemoved,
        EventType::SignatureChanged,
        EventType::DecoratorAdded,
        EventType::DecoratorRemoved,
        EventType::ErrorHandlingIntroduced,
        EventType::ErrorHandlingRemoved,
        EventType::ExceptionHandlingAdded,
        EventType::ExceptionHandlingRemoved,
        EventType::FunctionComplexityChanged,
        EventType::ReturnPatternChanged,
        EventType::YieldPatternChanged,
        EventType::FunctionalProgrammingAdopted,
        EventType::FunctionalProgrammingRemoved,
        EventType::LambdaUsageChanged,
        EventType::ComprehensionUsageChanged,
        EventType::TypeAnnotationsIntroduced,
        EventType::TypeAnnotationsRemoved,
        EventType::DefaultParametersAdded,
        EventType::DefaultParametersRemoved,
        EventType::DefaultParametersChanged,
        EventType::StarredExpressionsChanged,
        EventType::SliceUsageChanged,
        EventType::NestedClassAdded,
        EventType::NestedClassRemoved,
        EventType::NestedClassChanged,
        EventType::StringLiteralUsageChanged,
        EventType::NumericLiteralUsageChanged,
        EventType::BooleanLiteralUsageChanged,
        EventType::NoneLiteralUsageChanged,
        EventType::AssertionUsageChanged,
        EventType::FunctionMadeAsync,
        EventType::FunctionMadeSync,
        EventType::GlobalUsageChanged,
        EventType::InheritanceChanged,
        EventType::DependencyAdded,
        EventType::DependencyRemoved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NodeAdded => "node_added",
            EventType::NodeRemoved => "node_removed",
            EventType::SignatureChanged => "signature_changed",
            EventType::DecoratorAdded => "decorator_added",
            EventType::DecoratorRemoved => "decorator_removed",
            EventType::ErrorHandlingIntroduced => "error_handling_introduced",
            EventType::ErrorHandlingRemoved => "error_handling_removed",
            EventType::ExceptionHandlingAdded => "exception_handling_added",
            EventType::ExceptionHandlingRemoved => "exception_handling_removed",
            EventType::FunctionComplexityChanged => "function_complexity_changed",
            EventType::ReturnPatternChanged => "return_pattern_changed",
            EventType::YieldPatternChanged => "yield_pattern_changed",
            EventType::FunctionalProgrammingAdopted => "functional_programming_adopted",
            EventType::FunctionalProgrammingRemoved => "functional_programming_removed",
            EventType::LambdaUsageChanged => "lambda_usage_changed",
            EventType::ComprehensionUsageChanged => "comprehension_usage_changed",
            EventType::TypeAnnotationsIntroduced => "type_annotations_introduced",
            EventType::TypeAnnotationsRemoved => "type_annotations_removed",
            EventType::DefaultParametersAdded => "default_parameters_added",
            EventType::DefaultParametersRemoved => "default_parameters_removed",
            EventType::DefaultParametersChanged => "default_parameters_changed",
            EventType::StarredExpressionsChanged => "starred_expressions_changed",
            EventType::SliceUsageChanged => "slice_usage_changed",
            EventType::NestedClassAdded => "nested_class_added",
            EventType::NestedClassRemoved => "nested_class_removed",
            EventType::NestedClassChanged => "nested_class_changed",
            EventType::StringLiteralUsageChanged => "string_literal_usage_changed",
            EventType::NumericLiteralUsageChanged => "numeric_literal_usage_changed",
            EventType::BooleanLiteralUsageChanged => "boolean_literal_usage_changed",
            EventType::NoneLiteralUsageChanged => "none_literal_usage_changed",
            EventType::AssertionUsageChanged => "assertion_usage_changed",
            EventType::FunctionMadeAsync => "function_made_async",
            EventType::FunctionMadeSync => "function_made_sync",
            EventType::GlobalUsageChanged => "global_usage_changed",
            EventType::InheritanceChanged => "inheritance_changed",
            EventType::DependencyAdded => "dependency_added",
            EventType::DependencyRemoved => "dependency_removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        EVENT_TYPES.get(s).copied()
    }

    /// Whether the event may be emitted for a node with no before side.
    pub fn is_addition_safe(&self) -> bool {
        matches!(self, EventType::NodeAdded)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown event type: {}", s))
    }
}

/// One value in an event's detail payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Flag(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Flag(b) => write!(f, "{}", b),
            DetailValue::Int(n) => write!(f, "{}", n),
            DetailValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<u32> for DetailValue {
    fn from(n: u32) -> Self {
        DetailValue::Int(i64::from(n))
    }
}

impl From<usize> for DetailValue {
    fn from(n: usize) -> Self {
        DetailValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<bool> for DetailValue {
    fn from(b: bool) -> Self {
        DetailValue::Flag(b)
    }
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        DetailValue::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        DetailValue::Text(s)
    }
}

/// Ordered key/value payload of an event.
pub type Details = BTreeMap<String, DetailValue>;

/// Event produced by a classifier rule, before it is tied to a file and
/// revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub event_type: EventType,
    pub details: Details,
}

impl EventDraft {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            details: Details::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// `{from, to}` payload used by every "changed" event.
    pub fn transition(
        event_type: EventType,
        from: impl Into<DetailValue>,
        to: impl Into<DetailValue>,
    ) -> Self {
        Self::new(event_type).with("from", from).with("to", to)
    }
}

/// A typed record of one meaning-level change to one structural node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticEvent {
    pub event_type: EventType,
    pub qualified_key: QualifiedKey,
    pub file_path: String,
    pub node_kind: NodeKind,
    pub details: Details,
    /// Revision the change was detected at.
    pub revision_id: String,
    /// Catalog rule that emitted the event.
    pub rule: String,
    /// Position in the file's ordered event list.
    pub order: usize,
}
