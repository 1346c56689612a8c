//! Classifier rule functions.
//!
//! Every function here is registered in [`super::CATALOG`]; the catalog
//! decides which pairs reach it, so a rule only checks what it needs for
//! its own transition logic.

use std::collections::BTreeMap;

use crate::analysis::{Feature, FeatureSnapshot};
use crate::error::VocabularyMismatchError;

use super::catalog::{NodeSide, PairContext};
use super::types::{EventDraft, EventType};

type RuleResult = Result<Vec<EventDraft>, VocabularyMismatchError>;

fn span_event(event_type: EventType, ctx: &PairContext, side: Option<NodeSide>) -> RuleResult {
    let Some(side) = side else {
        return Ok(Vec::new());
    };
    let span = side.node.span;
    Ok(vec![EventDraft::new(event_type)
        .with("kind", ctx.kind.as_str())
        .with("start_line", span.start_line)
        .with("end_line", span.end_line)])
}

pub fn node_added(ctx: &PairContext) -> RuleResult {
    span_event(EventType::NodeAdded, ctx, ctx.after)
}

pub fn node_removed(ctx: &PairContext) -> RuleResult {
    span_event(EventType::NodeRemoved, ctx, ctx.before)
}

/// Emit `event` with `{from, to}` whenever a count differs.
fn count_delta(ctx: &PairContext, feature: Feature, event: EventType) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (from, to) = (before.count(feature)?, after.count(feature)?);
    if from == to {
        return Ok(Vec::new());
    }
    tracing::trace!(key = %ctx.key, %event, from, to, "count changed");
    Ok(vec![EventDraft::transition(event, from, to)])
}

/// Emit on the zero/non-zero boundary only.
fn presence_transition(
    before: u32,
    after: u32,
    appeared: EventType,
    disappeared: EventType,
) -> Vec<EventDraft> {
    match (before, after) {
        (0, n) if n > 0 => vec![EventDraft::transition(appeared, before, after)],
        (n, 0) if n > 0 => vec![EventDraft::transition(disappeared, before, after)],
        _ => Vec::new(),
    }
}

/// Names present on one side only, as added then removed.
fn tally_difference<'s>(
    before: &'s BTreeMap<String, u32>,
    after: &'s BTreeMap<String, u32>,
) -> (Vec<&'s str>, Vec<&'s str>) {
    let added = after
        .keys()
        .filter(|k| !before.contains_key(*k))
        .map(String::as_str)
        .collect();
    let removed = before
        .keys()
        .filter(|k| !after.contains_key(*k))
        .map(String::as_str)
        .collect();
    (added, removed)
}

fn named_events(
    added: Vec<&str>,
    removed: Vec<&str>,
    detail: &str,
    on_added: EventType,
    on_removed: EventType,
) -> Vec<EventDraft> {
    added
        .into_iter()
        .map(|name| EventDraft::new(on_added).with(detail, name))
        .chain(
            removed
                .into_iter()
                .map(|name| EventDraft::new(on_removed).with(detail, name)),
        )
        .collect()
}

pub fn signature(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (from, to) = (
        before.text(Feature::Signature)?,
        after.text(Feature::Signature)?,
    );
    if from == to {
        return Ok(Vec::new());
    }
    Ok(vec![EventDraft::transition(EventType::SignatureChanged, from, to)])
}

pub fn decorators(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (added, removed) = tally_difference(
        before.tally(Feature::DecoratorNames)?,
        after.tally(Feature::DecoratorNames)?,
    );
    Ok(named_events(
        added,
        removed,
        "decorator",
        EventType::DecoratorAdded,
        EventType::DecoratorRemoved,
    ))
}

pub fn error_handling(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    Ok(presence_transition(
        before.count(Feature::ExceptionHandlers)?,
        after.count(Feature::ExceptionHandlers)?,
        EventType::ErrorHandlingIntroduced,
        EventType::ErrorHandlingRemoved,
    ))
}

/// Per-type handler changes within code that already handled errors.
pub fn exception_handling(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    if before.count(Feature::ExceptionHandlers)? == 0 || after.count(Feature::ExceptionHandlers)? == 0 {
        return Ok(Vec::new());
    }
    let (added, removed) = tally_difference(
        before.tally(Feature::HandlerTypes)?,
        after.tally(Feature::HandlerTypes)?,
    );
    Ok(named_events(
        added,
        removed,
        "exception_type",
        EventType::ExceptionHandlingAdded,
        EventType::ExceptionHandlingRemoved,
    ))
}

pub fn complexity(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Complexity, EventType::FunctionComplexityChanged)
}

pub fn return_pattern(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Returns, EventType::ReturnPatternChanged)
}

pub fn yield_pattern(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Yields, EventType::YieldPatternChanged)
}

pub fn functional_style(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    Ok(presence_transition(
        before.count(Feature::FunctionalMarkers)?,
        after.count(Feature::FunctionalMarkers)?,
        EventType::FunctionalProgrammingAdopted,
        EventType::FunctionalProgrammingRemoved,
    ))
}

pub fn lambda_usage(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Lambdas, EventType::LambdaUsageChanged)
}

pub fn comprehension_usage(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Comprehensions, EventType::ComprehensionUsageChanged)
}

pub fn type_annotations(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let event = match (
        before.flag(Feature::TypeAnnotations)?,
        after.flag(Feature::TypeAnnotations)?,
    ) {
        (false, true) => EventType::TypeAnnotationsIntroduced,
        (true, false) => EventType::TypeAnnotationsRemoved,
        _ => return Ok(Vec::new()),
    };
    Ok(vec![EventDraft::new(event)])
}

pub fn default_parameters(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (from, to) = (
        before.count(Feature::DefaultParameters)?,
        after.count(Feature::DefaultParameters)?,
    );
    let mut events = presence_transition(
        from,
        to,
        EventType::DefaultParametersAdded,
        EventType::DefaultParametersRemoved,
    );
    events.extend(count_delta(ctx, Feature::DefaultParameters, EventType::DefaultParametersChanged)?);
    Ok(events)
}

pub fn starred_expressions(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::StarredExpressions, EventType::StarredExpressionsChanged)
}

pub fn slice_usage(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Slices, EventType::SliceUsageChanged)
}

pub fn nested_classes(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (from, to) = (
        before.count(Feature::NestedClasses)?,
        after.count(Feature::NestedClasses)?,
    );
    let mut events = presence_transition(
        from,
        to,
        EventType::NestedClassAdded,
        EventType::NestedClassRemoved,
    );
    events.extend(count_delta(ctx, Feature::NestedClasses, EventType::NestedClassChanged)?);
    Ok(events)
}

const LITERAL_KINDS: &[(Feature, EventType)] = &[
    (Feature::StringLiterals, EventType::StringLiteralUsageChanged),
    (Feature::NumericLiterals, EventType::NumericLiteralUsageChanged),
    (Feature::BooleanLiterals, EventType::BooleanLiteralUsageChanged),
    (Feature::NoneLiterals, EventType::NoneLiteralUsageChanged),
];

/// Any nonzero change in a literal kind's count is reported.
pub fn literal_usage(ctx: &PairContext) -> RuleResult {
    let mut events = Vec::new();
    for (feature, event) in LITERAL_KINDS {
        events.extend(count_delta(ctx, *feature, *event)?);
    }
    Ok(events)
}

pub fn assertions(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::Assertions, EventType::AssertionUsageChanged)
}

pub fn async_conversion(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let event = match (before.flag(Feature::Async)?, after.flag(Feature::Async)?) {
        (false, true) => EventType::FunctionMadeAsync,
        (true, false) => EventType::FunctionMadeSync,
        _ => return Ok(Vec::new()),
    };
    Ok(vec![EventDraft::new(event)])
}

pub fn scope_declarations(ctx: &PairContext) -> RuleResult {
    count_delta(ctx, Feature::ScopeDeclarations, EventType::GlobalUsageChanged)
}

pub fn inheritance(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    let (from, to) = (
        before.text(Feature::BaseClasses)?,
        after.text(Feature::BaseClasses)?,
    );
    if from == to {
        return Ok(Vec::new());
    }
    Ok(vec![EventDraft::transition(EventType::InheritanceChanged, from, to)])
}

pub fn dependencies(ctx: &PairContext) -> RuleResult {
    let Some((before, after)) = ctx.snapshots() else {
        return Ok(Vec::new());
    };
    import_changes(before, after)
}

fn import_changes(before: &FeatureSnapshot, after: &FeatureSnapshot) -> RuleResult {
    let (added, removed) = tally_difference(
        before.tally(Feature::Imports)?,
        after.tally(Feature::Imports)?,
    );
    Ok(named_events(
        added,
        removed,
        "module",
        EventType::DependencyAdded,
        EventType::DependencyRemoved,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{get_adapter, NodeKind, SourceUnit};

    fn parse(source: &str) -> SourceUnit {
        get_adapter("py").unwrap().parse("t.py", "r", source).unwrap()
    }

    fn run(rule: fn(&PairContext) -> RuleResult, key: &str, before: &str, after: &str) -> Vec<EventDraft> {
        let (b, a) = (parse(before), parse(after));
        let (bn, an) = (b.find(key).unwrap(), a.find(key).unwrap());
        let ctx = PairContext {
            key: &an.key,
            kind: an.kind,
            before: Some(NodeSide { unit: &b, node: bn }),
            after: Some(NodeSide { unit: &a, node: an }),
        };
        rule(&ctx).unwrap()
    }

    fn types(events: &[EventDraft]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type).collect()
    }

    #[test]
    fn test_presence_transition_boundaries() {
        let up = presence_transition(0, 2, EventType::NestedClassAdded, EventType::NestedClassRemoved);
        assert_eq!(types(&up), vec![EventType::NestedClassAdded]);
        let down = presence_transition(3, 0, EventType::NestedClassAdded, EventType::NestedClassRemoved);
        assert_eq!(types(&down), vec![EventType::NestedClassRemoved]);
        assert!(presence_transition(1, 2, EventType::NestedClassAdded, EventType::NestedClassRemoved).is_empty());
        assert!(presence_transition(0, 0, EventType::NestedClassAdded, EventType::NestedClassRemoved).is_empty());
    }

    #[test]
    fn test_error_handling_only_on_boundary() {
        let one = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n";
        let two = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n    except KeyError:\n        pass\n";
        assert!(run(error_handling, "f", one, two).is_empty());

        let events = run(exception_handling, "f", one, two);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ExceptionHandlingAdded);
        assert_eq!(
            events[0].details.get("exception_type").map(ToString::to_string),
            Some("\"KeyError\"".to_string())
        );
    }

    #[test]
    fn test_exception_handling_skips_introduction() {
        let none = "def f():\n    pass\n";
        let one = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n";
        assert!(run(exception_handling, "f", none, one).is_empty());
        assert_eq!(
            types(&run(error_handling, "f", none, one)),
            vec![EventType::ErrorHandlingIntroduced]
        );
        assert_eq!(
            types(&run(error_handling, "f", one, none)),
            vec![EventType::ErrorHandlingRemoved]
        );
    }

    #[test]
    fn test_default_parameters_added_and_changed() {
        let events = run(default_parameters, "f", "def f(a):\n    pass\n", "def f(a=1):\n    pass\n");
        assert_eq!(
            types(&events),
            vec![EventType::DefaultParametersAdded, EventType::DefaultParametersChanged]
        );
        let events = run(default_parameters, "f", "def f(a=1):\n    pass\n", "def f(a=1, b=2):\n    pass\n");
        assert_eq!(types(&events), vec![EventType::DefaultParametersChanged]);
    }

    fn from_to(event: &EventDraft) -> (String, String) {
        let get = |k: &str| event.details.get(k).map(ToString::to_string).unwrap_or_default();
        (get("from"), get("to"))
    }

    #[test]
    fn test_default_parameters_removed() {
        let events = run(default_parameters, "f", "def f(a=1, b=2):\n    pass\n", "def f(a, b):\n    pass\n");
        assert_eq!(
            types(&events),
            vec![EventType::DefaultParametersRemoved, EventType::DefaultParametersChanged]
        );
        assert_eq!(from_to(&events[1]), ("2".to_string(), "0".to_string()));
    }

    #[test]
    fn test_exception_handling_removed() {
        let two = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n    except KeyError:\n        pass\n";
        let one = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n";
        let events = run(exception_handling, "f", two, one);
        assert_eq!(types(&events), vec![EventType::ExceptionHandlingRemoved]);
        assert_eq!(
            events[0].details.get("exception_type").map(ToString::to_string),
            Some("\"KeyError\"".to_string())
        );
    }

    #[test]
    fn test_type_annotations_removed() {
        let events = run(
            type_annotations,
            "f",
            "def f(x: int) -> int:\n    return x\n",
            "def f(x):\n    return x\n",
        );
        assert_eq!(types(&events), vec![EventType::TypeAnnotationsRemoved]);
    }

    #[test]
    fn test_boolean_literal_usage() {
        let events = run(
            literal_usage,
            "f",
            "def f():\n    return None\n",
            "def f():\n    return True or False\n",
        );
        assert_eq!(
            types(&events),
            vec![EventType::BooleanLiteralUsageChanged, EventType::NoneLiteralUsageChanged]
        );
        assert_eq!(from_to(&events[0]), ("0".to_string(), "2".to_string()));
    }

    #[test]
    fn test_yield_pattern_transitions() {
        let none = "def f():\n    return []\n";
        let one = "def f():\n    yield 1\n";
        let two = "def f():\n    yield 1\n    yield from g()\n";

        let events = run(yield_pattern, "f", none, one);
        assert_eq!(types(&events), vec![EventType::YieldPatternChanged]);
        assert_eq!(from_to(&events[0]), ("0".to_string(), "1".to_string()));

        let events = run(yield_pattern, "f", two, one);
        assert_eq!(from_to(&events[0]), ("2".to_string(), "1".to_string()));

        let events = run(yield_pattern, "f", one, none);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "0".to_string()));

        assert!(run(yield_pattern, "f", one, "def f():\n    yield 2\n").is_empty());
    }

    #[test]
    fn test_starred_expressions_transitions() {
        let none = "def f(xs, kw):\n    return g(xs)\n";
        let one = "def f(xs, kw):\n    return g(*xs)\n";
        let three = "def f(xs, kw):\n    return [*xs, *xs], g(**kw)\n";

        let events = run(starred_expressions, "f", none, one);
        assert_eq!(types(&events), vec![EventType::StarredExpressionsChanged]);
        assert_eq!(from_to(&events[0]), ("0".to_string(), "1".to_string()));

        let events = run(starred_expressions, "f", one, three);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "3".to_string()));

        let events = run(starred_expressions, "f", three, none);
        assert_eq!(from_to(&events[0]), ("3".to_string(), "0".to_string()));
    }

    #[test]
    fn test_slice_usage_transitions() {
        let none = "def f(xs):\n    return xs[0]\n";
        let one = "def f(xs):\n    return xs[1:]\n";
        let two = "def f(xs):\n    return xs[1:], xs[:-1]\n";

        let events = run(slice_usage, "f", none, one);
        assert_eq!(types(&events), vec![EventType::SliceUsageChanged]);
        assert_eq!(from_to(&events[0]), ("0".to_string(), "1".to_string()));

        let events = run(slice_usage, "f", one, two);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "2".to_string()));

        let events = run(slice_usage, "f", two, none);
        assert_eq!(from_to(&events[0]), ("2".to_string(), "0".to_string()));
    }

    #[test]
    fn test_nested_class_transitions() {
        let none = "class A:\n    pass\n";
        let one = "class A:\n    class B:\n        pass\n";
        let two = "class A:\n    class B:\n        pass\n    class C:\n        pass\n";

        let events = run(nested_classes, "A", none, one);
        assert_eq!(
            types(&events),
            vec![EventType::NestedClassAdded, EventType::NestedClassChanged]
        );

        let events = run(nested_classes, "A", one, two);
        assert_eq!(types(&events), vec![EventType::NestedClassChanged]);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "2".to_string()));

        let events = run(nested_classes, "A", two, none);
        assert_eq!(
            types(&events),
            vec![EventType::NestedClassRemoved, EventType::NestedClassChanged]
        );
        assert_eq!(from_to(&events[1]), ("2".to_string(), "0".to_string()));
    }

    #[test]
    fn test_assertion_usage_transitions() {
        let none = "def f(x):\n    return x\n";
        let one = "def f(x):\n    assert x\n    return x\n";
        let two = "def f(x):\n    assert x\n    assert x > 0, \"positive\"\n    return x\n";

        let events = run(assertions, "f", none, one);
        assert_eq!(types(&events), vec![EventType::AssertionUsageChanged]);
        assert_eq!(from_to(&events[0]), ("0".to_string(), "1".to_string()));

        let events = run(assertions, "f", one, two);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "2".to_string()));

        let events = run(assertions, "f", two, none);
        assert_eq!(from_to(&events[0]), ("2".to_string(), "0".to_string()));
    }

    #[test]
    fn test_global_usage_transitions() {
        let none = "def f():\n    return 1\n";
        let one = "def f():\n    global count\n    return 1\n";
        let two = "def f():\n    global count\n    global total\n    return 1\n";

        let events = run(scope_declarations, "f", none, one);
        assert_eq!(types(&events), vec![EventType::GlobalUsageChanged]);
        assert_eq!(from_to(&events[0]), ("0".to_string(), "1".to_string()));

        let events = run(scope_declarations, "f", one, two);
        assert_eq!(from_to(&events[0]), ("1".to_string(), "2".to_string()));

        let events = run(scope_declarations, "f", two, none);
        assert_eq!(from_to(&events[0]), ("2".to_string(), "0".to_string()));
    }

    #[test]
    fn test_literal_usage_any_delta() {
        let events = run(
            literal_usage,
            "f",
            "def f():\n    return 'a'\n",
            "def f():\n    return ('a', 1, None)\n",
        );
        assert_eq!(
            types(&events),
            vec![EventType::NumericLiteralUsageChanged, EventType::NoneLiteralUsageChanged]
        );
    }

    #[test]
    fn test_async_conversion() {
        let events = run(async_conversion, "f", "def f():\n    pass\n", "async def f():\n    pass\n");
        assert_eq!(types(&events), vec![EventType::FunctionMadeAsync]);
        let events = run(async_conversion, "f", "async def f():\n    pass\n", "def f():\n    pass\n");
        assert_eq!(types(&events), vec![EventType::FunctionMadeSync]);
    }

    #[test]
    fn test_inheritance_and_decorators() {
        let events = run(inheritance, "A", "class A(Base):\n    pass\n", "class A(Base, Mixin):\n    pass\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details.get("to").map(ToString::to_string), Some("\"Base, Mixin\"".to_string()));

        let events = run(
            decorators,
            "f",
            "@old\ndef f():\n    pass\n",
            "@new\ndef f():\n    pass\n",
        );
        assert_eq!(
            types(&events),
            vec![EventType::DecoratorAdded, EventType::DecoratorRemoved]
        );
    }

    #[test]
    fn test_dependencies_at_module_level() {
        let events = run(
            dependencies,
            "<module>",
            "import os\nimport json\n",
            "import os\nfrom pathlib import Path\n",
        );
        assert_eq!(
            types(&events),
            vec![EventType::DependencyAdded, EventType::DependencyRemoved]
        );
        assert_eq!(
            events[0].details.get("module").map(ToString::to_string),
            Some("\"pathlib\"".to_string())
        );
    }

    #[test]
    fn test_node_added_details() {
        let unit = parse("\n\ndef g():\n    return 1\n");
        let node = unit.find("g").unwrap();
        let ctx = PairContext {
            key: &node.key,
            kind: NodeKind::Function,
            before: None,
            after: Some(NodeSide { unit: &unit, node }),
        };
        let events = node_added(&ctx).unwrap();
        assert_eq!(events.len(), 1);
        let details = &events[0].details;
        assert_eq!(details.get("start_line").map(ToString::to_string), Some("3".to_string()));
        assert_eq!(details.get("end_line").map(ToString::to_string), Some("4".to_string()));
        assert_eq!(details.get("kind").map(ToString::to_string), Some("\"function\"".to_string()));
    }
}
