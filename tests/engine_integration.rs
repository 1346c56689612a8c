//! Integration tests for the full diff pipeline.
//!
//! These tests check the engine's observable guarantees: determinism,
//! empty output for unchanged text, transition-only events, and the exact
//! event list for the fixture history under testdata/history.

use std::path::PathBuf;

use svcs::{diff_semantics, DetailValue, Engine, EventType, FileChange, SemanticEvent};

fn history_path(rev: &str, file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("history")
        .join(rev)
        .join(file)
}

fn read(rev: &str, file: &str) -> Option<String> {
    std::fs::read_to_string(history_path(rev, file)).ok()
}

fn diff(before: &str, after: &str) -> Vec<SemanticEvent> {
    diff_semantics("app.py", Some(before), Some(after), "rev2").expect("diff should succeed")
}

fn summary(events: &[SemanticEvent]) -> Vec<(&str, EventType)> {
    events
        .iter()
        .map(|e| (e.qualified_key.as_str(), e.event_type))
        .collect()
}

fn count_of(events: &[SemanticEvent], event_type: EventType) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}

fn detail<'a>(event: &'a SemanticEvent, key: &str) -> &'a DetailValue {
    event.details.get(key).expect("detail present")
}

#[test]
fn test_error_handling_scenario() {
    let events = diff(
        "def f(x): return x+1\n",
        "def f(x): \n  try:\n    return x+1\n  except: pass\n",
    );

    assert_eq!(
        summary(&events),
        vec![
            ("f", EventType::ErrorHandlingIntroduced),
            ("f", EventType::FunctionComplexityChanged),
        ]
    );
    assert_eq!(detail(&events[1], "from"), &DetailValue::Int(1));
    assert_eq!(detail(&events[1], "to"), &DetailValue::Int(3));
    assert_eq!(events[0].order, 0);
    assert_eq!(events[1].order, 1);
    assert!(events.iter().all(|e| e.revision_id == "rev2" && e.file_path == "app.py"));
}

#[test]
fn test_error_handling_removed_is_symmetric() {
    let events = diff(
        "def f(x): \n  try:\n    return x+1\n  except: pass\n",
        "def f(x): return x+1\n",
    );
    assert_eq!(count_of(&events, EventType::ErrorHandlingRemoved), 1);
    assert_eq!(count_of(&events, EventType::ErrorHandlingIntroduced), 0);
}

#[test]
fn test_handler_count_within_positive_range() {
    let before = r#"
def f(path):
    try:
        return open(path).read()
    except OSError:
        return ""
"#;
    let after = r#"
def f(path):
    try:
        return open(path).read()
    except OSError:
        return ""
    except UnicodeDecodeError:
        return ""
"#;
    let events = diff(before, after);
    assert_eq!(count_of(&events, EventType::ErrorHandlingIntroduced), 0);
    assert_eq!(count_of(&events, EventType::ErrorHandlingRemoved), 0);

    let added: Vec<&SemanticEvent> = events
        .iter()
        .filter(|e| e.event_type == EventType::ExceptionHandlingAdded)
        .collect();
    assert_eq!(added.len(), 1);
    assert_eq!(
        detail(added[0], "exception_type"),
        &DetailValue::Text("UnicodeDecodeError".to_string())
    );
}

#[test]
fn test_complexity_transition() {
    let before = "def f(x):\n    if x:\n        return 1\n";
    let after = r#"def f(x):
    if x:
        return 1
    elif x < 0:
        return 2
    for i in x:
        pass
    while x:
        break
    return 3
"#;
    let events = diff(before, after);
    let complexity: Vec<&SemanticEvent> = events
        .iter()
        .filter(|e| e.event_type == EventType::FunctionComplexityChanged)
        .collect();
    assert_eq!(complexity.len(), 1);
    assert_eq!(complexity[0].qualified_key.as_str(), "f");
    assert_eq!(detail(complexity[0], "from"), &DetailValue::Int(2));
    assert_eq!(detail(complexity[0], "to"), &DetailValue::Int(7));
}

#[test]
fn test_functional_adoption_threshold() {
    let events = diff(
        "def f(xs):\n    return xs\n",
        "def f(xs):\n    return [x for x in xs]\n",
    );
    let adopted: Vec<&SemanticEvent> = events
        .iter()
        .filter(|e| e.event_type == EventType::FunctionalProgrammingAdopted)
        .collect();
    assert_eq!(adopted.len(), 1);
    assert_eq!(adopted[0].qualified_key.as_str(), "f");
    assert_eq!(count_of(&events, EventType::FunctionalProgrammingRemoved), 0);

    // More of the same style is not a second adoption.
    let events = diff(
        "def f(xs):\n    return [x for x in xs]\n",
        "def f(xs):\n    return [x for x in xs if (lambda y: y)(x)]\n",
    );
    assert_eq!(count_of(&events, EventType::FunctionalProgrammingAdopted), 0);
    assert_eq!(count_of(&events, EventType::LambdaUsageChanged), 1);
}

#[test]
fn test_identical_text_yields_nothing() {
    for file in ["billing.py", "utils.py", "constants.py"] {
        let text = read("v1", file).expect("fixture");
        assert!(diff(&text, &text).is_empty(), "{} diffed against itself", file);
    }
}

#[test]
fn test_reformatting_yields_nothing() {
    let events = diff(
        "def f(a, b=1):\n    return a + b\n",
        "def f(a,\n      b=1):\n\n    return a + b  # sum\n",
    );
    assert!(events.is_empty(), "{:?}", summary(&events));
}

#[test]
fn test_formatter_style_edits_yield_nothing() {
    let cases = [
        ("def f(a, b = 1):\n    return a\n", "def f(a, b=1):\n    return a\n"),
        (
            "def f(m: Dict[str,int]) -> int:\n    return 0\n",
            "def f(m: Dict[str, int]) -> int:\n    return 0\n",
        ),
        (
            "class A(metaclass = M):\n    pass\n",
            "class A(metaclass=M):\n    pass\n",
        ),
        (
            "@register( 'x' )\ndef f(\n    a,\n    b,\n):\n    return a\n",
            "@register('x')\ndef f(a, b):\n    return a\n",
        ),
    ];
    for (before, after) in cases {
        let events = diff(before, after);
        assert!(events.is_empty(), "{:?} -> {:?}: {:?}", before, after, summary(&events));
    }
}

#[test]
fn test_diff_is_deterministic() {
    let before = read("v1", "billing.py").expect("fixture");
    let after = read("v2", "billing.py").expect("fixture");
    let first = serde_json::to_string(&diff(&before, &after)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&diff(&before, &after)).unwrap(), first);
    }
}

#[test]
fn test_added_file_only_reports_additions() {
    let after = read("v2", "reports.py").expect("fixture");
    let events = diff_semantics("reports.py", None, Some(&after), "rev2").unwrap();
    assert_eq!(
        summary(&events),
        vec![
            ("Report", EventType::NodeAdded),
            ("Report.render", EventType::NodeAdded),
        ]
    );
    assert!(events.iter().all(|e| e.event_type.is_addition_safe()));

    // A brand-new function with handlers is not "error handling introduced".
    let events = diff_semantics(
        "new.py",
        None,
        Some("def f():\n    try:\n        pass\n    except OSError:\n        pass\n"),
        "rev2",
    )
    .unwrap();
    assert_eq!(summary(&events), vec![("f", EventType::NodeAdded)]);
}

#[test]
fn test_fixture_history_billing() {
    let before = read("v1", "billing.py").expect("fixture");
    let after = read("v2", "billing.py").expect("fixture");
    let events = diff_semantics("billing.py", Some(&before), Some(&after), "rev2").unwrap();

    assert_eq!(
        summary(&events),
        vec![
            ("<module>", EventType::TypeAnnotationsIntroduced),
            ("<module>", EventType::DependencyAdded),
            ("Invoice", EventType::InheritanceChanged),
            ("Invoice.amount", EventType::FunctionMadeAsync),
            ("Invoice.describe", EventType::NodeAdded),
            ("parse_invoice", EventType::ErrorHandlingIntroduced),
            ("parse_invoice", EventType::FunctionComplexityChanged),
            ("parse_invoice", EventType::ReturnPatternChanged),
            ("parse_invoice", EventType::NoneLiteralUsageChanged),
            ("total", EventType::SignatureChanged),
            ("total", EventType::FunctionComplexityChanged),
            ("total", EventType::FunctionalProgrammingAdopted),
            ("total", EventType::ComprehensionUsageChanged),
            ("total", EventType::TypeAnnotationsIntroduced),
            ("total", EventType::NumericLiteralUsageChanged),
        ]
    );

    assert_eq!(detail(&events[1], "module"), &DetailValue::Text("typing".to_string()));
    assert_eq!(detail(&events[2], "to"), &DetailValue::Text("Base".to_string()));
    assert_eq!(detail(&events[6], "to"), &DetailValue::Int(4));
    assert_eq!(
        detail(&events[9], "to"),
        &DetailValue::Text("(items: List[\"Item\"]) -> float".to_string())
    );
    assert_eq!(detail(&events[10], "from"), &DetailValue::Int(2));
    assert_eq!(detail(&events[10], "to"), &DetailValue::Int(1));

    let orders: Vec<usize> = events.iter().map(|e| e.order).collect();
    assert_eq!(orders, (0..events.len()).collect::<Vec<_>>());
}

#[test]
fn test_fixture_history_removed_function() {
    let before = read("v1", "utils.py").expect("fixture");
    let after = read("v2", "utils.py").expect("fixture");
    let events = diff_semantics("utils.py", Some(&before), Some(&after), "rev2").unwrap();
    assert_eq!(summary(&events), vec![("legacy", EventType::NodeRemoved)]);
    assert_eq!(detail(&events[0], "start_line"), &DetailValue::Int(5));
    assert_eq!(detail(&events[0], "kind"), &DetailValue::Text("function".to_string()));
}

#[test]
fn test_batch_over_history() {
    let engine = Engine::new().unwrap();
    let changes: Vec<FileChange> = ["billing.py", "utils.py", "reports.py", "constants.py"]
        .iter()
        .map(|file| FileChange {
            file_path: file.to_string(),
            before: read("v1", file),
            after: read("v2", file),
            revision_id: "rev2".to_string(),
        })
        .collect();

    let diffs = engine.diff_batch(&changes);
    let counts: Vec<(&str, usize)> = diffs
        .iter()
        .map(|d| (d.file_path.as_str(), d.events().len()))
        .collect();
    assert_eq!(
        counts,
        vec![("billing.py", 15), ("utils.py", 1), ("reports.py", 2), ("constants.py", 0)]
    );
    assert!(diffs.iter().all(|d| d.result.is_ok()));

    // Batch results match single-file calls.
    let single = engine
        .diff_semantics("billing.py", read("v1", "billing.py").as_deref(), read("v2", "billing.py").as_deref(), "rev2")
        .unwrap();
    assert_eq!(diffs[0].events(), single.as_slice());
}

#[test]
fn test_config_disables_events() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/svcs.yaml");
    let config = svcs::Config::load(Some(&path)).unwrap();
    let engine = Engine::with_config(config).unwrap();

    let before = read("v1", "billing.py").expect("fixture");
    let after = read("v2", "billing.py").expect("fixture");
    let events = engine
        .diff_semantics("billing.py", Some(&before), Some(&after), "rev2")
        .unwrap();
    assert_eq!(events.len(), 14);
    assert_eq!(count_of(&events, EventType::NumericLiteralUsageChanged), 0);

    let excluded = engine
        .diff_semantics("app/migrations/0001.py", None, Some("def up():\n    pass\n"), "rev2")
        .unwrap();
    assert!(excluded.is_empty());
}
