//! Feature extraction for Python structural nodes.
//!
//! A node's features cover its own parameter list, return annotation and
//! body. Bodies of nested definitions are skipped: they belong to their own
//! structural node and only bump the parent's nested-definition counts.
//! Annotation subtrees (`type` nodes) and docstrings never contribute
//! literals.

use std::collections::BTreeMap;

use tree_sitter::Node;

use crate::analysis::{Feature, FeatureSnapshot, FeatureValue, NodeKind, SourceUnit, StructuralNode};

/// Features computed by this extractor.
pub const VOCABULARY: &[Feature] = Feature::ALL;

/// Modules whose import marks a scope as using type annotations.
const TYPING_MODULES: &[&str] = &["typing", "typing_extensions"];

/// Caught-type name recorded for a bare `except:`.
pub const BARE_EXCEPT: &str = "<bare>";

/// Raw counters gathered while walking one scope.
#[derive(Debug, Default)]
struct ScopeFacts {
    control_flow: u32,
    returns: u32,
    yields: u32,
    handlers: u32,
    handler_types: BTreeMap<String, u32>,
    lambdas: u32,
    comprehensions: u32,
    annotated: bool,
    decorators: BTreeMap<String, u32>,
    default_parameters: u32,
    starred: u32,
    slices: u32,
    nested_classes: u32,
    nested_functions: u32,
    strings: u32,
    numbers: u32,
    booleans: u32,
    nones: u32,
    assertions: u32,
    scope_declarations: u32,
    is_async: bool,
    imports: BTreeMap<String, u32>,
    signature: String,
    bases: String,
}

impl ScopeFacts {
    fn into_values(self) -> Vec<(Feature, FeatureValue)> {
        let complexity = self.control_flow + self.returns + self.yields + self.handlers;
        let decorator_count = self.decorators.values().sum();
        vec![
            (Feature::ControlFlow, FeatureValue::Count(self.control_flow)),
            (Feature::Returns, FeatureValue::Count(self.returns)),
            (Feature::Yields, FeatureValue::Count(self.yields)),
            (Feature::ExceptionHandlers, FeatureValue::Count(self.handlers)),
            (Feature::Complexity, FeatureValue::Count(complexity)),
            (Feature::HandlerTypes, FeatureValue::Tally(self.handler_types)),
            (Feature::Lambdas, FeatureValue::Count(self.lambdas)),
            (Feature::Comprehensions, FeatureValue::Count(self.comprehensions)),
            (
                Feature::FunctionalMarkers,
                FeatureValue::Count(self.lambdas + self.comprehensions),
            ),
            (Feature::TypeAnnotations, FeatureValue::Flag(self.annotated)),
            (Feature::Decorators, FeatureValue::Count(decorator_count)),
            (Feature::DecoratorNames, FeatureValue::Tally(self.decorators)),
            (Feature::DefaultParameters, FeatureValue::Count(self.default_parameters)),
            (Feature::StarredExpressions, FeatureValue::Count(self.starred)),
            (Feature::Slices, FeatureValue::Count(self.slices)),
            (Feature::NestedClasses, FeatureValue::Count(self.nested_classes)),
            (Feature::NestedFunctions, FeatureValue::Count(self.nested_functions)),
            (Feature::StringLiterals, FeatureValue::Count(self.strings)),
            (Feature::NumericLiterals, FeatureValue::Count(self.numbers)),
            (Feature::BooleanLiterals, FeatureValue::Count(self.booleans)),
            (Feature::NoneLiterals, FeatureValue::Count(self.nones)),
            (Feature::Assertions, FeatureValue::Count(self.assertions)),
            (Feature::ScopeDeclarations, FeatureValue::Count(self.scope_declarations)),
            (Feature::Async, FeatureValue::Flag(self.is_async)),
            (Feature::Imports, FeatureValue::Tally(self.imports)),
            (Feature::Signature, FeatureValue::Text(self.signature)),
            (Feature::BaseClasses, FeatureValue::Text(self.bases)),
        ]
    }
}

/// Compute the feature snapshot of `node`.
pub fn extract(unit: &SourceUnit, node: &StructuralNode) -> FeatureSnapshot {
    let mut facts = ScopeFacts::default();
    let walker = Walker { unit };
    let root = unit.tree.root_node();

    match node.kind {
        NodeKind::Module => walker.visit_scope(root, &mut facts),
        NodeKind::Function | NodeKind::Class => {
            let def = locate(root, node);
            debug_assert!(def.is_some(), "no definition for `{}` in {}", node.key, unit.file_path);
            match def {
                Some(def) if node.kind == NodeKind::Function => walker.function(def, &mut facts),
                Some(def) => walker.class(def, &mut facts),
                None => tracing::error!(
                    file = %unit.file_path,
                    key = %node.key,
                    "definition not found in syntax tree"
                ),
            }
        }
    }

    let mut snapshot = FeatureSnapshot::new(VOCABULARY);
    for (feature, value) in facts.into_values() {
        let stored = snapshot.set(feature, value);
        debug_assert!(stored.is_ok(), "{:?}", stored);
        if let Err(e) = stored {
            tracing::error!(key = %node.key, "{}", e);
        }
    }
    snapshot
}

/// Find the definition node a structural node was built from.
fn locate<'tree>(root: Node<'tree>, node: &StructuralNode) -> Option<Node<'tree>> {
    let expected = match node.kind {
        NodeKind::Function => "function_definition",
        NodeKind::Class => "class_definition",
        NodeKind::Module => return Some(root),
    };
    let mut current = root.descendant_for_byte_range(node.span.start_byte, node.span.end_byte);
    while let Some(n) = current {
        if n.kind() == expected
            && n.start_byte() == node.span.start_byte
            && n.end_byte() == node.span.end_byte
        {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

struct Walker<'u> {
    unit: &'u SourceUnit,
}

impl Walker<'_> {
    /// Token-level rendering of `node`. Whitespace, line breaks, comments and
    /// trailing commas in the source never change the result.
    fn text(&self, node: Node) -> String {
        let mut out = String::new();
        self.render(node, &mut out);
        out.truncate(out.trim_end().len());
        out
    }

    fn render(&self, node: Node, out: &mut String) {
        if matches!(node.kind(), "comment" | "line_continuation") {
            return;
        }
        if node.child_count() == 0 || node.kind() == "string" {
            let parent = node.parent().map(|p| p.kind());
            push_token(out, self.unit.node_text(node), node.is_named(), parent);
            return;
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for (i, child) in children.iter().enumerate() {
            let closes = children
                .get(i + 1)
                .map_or(true, |next| matches!(next.kind(), ")" | "]" | "}"));
            let trailing_comma = child.kind() == ","
                && closes
                && !matches!(node.kind(), "tuple" | "tuple_pattern");
            if !trailing_comma {
                self.render(*child, out);
            }
        }
    }

    fn function(&self, def: Node, facts: &mut ScopeFacts) {
        facts.is_async = has_token(def, "async");
        self.decorators(def, facts);

        let mut signature = String::from("(");
        if let Some(params) = def.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            let parts: Vec<String> = params
                .named_children(&mut cursor)
                .filter(|p| p.kind() != "comment")
                .map(|p| {
                    match p.kind() {
                        "default_parameter" => facts.default_parameters += 1,
                        "typed_default_parameter" => {
                            facts.default_parameters += 1;
                            facts.annotated = true;
                        }
                        "typed_parameter" => facts.annotated = true,
                        _ => {}
                    }
                    self.text(p)
                })
                .collect();
            signature.push_str(&parts.join(", "));
            self.visit_children(params, facts);
        }
        signature.push(')');

        if let Some(ret) = def.child_by_field_name("return_type") {
            facts.annotated = true;
            signature.push_str(" -> ");
            signature.push_str(&self.text(ret));
        }
        facts.signature = signature;

        if let Some(body) = def.child_by_field_name("body") {
            self.visit_scope(body, facts);
        }
    }

    fn class(&self, def: Node, facts: &mut ScopeFacts) {
        self.decorators(def, facts);

        if let Some(bases) = def.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            let parts: Vec<String> = bases
                .named_children(&mut cursor)
                .filter(|b| b.kind() != "comment")
                .map(|b| self.text(b))
                .collect();
            facts.bases = parts.join(", ");
            self.visit_children(bases, facts);
        }

        if let Some(body) = def.child_by_field_name("body") {
            self.visit_scope(body, facts);
        }
    }

    fn decorators(&self, def: Node, facts: &mut ScopeFacts) {
        let Some(parent) = def.parent().filter(|p| p.kind() == "decorated_definition") else {
            return;
        };
        let mut cursor = parent.walk();
        for decorator in parent
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
        {
            let Some(expr) = decorator.named_child(0) else {
                continue;
            };
            let callee = if expr.kind() == "call" {
                expr.child_by_field_name("function").unwrap_or(expr)
            } else {
                expr
            };
            *facts.decorators.entry(self.text(callee)).or_insert(0) += 1;
        }
    }

    /// Walk a block or module, skipping its docstring.
    fn visit_scope(&self, container: Node, facts: &mut ScopeFacts) {
        let doc = docstring(container).map(|d| d.id());
        let mut cursor = container.walk();
        let children: Vec<Node> = container.named_children(&mut cursor).collect();
        for child in children {
            if Some(child.id()) != doc {
                self.visit(child, facts);
            }
        }
    }

    fn visit_children(&self, node: Node, facts: &mut ScopeFacts) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, facts);
        }
    }

    fn visit(&self, node: Node, facts: &mut ScopeFacts) {
        match node.kind() {
            "function_definition" => {
                facts.nested_functions += 1;
                return;
            }
            "class_definition" => {
                facts.nested_classes += 1;
                return;
            }
            "decorated_definition" => {
                match node.child_by_field_name("definition").map(|d| d.kind()) {
                    Some("function_definition") => facts.nested_functions += 1,
                    Some("class_definition") => facts.nested_classes += 1,
                    _ => {}
                }
                return;
            }
            "type" | "comment" => return,
            _ => {}
        }
        self.count(node, facts);
        self.visit_children(node, facts);
    }

    fn count(&self, node: Node, facts: &mut ScopeFacts) {
        match node.kind() {
            "if_statement" | "elif_clause" | "for_statement" | "while_statement"
            | "try_statement" | "with_statement" | "match_statement" => facts.control_flow += 1,
            "return_statement" => facts.returns += 1,
            "yield" => facts.yields += 1,
            "except_clause" | "except_group_clause" => {
                facts.handlers += 1;
                for name in self.caught_types(node) {
                    *facts.handler_types.entry(name).or_insert(0) += 1;
                }
            }
            "lambda" => facts.lambdas += 1,
            "list_comprehension" | "dictionary_comprehension" | "set_comprehension"
            | "generator_expression" => facts.comprehensions += 1,
            "list_splat" | "dictionary_splat" | "list_splat_pattern"
            | "dictionary_splat_pattern" => facts.starred += 1,
            "slice" => facts.slices += 1,
            "string" => facts.strings += 1,
            "integer" | "float" => facts.numbers += 1,
            "true" | "false" => facts.booleans += 1,
            "none" => facts.nones += 1,
            "assert_statement" => facts.assertions += 1,
            "global_statement" | "nonlocal_statement" => facts.scope_declarations += 1,
            "assignment" => {
                if node.child_by_field_name("type").is_some() {
                    facts.annotated = true;
                }
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                for module in self.imported_modules(node) {
                    if TYPING_MODULES
                        .iter()
                        .any(|t| module == *t || module.starts_with(&format!("{}.", t)))
                    {
                        facts.annotated = true;
                    }
                    *facts.imports.entry(module).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    /// Exception type names caught by an except clause.
    fn caught_types(&self, clause: Node) -> Vec<String> {
        let mut cursor = clause.walk();
        let first = clause
            .named_children(&mut cursor)
            .find(|c| !matches!(c.kind(), "block" | "comment"));

        let Some(mut expr) = first else {
            return vec![BARE_EXCEPT.to_string()];
        };
        if expr.kind() == "as_pattern" {
            expr = expr.named_child(0).unwrap_or(expr);
        }
        while expr.kind() == "parenthesized_expression" {
            match expr.named_child(0) {
                Some(inner) => expr = inner,
                None => break,
            }
        }

        if expr.kind() == "tuple" {
            let mut cursor = expr.walk();
            let names: Vec<String> = expr
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .map(|c| self.text(c))
                .collect();
            names
        } else {
            vec![self.text(expr)]
        }
    }

    fn imported_modules(&self, stmt: Node) -> Vec<String> {
        match stmt.kind() {
            "import_statement" => {
                let mut cursor = stmt.walk();
                let modules: Vec<String> = stmt
                    .named_children(&mut cursor)
                    .filter_map(|c| match c.kind() {
                        "dotted_name" => Some(self.text(c)),
                        "aliased_import" => c.child_by_field_name("name").map(|n| self.text(n)),
                        _ => None,
                    })
                    .collect();
                modules
            }
            "import_from_statement" => stmt
                .child_by_field_name("module_name")
                .map(|m| vec![self.text(m)])
                .unwrap_or_default(),
            "future_import_statement" => vec!["__future__".to_string()],
            _ => Vec::new(),
        }
    }
}

/// The docstring statement of a block or module, if its first statement is
/// a bare string.
fn docstring(container: Node) -> Option<Node> {
    let mut cursor = container.walk();
    let first = container
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    match first.named_child(0) {
        Some(s) if s.kind() == "string" => Some(first),
        _ => None,
    }
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

/// Expressions whose anonymous tokens are infix operators.
const OPERATOR_PARENTS: &[&str] = &[
    "binary_operator",
    "comparison_operator",
    "boolean_operator",
    "conditional_expression",
];

/// Append one source token with canonical spacing: one space between words,
/// around `->`, infix operators and annotated defaults, and after `,` and
/// non-slice `:`.
fn push_token(out: &mut String, token: &str, named: bool, parent: Option<&str>) {
    let operator = !named
        && (token == "->"
            || (token == "=" && parent == Some("typed_default_parameter"))
            || parent.is_some_and(|p| OPERATOR_PARENTS.contains(&p)));
    let word = |c: char| c.is_alphanumeric() || c == '_';
    let joins_words =
        out.chars().last().is_some_and(word) && token.chars().next().is_some_and(word);

    if matches!(token, ")" | "]" | "}") && out.ends_with(' ') {
        out.pop();
    }
    if (operator || joins_words) && !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
    out.push_str(token);
    if !named && (operator || token == "," || (token == ":" && parent != Some("slice"))) {
        out.push(' ');
    }
}
