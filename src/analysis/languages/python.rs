//! Python language adapter using tree-sitter.

use std::collections::HashMap;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    Feature, FeatureSnapshot, LanguageAdapter, NodeKind, QualifiedKey, SourceUnit, Span,
    StructuralNode,
};
use crate::error::ParseError;

use super::python_features;

/// Decorated definitions are matched through their inner definition, so no
/// separate pattern is needed for them.
const DEFINITION_QUERY: &str = r#"
(function_definition
  name: (identifier) @func_name
) @function

(class_definition
  name: (identifier) @class_name
) @class
"#;

pub struct PythonAdapter {
    language: Language,
}

/// A definition found by the query, before nesting is resolved.
struct Definition<'tree> {
    node: Node<'tree>,
    name: String,
    kind: NodeKind,
}

impl PythonAdapter {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> Result<Parser, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Grammar {
                language: "python",
                message: e.to_string(),
            })?;
        Ok(parser)
    }

    fn find_definitions<'tree>(
        &self,
        root: Node<'tree>,
        source: &[u8],
    ) -> Result<Vec<Definition<'tree>>, ParseError> {
        let query = Query::new(&self.language, DEFINITION_QUERY).map_err(|e| {
            ParseError::Grammar {
                language: "python",
                message: e.to_string(),
            }
        })?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, source);

        let mut definitions = Vec::new();

        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut kind = NodeKind::Function;
            let mut def_node = None;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "func_name" => {
                        name = capture.node.utf8_text(source).unwrap_or("").to_string();
                        kind = NodeKind::Function;
                    }
                    "class_name" => {
                        name = capture.node.utf8_text(source).unwrap_or("").to_string();
                        kind = NodeKind::Class;
                    }
                    "function" | "class" => def_node = Some(capture.node),
                    _ => {}
                }
            }

            if !name.is_empty() {
                if let Some(node) = def_node {
                    definitions.push(Definition { node, name, kind });
                }
            }
        }

        // Pre-order: every enclosing definition precedes the ones it contains.
        definitions.sort_by_key(|d| (d.node.start_byte(), std::cmp::Reverse(d.node.end_byte())));
        Ok(definitions)
    }

    /// Resolve lexical nesting and build the structural tree.
    fn build_tree(
        &self,
        file_path: &str,
        root: Node,
        definitions: Vec<Definition>,
    ) -> Result<StructuralNode, ParseError> {
        let mut module = StructuralNode::new(
            QualifiedKey::module(),
            module_name(file_path),
            NodeKind::Module,
            Span::from_node(root),
        );

        let index_by_id: HashMap<usize, usize> = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.node.id(), i))
            .collect();

        let mut first_seen: HashMap<QualifiedKey, usize> = HashMap::new();
        let mut flat: Vec<StructuralNode> = Vec::with_capacity(definitions.len());
        let mut parents: Vec<Option<usize>> = Vec::with_capacity(definitions.len());

        for def in &definitions {
            let parent = enclosing_definition(def.node).and_then(|p| index_by_id.get(&p.id()).copied());
            let parent_key = match parent {
                Some(i) => flat[i].key.clone(),
                None => QualifiedKey::module(),
            };
            let key = parent_key.child(&def.name);
            let span = Span::from_node(def.node);

            if let Some(first_line) = first_seen.get(&key) {
                return Err(ParseError::DuplicateKey {
                    path: file_path.to_string(),
                    key: key.to_string(),
                    first_line: *first_line,
                    line: span.start_line,
                });
            }
            first_seen.insert(key.clone(), span.start_line);

            flat.push(StructuralNode::new(key, def.name.clone(), def.kind, span));
            parents.push(parent);
        }

        // Children always sit after their parent, so draining from the back
        // completes each node before it is attached.
        while let Some(mut node) = flat.pop() {
            node.children.reverse();
            match parents.pop().flatten() {
                Some(p) => flat[p].children.push(node),
                None => module.children.push(node),
            }
        }
        module.children.reverse();

        Ok(module)
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn vocabulary(&self) -> &'static [Feature] {
        python_features::VOCABULARY
    }

    fn parse(
        &'static self,
        file_path: &str,
        revision_id: &str,
        source: &str,
    ) -> Result<SourceUnit, ParseError> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| ParseError::Aborted {
                path: file_path.to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root)
                .map(|n| n.start_position())
                .unwrap_or_else(|| root.start_position());
            return Err(ParseError::Syntax {
                path: file_path.to_string(),
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        let definitions = self.find_definitions(root, source.as_bytes())?;
        let module = self.build_tree(file_path, root, definitions)?;

        Ok(SourceUnit::new(
            file_path.to_string(),
            revision_id.to_string(),
            source.to_string(),
            tree,
            module,
            self,
        ))
    }

    fn extract(&self, unit: &SourceUnit, node: &StructuralNode) -> FeatureSnapshot {
        python_features::extract(unit, node)
    }
}

/// Nearest function or class definition lexically enclosing `node`.
fn enclosing_definition(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "function_definition" | "class_definition") {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// First ERROR or MISSING node in document order.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Dotted module name for a file path (`pkg/mod.py` -> `pkg.mod`).
fn module_name(file_path: &str) -> String {
    let without_ext = Path::new(file_path).with_extension("");
    let parts: Vec<&str> = without_ext
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();
    parts.join(".")
}
