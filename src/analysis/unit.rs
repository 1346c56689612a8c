//! Structural model of one parsed file at one revision.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::{FeatureSnapshot, LanguageAdapter};

/// Key of the module (root) node in every unit.
pub const MODULE_KEY: &str = "<module>";

/// Separator between lexical nesting levels in a qualified key.
pub const KEY_SEPARATOR: char = '.';

/// Source location span with byte offsets and 1-indexed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// End line (1-indexed).
    pub end_line: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}

/// Kind of structural node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Class,
    Function,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic identity of a structural node, derived from lexical nesting.
///
/// Top-level definitions are keyed by their bare name, nested ones by the
/// dot-joined path of enclosing class/function names (`Config.validate`).
/// The module itself is keyed [`MODULE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedKey(String);

impl QualifiedKey {
    pub fn module() -> Self {
        Self(MODULE_KEY.to_string())
    }

    /// Key of a definition named `name` nested directly in `self`.
    pub fn child(&self, name: &str) -> Self {
        if self.is_module() {
            Self(name.to_string())
        } else {
            Self(format!("{}{}{}", self.0, KEY_SEPARATOR, name))
        }
    }

    pub fn is_module(&self) -> bool {
        self.0 == MODULE_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QualifiedKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for QualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A function, class, or module in a parsed unit.
#[derive(Debug)]
pub struct StructuralNode {
    pub key: QualifiedKey,
    pub name: String,
    pub kind: NodeKind,
    /// Span of the definition itself (decorators excluded).
    pub span: Span,
    pub children: Vec<StructuralNode>,
    snapshot: OnceCell<FeatureSnapshot>,
}

impl StructuralNode {
    pub fn new(key: QualifiedKey, name: String, kind: NodeKind, span: Span) -> Self {
        Self {
            key,
            name,
            kind,
            span,
            children: Vec::new(),
            snapshot: OnceCell::new(),
        }
    }
}

/// One parsed file at one revision.
pub struct SourceUnit {
    pub file_path: String,
    pub revision_id: String,
    pub source: String,
    pub tree: tree_sitter::Tree,
    pub root: StructuralNode,
    adapter: &'static dyn LanguageAdapter,
}

impl SourceUnit {
    pub(crate) fn new(
        file_path: String,
        revision_id: String,
        source: String,
        tree: tree_sitter::Tree,
        root: StructuralNode,
        adapter: &'static dyn LanguageAdapter,
    ) -> Self {
        Self {
            file_path,
            revision_id,
            source,
            tree,
            root,
            adapter,
        }
    }

    /// Language identifier of the adapter that produced this unit.
    pub fn language(&self) -> &'static str {
        self.adapter.language_id()
    }

    /// Feature snapshot of `node`, extracted on first access.
    pub fn features<'a>(&self, node: &'a StructuralNode) -> &'a FeatureSnapshot {
        node.snapshot.get_or_init(|| self.adapter.extract(self, node))
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// All structural nodes in pre-order, starting with the module.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![&self.root],
        }
    }

    /// Find a node by qualified key.
    pub fn find(&self, key: &str) -> Option<&StructuralNode> {
        self.nodes().find(|n| n.key.as_str() == key)
    }
}

impl fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceUnit")
            .field("file_path", &self.file_path)
            .field("revision_id", &self.revision_id)
            .field("language", &self.language())
            .field("root", &self.root)
            .finish()
    }
}

/// Pre-order iterator over the structural nodes of a unit.
pub struct Nodes<'a> {
    stack: Vec<&'a StructuralNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a StructuralNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
