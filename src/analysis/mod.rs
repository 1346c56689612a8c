//! Parsing and feature extraction.
//!
//! Source text is parsed by a language adapter into a [`SourceUnit`]: a tree
//! of modules, classes and functions, each identified by a [`QualifiedKey`]
//! derived from lexical nesting. Feature snapshots are extracted lazily per
//! node and cached on the node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ Source text │────▶│ LanguageAdapter │────▶│ SourceUnit       │
//! └─────────────┘     │ (tree-sitter)   │     │ (StructuralNode) │
//!                     └─────────────────┘     └──────────────────┘
//!                                                      │
//!                                                      ▼
//!                     ┌─────────────────┐     ┌──────────────────┐
//!                     │ Classifier      │◀────│ match_units      │
//!                     │ catalog         │     │ (MatchedPair)    │
//!                     └─────────────────┘     └──────────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Implement the `LanguageAdapter` trait, publishing the features it computes
//! 3. Register the adapter in `languages/mod.rs`
//!
//! See `languages/python.rs` for a reference implementation.

mod features;
mod languages;
mod matcher;
mod traits;
mod unit;

pub use features::{Feature, FeatureKind, FeatureSnapshot, FeatureValue, VOCABULARY_VERSION};
pub use languages::{all_adapters, get_adapter, PythonAdapter};
pub use matcher::{match_units, pair_by_key, MatchedPair};
pub use traits::LanguageAdapter;
pub use unit::{
    NodeKind, Nodes, QualifiedKey, SourceUnit, Span, StructuralNode, KEY_SEPARATOR, MODULE_KEY,
};
