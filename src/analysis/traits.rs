//! Core traits for language adapters.

use crate::error::ParseError;

use super::{Feature, FeatureSnapshot, SourceUnit, StructuralNode};

/// Language-specific parser adapter and feature extractor.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create parsers per
/// call. Adapters themselves are stateless and shared as `&'static`.
pub trait LanguageAdapter: Send + Sync {
    /// Returns the language identifier (e.g., "python").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this adapter handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Features this adapter's extractor computes.
    fn vocabulary(&self) -> &'static [Feature];

    /// Parse source text into a structural unit.
    ///
    /// Fails on any syntax error; there is no best-effort partial parse.
    fn parse(
        &'static self,
        file_path: &str,
        revision_id: &str,
        source: &str,
    ) -> Result<SourceUnit, ParseError>;

    /// Compute the feature snapshot of one node of `unit`.
    ///
    /// Total: every node yields a snapshot over [`Self::vocabulary`].
    fn extract(&self, unit: &SourceUnit, node: &StructuralNode) -> FeatureSnapshot;

    /// Check if this adapter handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
