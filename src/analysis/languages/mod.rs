//! Language-specific adapter implementations.

mod python;
mod python_features;

pub use python::PythonAdapter;

use super::LanguageAdapter;
use once_cell::sync::OnceCell;

/// Static storage for Python adapter.
static PYTHON_ADAPTER: OnceCell<PythonAdapter> = OnceCell::new();

fn python() -> &'static dyn LanguageAdapter {
    PYTHON_ADAPTER.get_or_init(PythonAdapter::new)
}

/// Get an adapter for the given file extension (without dot).
///
/// Returns None if no adapter handles the extension.
pub fn get_adapter(ext: &str) -> Option<&'static dyn LanguageAdapter> {
    all_adapters().into_iter().find(|a| a.handles_extension(ext))
}

/// Every registered adapter.
pub fn all_adapters() -> Vec<&'static dyn LanguageAdapter> {
    vec![python()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_extension() {
        assert_eq!(get_adapter("py").map(|a| a.language_id()), Some("python"));
        assert_eq!(get_adapter("pyi").map(|a| a.language_id()), Some("python"));
        assert!(get_adapter("go").is_none());
        assert!(get_adapter("").is_none());
    }
}
