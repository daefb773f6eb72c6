//! The process-wide adapter registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use metastatic_ast::Language;
use parking_lot::RwLock;

use crate::Adapter;

/// The interior, lock-guarded state of a registry.
#[derive(Debug, Default)]
struct Inner {
    /// Registered adapters keyed by language, in registration order.
    adapters: IndexMap<Language, Arc<dyn Adapter>>,
    /// File extension (lowercase, without dot) to language index.
    extensions: HashMap<String, Language>,
}

/// A keyed store of language adapters.
///
/// Reads take a shared lock and never block each other; writes are rare and
/// serialized. After a successful registration, lookups from any thread
/// observe the new adapter.
///
/// Registries are ordinary values: tests instantiate isolated ones rather
/// than sharing a hidden global.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    /// The lock-guarded registry state.
    inner: RwLock<Inner>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all built-in adapters registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(crate::python::PythonAdapter));
        registry.register(Arc::new(crate::elixir::ElixirAdapter));
        registry.register(Arc::new(crate::erlang::ErlangAdapter));
        registry.register(Arc::new(crate::ruby::RubyAdapter));
        registry.register(Arc::new(crate::haskell::HaskellAdapter));
        registry
    }

    /// Registers an adapter, replacing any previous adapter for the same
    /// language and re-indexing its file extensions.
    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        let mut inner = self.inner.write();
        let language = adapter.language();

        // Drop extension entries of a replaced adapter.
        inner.extensions.retain(|_, lang| *lang != language);
        for ext in adapter.file_extensions() {
            inner.extensions.insert(ext.to_ascii_lowercase(), language);
        }

        inner.adapters.insert(language, adapter);
        tracing::debug!(%language, "registered adapter");
    }

    /// Unregisters the adapter for a language, removing its extension index
    /// entries.
    ///
    /// Returns the adapter that was removed, if one was registered.
    pub fn unregister(&self, language: Language) -> Option<Arc<dyn Adapter>> {
        let mut inner = self.inner.write();
        inner.extensions.retain(|_, lang| *lang != language);
        inner.adapters.shift_remove(&language)
    }

    /// Gets the adapter for a language.
    pub fn get(&self, language: Language) -> Option<Arc<dyn Adapter>> {
        self.inner.read().adapters.get(&language).cloned()
    }

    /// Determines whether a language has a registered adapter.
    pub fn supports(&self, language: Language) -> bool {
        self.inner.read().adapters.contains_key(&language)
    }

    /// Gets the registered languages in registration order.
    pub fn languages(&self) -> Vec<Language> {
        self.inner.read().adapters.keys().copied().collect()
    }

    /// Detects the language of a file from its extension.
    ///
    /// The lookup is case-insensitive and consults only extensions of
    /// currently registered adapters.
    pub fn detect_language(&self, path: impl AsRef<Path>) -> Option<Language> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        self.inner.read().extensions.get(&ext).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_observable_and_reversible() {
        let registry = AdapterRegistry::new();
        assert!(registry.get(Language::Python).is_none());
        assert_eq!(registry.detect_language("script.py"), None);

        registry.register(Arc::new(crate::python::PythonAdapter));
        let adapter = registry.get(Language::Python).expect("adapter registered");
        assert_eq!(adapter.language(), Language::Python);
        assert_eq!(registry.detect_language("script.py"), Some(Language::Python));
        assert_eq!(registry.detect_language("SCRIPT.PY"), Some(Language::Python));

        registry.unregister(Language::Python);
        assert!(registry.get(Language::Python).is_none());
        assert_eq!(registry.detect_language("script.py"), None);
    }

    #[test]
    fn defaults_cover_every_language_and_extension() {
        let registry = AdapterRegistry::with_defaults();
        for language in Language::all() {
            assert!(registry.supports(*language), "{language} not registered");
            for ext in language.extensions() {
                assert_eq!(
                    registry.detect_language(format!("file.{ext}")),
                    Some(*language)
                );
            }
        }

        assert_eq!(registry.detect_language("file.xyz"), None);
    }
}
