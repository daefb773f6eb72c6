//! Pluggable transformers for constructs outside the core grammar.
//!
//! A supplemental claims one or more named constructs for one target
//! language (actor primitives, say) and renders matching MetaAST nodes into
//! native trees. At most one supplemental may claim a given
//! `(language, construct)` pair; conflicting registrations are rejected with
//! an error naming both modules.

use std::sync::Arc;

use indexmap::IndexMap;
use metastatic_ast::Document;
use metastatic_ast::Error;
use metastatic_ast::Language;
use metastatic_ast::Metadata;
use metastatic_ast::MetaNode;
use parking_lot::RwLock;

use crate::NativeAst;

/// Descriptive information about a supplemental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalInfo {
    /// The unique name of the supplemental module.
    pub name: String,
    /// The target language the supplemental renders into.
    pub language: Language,
    /// The construct names the supplemental claims.
    pub constructs: Vec<String>,
    /// External packages the rendered code requires.
    pub required_packages: Vec<String>,
    /// A short human-readable description.
    pub description: String,
}

/// A pluggable transformer for one language's non-core constructs.
pub trait Supplemental: Send + Sync + std::fmt::Debug {
    /// Gets the supplemental's descriptive information.
    fn info(&self) -> SupplementalInfo;

    /// Attempts to render a node into a native tree for the target
    /// language.
    ///
    /// Returns `None` when the node is not one of the supplemental's
    /// constructs.
    fn transform(
        &self,
        node: &MetaNode,
        target: Language,
        metadata: &Metadata,
    ) -> Option<NativeAst>;
}

/// A registry of supplementals indexed by `(language, construct)`.
///
/// Same locking discipline as the adapter registry: concurrent reads,
/// serialized writes, conflict detection under the write lock.
#[derive(Debug, Default)]
pub struct SupplementalRegistry {
    /// The lock-guarded `(language, construct)` index.
    index: RwLock<IndexMap<(Language, String), Arc<dyn Supplemental>>>,
}

impl SupplementalRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a supplemental for every construct it claims.
    ///
    /// Fails with [`Error::Conflict`] when another supplemental already
    /// claims one of the constructs for the same language; no partial
    /// registration is left behind.
    pub fn register(&self, supplemental: Arc<dyn Supplemental>) -> Result<(), Error> {
        let info = supplemental.info();
        let mut index = self.index.write();

        for construct in &info.constructs {
            let key = (info.language, construct.clone());
            if let Some(existing) = index.get(&key) {
                return Err(Error::Conflict {
                    construct: construct.clone(),
                    language: info.language,
                    existing: existing.info().name,
                    incoming: info.name,
                });
            }
        }

        for construct in &info.constructs {
            index.insert((info.language, construct.clone()), supplemental.clone());
        }

        tracing::debug!(name = %info.name, language = %info.language, "registered supplemental");
        Ok(())
    }

    /// Unregisters a supplemental by name, removing all of its index
    /// entries.
    pub fn unregister(&self, name: &str) {
        self.index
            .write()
            .retain(|_, supplemental| supplemental.info().name != name);
    }

    /// Gets the supplemental claiming a construct for a language.
    pub fn get(&self, language: Language, construct: &str) -> Option<Arc<dyn Supplemental>> {
        self.index
            .read()
            .get(&(language, construct.to_string()))
            .cloned()
    }

    /// Gets the sorted construct names covered for a language.
    pub fn available_constructs(&self, language: Language) -> Vec<String> {
        let mut constructs: Vec<String> = self
            .index
            .read()
            .keys()
            .filter(|(lang, _)| *lang == language)
            .map(|(_, construct)| construct.clone())
            .collect();
        constructs.sort();
        constructs
    }

    /// Determines whether every non-core construct in a document can be
    /// rendered into the target language.
    ///
    /// Escape hatches already owned by the target render natively; any
    /// other escape hatch needs a supplemental claiming its hinted
    /// construct.
    pub fn compatible(&self, document: &Document, target: Language) -> bool {
        fn check(
            registry: &SupplementalRegistry,
            node: &MetaNode,
            target: Language,
        ) -> bool {
            if let MetaNode::LanguageSpecific { language, hint, .. } = node {
                if *language != target {
                    let claimed = hint
                        .as_deref()
                        .is_some_and(|hint| registry.get(target, hint).is_some());
                    if !claimed {
                        return false;
                    }
                }
            }

            node.children()
                .into_iter()
                .all(|child| check(registry, child, target))
        }

        check(self, &document.ast, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A supplemental for tests that claims fixed constructs.
    #[derive(Debug)]
    struct Claimer {
        /// The supplemental name reported by `info`.
        name: &'static str,
        /// The constructs claimed by the supplemental.
        constructs: &'static [&'static str],
    }

    impl Supplemental for Claimer {
        fn info(&self) -> SupplementalInfo {
            SupplementalInfo {
                name: self.name.to_string(),
                language: Language::Python,
                constructs: self.constructs.iter().map(|c| c.to_string()).collect(),
                required_packages: Vec::new(),
                description: String::new(),
            }
        }

        fn transform(&self, _: &MetaNode, _: Language, _: &Metadata) -> Option<NativeAst> {
            None
        }
    }

    #[test]
    fn conflicting_registrations_name_both_modules() {
        let registry = SupplementalRegistry::new();
        registry
            .register(Arc::new(Claimer {
                name: "asyncio_actors",
                constructs: &["actor_call", "actor_spawn"],
            }))
            .expect("first registration succeeds");

        let err = registry
            .register(Arc::new(Claimer {
                name: "trio_actors",
                constructs: &["actor_call"],
            }))
            .unwrap_err();

        match err {
            Error::Conflict {
                construct,
                language,
                existing,
                incoming,
            } => {
                assert_eq!(construct, "actor_call");
                assert_eq!(language, Language::Python);
                assert_eq!(existing, "asyncio_actors");
                assert_eq!(incoming, "trio_actors");
            }
            _ => panic!("expected a conflict error"),
        }
    }

    #[test]
    fn compatibility_requires_a_claim_for_foreign_constructs() {
        let registry = SupplementalRegistry::new();
        let ast = MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("x"), MetaNode::integer(1)),
            MetaNode::language_specific(
                Language::Elixir,
                "receive do _ -> :ok end",
                Some("actor_call".to_string()),
            ),
        ]);
        let document = Document::new(ast, Language::Elixir);

        // The owning language always renders its own fragments.
        assert!(registry.compatible(&document, Language::Elixir));

        // Another target needs a supplemental claiming the construct.
        assert!(!registry.compatible(&document, Language::Python));

        registry
            .register(Arc::new(Claimer {
                name: "asyncio_actors",
                constructs: &["actor_call"],
            }))
            .unwrap();
        assert!(registry.compatible(&document, Language::Python));
    }

    #[test]
    fn unregistration_removes_every_index_entry() {
        let registry = SupplementalRegistry::new();
        registry
            .register(Arc::new(Claimer {
                name: "asyncio_actors",
                constructs: &["actor_call", "actor_spawn"],
            }))
            .unwrap();

        assert_eq!(
            registry.available_constructs(Language::Python),
            ["actor_call", "actor_spawn"]
        );

        registry.unregister("asyncio_actors");
        assert!(registry.available_constructs(Language::Python).is_empty());
        assert!(registry.get(Language::Python, "actor_call").is_none());
    }
}
