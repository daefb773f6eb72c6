//! Cross-language static analysis over a language-neutral MetaAST.
//!
//! Source in any supported language (Python, Elixir, Erlang, Ruby, Haskell)
//! is parsed into its native tree, abstracted into the MetaAST, optionally
//! enriched and analyzed, and reified back into any supported target
//! language.
//!
//! # Examples
//!
//! Translating an expression from Python to Elixir:
//!
//! ```rust
//! use metastatic::Language;
//!
//! let translated = metastatic::translate("x + 5", Language::Python, Language::Elixir)
//!     .expect("translation should succeed");
//! assert_eq!(translated, "x + 5");
//! ```
//!
//! Analyzing a document:
//!
//! ```rust
//! use metastatic::AnalysisKind;
//! use metastatic::AnalysisReport;
//! use metastatic::Language;
//!
//! let document = metastatic::quote("print(\"hi\")", Language::Python).unwrap();
//! let report = metastatic::analyze(&document, AnalysisKind::Purity).unwrap();
//! match report {
//!     AnalysisReport::Purity(purity) => assert!(!purity.pure),
//!     _ => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

use std::sync::LazyLock;

pub use metastatic_adapters as adapters;
pub use metastatic_analysis as analysis;
pub use metastatic_ast as ast;

pub use metastatic_adapters::Adapter;
pub use metastatic_adapters::AdapterRegistry;
pub use metastatic_adapters::SupplementalRegistry;
pub use metastatic_analysis::AnalysisKind;
pub use metastatic_analysis::AnalysisReport;
pub use metastatic_analysis::SemanticRegistry;
pub use metastatic_ast::Document;
pub use metastatic_ast::Error;
pub use metastatic_ast::Language;
pub use metastatic_ast::MetaNode;

/// The process-wide adapter registry with the built-in adapters.
static ADAPTERS: LazyLock<AdapterRegistry> = LazyLock::new(AdapterRegistry::with_defaults);

/// The process-wide semantic registry with the built-in pattern tables.
static PATTERNS: LazyLock<SemanticRegistry> = LazyLock::new(SemanticRegistry::with_defaults);

/// Gets the process-wide adapter registry.
pub fn adapter_registry() -> &'static AdapterRegistry {
    &ADAPTERS
}

/// Gets the process-wide semantic pattern registry.
pub fn semantic_registry() -> &'static SemanticRegistry {
    &PATTERNS
}

/// Parses source in the given language and abstracts it into a document.
pub fn quote(source: &str, language: Language) -> Result<Document, Error> {
    metastatic_adapters::quote_with(&ADAPTERS, source, language)
}

/// Reifies a MetaAST into the given language and unparses it to source.
pub fn unquote(node: &MetaNode, language: Language) -> Result<String, Error> {
    metastatic_adapters::unquote_with(&ADAPTERS, node, language)
}

/// Translates source from one language to another through the MetaAST.
pub fn translate(source: &str, from: Language, to: Language) -> Result<String, Error> {
    let document = quote(source, from)?;
    unquote(&document.ast, to)
}

/// Enriches a document with the default pattern tables and runs an
/// analysis.
pub fn analyze(document: &Document, kind: AnalysisKind) -> Result<AnalysisReport, Error> {
    analyze_with(document, kind, &PATTERNS)
}

/// Enriches a document with the given pattern tables and runs an analysis.
pub fn analyze_with(
    document: &Document,
    kind: AnalysisKind,
    registry: &SemanticRegistry,
) -> Result<AnalysisReport, Error> {
    let enriched = metastatic_analysis::enrich(document, registry);
    Ok(metastatic_analysis::analyze(&enriched, kind))
}
