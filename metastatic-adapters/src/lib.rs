//! Language adapters bridging native syntax trees and the MetaAST.
//!
//! An adapter is the bidirectional bridge for one language. It exposes four
//! operations: `parse` (source to native tree), `to_meta` (abstraction of a
//! native tree into MetaAST), `from_meta` (reification of MetaAST back into a
//! native tree), and `unparse` (native tree to source). Abstraction is total
//! on well-formed native trees: constructs with no MetaAST counterpart fall
//! through to the native escape hatch. Reification fails on escape hatches
//! tagged for a different language.
//!
//! The [`AdapterRegistry`] maps language tags and file extensions to
//! adapters; the [`SupplementalRegistry`] hosts pluggable transformers for
//! constructs outside the core grammar.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

use metastatic_ast::Document;
use metastatic_ast::DocumentMetadata;
use metastatic_ast::Error;
use metastatic_ast::Language;
use metastatic_ast::MetaNode;

pub mod elixir;
pub mod erlang;
pub mod haskell;
pub mod python;
mod registry;
pub mod ruby;
mod supplemental;

pub use registry::*;
pub use supplemental::*;

/// A native (M1) syntax tree produced by one of the language parsers.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeAst {
    /// A Python module.
    Python(python::Ast),
    /// An Elixir expression sequence.
    Elixir(elixir::Ast),
    /// An Erlang expression sequence.
    Erlang(erlang::Ast),
    /// A Ruby program.
    Ruby(ruby::Ast),
    /// A Haskell declaration sequence.
    Haskell(haskell::Ast),
}

impl NativeAst {
    /// Gets the language that owns the tree.
    pub fn language(&self) -> Language {
        match self {
            Self::Python(_) => Language::Python,
            Self::Elixir(_) => Language::Elixir,
            Self::Erlang(_) => Language::Erlang,
            Self::Ruby(_) => Language::Ruby,
            Self::Haskell(_) => Language::Haskell,
        }
    }
}

/// The bidirectional bridge for one language.
///
/// Implementations are stateless and cheap to share; the registry stores
/// them behind [`std::sync::Arc`].
pub trait Adapter: Send + Sync + std::fmt::Debug {
    /// Gets the language the adapter bridges.
    fn language(&self) -> Language;

    /// Gets the file extensions the adapter registers for detection.
    fn file_extensions(&self) -> &'static [&'static str] {
        self.language().extensions()
    }

    /// Parses source into a native tree.
    ///
    /// Returns [`Error::Parse`] with a line/column-carrying diagnostic when
    /// the source is syntactically invalid.
    fn parse(&self, source: &str) -> Result<NativeAst, Error>;

    /// Abstracts a native tree into MetaAST with file-level metadata.
    ///
    /// Abstraction never fails structurally: fragments without a MetaAST
    /// counterpart become [`MetaNode::LanguageSpecific`] nodes.
    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error>;

    /// Reifies a MetaAST into a native tree.
    ///
    /// Fails with [`Error::Reify`] on an escape hatch tagged for a different
    /// language, or on a construct with no rendering in this language.
    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error>;

    /// Pretty-prints a native tree to source.
    fn unparse(&self, native: &NativeAst) -> Result<String, Error>;
}

/// Parses source in the given language and abstracts it into a document.
pub fn quote_with(
    registry: &AdapterRegistry,
    source: &str,
    language: Language,
) -> Result<Document, Error> {
    let adapter = registry
        .get(language)
        .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))?;

    tracing::debug!(%language, "quoting source");
    let native = adapter.parse(source)?;
    let (ast, metadata) = adapter.to_meta(&native)?;

    Ok(Document::with_source(ast, language, source).with_metadata(metadata))
}

/// Reifies a MetaAST into the given language and unparses it to source.
pub fn unquote_with(
    registry: &AdapterRegistry,
    node: &MetaNode,
    language: Language,
) -> Result<String, Error> {
    let adapter = registry
        .get(language)
        .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))?;

    tracing::debug!(%language, "unquoting tree");
    let native = adapter.from_meta(node)?;
    adapter.unparse(&native)
}

/// Builds the reification error for an escape hatch owned by another
/// language.
pub(crate) fn foreign_fragment_error(owner: Language, target: Language) -> Error {
    Error::reify(format!(
        "native {owner} fragment cannot be reified into {target}"
    ))
}
