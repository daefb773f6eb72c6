//! The document envelope pairing a MetaAST with its source language.

use indexmap::IndexMap;
use serde::Serialize;

use crate::Language;
use crate::MetaNode;
use crate::MetaValue;
use crate::Visitor;
use crate::visit;

/// File-level metadata of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    /// The path the source was read from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The physical line count of the source.
    pub line_count: u32,
    /// The number of comment lines in the source.
    pub comment_count: u32,
    /// Opaquely preserved file-level keys.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, MetaValue>,
}

/// A MetaAST paired with its source language and file-level metadata.
///
/// Documents are immutable values: enrichment and other transformations
/// produce a new document. The `language` records where the document came
/// *from* and scopes diagnostics; reification can target any language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// The abstracted syntax tree.
    pub ast: MetaNode,
    /// The source language the document was abstracted from.
    pub language: Language,
    /// File-level metadata.
    pub metadata: DocumentMetadata,
    /// The complete original source, when retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
}

impl Document {
    /// Creates a document from an abstracted tree.
    pub fn new(ast: MetaNode, language: Language) -> Self {
        Self {
            ast,
            language,
            metadata: DocumentMetadata::default(),
            original_source: None,
        }
    }

    /// Creates a document that retains its original source.
    pub fn with_source(ast: MetaNode, language: Language, source: impl Into<String>) -> Self {
        let source = source.into();
        let metadata = DocumentMetadata {
            line_count: source.lines().count() as u32,
            ..Default::default()
        };

        Self {
            ast,
            language,
            metadata,
            original_source: Some(source),
        }
    }

    /// Sets the document's file-level metadata, builder style.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Visits the document's tree with the given visitor and state.
    ///
    /// The visitor receives an enter and exit call for the document itself
    /// around the canonical depth-first walk of the tree.
    pub fn visit<V: Visitor>(&self, visitor: &mut V, state: &mut V::State) {
        visitor.document(state, crate::VisitReason::Enter, self);
        visit(&self.ast, visitor, state);
        visitor.document(state, crate::VisitReason::Exit, self);
    }
}
