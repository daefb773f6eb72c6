//! Error kinds surfaced by the core pipeline.

use crate::Diagnostic;
use crate::Language;

/// An error returned by a core operation.
///
/// Errors are always values; the core never uses panics as control flow. A
/// failing abstraction falls back to [`MetaNode::LanguageSpecific`] instead of
/// erroring in standard mode, while a failing reification always propagates.
///
/// [`MetaNode::LanguageSpecific`]: crate::MetaNode::LanguageSpecific
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source was syntactically invalid.
    ///
    /// The diagnostic carries the span and line/column of the failure.
    #[error("parse error: {0}")]
    Parse(Diagnostic),

    /// A native syntax node has no known abstraction and the native escape
    /// hatch was disallowed by the validation mode.
    #[error("unsupported construct `{construct}` for {language}")]
    UnsupportedConstruct {
        /// The name of the unsupported construct.
        construct: String,
        /// The language that produced the construct.
        language: Language,
    },

    /// A MetaAST could not be reified into the target language.
    #[error("cannot reify: {message}")]
    Reify {
        /// A description of the reification failure.
        message: String,
    },

    /// The given language tag is not supported.
    #[error("unsupported language `{0}`")]
    UnsupportedLanguage(String),

    /// A MetaAST failed structural conformance.
    #[error("validation error at `{path}`: {message}")]
    Validation {
        /// The path of the offending node from the root.
        path: String,
        /// A description of the conformance failure.
        message: String,
    },

    /// A supplemental registration clashed with an existing one.
    #[error(
        "supplemental conflict: construct `{construct}` for {language} is already claimed by \
         `{existing}` (rejected registration from `{incoming}`)"
    )]
    Conflict {
        /// The contested construct name.
        construct: String,
        /// The target language of both supplementals.
        language: Language,
        /// The name of the supplemental already registered.
        existing: String,
        /// The name of the supplemental whose registration was rejected.
        incoming: String,
    },

    /// A traversal was cooperatively cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error from an external collaborator.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a reification error with the given message.
    pub fn reify(message: impl Into<String>) -> Self {
        Self::Reify {
            message: message.into(),
        }
    }
}
