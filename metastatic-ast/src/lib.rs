//! The language-neutral MetaAST representation used by Metastatic.
//!
//! A [`MetaNode`] is a tagged, immutable tree abstracted away from any single
//! source language. Language adapters abstract their native syntax trees into
//! MetaAST and reify MetaAST back into native trees; analyses are written once
//! against MetaAST and apply to every supported language.
//!
//! The node grammar is split into three layers:
//!
//! * **Core** ([`Layer::Core`]): universal constructs every adapter
//!   round-trips faithfully, such as literals, variables, operators, calls,
//!   conditionals, blocks, and assignments.
//! * **Extended** ([`Layer::Extended`]): common patterns such as loops,
//!   lambdas, collection operations, pattern matching, and exception
//!   handling.
//! * **Native** ([`Layer::Native`]): the [`MetaNode::LanguageSpecific`]
//!   escape hatch for fragments only one language can represent.
//!
//! # Examples
//!
//! Building and validating a small tree:
//!
//! ```rust
//! use metastatic_ast::Document;
//! use metastatic_ast::Language;
//! use metastatic_ast::MetaNode;
//! use metastatic_ast::ValidationMode;
//! use metastatic_ast::validate;
//!
//! let ast = MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5));
//! let document = Document::new(ast, Language::Python);
//! let meta = validate(&document, ValidationMode::Strict).expect("should validate");
//! assert_eq!(meta.node_count, 3);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

mod diagnostic;
mod document;
mod error;
mod lang;
mod metadata;
mod node;
mod op_kind;
mod validation;
mod visitor;

pub use diagnostic::*;
pub use document::*;
pub use error::*;
pub use lang::*;
pub use metadata::*;
pub use node::*;
pub use op_kind::*;
pub use validation::*;
pub use visitor::*;
