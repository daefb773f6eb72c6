//! Semantic enrichment and analyses over the MetaAST.
//!
//! Analyses are written once against the language-neutral tree and apply to
//! every supported source language. Each analysis is a disciplined walk with
//! an explicit context threaded through it; analyses never fail on
//! well-formed trees, producing results with empty findings or lowered
//! confidence instead.
//!
//! The [`SemanticRegistry`] classifies function calls by *what* they do
//! (database access, HTTP traffic, queue interaction) before analysis, so
//! the analyses reason about operations rather than library spellings.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

mod complexity;
mod patterns;
mod purity;
mod state;
mod taint;

pub use complexity::*;
pub use patterns::*;
pub use purity::*;
pub use state::*;
pub use taint::*;

use metastatic_ast::Document;
use serde::Serialize;

/// The analyses the crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisKind {
    /// Effect and purity classification.
    Purity,
    /// Cyclomatic, cognitive, and Halstead complexity.
    Complexity,
    /// Source-to-sink taint flow detection.
    Taint,
    /// State-management classification.
    StateManagement,
}

/// The result of running one analysis over a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisReport {
    /// A purity analysis result.
    Purity(PurityResult),
    /// A complexity analysis result.
    Complexity(ComplexityResult),
    /// A taint analysis result.
    Taint(TaintResult),
    /// A state-management analysis result.
    StateManagement(StateResult),
}

/// A named analysis over documents.
///
/// Analyzers are read-only: any number may run over the same document
/// concurrently, and each produces the same deterministic result.
pub trait Analyzer: Send + Sync {
    /// Gets the analyzer's name.
    fn name(&self) -> &'static str;

    /// Analyzes a document.
    fn analyze(&self, document: &Document) -> AnalysisReport;
}

/// Runs the given analysis over a document.
pub fn analyze(document: &Document, kind: AnalysisKind) -> AnalysisReport {
    tracing::debug!(analysis = %kind, language = %document.language, "running analysis");
    match kind {
        AnalysisKind::Purity => PurityAnalyzer.analyze(document),
        AnalysisKind::Complexity => ComplexityAnalyzer::default().analyze(document),
        AnalysisKind::Taint => TaintAnalyzer.analyze(document),
        AnalysisKind::StateManagement => StateAnalyzer.analyze(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_kinds_parse_from_their_tags() {
        assert_eq!("purity".parse::<AnalysisKind>().unwrap(), AnalysisKind::Purity);
        assert_eq!(
            "state_management".parse::<AnalysisKind>().unwrap(),
            AnalysisKind::StateManagement
        );
        assert!("typecheck".parse::<AnalysisKind>().is_err());
    }
}
