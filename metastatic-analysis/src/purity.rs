//! The purity analysis.

use std::collections::BTreeSet;

use metastatic_ast::Document;
use metastatic_ast::Domain;
use metastatic_ast::Language;
use metastatic_ast::MetaNode;
use metastatic_ast::VisitReason;
use metastatic_ast::Visitor;
use serde::Serialize;

use crate::AnalysisReport;
use crate::Analyzer;

/// A side effect detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Effect {
    Io,
    Nondeterminism,
    Db,
    Network,
    FileSystem,
    Queue,
    ExternalApi,
    Mutation,
    Exceptions,
}

/// How confident the classification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// The result of the purity analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurityResult {
    /// Whether the document is free of detected effects and unknowns.
    pub pure: bool,
    /// The detected effects.
    pub effects: BTreeSet<Effect>,
    /// Calls to local bindings whose effects cannot be determined.
    pub unknown: Vec<String>,
    /// The confidence of the classification.
    pub confidence: Confidence,
}

/// Output and logging call names per language.
///
/// Entries ending in `.` match as name prefixes.
fn io_names(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &["print", "input", "logging.", "sys.stdout.write"],
        Language::Elixir => &["IO.puts", "IO.inspect", "IO.write", "IO.gets", "Logger."],
        Language::Erlang => &["io.format", "io.put_chars", "io.get_line", "logger."],
        Language::Ruby => &["puts", "print", "p", "gets", "pp"],
        Language::Haskell => &["putStrLn", "putStr", "print", "getLine"],
    }
}

/// Randomness and clock call names per language.
fn nondeterminism_names(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &["random.", "time.", "datetime.", "uuid."],
        Language::Elixir => &[
            "Enum.random",
            "DateTime.utc_now",
            "System.monotonic_time",
            "System.os_time",
        ],
        Language::Erlang => &["rand.", "os.timestamp", "erlang.now", "calendar."],
        Language::Ruby => &["rand", "Random.rand", "Time.now", "SecureRandom."],
        Language::Haskell => &["randomIO", "randomRIO", "getCurrentTime"],
    }
}

/// Determines whether a name matches a list entry (exact, or prefix for
/// entries ending in `.`).
fn matches_any(name: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| {
        if let Some(prefix) = pattern.strip_suffix('.') {
            name.starts_with(prefix)
                && name[prefix.len()..].starts_with('.')
        } else {
            name == *pattern
        }
    })
}

/// The walker context for purity detection.
struct PurityVisitor {
    /// The document's source language.
    language: Language,
    /// Every name bound anywhere in the document.
    bindings: BTreeSet<String>,
    /// The current loop nesting depth.
    loop_depth: usize,
}

/// The accumulated purity facts.
#[derive(Default)]
struct PurityState {
    /// The detected effects.
    effects: BTreeSet<Effect>,
    /// Calls to local bindings.
    unknown: Vec<String>,
}

impl Visitor for PurityVisitor {
    type State = PurityState;

    fn function_call(&mut self, state: &mut PurityState, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        let MetaNode::FunctionCall { name, .. } = node else {
            return;
        };

        if matches_any(name, io_names(self.language)) {
            state.effects.insert(Effect::Io);
            return;
        }

        if matches_any(name, nondeterminism_names(self.language)) {
            state.effects.insert(Effect::Nondeterminism);
            return;
        }

        if let Some(op_kind) = node.metadata().op_kind() {
            let effect = match op_kind.domain {
                Domain::Db => Some(Effect::Db),
                Domain::Http => Some(Effect::Network),
                Domain::File => Some(Effect::FileSystem),
                Domain::Queue => Some(Effect::Queue),
                Domain::ExternalApi => Some(Effect::ExternalApi),
                Domain::Auth | Domain::Cache => None,
            };
            if let Some(effect) = effect {
                state.effects.insert(effect);
                return;
            }
        }

        // A call through a local binding could do anything.
        if !name.contains('.') && self.bindings.contains(name) {
            state.unknown.push(name.clone());
        }
    }

    fn loop_statement(&mut self, _: &mut PurityState, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => self.loop_depth += 1,
            VisitReason::Exit => self.loop_depth -= 1,
        }
    }

    fn assignment(&mut self, state: &mut PurityState, reason: VisitReason, _: &MetaNode) {
        if reason == VisitReason::Enter && self.loop_depth > 0 {
            state.effects.insert(Effect::Mutation);
        }
    }

    fn exception_handling(&mut self, state: &mut PurityState, reason: VisitReason, _: &MetaNode) {
        if reason == VisitReason::Enter {
            state.effects.insert(Effect::Exceptions);
        }
    }
}

/// The purity analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurityAnalyzer;

impl Analyzer for PurityAnalyzer {
    fn name(&self) -> &'static str {
        "purity"
    }

    fn analyze(&self, document: &Document) -> AnalysisReport {
        let mut visitor = PurityVisitor {
            language: document.language,
            bindings: document.ast.variables(),
            loop_depth: 0,
        };

        let mut state = PurityState::default();
        document.visit(&mut visitor, &mut state);

        let pure = state.effects.is_empty() && state.unknown.is_empty();
        let confidence = if pure || !state.effects.is_empty() {
            Confidence::High
        } else {
            Confidence::Medium
        };

        AnalysisReport::Purity(PurityResult {
            pure,
            effects: state.effects,
            unknown: state.unknown,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use metastatic_ast::OpKind;
    use metastatic_ast::Operation;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Runs the analyzer and unwraps the purity result.
    fn run(document: &Document) -> PurityResult {
        match PurityAnalyzer.analyze(document) {
            AnalysisReport::Purity(result) => result,
            other => panic!("expected a purity report, got {other:?}"),
        }
    }

    #[test]
    fn printing_is_an_io_effect() {
        let document = Document::new(
            MetaNode::call("print", vec![MetaNode::string("hi")]),
            Language::Python,
        );

        let result = run(&document);
        assert!(!result.pure);
        assert_eq!(result.effects.iter().collect::<Vec<_>>(), [&Effect::Io]);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn arithmetic_is_pure() {
        let document = Document::new(
            MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5)),
            Language::Python,
        );

        let result = run(&document);
        assert!(result.pure);
        assert!(result.effects.is_empty());
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn classified_calls_map_to_their_domain_effects() {
        let mut call = MetaNode::call("fetch_user", vec![MetaNode::integer(1)]);
        call.metadata_mut().set_op_kind(OpKind::new(Operation::Db(
            metastatic_ast::DbOperation::Retrieve,
        )));

        let result = run(&Document::new(call, Language::Elixir));
        assert_eq!(result.effects.iter().collect::<Vec<_>>(), [&Effect::Db]);
    }

    #[test]
    fn assignment_inside_a_loop_is_mutation() {
        let body = MetaNode::assignment(
            MetaNode::variable("total"),
            MetaNode::arithmetic("+", MetaNode::variable("total"), MetaNode::integer(1)),
        );
        let document = Document::new(
            MetaNode::while_loop(MetaNode::boolean(true), body),
            Language::Ruby,
        );

        let result = run(&document);
        assert!(result.effects.contains(&Effect::Mutation));
    }

    #[test]
    fn calls_through_bindings_lower_confidence() {
        let document = Document::new(
            MetaNode::block(vec![
                MetaNode::assignment(
                    MetaNode::variable("f"),
                    MetaNode::lambda(vec![MetaNode::variable("x")], MetaNode::variable("x")),
                ),
                MetaNode::call("f", vec![MetaNode::integer(1)]),
            ]),
            Language::Python,
        );

        let result = run(&document);
        assert!(!result.pure);
        assert_eq!(result.unknown, ["f"]);
        assert_eq!(result.confidence, Confidence::Medium);
    }
}
