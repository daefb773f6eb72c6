//! The complexity analysis.

use std::collections::HashSet;

use metastatic_ast::BinaryCategory;
use metastatic_ast::Diagnostic;
use metastatic_ast::Document;
use metastatic_ast::MatchArm;
use metastatic_ast::MetaNode;
use metastatic_ast::VisitReason;
use metastatic_ast::Visitor;
use metastatic_ast::visit;
use serde::Serialize;

use crate::AnalysisReport;
use crate::Analyzer;

/// Warning and error thresholds for the complexity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexityThresholds {
    /// The cyclomatic warning threshold.
    pub cyclomatic_warning: u32,
    /// The cyclomatic error threshold.
    pub cyclomatic_error: u32,
    /// The cognitive warning threshold.
    pub cognitive_warning: u32,
    /// The cognitive error threshold.
    pub cognitive_error: u32,
    /// The nesting warning threshold.
    pub nesting_warning: u32,
    /// The nesting error threshold.
    pub nesting_error: u32,
    /// The logical lines-of-code warning threshold.
    pub logical_loc_warning: u32,
    /// The logical lines-of-code error threshold.
    pub logical_loc_error: u32,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            cyclomatic_warning: 10,
            cyclomatic_error: 20,
            cognitive_warning: 15,
            cognitive_error: 30,
            nesting_warning: 3,
            nesting_error: 5,
            logical_loc_warning: 50,
            logical_loc_error: 100,
        }
    }
}

/// Halstead metrics derived from operator and operand counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Halstead {
    /// The number of distinct operators.
    pub distinct_operators: u32,
    /// The total operator occurrences.
    pub total_operators: u32,
    /// The number of distinct operands.
    pub distinct_operands: u32,
    /// The total operand occurrences.
    pub total_operands: u32,
    /// `n₁ + n₂`.
    pub vocabulary: u32,
    /// `N₁ + N₂`.
    pub length: u32,
    /// `length · log₂(vocabulary)`.
    pub volume: f64,
    /// `(n₁ / 2) · (N₂ / n₂)`.
    pub difficulty: f64,
    /// `volume · difficulty`.
    pub effort: f64,
}

impl Halstead {
    /// Derives the computed quantities from the raw counts.
    fn derive(mut self) -> Self {
        self.vocabulary = self.distinct_operators + self.distinct_operands;
        self.length = self.total_operators + self.total_operands;
        self.volume = if self.vocabulary > 0 {
            f64::from(self.length) * f64::from(self.vocabulary).log2()
        } else {
            0.0
        };
        self.difficulty = if self.distinct_operands > 0 {
            (f64::from(self.distinct_operators) / 2.0)
                * (f64::from(self.total_operands) / f64::from(self.distinct_operands))
        } else {
            0.0
        };
        self.effort = self.volume * self.difficulty;
        self
    }
}

/// Complexity metrics for one function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionComplexity {
    /// The function name, or `<anonymous>`.
    pub name: String,
    /// The function's cyclomatic complexity.
    pub cyclomatic: u32,
    /// The function's cognitive complexity.
    pub cognitive: u32,
    /// The function's maximum nesting depth.
    pub max_nesting: u32,
    /// The function's logical lines of code.
    pub logical_loc: u32,
}

/// The result of the complexity analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityResult {
    /// Cyclomatic complexity: one plus the number of decision points.
    pub cyclomatic: u32,
    /// Nesting-weighted cognitive complexity.
    pub cognitive: u32,
    /// The maximum control-structure nesting depth.
    pub max_nesting: u32,
    /// Halstead metrics.
    pub halstead: Halstead,
    /// The count of statement-producing nodes.
    pub logical_loc: u32,
    /// Per-function metrics.
    pub functions: Vec<FunctionComplexity>,
    /// Threshold warnings.
    pub warnings: Vec<Diagnostic>,
}

impl ComplexityResult {
    /// Merges several results: complexity metrics take the maximum, size
    /// metrics the sum.
    pub fn merge(results: &[ComplexityResult]) -> ComplexityResult {
        let mut merged = ComplexityResult {
            cyclomatic: 0,
            cognitive: 0,
            max_nesting: 0,
            halstead: Halstead::default(),
            logical_loc: 0,
            functions: Vec::new(),
            warnings: Vec::new(),
        };

        for result in results {
            merged.cyclomatic = merged.cyclomatic.max(result.cyclomatic);
            merged.cognitive = merged.cognitive.max(result.cognitive);
            merged.max_nesting = merged.max_nesting.max(result.max_nesting);
            merged.logical_loc += result.logical_loc;
            merged.halstead.distinct_operators += result.halstead.distinct_operators;
            merged.halstead.total_operators += result.halstead.total_operators;
            merged.halstead.distinct_operands += result.halstead.distinct_operands;
            merged.halstead.total_operands += result.halstead.total_operands;
            merged.functions.extend(result.functions.iter().cloned());
            merged.warnings.extend(result.warnings.iter().cloned());
        }

        merged.halstead = merged.halstead.derive();
        merged
    }
}

/// The walker accumulating the raw counts.
#[derive(Default)]
struct Counts {
    /// The number of decision points.
    decision_points: u32,
    /// The accumulated cognitive complexity.
    cognitive: u32,
    /// The current control-structure nesting depth.
    nesting: u32,
    /// The maximum nesting depth observed.
    max_nesting: u32,
    /// The count of statement-producing nodes.
    logical_loc: u32,
    /// Distinct operator spellings.
    operators: HashSet<String>,
    /// Total operator occurrences.
    total_operators: u32,
    /// Distinct operand spellings.
    operands: HashSet<String>,
    /// Total operand occurrences.
    total_operands: u32,
}

impl Counts {
    /// Records entry into a nesting control structure.
    fn enter_control(&mut self) {
        self.cognitive += 1 + self.nesting;
        self.nesting += 1;
        self.max_nesting = self.max_nesting.max(self.nesting);
    }

    /// Records exit from a nesting control structure.
    fn exit_control(&mut self) {
        self.nesting -= 1;
    }

    /// Records an operator occurrence.
    fn operator(&mut self, spelling: &str) {
        self.operators.insert(spelling.to_string());
        self.total_operators += 1;
    }

    /// Records an operand occurrence.
    fn operand(&mut self, spelling: String) {
        self.operands.insert(spelling);
        self.total_operands += 1;
    }
}

/// The complexity walker.
struct ComplexityVisitor;

impl Visitor for ComplexityVisitor {
    type State = Counts;

    fn conditional(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => {
                state.decision_points += 1;
                state.logical_loc += 1;
                state.enter_control();
            }
            VisitReason::Exit => state.exit_control(),
        }
    }

    fn loop_statement(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => {
                state.decision_points += 1;
                state.logical_loc += 1;
                state.enter_control();
            }
            VisitReason::Exit => state.exit_control(),
        }
    }

    fn pattern_match(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => {
                state.logical_loc += 1;
                state.enter_control();
            }
            VisitReason::Exit => state.exit_control(),
        }
    }

    fn match_arm(&mut self, state: &mut Counts, reason: VisitReason, _: &MatchArm) {
        if reason == VisitReason::Enter {
            state.decision_points += 1;
        }
    }

    fn exception_handling(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => {
                state.logical_loc += 1;
                state.enter_control();
            }
            VisitReason::Exit => state.exit_control(),
        }
    }

    fn binary_op(&mut self, state: &mut Counts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        let MetaNode::BinaryOp { category, op, .. } = node else {
            return;
        };

        if *category == BinaryCategory::Boolean {
            state.decision_points += 1;
        }
        state.operator(op);
    }

    fn unary_op(&mut self, state: &mut Counts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        if let MetaNode::UnaryOp { op, .. } = node {
            state.operator(op);
        }
    }

    fn function_call(&mut self, state: &mut Counts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        if let MetaNode::FunctionCall { name, .. } = node {
            state.operator(name);
            state.logical_loc += 1;
        }
    }

    fn literal(&mut self, state: &mut Counts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        if let MetaNode::Literal { value, .. } = node {
            state.operand(value.as_text());
        }
    }

    fn variable(&mut self, state: &mut Counts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        if let MetaNode::Variable { name, .. } = node {
            state.operand(name.clone());
        }
    }

    fn assignment(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        if reason == VisitReason::Enter {
            state.logical_loc += 1;
        }
    }

    fn early_return(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        if reason == VisitReason::Enter {
            state.logical_loc += 1;
        }
    }

    fn lambda(&mut self, state: &mut Counts, reason: VisitReason, _: &MetaNode) {
        if reason == VisitReason::Enter {
            state.logical_loc += 1;
        }
    }
}

/// Computes raw counts for one subtree.
fn count(node: &MetaNode) -> Counts {
    let mut counts = Counts::default();
    visit(node, &mut ComplexityVisitor, &mut counts);
    counts
}

/// Collects per-function metrics from lambda nodes.
fn collect_functions(node: &MetaNode, out: &mut Vec<FunctionComplexity>) {
    if let MetaNode::Assignment { target, value, .. } = node {
        if let (MetaNode::Variable { name, .. }, MetaNode::Lambda { body, .. }) =
            (&**target, &**value)
        {
            out.push(function_metrics(name.clone(), body));
            collect_functions(body, out);
            return;
        }
    }

    if let MetaNode::Lambda { body, .. } = node {
        out.push(function_metrics("<anonymous>".to_string(), body));
        collect_functions(body, out);
        return;
    }

    for child in node.children() {
        collect_functions(child, out);
    }
}

/// Computes the metrics of one function body.
fn function_metrics(name: String, body: &MetaNode) -> FunctionComplexity {
    let counts = count(body);
    FunctionComplexity {
        name,
        cyclomatic: 1 + counts.decision_points,
        cognitive: counts.cognitive,
        max_nesting: counts.max_nesting,
        logical_loc: counts.logical_loc,
    }
}

/// The complexity analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityAnalyzer {
    /// The thresholds that drive warnings.
    pub thresholds: ComplexityThresholds,
}

impl Analyzer for ComplexityAnalyzer {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn analyze(&self, document: &Document) -> AnalysisReport {
        let counts = count(&document.ast);

        let mut functions = Vec::new();
        collect_functions(&document.ast, &mut functions);

        let halstead = Halstead {
            distinct_operators: counts.operators.len() as u32,
            total_operators: counts.total_operators,
            distinct_operands: counts.operands.len() as u32,
            total_operands: counts.total_operands,
            ..Default::default()
        }
        .derive();

        let mut result = ComplexityResult {
            cyclomatic: 1 + counts.decision_points,
            cognitive: counts.cognitive,
            max_nesting: counts.max_nesting,
            halstead,
            logical_loc: counts.logical_loc,
            functions,
            warnings: Vec::new(),
        };
        result.warnings = warnings(&result, self.thresholds);

        AnalysisReport::Complexity(result)
    }
}

/// Builds threshold diagnostics for a result.
fn warnings(result: &ComplexityResult, thresholds: ComplexityThresholds) -> Vec<Diagnostic> {
    /// Checks one metric against its warning and error thresholds.
    fn check(
        out: &mut Vec<Diagnostic>,
        metric: &str,
        value: u32,
        warning: u32,
        error: u32,
    ) {
        if value > error {
            out.push(
                Diagnostic::error(format!("{metric} {value} exceeds {error}"))
                    .with_rule("complexity"),
            );
        } else if value > warning {
            out.push(
                Diagnostic::warning(format!("{metric} {value} exceeds {warning}"))
                    .with_rule("complexity"),
            );
        }
    }

    let mut out = Vec::new();
    check(
        &mut out,
        "cyclomatic complexity",
        result.cyclomatic,
        thresholds.cyclomatic_warning,
        thresholds.cyclomatic_error,
    );
    check(
        &mut out,
        "cognitive complexity",
        result.cognitive,
        thresholds.cognitive_warning,
        thresholds.cognitive_error,
    );
    check(
        &mut out,
        "nesting depth",
        result.max_nesting,
        thresholds.nesting_warning,
        thresholds.nesting_error,
    );
    check(
        &mut out,
        "logical lines of code",
        result.logical_loc,
        thresholds.logical_loc_warning,
        thresholds.logical_loc_error,
    );
    out
}

#[cfg(test)]
mod tests {
    use metastatic_ast::Language;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Runs the analyzer and unwraps the complexity result.
    fn run(document: &Document) -> ComplexityResult {
        match ComplexityAnalyzer::default().analyze(document) {
            AnalysisReport::Complexity(result) => result,
            other => panic!("expected a complexity report, got {other:?}"),
        }
    }

    /// Builds the `if a: x = 1 else: x = 2` tree.
    fn branchy() -> Document {
        Document::new(
            MetaNode::conditional(
                MetaNode::variable("a"),
                MetaNode::assignment(MetaNode::variable("x"), MetaNode::integer(1)),
                Some(MetaNode::assignment(
                    MetaNode::variable("x"),
                    MetaNode::integer(2),
                )),
            ),
            Language::Python,
        )
    }

    #[test]
    fn a_single_branch_scores_cyclomatic_two() {
        let result = run(&branchy());
        assert_eq!(result.cyclomatic, 2);
        assert_eq!(result.max_nesting, 1);
        assert_eq!(result.logical_loc, 3);
        assert_eq!(result.cognitive, 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn halstead_counts_operators_and_operands() {
        // x + 5 has one operator and two operands.
        let document = Document::new(
            MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5)),
            Language::Python,
        );

        let result = run(&document);
        assert_eq!(result.halstead.distinct_operators, 1);
        assert_eq!(result.halstead.total_operators, 1);
        assert_eq!(result.halstead.distinct_operands, 2);
        assert_eq!(result.halstead.total_operands, 2);
        assert_eq!(result.halstead.vocabulary, 3);
        assert_eq!(result.halstead.length, 3);

        use approx::assert_relative_eq;
        assert_relative_eq!(result.halstead.volume, 3.0 * 3.0_f64.log2());
        assert_relative_eq!(result.halstead.difficulty, 0.5 * (2.0 / 2.0));
    }

    #[test]
    fn merging_takes_max_complexity_and_summed_size() {
        let first = run(&branchy());
        let second = run(&Document::new(
            MetaNode::assignment(MetaNode::variable("y"), MetaNode::integer(3)),
            Language::Python,
        ));

        let merged = ComplexityResult::merge(&[first.clone(), second.clone()]);
        assert_eq!(merged.cyclomatic, first.cyclomatic.max(second.cyclomatic));
        assert_eq!(merged.logical_loc, first.logical_loc + second.logical_loc);
    }

    #[test]
    fn named_lambdas_produce_function_metrics() {
        let document = Document::new(
            MetaNode::assignment(
                MetaNode::variable("double"),
                MetaNode::lambda(
                    vec![MetaNode::variable("x")],
                    MetaNode::arithmetic("*", MetaNode::variable("x"), MetaNode::integer(2)),
                ),
            ),
            Language::Haskell,
        );

        let result = run(&document);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "double");
        assert_eq!(result.functions[0].cyclomatic, 1);
    }
}
