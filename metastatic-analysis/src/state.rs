//! The state-management analysis.

use std::collections::BTreeMap;

use metastatic_ast::Document;
use metastatic_ast::MetaNode;
use metastatic_ast::VisitReason;
use metastatic_ast::Visitor;
use serde::Serialize;

use crate::AnalysisReport;
use crate::Analyzer;

/// How a container manages its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum StatePattern {
    Stateless,
    ImmutableState,
    ControlledMutation,
    UncontrolledMutation,
    Mixed,
}

/// The qualitative assessment derived from the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Assessment {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// The result of the state-management analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateResult {
    /// The detected management pattern.
    pub pattern: StatePattern,
    /// The assessment derived from the pattern.
    pub assessment: Assessment,
    /// The number of state variables.
    pub state_variables: u32,
    /// The number of mutations past initialization.
    pub mutations: u32,
    /// The number of state variables with an initializing assignment.
    pub initialized: u32,
    /// The number of state variables never mutated after initialization.
    pub read_only: u32,
}

/// Per-variable bookkeeping.
#[derive(Debug, Default, Clone)]
struct VarFacts {
    /// How many assignments the variable received.
    assignments: u32,
    /// Whether any assignment happened inside a loop.
    assigned_in_loop: bool,
}

/// Determines whether an assignment target names container state.
///
/// Instance variables (`@count`), attribute paths (`self.count`,
/// `this.count`), and module-level underscored globals are treated as
/// state; plain locals are not.
fn is_state_name(name: &str) -> bool {
    name.starts_with('@')
        || name.starts_with("self.")
        || name.starts_with("this.")
        || (name.starts_with("__") && name.ends_with("__"))
}

/// The state-management walker.
struct StateVisitor {
    /// The current loop nesting depth.
    loop_depth: usize,
}

/// The accumulated per-variable facts.
#[derive(Default)]
struct StateFacts {
    /// Facts keyed by state-variable name.
    vars: BTreeMap<String, VarFacts>,
}

impl Visitor for StateVisitor {
    type State = StateFacts;

    fn loop_statement(&mut self, _: &mut StateFacts, reason: VisitReason, _: &MetaNode) {
        match reason {
            VisitReason::Enter => self.loop_depth += 1,
            VisitReason::Exit => self.loop_depth -= 1,
        }
    }

    fn assignment(&mut self, state: &mut StateFacts, reason: VisitReason, node: &MetaNode) {
        if reason == VisitReason::Exit {
            return;
        }

        let MetaNode::Assignment { target, .. } = node else {
            return;
        };
        let MetaNode::Variable { name, .. } = &**target else {
            return;
        };
        if !is_state_name(name) {
            return;
        }

        let facts = state.vars.entry(name.clone()).or_default();
        facts.assignments += 1;
        if self.loop_depth > 0 {
            facts.assigned_in_loop = true;
        }
    }
}

/// The state-management analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateAnalyzer;

impl Analyzer for StateAnalyzer {
    fn name(&self) -> &'static str {
        "state_management"
    }

    fn analyze(&self, document: &Document) -> AnalysisReport {
        let mut visitor = StateVisitor { loop_depth: 0 };
        let mut facts = StateFacts::default();
        document.visit(&mut visitor, &mut facts);

        let state_variables = facts.vars.len() as u32;
        let initialized = facts
            .vars
            .values()
            .filter(|facts| facts.assignments > 0)
            .count() as u32;
        let mutations: u32 = facts
            .vars
            .values()
            .map(|facts| facts.assignments.saturating_sub(1))
            .sum();
        let read_only = facts
            .vars
            .values()
            .filter(|facts| facts.assignments == 1 && !facts.assigned_in_loop)
            .count() as u32;

        // A variable is heavily mutated when it is reassigned repeatedly or
        // written inside a loop.
        let heavy = facts
            .vars
            .values()
            .filter(|facts| facts.assignments > 2 || facts.assigned_in_loop)
            .count() as u32;
        let mutated = facts
            .vars
            .values()
            .filter(|facts| facts.assignments > 1 || facts.assigned_in_loop)
            .count() as u32;

        let pattern = if state_variables == 0 {
            StatePattern::Stateless
        } else if mutations == 0 && heavy == 0 {
            StatePattern::ImmutableState
        } else if heavy == 0 {
            StatePattern::ControlledMutation
        } else if mutated < state_variables {
            StatePattern::Mixed
        } else {
            StatePattern::UncontrolledMutation
        };

        let assessment = match pattern {
            StatePattern::Stateless | StatePattern::ImmutableState => Assessment::Excellent,
            StatePattern::ControlledMutation => Assessment::Good,
            StatePattern::Mixed => Assessment::Fair,
            StatePattern::UncontrolledMutation => Assessment::Poor,
        };

        AnalysisReport::StateManagement(StateResult {
            pattern,
            assessment,
            state_variables,
            mutations,
            initialized,
            read_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use metastatic_ast::Language;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Runs the analyzer and unwraps the state result.
    fn run(ast: MetaNode) -> StateResult {
        match StateAnalyzer.analyze(&Document::new(ast, Language::Ruby)) {
            AnalysisReport::StateManagement(result) => result,
            other => panic!("expected a state report, got {other:?}"),
        }
    }

    #[test]
    fn local_only_code_is_stateless() {
        let result = run(MetaNode::block(vec![MetaNode::assignment(
            MetaNode::variable("x"),
            MetaNode::integer(1),
        )]));

        assert_eq!(result.pattern, StatePattern::Stateless);
        assert_eq!(result.assessment, Assessment::Excellent);
        assert_eq!(result.state_variables, 0);
    }

    #[test]
    fn initialize_once_is_immutable_state() {
        let result = run(MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("@count"), MetaNode::integer(0)),
            MetaNode::assignment(MetaNode::variable("@name"), MetaNode::string("a")),
        ]));

        assert_eq!(result.pattern, StatePattern::ImmutableState);
        assert_eq!(result.assessment, Assessment::Excellent);
        assert_eq!(result.state_variables, 2);
        assert_eq!(result.read_only, 2);
        assert_eq!(result.mutations, 0);
    }

    #[test]
    fn loop_mutation_is_uncontrolled() {
        let result = run(MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("@total"), MetaNode::integer(0)),
            MetaNode::while_loop(
                MetaNode::boolean(true),
                MetaNode::assignment(
                    MetaNode::variable("@total"),
                    MetaNode::arithmetic(
                        "+",
                        MetaNode::variable("@total"),
                        MetaNode::integer(1),
                    ),
                ),
            ),
        ]));

        assert_eq!(result.pattern, StatePattern::UncontrolledMutation);
        assert_eq!(result.assessment, Assessment::Poor);
    }

    #[test]
    fn a_single_reassignment_is_controlled() {
        let result = run(MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("self.mode"), MetaNode::string("init")),
            MetaNode::assignment(MetaNode::variable("self.mode"), MetaNode::string("ready")),
        ]));

        assert_eq!(result.pattern, StatePattern::ControlledMutation);
        assert_eq!(result.assessment, Assessment::Good);
        assert_eq!(result.mutations, 1);
    }

    #[test]
    fn mixed_patterns_are_fair() {
        let result = run(MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("@config"), MetaNode::integer(1)),
            MetaNode::assignment(MetaNode::variable("@counter"), MetaNode::integer(0)),
            MetaNode::while_loop(
                MetaNode::boolean(true),
                MetaNode::assignment(
                    MetaNode::variable("@counter"),
                    MetaNode::arithmetic(
                        "+",
                        MetaNode::variable("@counter"),
                        MetaNode::integer(1),
                    ),
                ),
            ),
        ]));

        assert_eq!(result.pattern, StatePattern::Mixed);
        assert_eq!(result.assessment, Assessment::Fair);
    }
}
