//! Implementation for MetaAST visitation.
//!
//! A visitor is called back for every node of a tree during the canonical
//! depth-first walk; callbacks correspond to node kinds. Each node receives a
//! call with [`VisitReason::Enter`] before its children and a matching call
//! with [`VisitReason::Exit`] after them. Children are visited left-to-right
//! in source order; a pattern match visits its scrutinee and then each arm's
//! pattern, guard, and body in declaration order. The walk threads an
//! explicit state value rather than relying on interior mutation, so results
//! are deterministic and the traversal order is part of the contract.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::CatchClause;
use crate::Document;
use crate::Error;
use crate::LoopForm;
use crate::MatchArm;
use crate::MetaNode;

/// Represents the reason a node is being visited.
///
/// Each node is visited exactly once, but the visitor receives a call for
/// entering the node and a call for exiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisitReason {
    /// The visit has entered the node.
    Enter,
    /// The visit has exited the node.
    Exit,
}

/// A trait used to implement a MetaAST visitor.
///
/// All methods have default empty implementations; a visitor overrides only
/// the node kinds it cares about.
#[allow(unused_variables)]
pub trait Visitor {
    /// Represents the external visitation state.
    type State;

    /// Visits the document wrapping the tree.
    fn document(&mut self, state: &mut Self::State, reason: VisitReason, document: &Document) {}

    /// Visits a literal node.
    fn literal(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a variable node.
    fn variable(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a binary operation node.
    fn binary_op(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a unary operation node.
    fn unary_op(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a function call node.
    fn function_call(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a conditional node.
    fn conditional(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a block node.
    fn block(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits an assignment node.
    fn assignment(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a loop node.
    fn loop_statement(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a lambda node.
    fn lambda(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a collection operation node.
    fn collection_op(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a pattern match node.
    fn pattern_match(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits one arm of a pattern match.
    fn match_arm(&mut self, state: &mut Self::State, reason: VisitReason, arm: &MatchArm) {}

    /// Visits an exception handling node.
    fn exception_handling(
        &mut self,
        state: &mut Self::State,
        reason: VisitReason,
        node: &MetaNode,
    ) {
    }

    /// Visits one catch clause of an exception handler.
    fn catch_clause(&mut self, state: &mut Self::State, reason: VisitReason, clause: &CatchClause) {
    }

    /// Visits an asynchronous operation node.
    fn async_operation(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a list node.
    fn list(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a map literal node.
    fn map_literal(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a pair node.
    fn pair(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a tuple node.
    fn tuple(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits an early return node.
    fn early_return(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits an inline match node.
    fn inline_match(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a wildcard pattern node.
    fn wildcard(&mut self, state: &mut Self::State, reason: VisitReason, node: &MetaNode) {}

    /// Visits a language-specific node.
    fn language_specific(
        &mut self,
        state: &mut Self::State,
        reason: VisitReason,
        node: &MetaNode,
    ) {
    }
}

/// Dispatches the enter or exit callback for a node.
fn dispatch<V: Visitor>(
    node: &MetaNode,
    visitor: &mut V,
    state: &mut V::State,
    reason: VisitReason,
) {
    match node {
        MetaNode::Literal { .. } => visitor.literal(state, reason, node),
        MetaNode::Variable { .. } => visitor.variable(state, reason, node),
        MetaNode::BinaryOp { .. } => visitor.binary_op(state, reason, node),
        MetaNode::UnaryOp { .. } => visitor.unary_op(state, reason, node),
        MetaNode::FunctionCall { .. } => visitor.function_call(state, reason, node),
        MetaNode::Conditional { .. } => visitor.conditional(state, reason, node),
        MetaNode::Block { .. } => visitor.block(state, reason, node),
        MetaNode::Assignment { .. } => visitor.assignment(state, reason, node),
        MetaNode::Loop { .. } => visitor.loop_statement(state, reason, node),
        MetaNode::Lambda { .. } => visitor.lambda(state, reason, node),
        MetaNode::CollectionOp { .. } => visitor.collection_op(state, reason, node),
        MetaNode::PatternMatch { .. } => visitor.pattern_match(state, reason, node),
        MetaNode::ExceptionHandling { .. } => visitor.exception_handling(state, reason, node),
        MetaNode::AsyncOperation { .. } => visitor.async_operation(state, reason, node),
        MetaNode::List { .. } => visitor.list(state, reason, node),
        MetaNode::MapLiteral { .. } => visitor.map_literal(state, reason, node),
        MetaNode::Pair { .. } => visitor.pair(state, reason, node),
        MetaNode::Tuple { .. } => visitor.tuple(state, reason, node),
        MetaNode::EarlyReturn { .. } => visitor.early_return(state, reason, node),
        MetaNode::InlineMatch { .. } => visitor.inline_match(state, reason, node),
        MetaNode::Wildcard { .. } => visitor.wildcard(state, reason, node),
        MetaNode::LanguageSpecific { .. } => visitor.language_specific(state, reason, node),
    }
}

/// Performs the canonical depth-first walk of a tree.
pub fn visit<V: Visitor>(node: &MetaNode, visitor: &mut V, state: &mut V::State) {
    // The cancellation token can never fire here.
    let token = AtomicBool::new(false);
    let _ = visit_inner(node, visitor, state, &token);
}

/// Performs the canonical walk, checking a cooperative cancellation token at
/// node boundaries.
///
/// When the token is set, traversal stops and [`Error::Cancelled`] is
/// returned without any other observable effect.
pub fn visit_cancellable<V: Visitor>(
    node: &MetaNode,
    visitor: &mut V,
    state: &mut V::State,
    token: &AtomicBool,
) -> Result<(), Error> {
    visit_inner(node, visitor, state, token)
}

/// The recursive walk shared by [`visit`] and [`visit_cancellable`].
fn visit_inner<V: Visitor>(
    node: &MetaNode,
    visitor: &mut V,
    state: &mut V::State,
    token: &AtomicBool,
) -> Result<(), Error> {
    if token.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }

    dispatch(node, visitor, state, VisitReason::Enter);

    match node {
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            visit_inner(scrutinee, visitor, state, token)?;
            for arm in arms {
                visitor.match_arm(state, VisitReason::Enter, arm);
                visit_inner(&arm.pattern, visitor, state, token)?;
                if let Some(guard) = &arm.guard {
                    visit_inner(guard, visitor, state, token)?;
                }
                visit_inner(&arm.body, visitor, state, token)?;
                visitor.match_arm(state, VisitReason::Exit, arm);
            }
        }
        MetaNode::ExceptionHandling {
            body,
            catches,
            else_body,
            ..
        } => {
            visit_inner(body, visitor, state, token)?;
            for clause in catches {
                visitor.catch_clause(state, VisitReason::Enter, clause);
                if let Some(pattern) = &clause.pattern {
                    visit_inner(pattern, visitor, state, token)?;
                }
                visit_inner(&clause.body, visitor, state, token)?;
                visitor.catch_clause(state, VisitReason::Exit, clause);
            }
            if let Some(else_body) = else_body {
                visit_inner(else_body, visitor, state, token)?;
            }
        }
        MetaNode::Loop { form, .. } => match form {
            LoopForm::While { condition, body } => {
                visit_inner(condition, visitor, state, token)?;
                visit_inner(body, visitor, state, token)?;
            }
            LoopForm::For {
                init,
                condition,
                step,
                body,
            } => {
                visit_inner(init, visitor, state, token)?;
                visit_inner(condition, visitor, state, token)?;
                visit_inner(step, visitor, state, token)?;
                visit_inner(body, visitor, state, token)?;
            }
            LoopForm::ForEach {
                binding,
                iterable,
                body,
            } => {
                visit_inner(binding, visitor, state, token)?;
                visit_inner(iterable, visitor, state, token)?;
                visit_inner(body, visitor, state, token)?;
            }
        },
        _ => {
            for child in node.children() {
                visit_inner(child, visitor, state, token)?;
            }
        }
    }

    dispatch(node, visitor, state, VisitReason::Exit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchArm;

    /// Records the order nodes are visited in.
    #[derive(Default)]
    struct Recorder;

    impl Visitor for Recorder {
        type State = Vec<String>;

        fn literal(&mut self, state: &mut Vec<String>, reason: VisitReason, node: &MetaNode) {
            if reason == VisitReason::Enter {
                state.push(format!("literal:{:?}", node.metadata().line()));
            }
        }

        fn variable(&mut self, state: &mut Vec<String>, reason: VisitReason, node: &MetaNode) {
            if reason == VisitReason::Enter {
                if let MetaNode::Variable { name, .. } = node {
                    state.push(format!("variable:{name}"));
                }
            }
        }

        fn pattern_match(&mut self, state: &mut Vec<String>, reason: VisitReason, _: &MetaNode) {
            state.push(match reason {
                VisitReason::Enter => "match:enter".to_string(),
                VisitReason::Exit => "match:exit".to_string(),
            });
        }

        fn wildcard(&mut self, state: &mut Vec<String>, reason: VisitReason, _: &MetaNode) {
            if reason == VisitReason::Enter {
                state.push("wildcard".to_string());
            }
        }
    }

    #[test]
    fn traversal_order_is_pinned() {
        let node = MetaNode::pattern_match(
            MetaNode::variable("subject"),
            vec![
                MatchArm::new(MetaNode::integer(1).at_line(1), MetaNode::variable("one")),
                MatchArm::new(MetaNode::wildcard(), MetaNode::variable("other")),
            ],
        );

        let mut order = Vec::new();
        visit(&node, &mut Recorder, &mut order);

        assert_eq!(
            order,
            [
                "match:enter",
                "variable:subject",
                "literal:1",
                "variable:one",
                "wildcard",
                "variable:other",
                "match:exit",
            ]
        );
    }

    #[test]
    fn cancellation_returns_without_finishing() {
        let node = MetaNode::block(vec![MetaNode::integer(1), MetaNode::integer(2)]);
        let token = AtomicBool::new(true);

        let mut order = Vec::new();
        let result = visit_cancellable(&node, &mut Recorder, &mut order, &token);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(order.is_empty());
    }
}
