//! The MetaAST node grammar.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::Language;
use crate::Metadata;

/// The layer a node belongs to.
///
/// Layers order by increasing language-specificity; every node belongs to
/// exactly one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Universal constructs every adapter round-trips faithfully.
    Core,
    /// Common patterns most languages can express.
    Extended,
    /// The per-language escape hatch.
    Native,
}

/// The subtype of a literal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Symbol,
    Collection,
}

/// The value of a literal node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string or symbol value.
    Str(String),
    /// A boolean value.
    Bool(bool),
    /// The language's null-ish value.
    Null,
}

impl LiteralValue {
    /// Gets the textual form of the value.
    pub fn as_text(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Str(v) => v.clone(),
            Self::Bool(v) => v.to_string(),
            Self::Null => "null".to_string(),
        }
    }
}

/// The category of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum BinaryCategory {
    Arithmetic,
    Comparison,
    Boolean,
    Bitwise,
}

/// The category of a unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum UnaryCategory {
    Arithmetic,
    Boolean,
    Bitwise,
}

/// The kind of a loop node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum LoopKind {
    While,
    For,
    ForEach,
}

/// The shape of a loop; children depend on the loop kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "loop_type", rename_all = "snake_case")]
pub enum LoopForm {
    /// A condition-driven loop.
    While {
        /// The loop condition.
        condition: Box<MetaNode>,
        /// The loop body.
        body: Box<MetaNode>,
    },
    /// A three-part counted loop.
    For {
        /// The initialization statement.
        init: Box<MetaNode>,
        /// The loop condition.
        condition: Box<MetaNode>,
        /// The per-iteration step.
        step: Box<MetaNode>,
        /// The loop body.
        body: Box<MetaNode>,
    },
    /// An iterator-driven loop.
    ForEach {
        /// The per-iteration binding.
        binding: Box<MetaNode>,
        /// The iterated collection.
        iterable: Box<MetaNode>,
        /// The loop body.
        body: Box<MetaNode>,
    },
}

impl LoopForm {
    /// Gets the kind of the loop.
    pub fn kind(&self) -> LoopKind {
        match self {
            Self::While { .. } => LoopKind::While,
            Self::For { .. } => LoopKind::For,
            Self::ForEach { .. } => LoopKind::ForEach,
        }
    }
}

/// The kind of a higher-order collection operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum CollectionKind {
    Map,
    Filter,
    Reduce,
}

/// The kind of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum AsyncKind {
    Async,
    Await,
    Spawn,
}

/// One arm of a pattern match.
///
/// Arms are ordered; matching is first-match-wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchArm {
    /// The pattern the scrutinee is matched against.
    pub pattern: MetaNode,
    /// The optional guard condition.
    pub guard: Option<MetaNode>,
    /// The arm body.
    pub body: MetaNode,
}

impl MatchArm {
    /// Creates a new unguarded arm.
    pub fn new(pattern: MetaNode, body: MetaNode) -> Self {
        Self {
            pattern,
            guard: None,
            body,
        }
    }

    /// Sets the guard condition of the arm.
    pub fn with_guard(mut self, guard: MetaNode) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// One catch clause of an exception handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchClause {
    /// The pattern of exceptions the clause catches; `None` catches all.
    pub pattern: Option<MetaNode>,
    /// The clause body.
    pub body: MetaNode,
}

impl CatchClause {
    /// Creates a catch-all clause.
    pub fn catch_all(body: MetaNode) -> Self {
        Self {
            pattern: None,
            body,
        }
    }

    /// Creates a clause catching the given pattern.
    pub fn catching(pattern: MetaNode, body: MetaNode) -> Self {
        Self {
            pattern: Some(pattern),
            body,
        }
    }
}

/// An opaque, verbatim fragment of native source.
///
/// The fragment is re-embedded byte-for-byte when reifying into the owning
/// language and rejected by every other adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeSyntax(Arc<str>);

impl NativeSyntax {
    /// Gets the fragment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NativeSyntax {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for NativeSyntax {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

/// A node of the language-neutral MetaAST.
///
/// Nodes are immutable values: construct a new tree to change one. Every node
/// carries a [`Metadata`] value (possibly empty) alongside its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetaNode {
    /// A literal value.
    Literal {
        /// The node metadata.
        meta: Metadata,
        /// The literal subtype.
        subtype: LiteralKind,
        /// The literal value.
        value: LiteralValue,
    },
    /// A reference to a variable or binding.
    Variable {
        /// The node metadata.
        meta: Metadata,
        /// The variable name.
        name: String,
    },
    /// A binary operation with a normalized operator.
    BinaryOp {
        /// The node metadata.
        meta: Metadata,
        /// The operator category.
        category: BinaryCategory,
        /// The normalized operator spelling.
        op: String,
        /// The left operand.
        lhs: Box<MetaNode>,
        /// The right operand.
        rhs: Box<MetaNode>,
    },
    /// A unary operation.
    UnaryOp {
        /// The node metadata.
        meta: Metadata,
        /// The operator category.
        category: UnaryCategory,
        /// The normalized operator spelling.
        op: String,
        /// The operand.
        operand: Box<MetaNode>,
    },
    /// A function call; the name may be dotted for remote calls.
    FunctionCall {
        /// The node metadata.
        meta: Metadata,
        /// The called name.
        name: String,
        /// The ordered arguments.
        args: Vec<MetaNode>,
    },
    /// A two- or three-way conditional.
    Conditional {
        /// The node metadata.
        meta: Metadata,
        /// The tested condition.
        condition: Box<MetaNode>,
        /// The branch taken when the condition holds.
        then_branch: Box<MetaNode>,
        /// The optional branch taken otherwise.
        else_branch: Option<Box<MetaNode>>,
    },
    /// An ordered sequence of statements.
    Block {
        /// The node metadata.
        meta: Metadata,
        /// The statements in source order.
        statements: Vec<MetaNode>,
    },
    /// An assignment of a value to a target.
    Assignment {
        /// The node metadata.
        meta: Metadata,
        /// The assignment target.
        target: Box<MetaNode>,
        /// The assigned value.
        value: Box<MetaNode>,
    },
    /// A loop.
    Loop {
        /// The node metadata.
        meta: Metadata,
        /// The loop shape.
        #[serde(flatten)]
        form: LoopForm,
    },
    /// An anonymous function.
    Lambda {
        /// The node metadata.
        meta: Metadata,
        /// The parameter patterns.
        params: Vec<MetaNode>,
        /// The function body.
        body: Box<MetaNode>,
    },
    /// A higher-order map, filter, or reduce over a collection.
    CollectionOp {
        /// The node metadata.
        meta: Metadata,
        /// The operation kind.
        #[serde(rename = "op_kind")]
        kind: CollectionKind,
        /// The mapped, filtering, or reducing function.
        func: Box<MetaNode>,
        /// The operated-on collection.
        collection: Box<MetaNode>,
        /// The initial accumulator, for reductions that carry one.
        init: Option<Box<MetaNode>>,
    },
    /// A multi-way pattern match.
    PatternMatch {
        /// The node metadata.
        meta: Metadata,
        /// The matched value.
        scrutinee: Box<MetaNode>,
        /// The ordered arms; matching is first-match-wins.
        arms: Vec<MatchArm>,
    },
    /// A try/catch-style exception handler.
    ExceptionHandling {
        /// The node metadata.
        meta: Metadata,
        /// The protected body.
        body: Box<MetaNode>,
        /// The ordered catch clauses.
        catches: Vec<CatchClause>,
        /// The optional no-exception branch.
        else_body: Option<Box<MetaNode>>,
    },
    /// An asynchronous primitive.
    AsyncOperation {
        /// The node metadata.
        meta: Metadata,
        /// The async operation kind.
        #[serde(rename = "async_kind")]
        kind: AsyncKind,
        /// The operated-on body.
        body: Box<MetaNode>,
    },
    /// A list literal.
    List {
        /// The node metadata.
        meta: Metadata,
        /// The ordered items.
        items: Vec<MetaNode>,
    },
    /// A map literal.
    #[serde(rename = "map")]
    MapLiteral {
        /// The node metadata.
        meta: Metadata,
        /// The ordered key/value entries.
        entries: Vec<(MetaNode, MetaNode)>,
    },
    /// A two-element pair.
    Pair {
        /// The node metadata.
        meta: Metadata,
        /// The first element.
        first: Box<MetaNode>,
        /// The second element.
        second: Box<MetaNode>,
    },
    /// A tuple literal.
    Tuple {
        /// The node metadata.
        meta: Metadata,
        /// The ordered items.
        items: Vec<MetaNode>,
    },
    /// An early return from the enclosing function.
    EarlyReturn {
        /// The node metadata.
        meta: Metadata,
        /// The optional returned value.
        value: Option<Box<MetaNode>>,
    },
    /// A single pattern-matched binding.
    InlineMatch {
        /// The node metadata.
        meta: Metadata,
        /// The binding pattern.
        pattern: Box<MetaNode>,
        /// The matched value.
        value: Box<MetaNode>,
    },
    /// The wildcard pattern `_`.
    Wildcard {
        /// The node metadata.
        meta: Metadata,
    },
    /// A native fragment only one language can represent.
    LanguageSpecific {
        /// The node metadata.
        meta: Metadata,
        /// The owning language.
        language: Language,
        /// The opaque native fragment.
        native: NativeSyntax,
        /// An optional hint naming the construct.
        hint: Option<String>,
    },
}

impl MetaNode {
    /// Creates an integer literal.
    pub fn integer(value: i64) -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::Integer,
            value: LiteralValue::Int(value),
        }
    }

    /// Creates a float literal.
    pub fn float(value: f64) -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::Float,
            value: LiteralValue::Float(value),
        }
    }

    /// Creates a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::String,
            value: LiteralValue::Str(value.into()),
        }
    }

    /// Creates a boolean literal.
    pub fn boolean(value: bool) -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::Boolean,
            value: LiteralValue::Bool(value),
        }
    }

    /// Creates a null-ish literal.
    pub fn null() -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::Null,
            value: LiteralValue::Null,
        }
    }

    /// Creates a symbol literal.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Literal {
            meta: Metadata::synthetic(),
            subtype: LiteralKind::Symbol,
            value: LiteralValue::Str(name.into()),
        }
    }

    /// Creates a variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable {
            meta: Metadata::synthetic(),
            name: name.into(),
        }
    }

    /// Creates a binary operation.
    pub fn binary(category: BinaryCategory, op: impl Into<String>, lhs: Self, rhs: Self) -> Self {
        Self::BinaryOp {
            meta: Metadata::synthetic(),
            category,
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Creates an arithmetic binary operation.
    pub fn arithmetic(op: impl Into<String>, lhs: Self, rhs: Self) -> Self {
        Self::binary(BinaryCategory::Arithmetic, op, lhs, rhs)
    }

    /// Creates a comparison binary operation.
    pub fn comparison(op: impl Into<String>, lhs: Self, rhs: Self) -> Self {
        Self::binary(BinaryCategory::Comparison, op, lhs, rhs)
    }

    /// Creates a short-circuit boolean operation (`and` or `or`).
    pub fn boolean_op(op: impl Into<String>, lhs: Self, rhs: Self) -> Self {
        Self::binary(BinaryCategory::Boolean, op, lhs, rhs)
    }

    /// Creates a unary operation.
    pub fn unary(category: UnaryCategory, op: impl Into<String>, operand: Self) -> Self {
        Self::UnaryOp {
            meta: Metadata::synthetic(),
            category,
            op: op.into(),
            operand: Box::new(operand),
        }
    }

    /// Creates a function call.
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::FunctionCall {
            meta: Metadata::synthetic(),
            name: name.into(),
            args,
        }
    }

    /// Creates a conditional.
    pub fn conditional(condition: Self, then_branch: Self, else_branch: Option<Self>) -> Self {
        Self::Conditional {
            meta: Metadata::synthetic(),
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    /// Creates a block of statements.
    pub fn block(statements: Vec<Self>) -> Self {
        Self::Block {
            meta: Metadata::synthetic(),
            statements,
        }
    }

    /// Creates an assignment.
    pub fn assignment(target: Self, value: Self) -> Self {
        Self::Assignment {
            meta: Metadata::synthetic(),
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Creates a while loop.
    pub fn while_loop(condition: Self, body: Self) -> Self {
        Self::Loop {
            meta: Metadata::synthetic(),
            form: LoopForm::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
        }
    }

    /// Creates an iterator-driven loop.
    pub fn for_each(binding: Self, iterable: Self, body: Self) -> Self {
        Self::Loop {
            meta: Metadata::synthetic(),
            form: LoopForm::ForEach {
                binding: Box::new(binding),
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
        }
    }

    /// Creates a lambda.
    pub fn lambda(params: Vec<Self>, body: Self) -> Self {
        Self::Lambda {
            meta: Metadata::synthetic(),
            params,
            body: Box::new(body),
        }
    }

    /// Creates a collection operation.
    pub fn collection_op(
        kind: CollectionKind,
        func: Self,
        collection: Self,
        init: Option<Self>,
    ) -> Self {
        Self::CollectionOp {
            meta: Metadata::synthetic(),
            kind,
            func: Box::new(func),
            collection: Box::new(collection),
            init: init.map(Box::new),
        }
    }

    /// Creates a pattern match.
    pub fn pattern_match(scrutinee: Self, arms: Vec<MatchArm>) -> Self {
        Self::PatternMatch {
            meta: Metadata::synthetic(),
            scrutinee: Box::new(scrutinee),
            arms,
        }
    }

    /// Creates an early return.
    pub fn early_return(value: Option<Self>) -> Self {
        Self::EarlyReturn {
            meta: Metadata::synthetic(),
            value: value.map(Box::new),
        }
    }

    /// Creates an inline pattern-matched binding.
    pub fn inline_match(pattern: Self, value: Self) -> Self {
        Self::InlineMatch {
            meta: Metadata::synthetic(),
            pattern: Box::new(pattern),
            value: Box::new(value),
        }
    }

    /// Creates the wildcard pattern.
    pub fn wildcard() -> Self {
        Self::Wildcard {
            meta: Metadata::synthetic(),
        }
    }

    /// Creates a native escape-hatch node owning a verbatim fragment.
    pub fn language_specific(
        language: Language,
        native: impl Into<NativeSyntax>,
        hint: Option<String>,
    ) -> Self {
        Self::LanguageSpecific {
            meta: Metadata::synthetic(),
            language,
            native: native.into(),
            hint,
        }
    }

    /// Replaces the node's metadata, builder style.
    pub fn with_metadata(mut self, meta: Metadata) -> Self {
        *self.metadata_mut() = meta;
        self
    }

    /// Anchors the node at the given one-based source line, builder style.
    pub fn at_line(mut self, line: u32) -> Self {
        self.metadata_mut().set_line(line);
        self
    }

    /// Gets the node's metadata.
    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Literal { meta, .. }
            | Self::Variable { meta, .. }
            | Self::BinaryOp { meta, .. }
            | Self::UnaryOp { meta, .. }
            | Self::FunctionCall { meta, .. }
            | Self::Conditional { meta, .. }
            | Self::Block { meta, .. }
            | Self::Assignment { meta, .. }
            | Self::Loop { meta, .. }
            | Self::Lambda { meta, .. }
            | Self::CollectionOp { meta, .. }
            | Self::PatternMatch { meta, .. }
            | Self::ExceptionHandling { meta, .. }
            | Self::AsyncOperation { meta, .. }
            | Self::List { meta, .. }
            | Self::MapLiteral { meta, .. }
            | Self::Pair { meta, .. }
            | Self::Tuple { meta, .. }
            | Self::EarlyReturn { meta, .. }
            | Self::InlineMatch { meta, .. }
            | Self::Wildcard { meta }
            | Self::LanguageSpecific { meta, .. } => meta,
        }
    }

    /// Gets the node's metadata mutably.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Self::Literal { meta, .. }
            | Self::Variable { meta, .. }
            | Self::BinaryOp { meta, .. }
            | Self::UnaryOp { meta, .. }
            | Self::FunctionCall { meta, .. }
            | Self::Conditional { meta, .. }
            | Self::Block { meta, .. }
            | Self::Assignment { meta, .. }
            | Self::Loop { meta, .. }
            | Self::Lambda { meta, .. }
            | Self::CollectionOp { meta, .. }
            | Self::PatternMatch { meta, .. }
            | Self::ExceptionHandling { meta, .. }
            | Self::AsyncOperation { meta, .. }
            | Self::List { meta, .. }
            | Self::MapLiteral { meta, .. }
            | Self::Pair { meta, .. }
            | Self::Tuple { meta, .. }
            | Self::EarlyReturn { meta, .. }
            | Self::InlineMatch { meta, .. }
            | Self::Wildcard { meta }
            | Self::LanguageSpecific { meta, .. } => meta,
        }
    }

    /// Gets the layer the node belongs to.
    pub fn layer(&self) -> Layer {
        match self {
            Self::Literal { .. }
            | Self::Variable { .. }
            | Self::BinaryOp { .. }
            | Self::UnaryOp { .. }
            | Self::FunctionCall { .. }
            | Self::Conditional { .. }
            | Self::Block { .. }
            | Self::Assignment { .. } => Layer::Core,
            Self::LanguageSpecific { .. } => Layer::Native,
            _ => Layer::Extended,
        }
    }

    /// Gets the snake-case name of the node kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::Variable { .. } => "variable",
            Self::BinaryOp { .. } => "binary_op",
            Self::UnaryOp { .. } => "unary_op",
            Self::FunctionCall { .. } => "function_call",
            Self::Conditional { .. } => "conditional",
            Self::Block { .. } => "block",
            Self::Assignment { .. } => "assignment",
            Self::Loop { .. } => "loop",
            Self::Lambda { .. } => "lambda",
            Self::CollectionOp { .. } => "collection_op",
            Self::PatternMatch { .. } => "pattern_match",
            Self::ExceptionHandling { .. } => "exception_handling",
            Self::AsyncOperation { .. } => "async_operation",
            Self::List { .. } => "list",
            Self::MapLiteral { .. } => "map",
            Self::Pair { .. } => "pair",
            Self::Tuple { .. } => "tuple",
            Self::EarlyReturn { .. } => "early_return",
            Self::InlineMatch { .. } => "inline_match",
            Self::Wildcard { .. } => "wildcard",
            Self::LanguageSpecific { .. } => "language_specific",
        }
    }

    /// Gets the node's structural children in canonical traversal order.
    ///
    /// The order is left-to-right in source order; a pattern match yields its
    /// scrutinee and then each arm's pattern, guard, and body in declaration
    /// order. Guard clauses stored in metadata are not structural children.
    pub fn children(&self) -> Vec<&MetaNode> {
        match self {
            Self::Literal { .. }
            | Self::Variable { .. }
            | Self::Wildcard { .. }
            | Self::LanguageSpecific { .. } => Vec::new(),
            Self::BinaryOp { lhs, rhs, .. } => vec![lhs, rhs],
            Self::UnaryOp { operand, .. } => vec![operand],
            Self::FunctionCall { args, .. } => args.iter().collect(),
            Self::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let mut children: Vec<&MetaNode> = vec![condition, then_branch];
                if let Some(else_branch) = else_branch {
                    children.push(else_branch);
                }
                children
            }
            Self::Block { statements, .. } => statements.iter().collect(),
            Self::Assignment { target, value, .. } => vec![target, value],
            Self::Loop { form, .. } => match form {
                LoopForm::While { condition, body } => vec![condition, body],
                LoopForm::For {
                    init,
                    condition,
                    step,
                    body,
                } => vec![init, condition, step, body],
                LoopForm::ForEach {
                    binding,
                    iterable,
                    body,
                } => vec![binding, iterable, body],
            },
            Self::Lambda { params, body, .. } => {
                let mut children: Vec<&MetaNode> = params.iter().collect();
                children.push(body);
                children
            }
            Self::CollectionOp {
                func,
                collection,
                init,
                ..
            } => {
                let mut children: Vec<&MetaNode> = vec![func, collection];
                if let Some(init) = init {
                    children.push(init);
                }
                children
            }
            Self::PatternMatch {
                scrutinee, arms, ..
            } => {
                let mut children: Vec<&MetaNode> = vec![scrutinee];
                for arm in arms {
                    children.push(&arm.pattern);
                    if let Some(guard) = &arm.guard {
                        children.push(guard);
                    }
                    children.push(&arm.body);
                }
                children
            }
            Self::ExceptionHandling {
                body,
                catches,
                else_body,
                ..
            } => {
                let mut children: Vec<&MetaNode> = vec![body];
                for clause in catches {
                    if let Some(pattern) = &clause.pattern {
                        children.push(pattern);
                    }
                    children.push(&clause.body);
                }
                if let Some(else_body) = else_body {
                    children.push(else_body);
                }
                children
            }
            Self::AsyncOperation { body, .. } => vec![body],
            Self::List { items, .. } | Self::Tuple { items, .. } => items.iter().collect(),
            Self::MapLiteral { entries, .. } => entries
                .iter()
                .flat_map(|(key, value)| [key, value])
                .collect(),
            Self::Pair { first, second, .. } => vec![first, second],
            Self::EarlyReturn { value, .. } => value.iter().map(|v| v.as_ref()).collect(),
            Self::InlineMatch { pattern, value, .. } => vec![pattern, value],
        }
    }

    /// Computes the depth of the tree rooted at the node.
    ///
    /// A leaf has depth 1; otherwise the depth is the maximum child depth
    /// plus one.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Counts the nodes of the tree rooted at the node, inclusive.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.node_count())
            .sum::<usize>()
    }

    /// Collects the name of every variable node in the tree into a set.
    pub fn variables(&self) -> std::collections::BTreeSet<String> {
        let mut names = std::collections::BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    /// Recursively collects variable names into the given set.
    fn collect_variables(&self, names: &mut std::collections::BTreeSet<String>) {
        if let Self::Variable { name, .. } = self {
            names.insert(name.clone());
        }

        for child in self.children() {
            child.collect_variables(names);
        }
    }

    /// Produces a copy of the tree with all metadata cleared.
    ///
    /// Useful for comparing trees structurally: two abstractions of
    /// equivalent source in different languages are equal after stripping
    /// line numbers and original-source fragments.
    pub fn strip_metadata(&self) -> MetaNode {
        let mut stripped = self.clone();
        stripped.clear_metadata();
        stripped
    }

    /// Recursively clears metadata in place.
    fn clear_metadata(&mut self) {
        *self.metadata_mut() = Metadata::synthetic();

        match self {
            Self::BinaryOp { lhs, rhs, .. } => {
                lhs.clear_metadata();
                rhs.clear_metadata();
            }
            Self::UnaryOp { operand, .. } => operand.clear_metadata(),
            Self::FunctionCall { args, .. } => args.iter_mut().for_each(Self::clear_metadata),
            Self::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                condition.clear_metadata();
                then_branch.clear_metadata();
                if let Some(else_branch) = else_branch {
                    else_branch.clear_metadata();
                }
            }
            Self::Block { statements, .. } => {
                statements.iter_mut().for_each(Self::clear_metadata)
            }
            Self::Assignment { target, value, .. } => {
                target.clear_metadata();
                value.clear_metadata();
            }
            Self::Loop { form, .. } => match form {
                LoopForm::While { condition, body } => {
                    condition.clear_metadata();
                    body.clear_metadata();
                }
                LoopForm::For {
                    init,
                    condition,
                    step,
                    body,
                } => {
                    init.clear_metadata();
                    condition.clear_metadata();
                    step.clear_metadata();
                    body.clear_metadata();
                }
                LoopForm::ForEach {
                    binding,
                    iterable,
                    body,
                } => {
                    binding.clear_metadata();
                    iterable.clear_metadata();
                    body.clear_metadata();
                }
            },
            Self::Lambda { params, body, .. } => {
                params.iter_mut().for_each(Self::clear_metadata);
                body.clear_metadata();
            }
            Self::CollectionOp {
                func,
                collection,
                init,
                ..
            } => {
                func.clear_metadata();
                collection.clear_metadata();
                if let Some(init) = init {
                    init.clear_metadata();
                }
            }
            Self::PatternMatch {
                scrutinee, arms, ..
            } => {
                scrutinee.clear_metadata();
                for arm in arms {
                    arm.pattern.clear_metadata();
                    if let Some(guard) = &mut arm.guard {
                        guard.clear_metadata();
                    }
                    arm.body.clear_metadata();
                }
            }
            Self::ExceptionHandling {
                body,
                catches,
                else_body,
                ..
            } => {
                body.clear_metadata();
                for clause in catches {
                    if let Some(pattern) = &mut clause.pattern {
                        pattern.clear_metadata();
                    }
                    clause.body.clear_metadata();
                }
                if let Some(else_body) = else_body {
                    else_body.clear_metadata();
                }
            }
            Self::AsyncOperation { body, .. } => body.clear_metadata(),
            Self::List { items, .. } | Self::Tuple { items, .. } => {
                items.iter_mut().for_each(Self::clear_metadata)
            }
            Self::MapLiteral { entries, .. } => {
                for (key, value) in entries {
                    key.clear_metadata();
                    value.clear_metadata();
                }
            }
            Self::Pair { first, second, .. } => {
                first.clear_metadata();
                second.clear_metadata();
            }
            Self::EarlyReturn { value, .. } => {
                if let Some(value) = value {
                    value.clear_metadata();
                }
            }
            Self::InlineMatch { pattern, value, .. } => {
                pattern.clear_metadata();
                value.clear_metadata();
            }
            Self::Literal { .. }
            | Self::Variable { .. }
            | Self::Wildcard { .. }
            | Self::LanguageSpecific { .. } => {}
        }
    }

    /// Determines whether two trees are structurally equal, ignoring
    /// metadata.
    pub fn structurally_equal(&self, other: &MetaNode) -> bool {
        self.strip_metadata() == other.strip_metadata()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Builds `x + 5` for reuse across tests.
    fn sum() -> MetaNode {
        MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5))
    }

    #[test]
    fn depth_is_structural() {
        assert_eq!(MetaNode::integer(1).depth(), 1);
        assert_eq!(sum().depth(), 2);

        let nested = MetaNode::conditional(sum(), MetaNode::block(vec![sum()]), None);
        assert_eq!(nested.depth(), 4);
    }

    #[test]
    fn node_count_is_structural() {
        assert_eq!(sum().node_count(), 3);

        let nested = MetaNode::conditional(sum(), MetaNode::block(vec![sum()]), Some(sum()));
        assert_eq!(nested.node_count(), 1 + 3 + (1 + 3) + 3);
    }

    #[test]
    fn variables_are_the_union_over_children() {
        let node = MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("x"), MetaNode::integer(1)),
            MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::variable("y")),
        ]);

        let names: Vec<_> = node.variables().into_iter().collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn layers_partition_the_grammar() {
        assert_eq!(sum().layer(), Layer::Core);
        assert_eq!(
            MetaNode::while_loop(MetaNode::boolean(true), MetaNode::block(vec![])).layer(),
            Layer::Extended
        );
        assert_eq!(
            MetaNode::language_specific(Language::Python, "yield x", None).layer(),
            Layer::Native
        );
    }

    #[test]
    fn structural_equality_ignores_metadata() {
        let anchored = sum().at_line(42).with_metadata(
            Metadata::at_line(42).with_original_source("x + 5"),
        );
        assert_ne!(anchored, sum());
        assert!(anchored.structurally_equal(&sum()));
    }

    #[test]
    fn pattern_match_children_are_in_declaration_order() {
        let node = MetaNode::pattern_match(
            MetaNode::variable("v"),
            vec![
                MatchArm::new(MetaNode::integer(1), MetaNode::string("one"))
                    .with_guard(MetaNode::boolean(true)),
                MatchArm::new(MetaNode::wildcard(), MetaNode::string("other")),
            ],
        );

        let kinds: Vec<_> = node.children().iter().map(|c| c.kind_name()).collect();
        assert_eq!(
            kinds,
            [
                "variable", "literal", "literal", "literal", "wildcard", "literal"
            ]
        );
    }
}
