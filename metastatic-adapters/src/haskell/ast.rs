//! The native Haskell syntax tree.

/// A parsed Haskell source fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ast {
    /// The top-level declarations in source order.
    pub decls: Vec<Decl>,
    /// The number of comment lines observed while parsing.
    pub comment_count: u32,
    /// The number of physical source lines.
    pub line_count: u32,
}

/// A declaration with its one-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// The one-based source line the declaration starts on.
    pub line: u32,
    /// The declaration itself.
    pub kind: DeclKind,
}

/// A Haskell declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// An equation `name params = body`.
    Bind {
        /// The bound name.
        name: String,
        /// The parameter names.
        params: Vec<String>,
        /// The right-hand side.
        body: Expr,
    },
    /// A bare expression (as in a REPL snippet).
    Expr(Expr),
    /// A verbatim fragment the parser does not model.
    Raw(String),
}

/// One alternative of a `case` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Alt {
    /// The alternative pattern.
    pub pattern: Expr,
    /// The alternative body.
    pub body: Expr,
}

/// A Haskell expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A string literal (unescaped).
    Str(String),
    /// A boolean literal.
    Bool(bool),
    /// A possibly qualified name or constructor.
    Var(String),
    /// An application `f a b`, flattened.
    App {
        /// The applied function.
        func: Box<Expr>,
        /// The ordered arguments.
        args: Vec<Expr>,
    },
    /// A binary operation.
    BinOp {
        /// The operator as written.
        op: String,
        /// The left operand.
        left: Box<Expr>,
        /// The right operand.
        right: Box<Expr>,
    },
    /// A unary minus.
    UnaryOp {
        /// The operator as written.
        op: String,
        /// The operand.
        operand: Box<Expr>,
    },
    /// An `if … then … else …` expression.
    If {
        /// The tested condition.
        cond: Box<Expr>,
        /// The value when the condition holds.
        then_value: Box<Expr>,
        /// The value otherwise.
        else_value: Box<Expr>,
    },
    /// A `case … of …` expression.
    Case {
        /// The matched scrutinee.
        scrutinee: Box<Expr>,
        /// The alternatives in source order.
        alts: Vec<Alt>,
    },
    /// A lambda `\params -> body`.
    Lambda {
        /// The parameter names.
        params: Vec<String>,
        /// The body.
        body: Box<Expr>,
    },
    /// A `let name = value in body` expression.
    Let {
        /// The bound name.
        name: String,
        /// The bound value.
        value: Box<Expr>,
        /// The body the binding scopes over.
        body: Box<Expr>,
    },
    /// A list literal.
    List(Vec<Expr>),
    /// A tuple literal.
    Tuple(Vec<Expr>),
    /// The `_` wildcard.
    Wildcard,
}
