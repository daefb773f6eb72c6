//! The Python statement and expression parser.

use metastatic_ast::Diagnostic;
use metastatic_ast::Location;

use super::ast::Ast;
use super::ast::ExceptHandler;
use super::ast::Expr;
use super::ast::MatchCase;
use super::ast::Stmt;
use super::ast::StmtKind;
use super::lexer::Token;
use super::lexer::TokenKind;
use super::lexer::lex;

/// Statement heads the parser recognizes but does not model.
///
/// Statements starting with one of these fall through verbatim so
/// abstraction can wrap them in the native escape hatch.
const UNMODELED_HEADS: &[&str] = &[
    "assert", "async", "class", "def", "del", "from", "global", "import", "nonlocal", "pass",
    "raise", "with", "yield",
];

/// Parses Python source into a native tree.
pub fn parse(source: &str) -> Result<Ast, Diagnostic> {
    let output = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: output.tokens,
        pos: 0,
    };

    let mut body = Vec::new();
    parser.skip_newlines();
    while !parser.at(TokenKind::Eof) {
        body.push(parser.statement()?);
        parser.skip_newlines();
    }

    Ok(Ast {
        body,
        comment_count: output.comment_count,
        line_count: source.lines().count() as u32,
    })
}

/// The recursive-descent parser state.
struct Parser<'a> {
    /// The source being parsed.
    source: &'a str,
    /// The layout-processed tokens.
    tokens: Vec<Token>,
    /// The index of the next token.
    pos: usize,
}

impl Parser<'_> {
    /// Gets the next token without consuming it.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Gets the kind of the token after the next one.
    fn peek2_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Determines whether the next token has the given kind.
    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Determines whether the next token is a name with the given text.
    fn at_name(&self, text: &str) -> bool {
        self.at(TokenKind::Name) && self.peek().text == text
    }

    /// Consumes and returns the next token.
    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consumes the next token, requiring the given kind.
    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Diagnostic> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Builds an unexpected-token diagnostic at the current position.
    fn unexpected(&self, what: &str) -> Diagnostic {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            _ => format!("`{text}`", text = token.text),
        };

        Diagnostic::error(format!("expected {what}, found {found}"))
            .with_location(Location::of_offset(self.source, token.span.start()))
            .with_highlight(token.span)
    }

    /// Skips logical line separators.
    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    /// Parses one statement, consuming its trailing line separator.
    fn statement(&mut self) -> Result<Stmt, Diagnostic> {
        let line = self.peek().line;
        let kind = match self.peek().kind {
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::For => self.for_statement()?,
            TokenKind::Try => self.try_statement()?,
            TokenKind::Return => self.return_statement()?,
            TokenKind::At => self.raw_statement(),
            TokenKind::Name if UNMODELED_HEADS.contains(&self.peek().text.as_str()) => {
                self.raw_statement()
            }
            TokenKind::Name
                if self.peek().text == "match"
                    && self.peek2_kind() != TokenKind::LParen
                    && starts_expression(self.peek2_kind()) =>
            {
                self.match_statement()?
            }
            _ => self.small_statement()?,
        };

        if self.at(TokenKind::Newline) {
            self.bump();
        }

        Ok(Stmt { line, kind })
    }

    /// Parses an expression or assignment statement without consuming the
    /// line separator.
    fn small_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        if self.at(TokenKind::Return) {
            return self.return_statement();
        }

        let expr = self.expression()?;
        if self.at(TokenKind::Assign) {
            self.bump();
            let value = self.expression()?;
            return match expr {
                Expr::Name(_) | Expr::Tuple(_) => Ok(StmtKind::Assign {
                    target: expr,
                    value,
                }),
                _ => Err(self.unexpected("an assignable target")),
            };
        }

        Ok(StmtKind::Expr(expr))
    }

    /// Parses a `return` statement.
    fn return_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::Return, "`return`")?;
        if self.at(TokenKind::Newline) || self.at(TokenKind::Eof) || self.at(TokenKind::Dedent) {
            return Ok(StmtKind::Return(None));
        }

        Ok(StmtKind::Return(Some(self.expression()?)))
    }

    /// Parses an `if`/`elif`/`else` chain.
    fn if_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::If, "`if`")?;
        self.if_tail()
    }

    /// Parses the remainder of an `if` or `elif` after its keyword.
    fn if_tail(&mut self) -> Result<StmtKind, Diagnostic> {
        let test = self.expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let body = self.suite()?;

        // An inline suite leaves the separating newline before `elif`/`else`.
        if self.at(TokenKind::Newline)
            && matches!(self.peek2_kind(), TokenKind::Elif | TokenKind::Else)
        {
            self.bump();
        }

        let orelse = if self.at(TokenKind::Elif) {
            let line = self.bump().line;
            vec![Stmt {
                line,
                kind: self.if_tail()?,
            }]
        } else if self.at(TokenKind::Else) {
            self.bump();
            self.expect(TokenKind::Colon, "`:`")?;
            self.suite()?
        } else {
            Vec::new()
        };

        Ok(StmtKind::If { test, body, orelse })
    }

    /// Parses a `while` loop.
    fn while_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::While, "`while`")?;
        let test = self.expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        Ok(StmtKind::While {
            test,
            body: self.suite()?,
        })
    }

    /// Parses a `for … in …` loop.
    fn for_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::For, "`for`")?;
        let target = self.expression()?;
        if !matches!(target, Expr::Name(_) | Expr::Tuple(_)) {
            return Err(self.unexpected("an iteration target"));
        }

        self.expect(TokenKind::In, "`in`")?;
        let iter = self.expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        Ok(StmtKind::For {
            target,
            iter,
            body: self.suite()?,
        })
    }

    /// Parses a `try`/`except`/`else` statement.
    fn try_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::Try, "`try`")?;
        self.expect(TokenKind::Colon, "`:`")?;
        let body = self.suite()?;

        let mut handlers = Vec::new();
        loop {
            if self.at(TokenKind::Newline)
                && matches!(self.peek2_kind(), TokenKind::Except | TokenKind::Else)
            {
                self.bump();
            }

            if !self.at(TokenKind::Except) {
                break;
            }

            self.bump();
            let kind = if self.at(TokenKind::Colon) {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect(TokenKind::Colon, "`:`")?;
            handlers.push(ExceptHandler {
                kind,
                body: self.suite()?,
            });
        }

        if handlers.is_empty() {
            return Err(self.unexpected("`except`"));
        }

        let orelse = if self.at(TokenKind::Else) {
            self.bump();
            self.expect(TokenKind::Colon, "`:`")?;
            self.suite()?
        } else {
            Vec::new()
        };

        Ok(StmtKind::Try {
            body,
            handlers,
            orelse,
        })
    }

    /// Parses a `match` statement.
    fn match_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.bump();
        let subject = self.expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        self.expect(TokenKind::Newline, "end of line")?;
        self.expect(TokenKind::Indent, "an indented block")?;

        let mut cases = Vec::new();
        while self.at_name("case") {
            self.bump();
            let pattern = to_pattern(self.expression()?);
            let guard = if self.at(TokenKind::If) {
                self.bump();
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Colon, "`:`")?;
            cases.push(MatchCase {
                pattern,
                guard,
                body: self.suite()?,
            });
            self.skip_newlines();
        }

        if cases.is_empty() {
            return Err(self.unexpected("`case`"));
        }

        self.expect(TokenKind::Dedent, "dedent")?;
        Ok(StmtKind::Match { subject, cases })
    }

    /// Parses a suite: an indented block, or a single inline statement.
    fn suite(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        if self.at(TokenKind::Newline) {
            self.bump();
            self.expect(TokenKind::Indent, "an indented block")?;

            let mut stmts = Vec::new();
            self.skip_newlines();
            while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
                stmts.push(self.statement()?);
                self.skip_newlines();
            }

            self.expect(TokenKind::Dedent, "dedent")?;
            return Ok(stmts);
        }

        let line = self.peek().line;
        let kind = self.small_statement()?;
        Ok(vec![Stmt { line, kind }])
    }

    /// Consumes a statement the parser does not model, keeping its verbatim
    /// text (including any indented suite).
    fn raw_statement(&mut self) -> StmtKind {
        let start = self.peek().span.start();
        let mut end = start;

        while !matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof) {
            end = self.bump().span.end();
        }

        // A trailing `:` means an indented suite belongs to the fragment.
        if self.at(TokenKind::Newline) && self.peek2_kind() == TokenKind::Indent {
            self.bump();
            self.bump();
            let mut depth = 1usize;
            while depth > 0 && !self.at(TokenKind::Eof) {
                match self.peek().kind {
                    TokenKind::Indent => depth += 1,
                    TokenKind::Dedent => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    let token = self.bump();
                    if token.span.end() > end && token.kind != TokenKind::Newline {
                        end = token.span.end();
                    }
                } else {
                    self.bump();
                }
            }
        }

        StmtKind::Raw(self.source[start..end].trim_end().to_string())
    }

    /// Parses an expression.
    fn expression(&mut self) -> Result<Expr, Diagnostic> {
        let value = self.or_expr()?;
        if self.at(TokenKind::If) {
            self.bump();
            let test = self.or_expr()?;
            self.expect(TokenKind::Else, "`else`")?;
            let orelse = self.expression()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(value),
                orelse: Box::new(orelse),
            });
        }

        Ok(value)
    }

    /// Parses an `or` chain.
    fn or_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.and_expr()?;
        while self.at(TokenKind::Or) {
            self.bump();
            let right = self.and_expr()?;
            left = Expr::BoolOp {
                op: "or".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses an `and` chain.
    fn and_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.not_expr()?;
        while self.at(TokenKind::And) {
            self.bump();
            let right = self.not_expr()?;
            left = Expr::BoolOp {
                op: "and".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a `not` prefix.
    fn not_expr(&mut self) -> Result<Expr, Diagnostic> {
        if self.at(TokenKind::Not) {
            self.bump();
            let operand = self.not_expr()?;
            return Ok(Expr::UnaryOp {
                op: "not".to_string(),
                operand: Box::new(operand),
            });
        }

        self.comparison()
    }

    /// Parses a (non-chained) comparison.
    fn comparison(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.arith()?;
        let op = match self.peek().kind {
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            _ => return Ok(left),
        };

        self.bump();
        let right = self.arith()?;
        Ok(Expr::Compare {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Parses an additive chain.
    fn arith(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                _ => break,
            };
            self.bump();
            let right = self.term()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a multiplicative chain.
    fn term(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                TokenKind::DoubleSlash => "//",
                TokenKind::Percent => "%",
                _ => break,
            };
            self.bump();
            let right = self.factor()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a unary minus prefix.
    fn factor(&mut self) -> Result<Expr, Diagnostic> {
        if self.at(TokenKind::Minus) {
            self.bump();
            let operand = self.factor()?;
            return Ok(Expr::UnaryOp {
                op: "-".to_string(),
                operand: Box::new(operand),
            });
        }

        self.power()
    }

    /// Parses a right-associative `**`.
    fn power(&mut self) -> Result<Expr, Diagnostic> {
        let base = self.postfix()?;
        if self.at(TokenKind::DoubleStar) {
            self.bump();
            let exponent = self.factor()?;
            return Ok(Expr::BinOp {
                op: "**".to_string(),
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    /// Parses attribute access and calls after an atom.
    fn postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.atom()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.bump();
                    let attr = self.expect(TokenKind::Name, "an attribute name")?;
                    expr = match expr {
                        Expr::Name(name) => Expr::Name(format!("{name}.{attr}", attr = attr.text)),
                        _ => return Err(self.unexpected("a dotted name")),
                    };
                }
                TokenKind::LParen => {
                    let func = match &expr {
                        Expr::Name(name) => name.clone(),
                        _ => return Err(self.unexpected("a callable name")),
                    };
                    self.bump();
                    let args = self.arguments(TokenKind::RParen)?;
                    expr = Expr::Call { func, args };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parses a comma-separated argument list up to a closing token.
    fn arguments(&mut self, close: TokenKind) -> Result<Vec<Expr>, Diagnostic> {
        let mut args = Vec::new();
        while !self.at(close) {
            args.push(self.expression()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }

        self.expect(close, "a closing delimiter")?;
        Ok(args)
    }

    /// Parses an atomic expression.
    fn atom(&mut self) -> Result<Expr, Diagnostic> {
        match self.peek().kind {
            TokenKind::Int => {
                let token = self.bump();
                token.text.parse::<i64>().map(Expr::Int).map_err(|_| {
                    Diagnostic::error("integer literal out of range")
                        .with_location(Location::of_offset(self.source, token.span.start()))
                        .with_highlight(token.span)
                })
            }
            TokenKind::Float => {
                let token = self.bump();
                token.text.parse::<f64>().map(Expr::Float).map_err(|_| {
                    Diagnostic::error("invalid float literal")
                        .with_location(Location::of_offset(self.source, token.span.start()))
                        .with_highlight(token.span)
                })
            }
            TokenKind::Str => {
                let token = self.bump();
                Ok(Expr::Str(unescape(&token.text)))
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::NoneKw => {
                self.bump();
                Ok(Expr::None)
            }
            TokenKind::Name => Ok(Expr::Name(self.bump().text)),
            TokenKind::Lambda => {
                self.bump();
                let mut params = Vec::new();
                while self.at(TokenKind::Name) {
                    params.push(self.bump().text);
                    if self.at(TokenKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::Colon, "`:`")?;
                let body = self.expression()?;
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                })
            }
            TokenKind::Await => {
                self.bump();
                let operand = self.factor()?;
                Ok(Expr::Await(Box::new(operand)))
            }
            TokenKind::LParen => {
                self.bump();
                let first = self.expression()?;
                if self.at(TokenKind::Comma) {
                    self.bump();
                    let mut items = vec![first];
                    items.extend(self.arguments(TokenKind::RParen)?);
                    return Ok(Expr::Tuple(items));
                }
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(first)
            }
            TokenKind::LBracket => {
                self.bump();
                Ok(Expr::List(self.arguments(TokenKind::RBracket)?))
            }
            TokenKind::LBrace => {
                self.bump();
                let mut entries = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let key = self.expression()?;
                    self.expect(TokenKind::Colon, "`:`")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if self.at(TokenKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "`}`")?;
                Ok(Expr::Dict(entries))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

/// Determines whether a token kind can start an expression.
fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Name
            | TokenKind::True
            | TokenKind::False
            | TokenKind::NoneKw
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Not
            | TokenKind::Lambda
            | TokenKind::Await
    )
}

/// Rewrites `_` names into wildcard patterns, recursing into containers.
fn to_pattern(expr: Expr) -> Expr {
    match expr {
        Expr::Name(name) if name == "_" => Expr::Wildcard,
        Expr::Tuple(items) => Expr::Tuple(items.into_iter().map(to_pattern).collect()),
        Expr::List(items) => Expr::List(items.into_iter().map(to_pattern).collect()),
        other => other,
    }
}

/// Removes quotes and resolves escapes in a string literal.
fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn it_parses_expressions_with_precedence() {
        let ast = parse("x + 5 * y").unwrap();
        assert_eq!(
            ast.body,
            [Stmt {
                line: 1,
                kind: StmtKind::Expr(Expr::BinOp {
                    op: "+".to_string(),
                    left: Box::new(Expr::Name("x".to_string())),
                    right: Box::new(Expr::BinOp {
                        op: "*".to_string(),
                        left: Box::new(Expr::Int(5)),
                        right: Box::new(Expr::Name("y".to_string())),
                    }),
                }),
            }]
        );
    }

    #[test]
    fn it_parses_inline_if_else() {
        let ast = parse("if a: x = 1\nelse: x = 2").unwrap();
        match &ast.body[0].kind {
            StmtKind::If { test, body, orelse } => {
                assert_eq!(*test, Expr::Name("a".to_string()));
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected an if statement, got {other:?}"),
        }
    }

    #[test]
    fn it_keeps_unmodeled_statements_verbatim() {
        let ast = parse("def f(x):\n    return x\ny = 2").unwrap();
        assert_eq!(
            ast.body[0].kind,
            StmtKind::Raw("def f(x):\n    return x".to_string())
        );
        assert!(matches!(ast.body[1].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn it_parses_match_statements() {
        let source = "match v:\n    case 1:\n        a = 1\n    case _:\n        a = 2";
        let ast = parse(source).unwrap();
        match &ast.body[0].kind {
            StmtKind::Match { subject, cases } => {
                assert_eq!(*subject, Expr::Name("v".to_string()));
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[1].pattern, Expr::Wildcard);
            }
            other => panic!("expected a match statement, got {other:?}"),
        }
    }

    #[test]
    fn it_reports_parse_errors_with_locations() {
        let err = parse("x = = 5").unwrap_err();
        assert!(err.message().contains("expected an expression"));
        assert_eq!(err.location().unwrap(), Location::new(1, 5));
    }
}
