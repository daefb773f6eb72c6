//! The Ruby parser.

use metastatic_ast::Diagnostic;
use metastatic_ast::Location;

use super::ast::Ast;
use super::ast::Block;
use super::ast::Expr;
use super::ast::Rescue;
use super::ast::Stmt;
use super::ast::StmtKind;
use super::ast::When;
use super::lexer::Token;
use super::lexer::TokenKind;
use super::lexer::lex;

/// Statement heads the parser recognizes but does not model.
const UNMODELED_HEADS: &[&str] = &[
    "attr_accessor", "attr_reader", "attr_writer", "break", "class", "def", "loop", "module",
    "next", "redo", "require_relative", "retry", "super", "unless", "until", "yield",
];

/// Identifiers callable without parentheses.
const COMMANDS: &[&str] = &["p", "print", "puts", "raise", "require"];

/// Parses Ruby source into a native tree.
pub fn parse(source: &str) -> Result<Ast, Diagnostic> {
    let output = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: output.tokens,
        pos: 0,
    };

    let mut body = Vec::new();
    parser.skip_separators();
    while !parser.at(TokenKind::Eof) {
        body.push(parser.statement()?);
        parser.skip_separators();
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
    /// The lexed tokens.
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
            _ => format!("`{text}`", text = token.text),
        };

        Diagnostic::error(format!("expected {what}, found {found}"))
            .with_location(Location::of_offset(self.source, token.span.start()))
            .with_highlight(token.span)
    }

    /// Skips newline and semicolon separators.
    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.bump();
        }
    }

    /// Parses one statement.
    fn statement(&mut self) -> Result<Stmt, Diagnostic> {
        let line = self.peek().line;
        let kind = match self.peek().kind {
            TokenKind::If => self.if_statement()?,
            TokenKind::While => self.while_statement()?,
            TokenKind::Case => self.case_statement()?,
            TokenKind::Begin => self.begin_statement()?,
            TokenKind::Return => self.return_statement()?,
            TokenKind::Ident
                if UNMODELED_HEADS.contains(&self.peek().text.as_str()) =>
            {
                self.raw_statement()
            }
            _ if self.line_has_unmodeled_operator() => self.raw_statement(),
            TokenKind::Ident
                if COMMANDS.contains(&self.peek().text.as_str())
                    && self.command_follows() =>
            {
                self.command_statement()?
            }
            _ => self.expr_statement()?,
        };

        Ok(Stmt { line, kind })
    }

    /// Determines whether a paren-less command argument follows.
    fn command_follows(&self) -> bool {
        matches!(
            self.peek2_kind(),
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::Sym
                | TokenKind::Ident
                | TokenKind::Const
                | TokenKind::Ivar
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::LBracket
        )
    }

    /// Scans the current logical line for operators outside the modeled
    /// subset.
    fn line_has_unmodeled_operator(&self) -> bool {
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Shovel
                | TokenKind::Spaceship
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::OrAssign
                | TokenKind::Amp => return true,
                TokenKind::Newline | TokenKind::Eof => return false,
                _ => {}
            }
        }

        false
    }

    /// Consumes a statement verbatim, tracking `end`-terminated nesting.
    fn raw_statement(&mut self) -> StmtKind {
        let start = self.peek().span.start();
        let mut end = start;
        let mut depth = 0usize;

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::If
                | TokenKind::While
                | TokenKind::Case
                | TokenKind::Begin
                | TokenKind::Do => depth += 1,
                TokenKind::Ident
                    if matches!(
                        self.peek().text.as_str(),
                        "def" | "class" | "module" | "unless" | "until" | "loop"
                    ) =>
                {
                    depth += 1;
                }
                TokenKind::End => depth = depth.saturating_sub(1),
                _ => {}
            }

            let token = self.bump();
            if token.kind != TokenKind::Newline {
                end = end.max(token.span.end());
            }
        }

        StmtKind::Raw(self.source[start..end].trim_end().to_string())
    }

    /// Parses a paren-less command call statement.
    fn command_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        let name = self.bump().text;
        let mut args = vec![self.expression()?];
        while self.at(TokenKind::Comma) {
            self.bump();
            args.push(self.expression()?);
        }

        Ok(StmtKind::Expr(Expr::MethodCall {
            recv: None,
            name,
            args,
            block: None,
        }))
    }

    /// Parses an expression or assignment statement.
    fn expr_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        let expr = self.expression()?;
        if self.at(TokenKind::Assign) {
            self.bump();
            let value = self.expression()?;
            return match expr {
                Expr::Var(_) | Expr::Ivar(_) => Ok(StmtKind::Assign {
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
        if matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::End
        ) {
            return Ok(StmtKind::Return(None));
        }

        Ok(StmtKind::Return(Some(self.expression()?)))
    }

    /// Parses an `if`/`elsif`/`else` statement.
    fn if_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::If, "`if`")?;
        let cond = self.expression()?;
        if self.at(TokenKind::Then) {
            self.bump();
        }

        let then_body = self.body_until(&[TokenKind::Elsif, TokenKind::Else, TokenKind::End])?;

        let mut elsifs = Vec::new();
        while self.at(TokenKind::Elsif) {
            self.bump();
            let elsif_cond = self.expression()?;
            if self.at(TokenKind::Then) {
                self.bump();
            }
            let body =
                self.body_until(&[TokenKind::Elsif, TokenKind::Else, TokenKind::End])?;
            elsifs.push((elsif_cond, body));
        }

        let else_body = if self.at(TokenKind::Else) {
            self.bump();
            self.body_until(&[TokenKind::End])?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::End, "`end`")?;
        Ok(StmtKind::If {
            cond,
            then_body,
            elsifs,
            else_body,
        })
    }

    /// Parses a `while` loop.
    fn while_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::While, "`while`")?;
        let cond = self.expression()?;
        if self.at(TokenKind::Do) {
            self.bump();
        }
        let body = self.body_until(&[TokenKind::End])?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(StmtKind::While { cond, body })
    }

    /// Parses a `case`/`when` statement.
    fn case_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::Case, "`case`")?;
        let subject = self.expression()?;
        self.skip_separators();

        let mut whens = Vec::new();
        while self.at(TokenKind::When) {
            self.bump();
            let mut values = vec![self.expression()?];
            while self.at(TokenKind::Comma) {
                self.bump();
                values.push(self.expression()?);
            }
            if self.at(TokenKind::Then) {
                self.bump();
            }
            let body = self.body_until(&[TokenKind::When, TokenKind::Else, TokenKind::End])?;
            whens.push(When { values, body });
        }

        if whens.is_empty() {
            return Err(self.unexpected("`when`"));
        }

        let else_body = if self.at(TokenKind::Else) {
            self.bump();
            self.body_until(&[TokenKind::End])?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::End, "`end`")?;
        Ok(StmtKind::Case {
            subject,
            whens,
            else_body,
        })
    }

    /// Parses a `begin`/`rescue`/`else` statement.
    fn begin_statement(&mut self) -> Result<StmtKind, Diagnostic> {
        self.expect(TokenKind::Begin, "`begin`")?;
        let body = self.body_until(&[TokenKind::Rescue, TokenKind::Else, TokenKind::End])?;

        let mut rescues = Vec::new();
        while self.at(TokenKind::Rescue) {
            self.bump();
            let class = if matches!(self.peek().kind, TokenKind::Const) {
                Some(Expr::Var(self.bump().text))
            } else {
                None
            };
            let rescue_body =
                self.body_until(&[TokenKind::Rescue, TokenKind::Else, TokenKind::End])?;
            rescues.push(Rescue {
                class,
                body: rescue_body,
            });
        }

        let else_body = if self.at(TokenKind::Else) {
            self.bump();
            self.body_until(&[TokenKind::End])?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::End, "`end`")?;
        Ok(StmtKind::Begin {
            body,
            rescues,
            else_body,
        })
    }

    /// Parses statements until one of the stop tokens.
    fn body_until(&mut self, stops: &[TokenKind]) -> Result<Vec<Stmt>, Diagnostic> {
        let mut body = Vec::new();
        self.skip_separators();
        while !stops.contains(&self.peek().kind) && !self.at(TokenKind::Eof) {
            body.push(self.statement()?);
            self.skip_separators();
        }

        Ok(body)
    }

    /// Parses an expression (lowest precedence: ternary).
    fn expression(&mut self) -> Result<Expr, Diagnostic> {
        let cond = self.or_expr()?;
        if self.at(TokenKind::Question) {
            self.bump();
            let then_value = self.expression()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let else_value = self.expression()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            });
        }

        Ok(cond)
    }

    /// Parses an `or`/`||` chain.
    fn or_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.and_expr()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Or => "or",
                TokenKind::OrOr => "||",
                _ => break,
            };
            self.bump();
            let right = self.and_expr()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses an `and`/`&&` chain.
    fn and_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.not_expr()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::And => "and",
                TokenKind::AndAnd => "&&",
                _ => break,
            };
            self.bump();
            let right = self.not_expr()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a `not`/`!` prefix.
    fn not_expr(&mut self) -> Result<Expr, Diagnostic> {
        let op = match self.peek().kind {
            TokenKind::Not => "not",
            TokenKind::Bang => "!",
            _ => return self.comparison(),
        };

        self.bump();
        let operand = self.not_expr()?;
        Ok(Expr::UnaryOp {
            op: op.to_string(),
            operand: Box::new(operand),
        })
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
        Ok(Expr::BinOp {
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
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                TokenKind::Percent => "%",
                _ => break,
            };
            self.bump();
            let right = self.unary()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a unary minus prefix.
    fn unary(&mut self) -> Result<Expr, Diagnostic> {
        if self.at(TokenKind::Minus) {
            self.bump();
            let operand = self.unary()?;
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
            let exponent = self.unary()?;
            return Ok(Expr::BinOp {
                op: "**".to_string(),
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    /// Parses method-call chains after an atom.
    fn postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.atom()?;
        while self.at(TokenKind::Dot) {
            self.bump();
            let name = match self.peek().kind {
                TokenKind::Ident | TokenKind::Const => self.bump().text,
                _ => return Err(self.unexpected("a method name")),
            };

            let args = if self.at(TokenKind::LParen) {
                self.bump();
                self.items(TokenKind::RParen)?
            } else {
                Vec::new()
            };

            let block = self.maybe_block()?;
            expr = Expr::MethodCall {
                recv: Some(Box::new(expr)),
                name,
                args,
                block,
            };
        }

        Ok(expr)
    }

    /// Parses an attached brace or `do` block, when present.
    fn maybe_block(&mut self) -> Result<Option<Block>, Diagnostic> {
        let close = if self.at(TokenKind::LBrace) {
            TokenKind::RBrace
        } else if self.at(TokenKind::Do) {
            TokenKind::End
        } else {
            return Ok(None);
        };
        self.bump();

        let mut params = Vec::new();
        if self.at(TokenKind::Bar) {
            self.bump();
            while self.at(TokenKind::Ident) {
                params.push(self.bump().text);
                if self.at(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Bar, "`|`")?;
        }

        let body = self.body_until(&[close])?;
        self.expect(close, "a block terminator")?;

        Ok(Some(Block { params, body }))
    }

    /// Parses a comma-separated expression list up to a closing token.
    fn items(&mut self, close: TokenKind) -> Result<Vec<Expr>, Diagnostic> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.expression()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }

        self.expect(close, "a closing delimiter")?;
        Ok(items)
    }

    /// Parses an atomic expression.
    fn atom(&mut self) -> Result<Expr, Diagnostic> {
        match self.peek().kind {
            TokenKind::Int => {
                let token = self.bump();
                token
                    .text
                    .replace('_', "")
                    .parse::<i64>()
                    .map(Expr::Int)
                    .map_err(|_| {
                        Diagnostic::error("integer literal out of range")
                            .with_location(Location::of_offset(self.source, token.span.start()))
                            .with_highlight(token.span)
                    })
            }
            TokenKind::Float => {
                let token = self.bump();
                token
                    .text
                    .replace('_', "")
                    .parse::<f64>()
                    .map(Expr::Float)
                    .map_err(|_| {
                        Diagnostic::error("invalid float literal")
                            .with_location(Location::of_offset(self.source, token.span.start()))
                            .with_highlight(token.span)
                    })
            }
            TokenKind::Str => {
                let token = self.bump();
                Ok(Expr::Str(unescape(&token.text)))
            }
            TokenKind::Sym => {
                let token = self.bump();
                Ok(Expr::Sym(token.text[1..].to_string()))
            }
            TokenKind::Ivar => Ok(Expr::Ivar(self.bump().text)),
            TokenKind::True => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::Nil => {
                self.bump();
                Ok(Expr::Nil)
            }
            TokenKind::Const => Ok(Expr::Var(self.bump().text)),
            TokenKind::Ident => {
                let name = self.bump().text;
                if self.at(TokenKind::LParen) {
                    self.bump();
                    let args = self.items(TokenKind::RParen)?;
                    let block = self.maybe_block()?;
                    return Ok(Expr::MethodCall {
                        recv: None,
                        name,
                        args,
                        block,
                    });
                }

                Ok(Expr::Var(name))
            }
            TokenKind::Lambda => {
                self.bump();
                let block = self
                    .maybe_block()?
                    .ok_or_else(|| self.unexpected("a lambda block"))?;
                Ok(Expr::Lambda {
                    params: block.params,
                    body: block.body,
                })
            }
            TokenKind::Stabby => {
                self.bump();
                let mut params = Vec::new();
                if self.at(TokenKind::LParen) {
                    self.bump();
                    while self.at(TokenKind::Ident) {
                        params.push(self.bump().text);
                        if self.at(TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`")?;
                }

                self.expect(TokenKind::LBrace, "`{`")?;
                let body = self.body_until(&[TokenKind::RBrace])?;
                self.expect(TokenKind::RBrace, "`}`")?;
                Ok(Expr::Lambda { params, body })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                Ok(Expr::Array(self.items(TokenKind::RBracket)?))
            }
            TokenKind::LBrace => {
                self.bump();
                let mut entries = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let key = self.expression()?;
                    self.expect(TokenKind::FatArrow, "`=>`")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if self.at(TokenKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "`}`")?;
                Ok(Expr::Hash(entries))
            }
            _ => Err(self.unexpected("an expression")),
        }
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
    fn it_parses_commands_and_blocks() {
        let ast = parse("puts \"hi\"\nitems.each do |v|\n  total = v\nend").unwrap();
        assert!(matches!(
            &ast.body[0].kind,
            StmtKind::Expr(Expr::MethodCall { recv: None, name, .. }) if name == "puts"
        ));
        match &ast.body[1].kind {
            StmtKind::Expr(Expr::MethodCall { name, block, .. }) => {
                assert_eq!(name, "each");
                assert_eq!(block.as_ref().unwrap().params, ["v"]);
            }
            other => panic!("expected a method call, got {other:?}"),
        }
    }

    #[test]
    fn it_parses_if_elsif_chains() {
        let source = "if a\n  x = 1\nelsif b\n  x = 2\nelse\n  x = 3\nend";
        let ast = parse(source).unwrap();
        match &ast.body[0].kind {
            StmtKind::If { elsifs, else_body, .. } => {
                assert_eq!(elsifs.len(), 1);
                assert_eq!(else_body.len(), 1);
            }
            other => panic!("expected an if, got {other:?}"),
        }
    }

    #[test]
    fn definitions_stay_verbatim() {
        let source = "def double(x)\n  x * 2\nend\ny = 1";
        let ast = parse(source).unwrap();
        assert_eq!(
            ast.body[0].kind,
            StmtKind::Raw("def double(x)\n  x * 2\nend".to_string())
        );
        assert!(matches!(&ast.body[1].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn shovel_pushes_stay_verbatim() {
        let ast = parse("results << item").unwrap();
        assert!(matches!(&ast.body[0].kind, StmtKind::Raw(_)));
    }
}
