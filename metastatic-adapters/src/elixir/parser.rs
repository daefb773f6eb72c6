//! The Elixir parser.

use metastatic_ast::Diagnostic;
use metastatic_ast::Location;

use super::ast::Ast;
use super::ast::Clause;
use super::ast::Expr;
use super::ast::Form;
use super::lexer::Token;
use super::lexer::TokenKind;
use super::lexer::lex;

/// Form heads the parser recognizes but does not model.
const UNMODELED_HEADS: &[&str] = &[
    "alias", "cond", "def", "defimpl", "defmacro", "defmacrop", "defmodule", "defp",
    "defprotocol", "defstruct", "import", "quote", "raise", "receive", "require", "unless",
    "unquote", "use", "with",
];

/// Parses Elixir source into a native tree.
pub fn parse(source: &str) -> Result<Ast, Diagnostic> {
    let output = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: output.tokens,
        pos: 0,
    };

    let mut forms = Vec::new();
    parser.skip_separators();
    while !parser.at(TokenKind::Eof) {
        forms.push(parser.form()?);
        parser.skip_separators();
    }

    Ok(Ast {
        forms,
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

    /// Parses one top-level form.
    fn form(&mut self) -> Result<Form, Diagnostic> {
        let line = self.peek().line;

        let head_is_unmodeled = self.at(TokenKind::At)
            || (self.at(TokenKind::Ident)
                && UNMODELED_HEADS.contains(&self.peek().text.as_str()));
        if head_is_unmodeled || self.line_has_unmodeled_operator() {
            return Ok(Form {
                line,
                expr: self.raw_form(),
            });
        }

        Ok(Form {
            line,
            expr: self.expression()?,
        })
    }

    /// Scans the current logical line for operators outside the modeled
    /// subset (pipes, captures, cons cells, bare keyword lists).
    fn line_has_unmodeled_operator(&self) -> bool {
        let keyword_form = matches!(self.peek().kind, TokenKind::If | TokenKind::Try);
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Pipe | TokenKind::Capture | TokenKind::At | TokenKind::Bar => {
                    return true;
                }
                TokenKind::KwKey if !keyword_form => return true,
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::MapOpen
                | TokenKind::Do
                | TokenKind::Fn
                | TokenKind::Case
                | TokenKind::If
                | TokenKind::Try => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::End => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Newline if depth == 0 => return false,
                TokenKind::Eof => return false,
                _ => {}
            }
        }

        false
    }

    /// Consumes a form verbatim, tracking `do`/`fn` … `end` nesting.
    fn raw_form(&mut self) -> Expr {
        let start = self.peek().span.start();
        let mut end = start;
        let mut depth = 0usize;

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Do | TokenKind::Fn => depth += 1,
                TokenKind::End => depth = depth.saturating_sub(1),
                _ => {}
            }

            let token = self.bump();
            if token.kind != TokenKind::Newline {
                end = end.max(token.span.end());
            }
        }

        Expr::Raw(self.source[start..end].trim_end().to_string())
    }

    /// Parses an expression (lowest precedence: `=` matches).
    fn expression(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.or_expr()?;
        if self.at(TokenKind::Assign) {
            self.bump();
            let right = self.expression()?;
            return Ok(Expr::Match {
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
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
        let left = self.concat()?;
        let op = match self.peek().kind {
            TokenKind::StrictEq => "===",
            TokenKind::StrictNeq => "!==",
            TokenKind::Eq => "==",
            TokenKind::Neq => "!=",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            _ => return Ok(left),
        };

        self.bump();
        let right = self.concat()?;
        Ok(Expr::BinOp {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Parses a `++`/`<>` chain.
    fn concat(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.arith()?;
        let op = match self.peek().kind {
            TokenKind::Concat => "++",
            TokenKind::BinaryConcat => "<>",
            _ => return Ok(left),
        };

        self.bump();
        let right = self.concat()?;
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

        self.primary()
    }

    /// Parses an atomic expression or block construct.
    fn primary(&mut self) -> Result<Expr, Diagnostic> {
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
            TokenKind::Atom => {
                let token = self.bump();
                Ok(Expr::Atom(token.text[1..].to_string()))
            }
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
            TokenKind::If => self.if_expr(),
            TokenKind::Case => self.case_expr(),
            TokenKind::Fn => self.fn_expr(),
            TokenKind::Try => self.try_expr(),
            TokenKind::Ident | TokenKind::Alias => self.name_or_call(),
            TokenKind::LParen => {
                self.bump();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                Ok(Expr::List(self.items(TokenKind::RBracket)?))
            }
            TokenKind::LBrace => {
                self.bump();
                Ok(Expr::Tuple(self.items(TokenKind::RBrace)?))
            }
            TokenKind::MapOpen => {
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
                Ok(Expr::MapLit(entries))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parses a possibly dotted name, continuing into a call when it is
    /// applied.
    fn name_or_call(&mut self) -> Result<Expr, Diagnostic> {
        let mut name = self.bump().text;
        while self.at(TokenKind::Dot) {
            self.bump();
            let segment = match self.peek().kind {
                TokenKind::Ident | TokenKind::Alias => self.bump().text,
                _ => return Err(self.unexpected("a name after `.`")),
            };
            name.push('.');
            name.push_str(&segment);
        }

        if name == "_" {
            return Ok(Expr::Wildcard);
        }

        if self.at(TokenKind::LParen) {
            self.bump();
            let args = self.items(TokenKind::RParen)?;
            return Ok(Expr::Call { name, args });
        }

        Ok(Expr::Var(name))
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

    /// Parses an `if` in block or keyword form.
    fn if_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::If, "`if`")?;
        let condition = Box::new(self.expression()?);

        if self.at(TokenKind::Comma) {
            // Keyword form: `if cond, do: a, else: b`.
            self.bump();
            self.expect_kw("do:")?;
            let do_block = vec![self.expression()?];
            let else_block = if self.at(TokenKind::Comma) {
                self.bump();
                self.expect_kw("else:")?;
                Some(vec![self.expression()?])
            } else {
                None
            };

            return Ok(Expr::If {
                condition,
                do_block,
                else_block,
            });
        }

        self.expect(TokenKind::Do, "`do`")?;
        let do_block = self.block_until(&[TokenKind::Else, TokenKind::End])?;
        let else_block = if self.at(TokenKind::Else) {
            self.bump();
            Some(self.block_until(&[TokenKind::End])?)
        } else {
            None
        };
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::If {
            condition,
            do_block,
            else_block,
        })
    }

    /// Consumes a keyword-list key with the given text.
    fn expect_kw(&mut self, key: &str) -> Result<(), Diagnostic> {
        if self.at(TokenKind::KwKey) && self.peek().text == key {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{key}`")))
        }
    }

    /// Parses a `case` expression.
    fn case_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Case, "`case`")?;
        let subject = Box::new(self.expression()?);
        self.expect(TokenKind::Do, "`do`")?;
        let clauses = self.clauses_until(&[TokenKind::End])?;
        self.expect(TokenKind::End, "`end`")?;

        if clauses.is_empty() {
            return Err(self.unexpected("a `->` clause"));
        }

        Ok(Expr::Case { subject, clauses })
    }

    /// Parses an anonymous function.
    fn fn_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Fn, "`fn`")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::Arrow) {
            params.push(self.expression()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::Arrow, "`->`")?;
        let body = self.block_until(&[TokenKind::End])?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::Fn { params, body })
    }

    /// Parses a `try` expression.
    fn try_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Try, "`try`")?;
        self.expect(TokenKind::Do, "`do`")?;
        let body = self.block_until(&[TokenKind::Rescue, TokenKind::Else, TokenKind::End])?;

        let rescue = if self.at(TokenKind::Rescue) {
            self.bump();
            self.clauses_until(&[TokenKind::Else, TokenKind::End])?
        } else {
            Vec::new()
        };

        let else_block = if self.at(TokenKind::Else) {
            self.bump();
            self.block_until(&[TokenKind::End])?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::End, "`end`")?;
        Ok(Expr::Try {
            body,
            rescue,
            else_block,
        })
    }

    /// Parses expressions separated by newlines or semicolons until one of
    /// the stop tokens.
    fn block_until(&mut self, stops: &[TokenKind]) -> Result<Vec<Expr>, Diagnostic> {
        let mut exprs = Vec::new();
        self.skip_separators();
        while !stops.contains(&self.peek().kind) && !self.at(TokenKind::Eof) {
            exprs.push(self.expression()?);
            self.skip_separators();
        }

        Ok(exprs)
    }

    /// Parses `pattern [when guard] -> body` clauses until a stop token.
    fn clauses_until(&mut self, stops: &[TokenKind]) -> Result<Vec<Clause>, Diagnostic> {
        let mut clauses = Vec::new();
        self.skip_separators();
        while !stops.contains(&self.peek().kind) && !self.at(TokenKind::Eof) {
            let pattern = self.expression()?;
            let guard = if self.at(TokenKind::When) {
                self.bump();
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Arrow, "`->`")?;

            let mut body = Vec::new();
            self.skip_separators();
            while !stops.contains(&self.peek().kind)
                && !self.at(TokenKind::Eof)
                && !self.at_clause_start(stops)
            {
                body.push(self.expression()?);
                self.skip_separators();
            }

            clauses.push(Clause {
                pattern,
                guard,
                body,
            });
        }

        Ok(clauses)
    }

    /// Determines whether the tokens ahead form the start of another
    /// clause (an `->` at depth zero before the end of the logical line).
    fn at_clause_start(&self, stops: &[TokenKind]) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Arrow if depth == 0 => return true,
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => return false,
                TokenKind::Eof => return false,
                kind if stops.contains(&kind) && depth == 0 => return false,
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::MapOpen
                | TokenKind::Do
                | TokenKind::Fn
                | TokenKind::Case
                | TokenKind::If
                | TokenKind::Try => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::End => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        false
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
    fn it_parses_matches_and_calls() {
        let ast = parse("x = Enum.map(items, fn v -> v + 1 end)").unwrap();
        match &ast.forms[0].expr {
            Expr::Match { left, right } => {
                assert_eq!(**left, Expr::Var("x".to_string()));
                assert!(matches!(**right, Expr::Call { .. }));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn it_parses_case_clauses_in_order() {
        let source = "case v do\n  1 -> :one\n  _ -> :other\nend";
        let ast = parse(source).unwrap();
        match &ast.forms[0].expr {
            Expr::Case { clauses, .. } => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[0].pattern, Expr::Int(1));
                assert_eq!(clauses[1].pattern, Expr::Wildcard);
            }
            other => panic!("expected a case, got {other:?}"),
        }
    }

    #[test]
    fn it_parses_keyword_form_if() {
        let ast = parse("if x > 0, do: :pos, else: :neg").unwrap();
        match &ast.forms[0].expr {
            Expr::If {
                do_block,
                else_block,
                ..
            } => {
                assert_eq!(do_block.len(), 1);
                assert_eq!(else_block.as_ref().unwrap().len(), 1);
            }
            other => panic!("expected an if, got {other:?}"),
        }
    }

    #[test]
    fn definitions_stay_verbatim() {
        let source = "defmodule M do\n  def f(x), do: x\nend\ny = 1";
        let ast = parse(source).unwrap();
        assert!(matches!(&ast.forms[0].expr, Expr::Raw(text)
            if text.starts_with("defmodule M do") && text.ends_with("end")));
        assert!(matches!(&ast.forms[1].expr, Expr::Match { .. }));
    }

    #[test]
    fn pipelines_stay_verbatim() {
        let ast = parse("items |> Enum.map(f) |> Enum.sum()").unwrap();
        assert!(matches!(&ast.forms[0].expr, Expr::Raw(_)));
    }
}
