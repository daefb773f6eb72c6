//! The Erlang parser.

use metastatic_ast::Diagnostic;
use metastatic_ast::Location;

use super::ast::Ast;
use super::ast::Clause;
use super::ast::Expr;
use super::ast::Form;
use super::ast::IfClause;
use super::lexer::Token;
use super::lexer::TokenKind;
use super::lexer::lex;

/// Parses Erlang source into a native tree.
///
/// The accepted input is a sequence of expression forms separated by `.` or
/// newlines; module attributes and function definitions are kept verbatim.
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

    /// Skips newline, `.`, and stray `;` separators between forms.
    fn skip_separators(&mut self) {
        while matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Dot | TokenKind::Semicolon
        ) {
            self.bump();
        }
    }

    /// Parses one top-level form.
    fn form(&mut self) -> Result<Form, Diagnostic> {
        let line = self.peek().line;
        if self.form_is_unmodeled() {
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

    /// Determines whether the form ahead is an attribute, a function
    /// definition, or uses syntax outside the modeled subset.
    fn form_is_unmodeled(&self) -> bool {
        // `-module(m).`-style attributes.
        if self.at(TokenKind::Minus) && matches!(self.peek2_kind(), TokenKind::Atom) {
            return true;
        }

        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Bang
                | TokenKind::Question
                | TokenKind::Hash
                | TokenKind::Bar
                | TokenKind::BinOpen
                | TokenKind::BinClose
                | TokenKind::Receive => return true,
                // An arrow at depth zero is a function definition head.
                TokenKind::Arrow if depth == 0 => return true,
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::MapOpen
                | TokenKind::Case
                | TokenKind::If
                | TokenKind::Try
                | TokenKind::Fun => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::End => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Dot | TokenKind::Newline if depth == 0 => return false,
                TokenKind::Eof => return false,
                _ => {}
            }
        }

        false
    }

    /// Gets the kind of the token after the next one.
    fn peek2_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Consumes a form verbatim through its terminating `.` (tracking
    /// block nesting).
    fn raw_form(&mut self) -> Expr {
        let start = self.peek().span.start();
        let mut end = start;
        let mut depth = 0usize;

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Case | TokenKind::If | TokenKind::Try | TokenKind::Fun
                | TokenKind::Receive => depth += 1,
                TokenKind::End => depth = depth.saturating_sub(1),
                TokenKind::Dot if depth == 0 => {
                    end = self.bump().span.end();
                    break;
                }
                TokenKind::Newline if depth == 0 => break,
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

    /// Parses an `orelse`/`or` chain.
    fn or_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.and_expr()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Orelse => "orelse",
                TokenKind::Or => "or",
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

    /// Parses an `andalso`/`and` chain.
    fn and_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.not_expr()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Andalso => "andalso",
                TokenKind::And => "and",
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
        let left = self.concat()?;
        let op = match self.peek().kind {
            TokenKind::StrictEq => "=:=",
            TokenKind::StrictNeq => "=/=",
            TokenKind::Eq => "==",
            TokenKind::Neq => "/=",
            TokenKind::Le => "=<",
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

    /// Parses a `++` chain.
    fn concat(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.arith()?;
        if self.at(TokenKind::Concat) {
            self.bump();
            let right = self.concat()?;
            return Ok(Expr::BinOp {
                op: "++".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
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
                TokenKind::Div => "div",
                TokenKind::Rem => "rem",
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
            TokenKind::Atom => self.atom_or_call(),
            TokenKind::Var => {
                let token = self.bump();
                if token.text == "_" {
                    Ok(Expr::Wildcard)
                } else {
                    Ok(Expr::Var(token.text))
                }
            }
            TokenKind::Case => self.case_expr(),
            TokenKind::If => self.if_expr(),
            TokenKind::Fun => self.fun_expr(),
            TokenKind::Try => self.try_expr(),
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

    /// Parses an atom, continuing into a local or remote call.
    fn atom_or_call(&mut self) -> Result<Expr, Diagnostic> {
        let first = self.bump().text;

        // `mod:fun(Args)` remote call.
        if self.at(TokenKind::Colon) {
            self.bump();
            let name = self.expect(TokenKind::Atom, "a function name")?.text;
            self.expect(TokenKind::LParen, "`(`")?;
            let args = self.items(TokenKind::RParen)?;
            return Ok(Expr::Call {
                module: Some(first),
                name,
                args,
            });
        }

        if self.at(TokenKind::LParen) {
            self.bump();
            let args = self.items(TokenKind::RParen)?;
            return Ok(Expr::Call {
                module: None,
                name: first,
                args,
            });
        }

        Ok(Expr::Atom(first))
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

    /// Parses a `case … of … end` expression.
    fn case_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Case, "`case`")?;
        let subject = Box::new(self.expression()?);
        self.expect(TokenKind::Of, "`of`")?;
        let clauses = self.clauses(&[TokenKind::End])?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::Case { subject, clauses })
    }

    /// Parses an `if … end` expression of guard clauses.
    fn if_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::If, "`if`")?;
        let mut clauses = Vec::new();
        loop {
            self.skip_newlines();
            let guard = self.expression()?;
            self.expect(TokenKind::Arrow, "`->`")?;
            let body = self.body(&[TokenKind::Semicolon, TokenKind::End])?;
            clauses.push(IfClause { guard, body });

            if self.at(TokenKind::Semicolon) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::If { clauses })
    }

    /// Parses an anonymous function with a single clause.
    fn fun_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Fun, "`fun`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.items(TokenKind::RParen)?;
        self.expect(TokenKind::Arrow, "`->`")?;
        let body = self.body(&[TokenKind::End])?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::Fun { params, body })
    }

    /// Parses a `try … catch … end` expression.
    fn try_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Try, "`try`")?;
        let body = self.body(&[TokenKind::Catch, TokenKind::End])?;
        let catches = if self.at(TokenKind::Catch) {
            self.bump();
            self.clauses(&[TokenKind::End])?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::End, "`end`")?;

        Ok(Expr::Try { body, catches })
    }

    /// Parses `pattern [when guard] -> body` clauses separated by `;`.
    fn clauses(&mut self, stops: &[TokenKind]) -> Result<Vec<Clause>, Diagnostic> {
        let mut clauses = Vec::new();
        loop {
            self.skip_newlines();
            let pattern = self.expression()?;
            let guard = if self.at(TokenKind::When) {
                self.bump();
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Arrow, "`->`")?;

            let mut body_stops = stops.to_vec();
            body_stops.push(TokenKind::Semicolon);
            let body = self.body(&body_stops)?;
            clauses.push(Clause {
                pattern,
                guard,
                body,
            });

            if self.at(TokenKind::Semicolon) {
                self.bump();
                continue;
            }
            break;
        }

        Ok(clauses)
    }

    /// Parses a comma-sequenced body until one of the stop tokens.
    fn body(&mut self, stops: &[TokenKind]) -> Result<Vec<Expr>, Diagnostic> {
        let mut exprs = Vec::new();
        loop {
            self.skip_newlines();
            exprs.push(self.expression()?);
            self.skip_newlines();
            if self.at(TokenKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }

        self.skip_newlines();
        if !stops.contains(&self.peek().kind) && !self.at(TokenKind::Eof) {
            return Err(self.unexpected("`,`, `;`, or `end`"));
        }

        Ok(exprs)
    }

    /// Skips newline tokens.
    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
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
    fn it_parses_matches_and_remote_calls() {
        let ast = parse("X = lists:map(F, Items)").unwrap();
        match &ast.forms[0].expr {
            Expr::Match { left, right } => {
                assert_eq!(**left, Expr::Var("X".to_string()));
                assert!(matches!(
                    &**right,
                    Expr::Call { module: Some(m), name, .. }
                        if m == "lists" && name == "map"
                ));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn it_parses_case_clauses() {
        let source = "case X of\n    1 -> one;\n    _ -> other\nend";
        let ast = parse(source).unwrap();
        match &ast.forms[0].expr {
            Expr::Case { clauses, .. } => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[1].pattern, Expr::Wildcard);
            }
            other => panic!("expected a case, got {other:?}"),
        }
    }

    #[test]
    fn attributes_and_definitions_stay_verbatim() {
        let ast = parse("-module(sample).\nX = 1.").unwrap();
        assert_eq!(ast.forms[0].expr, Expr::Raw("-module(sample).".to_string()));
        assert!(matches!(&ast.forms[1].expr, Expr::Match { .. }));

        let ast = parse("double(X) -> X * 2.").unwrap();
        assert_eq!(
            ast.forms[0].expr,
            Expr::Raw("double(X) -> X * 2.".to_string())
        );
    }

    #[test]
    fn it_parses_guarded_fun_clauses() {
        let source = "F = fun(X) -> X + 1 end";
        let ast = parse(source).unwrap();
        match &ast.forms[0].expr {
            Expr::Match { right, .. } => assert!(matches!(&**right, Expr::Fun { .. })),
            other => panic!("expected a match, got {other:?}"),
        }
    }
}
