//! The Haskell parser.

use metastatic_ast::Diagnostic;
use metastatic_ast::Location;

use super::ast::Alt;
use super::ast::Ast;
use super::ast::Decl;
use super::ast::DeclKind;
use super::ast::Expr;
use super::lexer::Token;
use super::lexer::TokenKind;
use super::lexer::lex;

/// Declaration heads the parser recognizes but does not model.
const UNMODELED_HEADS: &[&str] = &[
    "class", "data", "deriving", "foreign", "import", "infix", "infixl", "infixr", "instance",
    "module", "newtype", "type",
];

/// Parses Haskell source into a native tree.
pub fn parse(source: &str) -> Result<Ast, Diagnostic> {
    let output = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: output.tokens,
        pos: 0,
    };

    let mut decls = Vec::new();
    parser.skip_separators();
    while !parser.at(TokenKind::Eof) {
        decls.push(parser.decl()?);
        parser.skip_separators();
    }

    Ok(Ast {
        decls,
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

    /// Gets the token at an offset from the cursor.
    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
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

    /// Parses one top-level declaration.
    fn decl(&mut self) -> Result<Decl, Diagnostic> {
        let line = self.peek().line;

        let head_is_unmodeled = (self.at(TokenKind::Ident)
            && UNMODELED_HEADS.contains(&self.peek().text.as_str()))
            || self.at(TokenKind::Where)
            || self.at(TokenKind::Do);
        if head_is_unmodeled || self.line_has_unmodeled_operator() {
            return Ok(Decl {
                line,
                kind: self.raw_decl(),
            });
        }

        if let Some((name, params)) = self.equation_head() {
            for _ in 0..params.len() + 2 {
                self.bump();
            }
            let body = self.expression()?;
            return Ok(Decl {
                line,
                kind: DeclKind::Bind { name, params, body },
            });
        }

        Ok(Decl {
            line,
            kind: DeclKind::Expr(self.expression()?),
        })
    }

    /// Recognizes `name param… =` ahead of the cursor, without consuming.
    fn equation_head(&self) -> Option<(String, Vec<String>)> {
        if !self.at(TokenKind::Ident) {
            return None;
        }

        let name = self.peek().text.clone();
        let mut params = Vec::new();
        let mut offset = 1;
        loop {
            let token = self.peek_at(offset);
            match token.kind {
                TokenKind::Ident => {
                    params.push(token.text.clone());
                    offset += 1;
                }
                TokenKind::Assign => return Some((name, params)),
                _ => return None,
            }
        }
    }

    /// Scans the current logical line for syntax outside the modeled
    /// subset (type signatures, monadic operators, composition, guards).
    fn line_has_unmodeled_operator(&self) -> bool {
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::TypeSig
                | TokenKind::BindOp
                | TokenKind::SeqOp
                | TokenKind::LeftArrow
                | TokenKind::Dollar
                | TokenKind::Dot
                | TokenKind::Backtick
                | TokenKind::Bar
                | TokenKind::Where
                | TokenKind::Do => return true,
                TokenKind::Newline | TokenKind::Eof => return false,
                _ => {}
            }
        }

        false
    }

    /// Consumes a declaration verbatim, including indented continuation
    /// lines (any line not starting at column one).
    fn raw_decl(&mut self) -> DeclKind {
        let start = self.peek().span.start();
        let mut end = start;

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    let next = self.peek_at(1);
                    if next.kind == TokenKind::Eof || next.column == 1 {
                        break;
                    }
                    self.bump();
                }
                _ => {
                    end = end.max(self.bump().span.end());
                }
            }
        }

        DeclKind::Raw(self.source[start..end].trim_end().to_string())
    }

    /// Parses an expression (lowest precedence: `||`).
    fn expression(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.and_expr()?;
        while self.at(TokenKind::OrOr) {
            self.bump();
            let right = self.and_expr()?;
            left = Expr::BinOp {
                op: "||".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses an `&&` chain.
    fn and_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.comparison()?;
        while self.at(TokenKind::AndAnd) {
            self.bump();
            let right = self.comparison()?;
            left = Expr::BinOp {
                op: "&&".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a (non-chained) comparison.
    fn comparison(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.concat()?;
        let op = match self.peek().kind {
            TokenKind::EqEq => "==",
            TokenKind::Neq => "/=",
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

    /// Parses a right-associative `++`.
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
        let mut left = self.application()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                _ => break,
            };
            self.bump();
            let right = self.application()?;
            left = Expr::BinOp {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses function application by juxtaposition.
    fn application(&mut self) -> Result<Expr, Diagnostic> {
        let func = self.atom()?;
        let mut args = Vec::new();
        while self.starts_atom() {
            args.push(self.atom()?);
        }

        if args.is_empty() {
            return Ok(func);
        }

        Ok(Expr::App {
            func: Box::new(func),
            args,
        })
    }

    /// Determines whether the next token can start an application
    /// argument.
    fn starts_atom(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::Ident
                | TokenKind::Upper
                | TokenKind::True
                | TokenKind::False
                | TokenKind::LParen
                | TokenKind::LBracket
        )
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
            TokenKind::Ident => {
                let token = self.bump();
                if token.text == "_" {
                    Ok(Expr::Wildcard)
                } else {
                    Ok(Expr::Var(token.text))
                }
            }
            TokenKind::Upper => Ok(Expr::Var(self.bump().text)),
            TokenKind::Minus => {
                self.bump();
                let operand = self.atom()?;
                Ok(Expr::UnaryOp {
                    op: "-".to_string(),
                    operand: Box::new(operand),
                })
            }
            TokenKind::If => {
                self.bump();
                let cond = self.expression()?;
                self.expect(TokenKind::Then, "`then`")?;
                let then_value = self.expression()?;
                self.expect(TokenKind::Else, "`else`")?;
                let else_value = self.expression()?;
                Ok(Expr::If {
                    cond: Box::new(cond),
                    then_value: Box::new(then_value),
                    else_value: Box::new(else_value),
                })
            }
            TokenKind::Case => self.case_expr(),
            TokenKind::Backslash => {
                self.bump();
                let mut params = Vec::new();
                while self.at(TokenKind::Ident) {
                    params.push(self.bump().text);
                }
                self.expect(TokenKind::Arrow, "`->`")?;
                let body = self.expression()?;
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                })
            }
            TokenKind::Let => {
                self.bump();
                let name = self.expect(TokenKind::Ident, "a binding name")?.text;
                self.expect(TokenKind::Assign, "`=`")?;
                let value = self.expression()?;
                self.expect(TokenKind::In, "`in`")?;
                let body = self.expression()?;
                Ok(Expr::Let {
                    name,
                    value: Box::new(value),
                    body: Box::new(body),
                })
            }
            TokenKind::LParen => {
                self.bump();
                let first = self.expression()?;
                if self.at(TokenKind::Comma) {
                    self.bump();
                    let mut items = vec![first];
                    loop {
                        items.push(self.expression()?);
                        if self.at(TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`")?;
                    return Ok(Expr::Tuple(items));
                }
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(first)
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    items.push(self.expression()?);
                    if self.at(TokenKind::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "`]`")?;
                Ok(Expr::List(items))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parses a `case … of` with newline-separated alternatives.
    fn case_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::Case, "`case`")?;
        let scrutinee = Box::new(self.expression()?);
        self.expect(TokenKind::Of, "`of`")?;

        let mut alts = Vec::new();
        loop {
            self.skip_separators();
            if !self.alt_follows() {
                break;
            }

            let pattern = self.application()?;
            self.expect(TokenKind::Arrow, "`->`")?;
            let body = self.expression()?;
            alts.push(Alt { pattern, body });
        }

        if alts.is_empty() {
            return Err(self.unexpected("a case alternative"));
        }

        Ok(Expr::Case { scrutinee, alts })
    }

    /// Determines whether the tokens ahead form another `pattern ->`
    /// alternative on this line.
    fn alt_follows(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Arrow if depth == 0 => return true,
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof if depth == 0 => {
                    return false;
                }
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
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
    fn application_flattens_by_juxtaposition() {
        let ast = parse("f a b").unwrap();
        match &ast.decls[0].kind {
            DeclKind::Expr(Expr::App { func, args }) => {
                assert_eq!(**func, Expr::Var("f".to_string()));
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected an application, got {other:?}"),
        }
    }

    #[test]
    fn equations_bind_names_with_parameters() {
        let ast = parse("double x = x * 2").unwrap();
        match &ast.decls[0].kind {
            DeclKind::Bind { name, params, .. } => {
                assert_eq!(name, "double");
                assert_eq!(params, &["x".to_string()]);
            }
            other => panic!("expected a bind, got {other:?}"),
        }
    }

    #[test]
    fn case_alternatives_parse_in_order() {
        let source = "describe v = case v of\n    1 -> \"one\"\n    _ -> \"other\"";
        let ast = parse(source).unwrap();
        match &ast.decls[0].kind {
            DeclKind::Bind { body, .. } => match body {
                Expr::Case { alts, .. } => {
                    assert_eq!(alts.len(), 2);
                    assert_eq!(alts[1].pattern, Expr::Wildcard);
                }
                other => panic!("expected a case, got {other:?}"),
            },
            other => panic!("expected a bind, got {other:?}"),
        }
    }

    #[test]
    fn type_signatures_and_imports_stay_verbatim() {
        let source = "import Data.List\nsquare :: Int -> Int\nsquare x = x * x";
        let ast = parse(source).unwrap();
        assert_eq!(ast.decls[0].kind, DeclKind::Raw("import Data.List".to_string()));
        assert_eq!(
            ast.decls[1].kind,
            DeclKind::Raw("square :: Int -> Int".to_string())
        );
        assert!(matches!(&ast.decls[2].kind, DeclKind::Bind { .. }));
    }
}
