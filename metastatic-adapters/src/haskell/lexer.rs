//! The Haskell lexer.

use logos::Logos;
use metastatic_ast::Diagnostic;
use metastatic_ast::Location;
use metastatic_ast::Span;

/// A Haskell token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[allow(missing_docs)]
pub enum TokenKind {
    #[regex(r"--[^\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("case")]
    Case,
    #[token("of")]
    Of,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("where")]
    Where,
    #[token("do")]
    Do,
    #[token("True")]
    True,
    #[token("False")]
    False,

    /// A lowercase identifier.
    #[regex(r"[a-z_][a-zA-Z0-9_']*")]
    Ident,

    /// A possibly qualified constructor or module path.
    #[regex(r"[A-Z][a-zA-Z0-9_']*(\.[a-zA-Z][a-zA-Z0-9_']*)*")]
    Upper,

    #[token("==")]
    EqEq,
    #[token("/=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<-")]
    LeftArrow,
    #[token("<")]
    Lt,
    #[token(">>=")]
    BindOp,
    #[token(">>")]
    SeqOp,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("++")]
    Concat,
    #[token("::")]
    TypeSig,
    #[token("->")]
    Arrow,
    #[token("\\")]
    Backslash,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("$")]
    Dollar,
    #[token(".")]
    Dot,
    #[token("`")]
    Backtick,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("|")]
    Bar,

    /// A synthetic end-of-input marker.
    Eof,
}

/// A token with its text, line, and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The matched text.
    pub text: String,
    /// The one-based source line.
    pub line: u32,
    /// The one-based source column.
    pub column: u32,
    /// The source span.
    pub span: Span,
}

/// The result of lexing.
#[derive(Debug, Clone, PartialEq)]
pub struct LexOutput {
    /// The tokens, ending with a single `Eof`.
    pub tokens: Vec<Token>,
    /// The number of comments observed.
    pub comment_count: u32,
}

/// Lexes Haskell source, tracking columns for layout decisions.
pub fn lex(source: &str) -> Result<LexOutput, Diagnostic> {
    let mut tokens = Vec::new();
    let mut comment_count = 0u32;
    let mut line = 1u32;
    let mut line_start = 0usize;

    let mut lexer = TokenKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(TokenKind::Comment) => comment_count += 1,
            Ok(TokenKind::Newline) => {
                if !matches!(
                    tokens.last().map(|t: &Token| t.kind),
                    None | Some(TokenKind::Newline)
                ) {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        text: String::new(),
                        line,
                        column: (span.start - line_start + 1) as u32,
                        span: Span::from(span.clone()),
                    });
                }
                line += 1;
                line_start = span.end;
            }
            Ok(kind) => tokens.push(Token {
                kind,
                text: source[span.clone()].to_string(),
                line,
                column: (span.start - line_start + 1) as u32,
                span: Span::from(span),
            }),
            Err(()) => {
                return Err(Diagnostic::error(format!(
                    "unexpected character `{text}`",
                    text = lexer.slice()
                ))
                .with_location(Location::of_offset(source, span.start))
                .with_highlight(Span::from(span)));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        column: 1,
        span: Span::new(source.len(), 0),
    });

    Ok(LexOutput {
        tokens,
        comment_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names_lex_as_one_token() {
        let output = lex("Data.Map.lookup key table").unwrap();
        assert_eq!(output.tokens[0].kind, TokenKind::Upper);
        assert_eq!(output.tokens[0].text, "Data.Map.lookup");
    }

    #[test]
    fn columns_are_tracked_for_layout() {
        let output = lex("x = 1\n    y").unwrap();
        let y = output
            .tokens
            .iter()
            .find(|t| t.text == "y")
            .expect("y token");
        assert_eq!(y.column, 5);
        assert_eq!(y.line, 2);
    }
}
