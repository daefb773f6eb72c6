//! The Elixir lexer.

use logos::Logos;
use metastatic_ast::Diagnostic;
use metastatic_ast::Location;
use metastatic_ast::Span;

/// An Elixir token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[allow(missing_docs)]
pub enum TokenKind {
    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[0-9][0-9_]*\.[0-9]+")]
    Float,

    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*[?!]?")]
    Atom,

    /// A keyword-list key such as `do:` or `else:`.
    #[regex(r"[a-z_][a-zA-Z0-9_]*:")]
    KwKey,

    #[token("do")]
    Do,
    #[token("end")]
    End,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("case")]
    Case,
    #[token("fn")]
    Fn,
    #[token("try")]
    Try,
    #[token("rescue")]
    Rescue,
    #[token("when")]
    When,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    /// A lowercase identifier.
    #[regex(r"[a-z_][a-zA-Z0-9_]*[?!]?")]
    Ident,

    /// A module alias segment.
    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    Alias,

    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNeq,
    #[token("==")]
    Eq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
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
    #[token("++")]
    Concat,
    #[token("<>")]
    BinaryConcat,
    #[token("|>")]
    Pipe,
    #[token("&")]
    Capture,
    #[token("@")]
    At,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("%{")]
    MapOpen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
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

/// Lexes Elixir source, dropping comments but counting them.
pub fn lex(source: &str) -> Result<LexOutput, Diagnostic> {
    let mut tokens = Vec::new();
    let mut comment_count = 0u32;
    let mut line = 1u32;

    let mut lexer = TokenKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(TokenKind::Comment) => comment_count += 1,
            Ok(TokenKind::Newline) => {
                // Collapse runs of newlines into one separator.
                if !matches!(
                    tokens.last().map(|t: &Token| t.kind),
                    None | Some(TokenKind::Newline)
                ) {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        text: String::new(),
                        line,
                        span: Span::from(span),
                    });
                }
                line += 1;
            }
            Ok(kind) => tokens.push(Token {
                kind,
                text: source[span.clone()].to_string(),
                line,
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
    fn keywords_win_over_identifiers() {
        let output = lex("if x do y end").unwrap();
        let kinds: Vec<_> = output.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::If,
                TokenKind::Ident,
                TokenKind::Do,
                TokenKind::Ident,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn atoms_and_keyword_keys_are_distinct() {
        let output = lex(":ok do: x").unwrap();
        let kinds: Vec<_> = output.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TokenKind::Atom, TokenKind::KwKey, TokenKind::Ident, TokenKind::Eof]
        );
    }
}
