//! The Erlang lexer.

use logos::Logos;
use metastatic_ast::Diagnostic;
use metastatic_ast::Location;
use metastatic_ast::Span;

/// An Erlang token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[allow(missing_docs)]
pub enum TokenKind {
    #[regex(r"%[^\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[token("case")]
    Case,
    #[token("of")]
    Of,
    #[token("end")]
    End,
    #[token("fun")]
    Fun,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("if")]
    If,
    #[token("when")]
    When,
    #[token("receive")]
    Receive,
    #[token("andalso")]
    Andalso,
    #[token("orelse")]
    Orelse,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("div")]
    Div,
    #[token("rem")]
    Rem,

    /// A lowercase atom.
    #[regex(r"[a-z][a-zA-Z0-9_@]*")]
    Atom,

    /// A variable.
    #[regex(r"[A-Z_][a-zA-Z0-9_@]*")]
    Var,

    #[token("=:=")]
    StrictEq,
    #[token("=/=")]
    StrictNeq,
    #[token("==")]
    Eq,
    #[token("/=")]
    Neq,
    #[token("=<")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
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
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("#{")]
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
    #[token(":")]
    Colon,
    #[token("|")]
    Bar,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("#")]
    Hash,
    #[token("<<")]
    BinOpen,
    #[token(">>")]
    BinClose,

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

/// Lexes Erlang source, dropping comments but counting them.
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
    fn strict_operators_lex_as_single_tokens() {
        let output = lex("X =:= Y, A =/= B, C =< D").unwrap();
        let strict = output
            .tokens
            .iter()
            .filter(|t| {
                matches!(
                    t.kind,
                    TokenKind::StrictEq | TokenKind::StrictNeq | TokenKind::Le
                )
            })
            .count();
        assert_eq!(strict, 3);
    }
}
