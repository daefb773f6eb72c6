//! The Ruby lexer.

use logos::Logos;
use metastatic_ast::Diagnostic;
use metastatic_ast::Location;
use metastatic_ast::Span;

/// A Ruby token.
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
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,

    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*[?!]?")]
    Sym,

    #[regex(r"@[a-z_][a-zA-Z0-9_]*")]
    Ivar,

    #[token("if")]
    If,
    #[token("elsif")]
    Elsif,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("while")]
    While,
    #[token("case")]
    Case,
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("begin")]
    Begin,
    #[token("rescue")]
    Rescue,
    #[token("return")]
    Return,
    #[token("do")]
    Do,
    #[token("lambda")]
    Lambda,
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

    #[regex(r"[a-z_][a-zA-Z0-9_]*[?!]?")]
    Ident,

    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    Const,

    #[token("**")]
    DoubleStar,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=>")]
    Spaceship,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shovel,
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
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("||=")]
    OrAssign,
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Stabby,
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
    #[token("%")]
    Percent,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("|")]
    Bar,
    #[token("&")]
    Amp,

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

/// Lexes Ruby source, dropping comments but counting them.
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
    fn blocks_and_symbols_lex() {
        let output = lex("items.map { |v| v * 2 }").unwrap();
        let kinds: Vec<_> = output.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Bar,
                TokenKind::Ident,
                TokenKind::Bar,
                TokenKind::Ident,
                TokenKind::Star,
                TokenKind::Int,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }
}
