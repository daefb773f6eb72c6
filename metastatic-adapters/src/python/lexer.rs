//! The Python lexer and indentation layout pass.

use logos::Logos;
use metastatic_ast::Diagnostic;
use metastatic_ast::Location;
use metastatic_ast::Span;

/// A raw token produced by `logos` before the layout pass.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
enum RawToken {
    /// A comment running to the end of the line.
    #[regex(r"#[^\n]*")]
    Comment,

    /// A newline and the indentation of the following line.
    #[regex(r"\r?\n[ \t]*")]
    Newline,

    /// A float literal.
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    /// An integer literal.
    #[regex(r"[0-9]+")]
    Int,

    /// A double- or single-quoted string literal.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,

    /// The `and` keyword.
    #[token("and")]
    And,
    /// The `or` keyword.
    #[token("or")]
    Or,
    /// The `not` keyword.
    #[token("not")]
    Not,
    /// The `if` keyword.
    #[token("if")]
    If,
    /// The `elif` keyword.
    #[token("elif")]
    Elif,
    /// The `else` keyword.
    #[token("else")]
    Else,
    /// The `while` keyword.
    #[token("while")]
    While,
    /// The `for` keyword.
    #[token("for")]
    For,
    /// The `in` keyword.
    #[token("in")]
    In,
    /// The `return` keyword.
    #[token("return")]
    Return,
    /// The `try` keyword.
    #[token("try")]
    Try,
    /// The `except` keyword.
    #[token("except")]
    Except,
    /// The `lambda` keyword.
    #[token("lambda")]
    Lambda,
    /// The `await` keyword.
    #[token("await")]
    Await,
    /// The `True` literal.
    #[token("True")]
    True,
    /// The `False` literal.
    #[token("False")]
    False,
    /// The `None` literal.
    #[token("None")]
    NoneKw,

    /// An identifier (including soft keywords such as `match`).
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,

    /// The `**` operator.
    #[token("**")]
    DoubleStar,
    /// The `//` operator.
    #[token("//")]
    DoubleSlash,
    /// The `==` operator.
    #[token("==")]
    EqEq,
    /// The `!=` operator.
    #[token("!=")]
    NotEq,
    /// The `<=` operator.
    #[token("<=")]
    Le,
    /// The `>=` operator.
    #[token(">=")]
    Ge,
    /// The `<` operator.
    #[token("<")]
    Lt,
    /// The `>` operator.
    #[token(">")]
    Gt,
    /// The `=` operator.
    #[token("=")]
    Assign,
    /// The `+` operator.
    #[token("+")]
    Plus,
    /// The `-` operator.
    #[token("-")]
    Minus,
    /// The `*` operator.
    #[token("*")]
    Star,
    /// The `/` operator.
    #[token("/")]
    Slash,
    /// The `%` operator.
    #[token("%")]
    Percent,
    /// An opening parenthesis.
    #[token("(")]
    LParen,
    /// A closing parenthesis.
    #[token(")")]
    RParen,
    /// An opening bracket.
    #[token("[")]
    LBracket,
    /// A closing bracket.
    #[token("]")]
    RBracket,
    /// An opening brace.
    #[token("{")]
    LBrace,
    /// A closing brace.
    #[token("}")]
    RBrace,
    /// A colon.
    #[token(":")]
    Colon,
    /// A comma.
    #[token(",")]
    Comma,
    /// A dot.
    #[token(".")]
    Dot,
    /// A decorator marker.
    #[token("@")]
    At,
}

/// A token after the layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TokenKind {
    Int,
    Float,
    Str,
    Name,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Try,
    Except,
    Lambda,
    Await,
    True,
    False,
    NoneKw,
    DoubleStar,
    DoubleSlash,
    EqEq,
    NotEq,
    Le,
    Ge,
    Lt,
    Gt,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Dot,
    At,
    /// A logical end of line.
    Newline,
    /// An increase of the indentation level.
    Indent,
    /// A decrease of the indentation level.
    Dedent,
    /// The end of input.
    Eof,
}

/// A layout-processed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The matched text (empty for synthetic tokens).
    pub text: String,
    /// The one-based source line the token starts on.
    pub line: u32,
    /// The source span of the token.
    pub span: Span,
}

/// The result of lexing: layout-processed tokens plus a comment count.
#[derive(Debug, Clone, PartialEq)]
pub struct LexOutput {
    /// The tokens, ending with a single `Eof`.
    pub tokens: Vec<Token>,
    /// The number of comments observed.
    pub comment_count: u32,
}

/// Measures an indentation string, counting a tab as four columns.
fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Lexes source and applies the indentation layout pass.
///
/// `Newline` tokens separate logical lines; `Indent` and `Dedent` tokens
/// bracket suites. Blank and comment-only lines produce no layout changes.
pub fn lex(source: &str) -> Result<LexOutput, Diagnostic> {
    // Collect raw tokens first; the layout pass needs one token of
    // lookahead to ignore blank lines.
    let mut raw = Vec::new();
    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => raw.push((token, span)),
            Err(()) => {
                let location = Location::of_offset(source, span.start);
                return Err(Diagnostic::error(format!(
                    "unexpected character `{text}`",
                    text = lexer.slice()
                ))
                .with_location(location)
                .with_highlight(Span::from(span)));
            }
        }
    }

    let mut tokens = Vec::new();
    let mut comment_count = 0u32;
    let mut indents = vec![0usize];
    let mut line = 1u32;

    for (index, (token, span)) in raw.iter().enumerate() {
        match token {
            RawToken::Comment => comment_count += 1,
            RawToken::Newline => {
                line += 1;

                // A line holding no real token does not change the layout.
                let next_real = raw[index + 1..]
                    .first()
                    .map(|(token, _)| *token);
                if matches!(next_real, None | Some(RawToken::Newline) | Some(RawToken::Comment))
                {
                    continue;
                }

                tokens.push(Token {
                    kind: TokenKind::Newline,
                    text: String::new(),
                    line,
                    span: Span::new(span.start, 1),
                });

                let text = &source[span.clone()];
                let width = indent_width(text.trim_start_matches(['\r', '\n']));
                let current = *indents.last().expect("indent stack is never empty");
                if width > current {
                    indents.push(width);
                    tokens.push(Token {
                        kind: TokenKind::Indent,
                        text: String::new(),
                        line,
                        span: Span::new(span.end, 0),
                    });
                } else {
                    while width < *indents.last().expect("indent stack is never empty") {
                        indents.pop();
                        tokens.push(Token {
                            kind: TokenKind::Dedent,
                            text: String::new(),
                            line,
                            span: Span::new(span.end, 0),
                        });
                    }

                    if width != *indents.last().expect("indent stack is never empty") {
                        return Err(Diagnostic::error(
                            "unindent does not match any outer indentation level",
                        )
                        .with_location(Location::new(line, 1))
                        .with_highlight(Span::new(span.end, 0)));
                    }
                }
            }
            _ => {
                tokens.push(Token {
                    kind: map_raw(*token),
                    text: source[span.clone()].to_string(),
                    line,
                    span: Span::from(span.clone()),
                });
            }
        }
    }

    // Close any open suites at the end of input.
    let end = source.len();
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token {
            kind: TokenKind::Dedent,
            text: String::new(),
            line,
            span: Span::new(end, 0),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        span: Span::new(end, 0),
    });

    Ok(LexOutput {
        tokens,
        comment_count,
    })
}

/// Maps a raw token to its layout-processed kind.
fn map_raw(token: RawToken) -> TokenKind {
    match token {
        RawToken::Int => TokenKind::Int,
        RawToken::Float => TokenKind::Float,
        RawToken::Str => TokenKind::Str,
        RawToken::Name => TokenKind::Name,
        RawToken::And => TokenKind::And,
        RawToken::Or => TokenKind::Or,
        RawToken::Not => TokenKind::Not,
        RawToken::If => TokenKind::If,
        RawToken::Elif => TokenKind::Elif,
        RawToken::Else => TokenKind::Else,
        RawToken::While => TokenKind::While,
        RawToken::For => TokenKind::For,
        RawToken::In => TokenKind::In,
        RawToken::Return => TokenKind::Return,
        RawToken::Try => TokenKind::Try,
        RawToken::Except => TokenKind::Except,
        RawToken::Lambda => TokenKind::Lambda,
        RawToken::Await => TokenKind::Await,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::NoneKw => TokenKind::NoneKw,
        RawToken::DoubleStar => TokenKind::DoubleStar,
        RawToken::DoubleSlash => TokenKind::DoubleSlash,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Le => TokenKind::Le,
        RawToken::Ge => TokenKind::Ge,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::At => TokenKind::At,
        RawToken::Comment | RawToken::Newline => unreachable!("handled by the layout pass"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lexes source and returns the token kinds.
    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn it_lays_out_suites_with_indent_and_dedent() {
        use TokenKind::*;
        assert_eq!(
            kinds("if a:\n    x = 1\ny = 2"),
            [
                If, Name, Colon, Newline, Indent, Name, Assign, Int, Newline, Dedent, Name,
                Assign, Int, Eof,
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_do_not_change_layout() {
        use TokenKind::*;
        let output = lex("x = 1\n\n# comment\ny = 2").unwrap();
        let kinds: Vec<_> = output.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [Name, Assign, Int, Newline, Name, Assign, Int, Eof]
        );
        assert_eq!(output.comment_count, 1);
    }

    #[test]
    fn it_rejects_unknown_characters() {
        let err = lex("x = ?").unwrap_err();
        assert!(err.message().contains("unexpected character"));
        assert_eq!(err.location().unwrap().line, 1);
    }

    #[test]
    fn it_tracks_lines() {
        let output = lex("a = 1\nb = 2").unwrap();
        let lines: Vec<_> = output
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, [1, 2]);
    }
}
