//! Logos-based lexer for the compact history text format.
//!
//! The format describes one operation per line: a process, a type, an
//! operation kind, and a value. `_` is nil, brackets enclose lists and
//! micro-op tuples, `//` starts a line comment.
//!
//! # Example input
//!
//! ```text
//! // two appends and a read
//! 0: invoke txn [append x 1, r y _]
//! 0: ok     txn [append x 1, r y [1]]
//! n: info   start _
//! ```

use core::ops::Range;

/// All token kinds produced by the lexer.
#[derive(::logos::Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A line comment starting with `//` and running to end of line.
    #[regex(r"//[^\n]*")]
    Comment,

    /// Process/kind separator `:`.
    #[token(":")]
    Colon,

    /// Micro-op separator `,`.
    #[token(",")]
    Comma,

    /// Opening bracket `[`.
    #[token("[")]
    BracketOpen,

    /// Closing bracket `]`.
    #[token("]")]
    BracketClose,

    /// Nil marker `_`.
    #[token("_")]
    Underscore,

    /// An identifier: a letter followed by letters, digits, or dashes.
    #[regex(r"[a-zA-Z][a-zA-Z0-9-]*")]
    Ident,

    /// An integer literal, optionally negative.
    #[regex(r"-?[0-9]+")]
    Integer,

    /// A newline (`\n` or `\r\n`).
    #[regex(r"\r?\n")]
    Newline,

    /// Spaces or tabs. Emitted so the tokenizer can drive syntax
    /// highlighting where positions matter.
    #[regex(r"[ \t]+")]
    Whitespace,
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// The source text for this token.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span.clone()]
    }
}

/// Tokenize `input`, skipping anything the lexer does not recognise.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|kind| Token { kind, span }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{tokenize, TokenKind};

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_an_op_line() {
        let ks = kinds("0: ok txn [r x _]");
        assert_eq!(
            ks,
            vec![
                TokenKind::Integer,
                TokenKind::Colon,
                TokenKind::Whitespace,
                TokenKind::Ident, // ok
                TokenKind::Whitespace,
                TokenKind::Ident, // txn
                TokenKind::Whitespace,
                TokenKind::BracketOpen,
                TokenKind::Ident, // r
                TokenKind::Whitespace,
                TokenKind::Ident, // x
                TokenKind::Whitespace,
                TokenKind::Underscore,
                TokenKind::BracketClose,
            ]
        );
    }

    #[test]
    fn lexes_comments_and_newlines() {
        let ks = kinds("// note\n1: invoke read _\n");
        assert_eq!(ks[0], TokenKind::Comment);
        assert_eq!(ks[1], TokenKind::Newline);
        assert!(ks.contains(&TokenKind::Newline));
    }

    #[test]
    fn lexes_negative_integers() {
        let tokens = tokenize("-12");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].text("-12"), "-12");
    }

    #[test]
    fn spans_are_byte_accurate() {
        let input = "[x 42]";
        let tokens = tokenize(input);
        assert_eq!(tokens[0].span, 0..1);
        assert_eq!(tokens[1].text(input), "x");
        assert_eq!(tokens[3].text(input), "42");
    }
}
