//! Token types for lexical analysis
//!
//! Defines all token types recognized by the script lexer.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Token type produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Cooked text of this token (string contents without quotes, variable
    /// names without the sigil)
    pub lexeme: String,
    /// Source location
    pub span: Span,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Case-insensitive keyword comparison for bare words
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.lexeme.eq_ignore_ascii_case(word)
    }
}

/// Classification of token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Number literal (42, 0x1F, 1.5e3, 10MB)
    Number,
    /// Verbatim string ('text', @'...'@)
    StringLiteral,
    /// Expandable string ("text $var", @"..."@)
    StringExpandable,
    /// Variable reference ($name, ${name}, $env:PATH)
    Variable,
    /// Splatted variable (@params)
    Splat,
    /// Bare word: command names, identifiers, type names, arguments
    Word,
    /// Dash-prefixed word: -Path, -eq, -not
    Parameter,

    // Keywords recognized at statement start
    /// `function`
    Function,
    /// `filter`
    Filter,
    /// `workflow`
    Workflow,
    /// `class`
    Class,
    /// `enum`
    Enum,
    /// `using`
    Using,
    /// `param`
    Param,

    // Grouping
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `@(` array subexpression
    AtParen,
    /// `@{` hashtable literal
    AtBrace,
    /// `$(` subexpression
    DollarParen,

    // Punctuation
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.` member access or dot-source
    Dot,
    /// `::` static member access
    ColonColon,
    /// `:` loop label or drive separator
    Colon,
    /// `=`
    Equal,
    /// `|`
    Pipe,
    /// Any other operator (+, -=, .., &&, >, !, ...)
    Operator,

    // Layout
    /// End of a logical line
    Newline,

    // Special
    /// Lexing error placeholder
    Error,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Keyword lookup for a bare word (case-insensitive)
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "function" => TokenKind::Function,
            "filter" => TokenKind::Filter,
            "workflow" => TokenKind::Workflow,
            "class" => TokenKind::Class,
            "enum" => TokenKind::Enum,
            "using" => TokenKind::Using,
            "param" => TokenKind::Param,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this kind opens a nested group
    pub fn is_opener(self) -> bool {
        matches!(
            self,
            TokenKind::LeftParen
                | TokenKind::LeftBrace
                | TokenKind::LeftBracket
                | TokenKind::AtParen
                | TokenKind::AtBrace
                | TokenKind::DollarParen
        )
    }

    /// Whether this kind closes a nested group
    pub fn is_closer(self) -> bool {
        matches!(
            self,
            TokenKind::RightParen | TokenKind::RightBrace | TokenKind::RightBracket
        )
    }

    /// Whether this kind is a keyword that starts a declaration
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Function
                | TokenKind::Filter
                | TokenKind::Workflow
                | TokenKind::Class
                | TokenKind::Enum
                | TokenKind::Using
                | TokenKind::Param
        )
    }
}
