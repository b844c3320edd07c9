//! Lexical analysis (tokenization)
//!
//! The lexer converts script source into a stream of tokens with byte offsets
//! and line/column positions. Comments and line continuations are dropped;
//! newlines are kept because they terminate statements.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod literals;

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Original source code
    pub(super) source: String,
    /// Characters of source code
    pub(super) chars: Vec<char>,
    /// Current position in chars
    pub(super) current: usize,
    /// Byte offset of `current` in `source`
    pub(super) byte_pos: usize,
    /// Current line number (1-indexed)
    pub(super) line: u32,
    /// Current column number (1-indexed)
    pub(super) column: u32,
    /// Byte offset of the current token
    pub(super) start_byte: usize,
    /// Start line of current token
    pub(super) start_line: u32,
    /// Start column of current token
    pub(super) start_column: u32,
    /// Collected diagnostics
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars: Vec<char> = source.chars().collect();
        Self {
            source,
            chars,
            current: 0,
            byte_pos: 0,
            line: 1,
            column: 1,
            start_byte: 0,
            start_line: 1,
            start_column: 1,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        (tokens, std::mem::take(&mut self.diagnostics))
    }

    /// Scan the next token
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_byte = self.byte_pos;
        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.advance();

        match c {
            '\n' => self.make_token(TokenKind::Newline, "\n"),
            '(' => self.make_token(TokenKind::LeftParen, "("),
            ')' => self.make_token(TokenKind::RightParen, ")"),
            '{' => self.make_token(TokenKind::LeftBrace, "{"),
            '}' => self.make_token(TokenKind::RightBrace, "}"),
            '[' => self.make_token(TokenKind::LeftBracket, "["),
            ']' => self.make_token(TokenKind::RightBracket, "]"),
            ';' => self.make_token(TokenKind::Semicolon, ";"),
            ',' => self.make_token(TokenKind::Comma, ","),

            '.' => {
                if self.match_char('.') {
                    self.make_token(TokenKind::Operator, "..")
                } else {
                    self.make_token(TokenKind::Dot, ".")
                }
            }
            ':' => {
                if self.match_char(':') {
                    self.make_token(TokenKind::ColonColon, "::")
                } else {
                    self.make_token(TokenKind::Colon, ":")
                }
            }
            '=' => self.make_token(TokenKind::Equal, "="),
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::Operator, "||")
                } else {
                    self.make_token(TokenKind::Pipe, "|")
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::Operator, "&&")
                } else {
                    self.make_token(TokenKind::Operator, "&")
                }
            }
            '+' | '*' | '/' | '%' | '!' => {
                let mut op = c.to_string();
                if self.peek() == '=' || (c == '+' && self.peek() == '+') {
                    op.push(self.advance());
                }
                self.make_token(TokenKind::Operator, &op)
            }
            '>' | '<' => {
                let mut op = c.to_string();
                if self.peek() == c || self.peek() == '&' {
                    op.push(self.advance());
                }
                self.make_token(TokenKind::Operator, &op)
            }
            '-' => self.dash(),

            '$' => self.variable(),
            '@' => self.at_sign(),

            '\'' => self.single_quoted_string(),
            '"' => self.double_quoted_string(),

            c if c.is_ascii_digit() => self.number(),

            _ => self.word(),
        }
    }

    /// Skip whitespace, comments and backtick line continuations
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.is_at_end() {
                return;
            }

            match self.peek() {
                ' ' | '\t' | '\r' | '\u{feff}' | '\u{a0}' | '\u{c}' => {
                    self.advance();
                }
                '`' if matches!(self.peek_next(), Some('\n') | Some('\r')) => {
                    self.advance();
                    if self.peek() == '\r' {
                        self.advance();
                    }
                    if self.peek() == '\n' {
                        self.advance();
                    }
                }
                '#' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '<' if self.peek_next() == Some('#') => self.block_comment(),
                _ => return,
            }
        }
    }

    /// Skip a `<# ... #>` comment
    fn block_comment(&mut self) {
        let start = self.position_here();
        self.advance(); // <
        self.advance(); // #

        while !self.is_at_end() {
            if self.peek() == '#' && self.peek_next() == Some('>') {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }

        let span = Span::new(start.start, self.byte_pos, start.line, start.column);
        self.diagnostics.push(
            Diagnostic::error_with_code(
                error_codes::UNTERMINATED_COMMENT,
                "Unterminated block comment",
                span,
            )
            .with_label("comment starts here")
            .with_help("add '#>' to close the block comment"),
        );
    }

    /// `-Name` parameter, `-eq` operator, or a plain minus
    fn dash(&mut self) -> Token {
        if self.peek().is_alphabetic() {
            let mut name = String::new();
            while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
                name.push(self.advance());
            }
            return self.make_token(TokenKind::Parameter, &name);
        }

        let mut op = "-".to_string();
        if self.peek() == '-' || self.peek() == '=' {
            op.push(self.advance());
        }
        self.make_token(TokenKind::Operator, &op)
    }

    /// `$name`, `${braced name}`, `$scope:name`, `$(` or a bare `$`
    fn variable(&mut self) -> Token {
        if self.match_char('(') {
            return self.make_token(TokenKind::DollarParen, "$(");
        }

        if self.match_char('{') {
            let mut name = String::new();
            while !self.is_at_end() && self.peek() != '}' {
                if self.peek() == '`' {
                    self.advance();
                    if self.is_at_end() {
                        break;
                    }
                }
                name.push(self.advance());
            }
            if !self.match_char('}') {
                return self.error_token_with_code(
                    error_codes::UNTERMINATED_VARIABLE,
                    "Missing closing '}' in braced variable name",
                );
            }
            return self.make_token(TokenKind::Variable, &name);
        }

        if matches!(self.peek(), '$' | '?' | '^') {
            let c = self.advance();
            return self.make_token(TokenKind::Variable, &c.to_string());
        }

        let mut name = String::new();
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_alphanumeric() || c == '_' {
                name.push(self.advance());
            } else if c == ':'
                && !name.is_empty()
                && self.peek_next().is_some_and(|n| n.is_alphanumeric() || n == '_')
            {
                name.push(self.advance());
            } else {
                break;
            }
        }

        if name.is_empty() {
            self.make_token(TokenKind::Word, "$")
        } else {
            self.make_token(TokenKind::Variable, &name)
        }
    }

    /// `@(`, `@{`, `@splat`, or the start of a here-string
    fn at_sign(&mut self) -> Token {
        match self.peek() {
            '(' => {
                self.advance();
                self.make_token(TokenKind::AtParen, "@(")
            }
            '{' => {
                self.advance();
                self.make_token(TokenKind::AtBrace, "@{")
            }
            '\'' | '"' if self.here_string_header_follows() => self.here_string(),
            c if c.is_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
                    name.push(self.advance());
                }
                self.make_token(TokenKind::Splat, &name)
            }
            _ => self.make_token(TokenKind::Operator, "@"),
        }
    }

    /// Bare word: command names, arguments, type names, member names
    fn word(&mut self) -> Token {
        let mut text = String::new();
        text.push(self.chars[self.current - 1]);

        while !self.is_at_end() {
            let c = self.peek();
            if c == '`' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                text.push(self.advance());
                continue;
            }
            if c == ':' {
                // Keep drive and scope qualifiers (C:\, global:Name) but stop at `::`
                let next = self.peek_next();
                if next.is_some_and(|n| n != ':' && !n.is_whitespace() && is_word_char(n)) {
                    text.push(self.advance());
                    continue;
                }
                break;
            }
            if !is_word_char(c) {
                break;
            }
            text.push(self.advance());
        }

        match TokenKind::keyword(&text) {
            Some(kind) => self.make_token(kind, &text),
            None => self.make_token(TokenKind::Word, &text),
        }
    }

    // === Character navigation ===

    /// Advance to next character and return it
    pub(super) fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.byte_pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Peek at current character without advancing
    pub(super) fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    /// Peek at next character (current + 1)
    pub(super) fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    /// Check if current character matches expected, and advance if so
    pub(super) fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Check if we've reached the end of source
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    /// Zero-length span at the current position
    pub(super) fn position_here(&self) -> Span {
        Span::new(self.byte_pos, self.byte_pos, self.line, self.column)
    }

    // === Token creation ===

    /// Create a token with the given kind and lexeme
    pub(super) fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        let span = Span::new(
            self.start_byte,
            self.byte_pos,
            self.start_line,
            self.start_column,
        );
        Token::new(kind, lexeme, span)
    }

    /// Create an error token and record a diagnostic with a specific code
    pub(super) fn error_token_with_code(&mut self, code: &str, message: &str) -> Token {
        let span = Span::new(
            self.start_byte,
            self.byte_pos.max(self.start_byte + 1),
            self.start_line,
            self.start_column,
        );

        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span).with_label("lexer error"),
        );

        Token::new(TokenKind::Error, message, span)
    }

    /// Source text of the current token so far
    pub(super) fn current_text(&self) -> &str {
        &self.source[self.start_byte..self.byte_pos]
    }
}

/// Characters that may continue a bare word
fn is_word_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '(' | ')' | '{' | '}' | '[' | ']' | ';' | ',' | '|' | '&' | '\'' | '"' | '$' | '='
                | '<' | '>' | '\0'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let (tokens, _) = lexer.tokenize();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        let mut lexer = Lexer::new("");
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_grouping_tokens() {
        assert_eq!(
            kinds("(){}[]@(@{$("),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::AtParen,
                TokenKind::AtBrace,
                TokenKind::DollarParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_command_word_keeps_dashes() {
        let mut lexer = Lexer::new("Get-Widget -Name 'x'");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[0].lexeme, "Get-Widget");
        assert_eq!(tokens[1].kind, TokenKind::Parameter);
        assert_eq!(tokens[1].lexeme, "Name");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(kinds("FUNCTION")[0], TokenKind::Function);
        assert_eq!(kinds("Class")[0], TokenKind::Class);
        assert_eq!(kinds("param")[0], TokenKind::Param);
    }

    #[test]
    fn test_comments_and_continuations_skipped() {
        let source = "Get-Item `\n  -Path x # trailing\n<# block\ncomment #>end";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Word,
                TokenKind::Parameter,
                TokenKind::Word,
                TokenKind::Newline,
                TokenKind::Word,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("<# never closed");
        let (_, diagnostics) = lexer.tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_COMMENT);
    }

    #[test]
    fn test_variables() {
        let mut lexer = Lexer::new("$x ${my var} $env:PATH $_ $script:count");
        let (tokens, _) = lexer.tokenize();
        let names: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Variable)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(names, vec!["x", "my var", "env:PATH", "_", "script:count"]);
    }

    #[test]
    fn test_positions_track_lines_and_bytes() {
        let mut lexer = Lexer::new("a\n  é $b");
        let (tokens, _) = lexer.tokenize();
        let var = tokens.iter().find(|t| t.kind == TokenKind::Variable).unwrap();
        assert_eq!(var.span.line, 2);
        assert_eq!(var.span.column, 5);
        assert_eq!(var.span.start, 7);
    }

    #[test]
    fn test_scope_qualified_function_name() {
        let mut lexer = Lexer::new("global:Get-Thing");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].lexeme, "global:Get-Thing");
    }

    #[test]
    fn test_static_member_access() {
        assert_eq!(
            kinds("[Math]::Round"),
            vec![
                TokenKind::LeftBracket,
                TokenKind::Word,
                TokenKind::RightBracket,
                TokenKind::ColonColon,
                TokenKind::Word,
                TokenKind::Eof,
            ]
        );
    }
}
