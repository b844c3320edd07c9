//! Literal scanning for the lexer

use crate::diagnostic::error_codes;
use crate::lexer::{is_word_char, Lexer};
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Scan a verbatim string; `''` inside is an escaped quote
    pub(super) fn single_quoted_string(&mut self) -> Token {
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return self.error_unterminated_string();
            }
            let c = self.advance();
            if c == '\'' {
                if self.peek() == '\'' {
                    self.advance();
                    value.push('\'');
                    continue;
                }
                break;
            }
            value.push(c);
        }

        self.make_token(TokenKind::StringLiteral, &value)
    }

    /// Scan an expandable string, including backtick escapes and `$( )`
    /// subexpressions that may contain their own quotes
    pub(super) fn double_quoted_string(&mut self) -> Token {
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return self.error_unterminated_string();
            }
            let c = self.advance();
            match c {
                '"' => {
                    if self.peek() == '"' {
                        self.advance();
                        value.push('"');
                        continue;
                    }
                    break;
                }
                '`' => {
                    if self.is_at_end() {
                        return self.error_unterminated_string();
                    }
                    let escaped = self.advance();
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '0' => '\0',
                        'a' => '\u{7}',
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'v' => '\u{b}',
                        'e' => '\u{1b}',
                        other => other,
                    });
                }
                '$' if self.peek() == '(' => {
                    value.push('$');
                    if !self.subexpression_in_string(&mut value) {
                        return self.error_unterminated_string();
                    }
                }
                _ => value.push(c),
            }
        }

        self.make_token(TokenKind::StringExpandable, &value)
    }

    /// Copy a `$( ... )` subexpression verbatim into `value`. Returns false
    /// when input ends before the closing paren.
    fn subexpression_in_string(&mut self, value: &mut String) -> bool {
        let mut depth = 0usize;

        while !self.is_at_end() {
            let c = self.advance();
            value.push(c);
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                '\'' | '"' => {
                    // Nested quoted text; its parens don't count
                    while !self.is_at_end() {
                        let inner = self.advance();
                        value.push(inner);
                        if inner == '`' && c == '"' && !self.is_at_end() {
                            value.push(self.advance());
                            continue;
                        }
                        if inner == c {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        false
    }

    /// Whether the input after `@` is a here-string header: a quote followed
    /// by nothing but whitespace up to the end of the line
    pub(super) fn here_string_header_follows(&self) -> bool {
        let mut i = self.current + 1;
        while let Some(&c) = self.chars.get(i) {
            match c {
                '\n' => return true,
                ' ' | '\t' | '\r' => i += 1,
                _ => return false,
            }
        }
        false
    }

    /// Scan `@'...'@` or `@"..."@`. The body starts on the line after the
    /// header and ends at a line beginning with the closing quote and `@`.
    pub(super) fn here_string(&mut self) -> Token {
        let quote = self.advance();
        while self.peek() != '\n' {
            self.advance();
        }
        self.advance(); // header newline

        let mut body = String::new();
        let mut at_line_start = true;

        while !self.is_at_end() {
            if at_line_start && self.peek() == quote && self.peek_next() == Some('@') {
                self.advance();
                self.advance();
                if body.ends_with('\n') {
                    body.pop();
                    if body.ends_with('\r') {
                        body.pop();
                    }
                }
                let kind = if quote == '\'' {
                    TokenKind::StringLiteral
                } else {
                    TokenKind::StringExpandable
                };
                return self.make_token(kind, &body);
            }

            let c = self.advance();
            at_line_start = c == '\n';
            body.push(c);
        }

        self.error_token_with_code(
            error_codes::UNTERMINATED_HERE_STRING,
            &format!("Unterminated here-string; expected a line starting with {}@", quote),
        )
    }

    /// Scan a numeric literal. Text that starts with a digit but does not
    /// form a number (`7zip`, `2-factor`) becomes a bare word.
    pub(super) fn number(&mut self) -> Token {
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else if c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
                self.advance();
            } else if (c == '-' || c == '+')
                && self.current_text().to_ascii_lowercase().ends_with('e')
                && self.peek_next().is_some_and(|n| n.is_ascii_digit())
                && !self.current_text().to_ascii_lowercase().starts_with("0x")
            {
                self.advance();
            } else {
                break;
            }
        }

        let continues_as_word = !self.is_at_end()
            && self.peek() != '.'
            && self.peek() != ':'
            && is_word_char(self.peek());

        let text = self.current_text().to_string();
        if !continues_as_word && is_number_literal(&text) {
            return self.make_token(TokenKind::Number, &text);
        }

        let mut word = text;
        while !self.is_at_end() && self.peek() != ':' && is_word_char(self.peek()) {
            word.push(self.advance());
        }
        self.make_token(TokenKind::Word, &word)
    }

    fn error_unterminated_string(&mut self) -> Token {
        self.error_token_with_code(
            error_codes::UNTERMINATED_STRING,
            "Unterminated string literal",
        )
    }
}

/// Decimal, hex, scientific, and multiplier-suffixed (`10MB`) numbers, with
/// optional `l`/`d` type suffixes
fn is_number_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        let hex = hex.strip_suffix('l').unwrap_or(hex);
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let mut body = lower.as_str();
    for suffix in ["kb", "mb", "gb", "tb", "pb"] {
        if let Some(stripped) = body.strip_suffix(suffix) {
            body = stripped;
            break;
        }
    }
    if let Some(stripped) = body.strip_suffix('l').or_else(|| body.strip_suffix('d')) {
        body = stripped;
    }

    !body.is_empty()
        && body.starts_with(|c: char| c.is_ascii_digit())
        && body.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> Token {
        let mut lexer = Lexer::new(source);
        let (tokens, _) = lexer.tokenize();
        tokens.into_iter().next().unwrap()
    }

    #[test]
    fn test_single_quoted_doubled_quote() {
        let token = single("'it''s'");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.lexeme, "it's");
    }

    #[test]
    fn test_double_quoted_escapes() {
        let token = single("\"a`tb `\"q`\" \"\"c\"\"\"");
        assert_eq!(token.kind, TokenKind::StringExpandable);
        assert_eq!(token.lexeme, "a\tb \"q\" \"c\"");
    }

    #[test]
    fn test_subexpression_with_nested_quotes() {
        let token = single("\"Count: $($items.Where({ $_ -eq \")\" }).Count)\"");
        assert_eq!(token.kind, TokenKind::StringExpandable);
        assert_eq!(
            token.lexeme,
            "Count: $($items.Where({ $_ -eq \")\" }).Count)"
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'never closed");
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_STRING);
    }

    #[test]
    fn test_here_string() {
        let source = "@'\nline one\n  'quoted'\n'@\nnext";
        let mut lexer = Lexer::new(source);
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].lexeme, "line one\n  'quoted'");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].lexeme, "next");
    }

    #[test]
    fn test_unterminated_here_string() {
        let mut lexer = Lexer::new("@\"\nbody\n");
        let (_, diagnostics) = lexer.tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_HERE_STRING);
    }

    #[test]
    fn test_numbers() {
        for text in ["42", "1.5", "0x1F", "10MB", "1e3", "2.5e-3", "7l"] {
            let token = single(text);
            assert_eq!(token.kind, TokenKind::Number, "{}", text);
            assert_eq!(token.lexeme, text);
        }
    }

    #[test]
    fn test_digit_led_words() {
        assert_eq!(single("7zip").kind, TokenKind::Word);
        let token = single("2-factor");
        assert_eq!(token.kind, TokenKind::Word);
        assert_eq!(token.lexeme, "2-factor");
    }

    #[test]
    fn test_range_operator_not_swallowed() {
        let mut lexer = Lexer::new("1..10");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "..");
        assert_eq!(tokens[2].lexeme, "10");
    }
}
