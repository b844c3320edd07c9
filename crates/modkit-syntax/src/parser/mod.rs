//! Parsing (tokens to syntax tree)
//!
//! Recursive descent over the token stream. Declarations are parsed into
//! structured nodes; ordinary statements are kept as element sequences with
//! balanced groups. Every `Err(())` has already pushed a diagnostic, and the
//! caller recovers with [`Parser::synchronize`].

mod attr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parser state for building the syntax tree from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or_else(Span::dummy);
            tokens.push(Token::new(
                TokenKind::Eof,
                "",
                Span::new(end.end, end.end, end.line, end.column),
            ));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse tokens into a script file
    pub fn parse(&mut self) -> (ScriptFile, Vec<Diagnostic>) {
        let start = self.peek().span;
        let (param_block, items) = self.parse_item_list(None);
        let end = self.peek().span;

        let script = ScriptFile {
            param_block,
            items,
            span: start.merge(end),
        };
        (script, std::mem::take(&mut self.diagnostics))
    }

    // === Item lists ===

    /// Parse items up to `terminator` (not consumed) or end of input. A param
    /// block is accepted only before the first item.
    pub(super) fn parse_item_list(
        &mut self,
        terminator: Option<TokenKind>,
    ) -> (Option<ParamBlock>, Vec<Item>) {
        let mut param_block = None;
        let mut items = Vec::new();

        loop {
            self.skip_separators();
            if self.is_at_end() {
                break;
            }

            let kind = self.peek().kind;
            if Some(kind) == terminator {
                break;
            }
            if kind.is_closer() {
                if terminator.is_some() {
                    // Mismatched closer; let the enclosing group report it
                    break;
                }
                let token = self.advance().clone();
                self.error_at(
                    error_codes::UNEXPECTED_TOKEN,
                    &format!("Unexpected '{}'", token.lexeme),
                    token.span,
                    "no matching opening delimiter",
                );
                continue;
            }

            if self.param_block_ahead() {
                match self.parse_param_block() {
                    Ok(block) => {
                        if items.is_empty() && param_block.is_none() {
                            param_block = Some(block);
                        } else {
                            self.error_at(
                                error_codes::MISPLACED_PARAM_BLOCK,
                                "A param block must be the first statement in a script or function",
                                block.span,
                                "param block after other statements",
                            );
                        }
                    }
                    Err(_) => self.synchronize(),
                }
                continue;
            }

            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(_) => self.synchronize(),
            }
        }

        (param_block, items)
    }

    /// Parse one item at statement position
    fn parse_item(&mut self) -> Result<Item, ()> {
        match self.peek().kind {
            TokenKind::Using => Ok(Item::Using(self.parse_using()?)),
            TokenKind::Function | TokenKind::Filter | TokenKind::Workflow => {
                Ok(Item::Function(self.parse_function()?))
            }
            TokenKind::Class => Ok(Item::Class(self.parse_class(Vec::new())?)),
            TokenKind::Enum => Ok(Item::Enum(self.parse_enum(Vec::new())?)),
            TokenKind::LeftBracket => match self.kind_after_brackets() {
                TokenKind::Class => {
                    let attributes = self.parse_leading_attributes()?;
                    Ok(Item::Class(self.parse_class(attributes)?))
                }
                TokenKind::Enum => {
                    let attributes = self.parse_leading_attributes()?;
                    Ok(Item::Enum(self.parse_enum(attributes)?))
                }
                _ => Ok(Item::Statement(self.parse_statement()?)),
            },
            _ => Ok(Item::Statement(self.parse_statement()?)),
        }
    }

    // === Lookahead ===

    /// Kind of the first token after any run of `[...]` groups and newlines
    pub(super) fn kind_after_brackets(&self) -> TokenKind {
        let mut idx = self.current;
        loop {
            match self.tokens[idx].kind {
                TokenKind::Newline => idx += 1,
                TokenKind::LeftBracket => {
                    let mut depth = 0usize;
                    loop {
                        let kind = self.tokens[idx].kind;
                        if kind == TokenKind::Eof {
                            return TokenKind::Eof;
                        }
                        if kind.is_opener() {
                            depth += 1;
                        } else if kind.is_closer() {
                            depth = depth.saturating_sub(1);
                        }
                        idx += 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                kind => return kind,
            }
        }
    }

    /// Whether a (possibly attributed) `param(` block starts here
    fn param_block_ahead(&self) -> bool {
        match self.peek().kind {
            TokenKind::Param => true,
            TokenKind::LeftBracket => self.kind_after_brackets() == TokenKind::Param,
            _ => false,
        }
    }

    // === Helper methods ===

    /// Advance to next token and return reference to previous
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Peek at current token
    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Token before the current one, if any
    pub(super) fn previous(&self) -> Option<&Token> {
        self.current.checked_sub(1).map(|idx| &self.tokens[idx])
    }

    /// Check if current token matches kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Match and consume token if it matches
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token of given kind or error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error(message);
            Err(())
        }
    }

    /// Consume the closer for a group opened at `open`. A missing closer is
    /// reported at the opener and the group is kept.
    pub(super) fn close_group(&mut self, closer: TokenKind, open: &Token) -> Span {
        if self.check(closer) {
            return self.advance().span;
        }
        let expected = match closer {
            TokenKind::RightParen => ")",
            TokenKind::RightBrace => "}",
            _ => "]",
        };
        self.error_at(
            error_codes::MISSING_CLOSING_DELIMITER,
            &format!("Missing closing '{}'", expected),
            open.span,
            "unclosed delimiter opened here",
        );
        self.previous().map(|t| t.span).unwrap_or(open.span)
    }

    /// Check if at end of token stream
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].kind == TokenKind::Eof
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    pub(super) fn skip_separators(&mut self) {
        while self.check(TokenKind::Newline) || self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Record an error at the current token
    pub(super) fn error(&mut self, message: &str) {
        let span = self.peek().span;
        self.error_at(error_codes::UNEXPECTED_TOKEN, message, span, "syntax error");
    }

    /// Record an error with a specific code and location
    pub(super) fn error_at(&mut self, code: &str, message: &str, span: Span, label: &str) {
        self.diagnostics
            .push(Diagnostic::error_with_code(code, message, span).with_label(label));
    }

    /// Skip to the end of the current statement. Nested groups are skipped
    /// whole; an unmatched closer is left for the enclosing list.
    pub(super) fn synchronize(&mut self) {
        let mut depth = 0usize;

        while !self.is_at_end() {
            let kind = self.peek().kind;
            if depth == 0 {
                if matches!(kind, TokenKind::Newline | TokenKind::Semicolon) {
                    self.advance();
                    return;
                }
                if kind.is_closer() {
                    return;
                }
            }
            if kind.is_opener() {
                depth += 1;
            } else if kind.is_closer() {
                depth -= 1;
            }
            self.advance();
        }
    }
}

/// Whether a token can serve as a name (function, member, argument)
pub(super) fn is_name_token(token: &Token) -> bool {
    token.kind == TokenKind::Word || token.kind.is_keyword()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_source(source: &str) -> (ScriptFile, Vec<Diagnostic>) {
        let mut lexer = Lexer::new(source);
        let (tokens, _) = lexer.tokenize();
        let mut parser = Parser::new(tokens);
        parser.parse()
    }

    #[test]
    fn test_parser_creation() {
        let mut parser = Parser::new(Vec::new());
        let (script, diagnostics) = parser.parse();
        assert!(script.items.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_statements_split_on_newline_and_semicolon() {
        let (script, diagnostics) = parse_source("Write-Host a; Write-Host b\nGet-Item c");
        assert!(diagnostics.is_empty());
        assert_eq!(script.items.len(), 3);
    }

    #[test]
    fn test_pipeline_continues_after_trailing_pipe() {
        let (script, diagnostics) = parse_source("Get-Item x |\n  Select-Object Name");
        assert!(diagnostics.is_empty());
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn test_script_level_param_block() {
        let (script, diagnostics) =
            parse_source("[CmdletBinding()]\nparam([string]$Path)\nGet-Item $Path");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let block = script.param_block.expect("param block");
        assert_eq!(block.attributes.len(), 1);
        assert_eq!(block.params[0].name, "Path");
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn test_misplaced_param_block() {
        let (_, diagnostics) = parse_source("Get-Item x\nparam($a)");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::MISPLACED_PARAM_BLOCK);
    }

    #[test]
    fn test_stray_closer_reported_and_skipped() {
        let (script, diagnostics) = parse_source("Get-Item a\n}\nGet-Item b");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::UNEXPECTED_TOKEN);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(script.items.len(), 2);
    }

    #[test]
    fn test_unclosed_brace_reported_at_opener() {
        let (_, diagnostics) = parse_source("function Get-A {\n  if ($x) {\n    1\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::MISSING_CLOSING_DELIMITER);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[0].column, 16);
    }

    #[test]
    fn test_recovery_continues_after_error() {
        let (script, diagnostics) = parse_source("function {\n}\nfunction Get-B { }");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::MISSING_FUNCTION_NAME);
        assert!(script
            .items
            .iter()
            .any(|item| matches!(item, Item::Function(f) if f.name == "Get-B")));
    }
}
