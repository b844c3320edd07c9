//! Attributes, type literals and parameter declarations

use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::parser::stmt::make_statement;
use crate::parser::{is_name_token, Parser};
use crate::span::Span;
use crate::token::TokenKind;

/// Result of parsing a `[...]` group in non-index position
pub(super) enum Bracket {
    Attribute(Attribute),
    Type(TypeName),
}

impl Parser {
    /// Parse `[TypeName]` or `[Name(args)]`
    pub(super) fn parse_bracket(&mut self) -> Result<Bracket, ()> {
        let open = self.advance().clone();

        if !is_name_token(self.peek()) {
            let span = self.peek().span;
            self.error_at(
                error_codes::MISSING_TYPE_NAME,
                "Expected a type name after '['",
                span,
                "expected a type name",
            );
            self.skip_past_closer();
            return Err(());
        }

        let name = self.parse_bare_type_name();

        if self.check(TokenKind::LeftParen) {
            let args = self.parse_attribute_args()?;
            let end = self.close_group(TokenKind::RightBracket, &open);
            return Ok(Bracket::Attribute(Attribute {
                name,
                args,
                span: open.span.merge(end),
            }));
        }

        self.close_group(TokenKind::RightBracket, &open);
        Ok(Bracket::Type(name))
    }

    /// Parse a dotted type name plus any adjacent `[...]` suffixes
    /// (`List[string]`, `int[]`). The current token must be a name.
    pub(super) fn parse_bare_type_name(&mut self) -> TypeName {
        let first = self.advance().clone();
        let mut name = first.lexeme;
        let mut span = first.span;

        while self.check(TokenKind::LeftBracket) && self.peek().span.start == span.end {
            let mut depth = 0usize;
            while !self.is_at_end() {
                let token = self.advance().clone();
                name.push_str(&token.lexeme);
                span = span.merge(token.span);
                match token.kind {
                    TokenKind::LeftBracket => depth += 1,
                    TokenKind::RightBracket => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }

        TypeName { name, span }
    }

    /// Parse `(positional, Name = value, Switch)` after an attribute name
    fn parse_attribute_args(&mut self) -> Result<Vec<AttributeArgument>, ()> {
        let open = self.advance().clone();
        let mut args = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() || self.check(TokenKind::RightParen) {
                break;
            }

            let start = self.peek().span;
            if is_name_token(self.peek()) {
                match self.kind_after_current() {
                    TokenKind::Equal => {
                        let name = self.advance().lexeme.clone();
                        self.skip_newlines();
                        self.advance(); // =
                        let value = self.parse_list_element()?;
                        let Some(last) = value.last() else {
                            self.error(&format!("Expected a value for '{}'", name));
                            return Err(());
                        };
                        let span = start.merge(last.span);
                        args.push(AttributeArgument::Named {
                            name,
                            value: Some(value),
                            span,
                        });
                    }
                    TokenKind::Comma | TokenKind::RightParen => {
                        let name = self.advance().lexeme.clone();
                        args.push(AttributeArgument::Named {
                            name,
                            value: None,
                            span: start,
                        });
                    }
                    _ => args.push(self.parse_positional_arg(start)?),
                }
            } else {
                args.push(self.parse_positional_arg(start)?);
            }

            self.skip_newlines();
            if self.match_token(TokenKind::Comma) {
                continue;
            }
            if !self.check(TokenKind::RightParen) && !self.is_at_end() {
                self.error("Expected ',' or ')' in attribute arguments");
                return Err(());
            }
        }

        self.close_group(TokenKind::RightParen, &open);
        Ok(args)
    }

    fn parse_positional_arg(&mut self, start: Span) -> Result<AttributeArgument, ()> {
        let value = self.parse_list_element()?;
        let Some(last) = value.last() else {
            self.error("Expected an attribute argument");
            return Err(());
        };
        let span = start.merge(last.span);
        Ok(AttributeArgument::Positional { value, span })
    }

    /// Parse attributes before a declaration; type literals are rejected
    pub(super) fn parse_leading_attributes(&mut self) -> Result<Vec<Attribute>, ()> {
        let mut attributes = Vec::new();

        loop {
            self.skip_newlines();
            if !self.check(TokenKind::LeftBracket) {
                break;
            }
            match self.parse_bracket()? {
                Bracket::Attribute(attribute) => attributes.push(attribute),
                Bracket::Type(ty) => {
                    self.error_at(
                        error_codes::UNEXPECTED_TOKEN,
                        &format!("Type literal '[{}]' cannot precede a declaration", ty.name),
                        ty.span,
                        "expected an attribute",
                    );
                    return Err(());
                }
            }
        }

        Ok(attributes)
    }

    /// Parse `[attributes] param(...)`
    pub(super) fn parse_param_block(&mut self) -> Result<ParamBlock, ()> {
        let attributes = self.parse_leading_attributes()?;
        let param_span = self.consume(TokenKind::Param, "Expected 'param'")?.span;
        let start = attributes.first().map(|a| a.span).unwrap_or(param_span);

        self.skip_newlines();
        let open = self
            .consume(TokenKind::LeftParen, "Expected '(' after 'param'")?
            .clone();
        let params = self.parse_parameter_list();
        let end = self.close_group(TokenKind::RightParen, &open);

        Ok(ParamBlock {
            attributes,
            params,
            span: start.merge(end),
        })
    }

    /// Parse comma-separated parameters up to a closer (not consumed).
    /// Malformed parameters are reported and skipped.
    pub(super) fn parse_parameter_list(&mut self) -> Vec<Parameter> {
        let mut params = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() || self.peek().kind.is_closer() {
                break;
            }

            match self.parse_parameter() {
                Ok(param) => params.push(param),
                Err(_) => self.skip_list_item(),
            }

            self.skip_newlines();
            if self.match_token(TokenKind::Comma) {
                continue;
            }
            if self.is_at_end() || self.peek().kind.is_closer() {
                break;
            }
            self.error("Expected ',' between parameters");
            self.skip_list_item();
            self.match_token(TokenKind::Comma);
        }

        params
    }

    /// Parse `[attr] [type] $Name [= default]`
    fn parse_parameter(&mut self) -> Result<Parameter, ()> {
        let start = self.peek().span;
        let mut attributes = Vec::new();
        let mut type_constraints = Vec::new();

        loop {
            self.skip_newlines();
            if !self.check(TokenKind::LeftBracket) {
                break;
            }
            match self.parse_bracket()? {
                Bracket::Attribute(attribute) => attributes.push(attribute),
                Bracket::Type(ty) => type_constraints.push(ty),
            }
        }

        if !self.check(TokenKind::Variable) {
            let span = self.peek().span;
            self.error_at(
                error_codes::UNEXPECTED_TOKEN,
                "Expected a parameter variable such as '$Name'",
                span,
                "expected a variable",
            );
            return Err(());
        }
        let name_token = self.advance().clone();
        let mut end = name_token.span;

        let default = if self.match_token(TokenKind::Equal) {
            let elements = self.parse_list_element()?;
            let value = make_statement(elements, self.peek().span);
            if !value.elements.is_empty() {
                end = value.span;
            }
            Some(value)
        } else {
            None
        };

        Ok(Parameter {
            attributes,
            type_constraints,
            name: name_token.lexeme,
            default,
            span: start.merge(end),
        })
    }

    /// Kind of the next token after the current one, ignoring newlines
    fn kind_after_current(&self) -> TokenKind {
        self.tokens[self.current + 1..]
            .iter()
            .map(|t| t.kind)
            .find(|kind| *kind != TokenKind::Newline)
            .unwrap_or(TokenKind::Eof)
    }

    /// Skip to the next `,` or closer at the current nesting level
    fn skip_list_item(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            let kind = self.peek().kind;
            if depth == 0 && (kind == TokenKind::Comma || kind.is_closer()) {
                return;
            }
            if kind.is_opener() {
                depth += 1;
            } else if kind.is_closer() {
                depth -= 1;
            }
            self.advance();
        }
    }

    /// Skip past the closer matching an opener that was just consumed
    fn skip_past_closer(&mut self) {
        let mut depth = 1usize;
        while !self.is_at_end() {
            let kind = self.advance().kind;
            if kind.is_opener() {
                depth += 1;
            } else if kind.is_closer() {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }
}
