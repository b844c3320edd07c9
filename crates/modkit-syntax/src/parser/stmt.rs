//! Declaration and statement parsing

use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::parser::attr::Bracket;
use crate::parser::{is_name_token, Parser};
use crate::span::Span;
use crate::token::{Token, TokenKind};

impl Parser {
    /// Parse `using module|assembly|namespace <target>`
    pub(super) fn parse_using(&mut self) -> Result<UsingDirective, ()> {
        let using_span = self.consume(TokenKind::Using, "Expected 'using'")?.span;

        let kind = match self.peek() {
            t if t.is_word("module") => UsingKind::Module,
            t if t.is_word("assembly") => UsingKind::Assembly,
            t if t.is_word("namespace") => UsingKind::Namespace,
            t => {
                let span = t.span;
                self.error_at(
                    error_codes::INVALID_USING,
                    "Expected 'module', 'assembly' or 'namespace' after 'using'",
                    span,
                    "unknown using kind",
                );
                return Err(());
            }
        };
        self.advance();

        let target_stmt = self.parse_statement()?;
        let target = render_elements(&target_stmt.elements);
        if target.is_empty() {
            self.error_at(
                error_codes::INVALID_USING,
                "Missing target in using directive",
                using_span,
                "nothing to import",
            );
            return Err(());
        }

        Ok(UsingDirective {
            kind,
            target,
            span: using_span.merge(target_stmt.span),
        })
    }

    /// Parse `function|filter|workflow Name [(params)] { body }`
    pub(super) fn parse_function(&mut self) -> Result<FunctionDecl, ()> {
        let keyword = self.advance().clone();
        let kind = match keyword.kind {
            TokenKind::Filter => FunctionKind::Filter,
            TokenKind::Workflow => FunctionKind::Workflow,
            _ => FunctionKind::Function,
        };

        if !is_name_token(self.peek()) {
            let span = self.peek().span;
            self.error_at(
                error_codes::MISSING_FUNCTION_NAME,
                &format!("Missing name after '{}'", keyword.lexeme),
                span,
                "expected a function name",
            );
            return Err(());
        }
        let name_token = self.advance().clone();

        let params = if self.check(TokenKind::LeftParen) {
            let open = self.advance().clone();
            let params = self.parse_parameter_list();
            self.close_group(TokenKind::RightParen, &open);
            params
        } else {
            Vec::new()
        };

        self.skip_newlines();
        if !self.check(TokenKind::LeftBrace) {
            let span = self.peek().span;
            self.error_at(
                error_codes::MISSING_FUNCTION_BODY,
                &format!("Missing body for function '{}'", name_token.lexeme),
                span,
                "expected '{'",
            );
            return Err(());
        }
        let body = self.parse_script_block()?;

        Ok(FunctionDecl {
            kind,
            name: name_token.lexeme,
            name_span: name_token.span,
            params,
            span: keyword.span.merge(body.span),
            body,
        })
    }

    /// Parse `class Name [: Base, ...] { members }`
    pub(super) fn parse_class(&mut self, attributes: Vec<Attribute>) -> Result<ClassDecl, ()> {
        let class_span = self.consume(TokenKind::Class, "Expected 'class'")?.span;
        let start = attributes.first().map(|a| a.span).unwrap_or(class_span);
        let name_token = self.consume_type_name("class")?;

        let mut base_types = Vec::new();
        if self.match_token(TokenKind::Colon) {
            loop {
                self.skip_newlines();
                if !is_name_token(self.peek()) {
                    let span = self.peek().span;
                    self.error_at(
                        error_codes::MISSING_TYPE_NAME,
                        "Expected a base type name after ':'",
                        span,
                        "expected a type name",
                    );
                    return Err(());
                }
                base_types.push(self.parse_bare_type_name());
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.skip_newlines();
        let open = self
            .consume(TokenKind::LeftBrace, "Expected '{' after class name")?
            .clone();

        let mut members = Vec::new();
        loop {
            self.skip_separators();
            if self.is_at_end() || self.check(TokenKind::RightBrace) {
                break;
            }
            match self.parse_class_member() {
                Ok(member) => members.push(member),
                Err(_) => self.synchronize(),
            }
        }
        let end = self.close_group(TokenKind::RightBrace, &open);

        Ok(ClassDecl {
            attributes,
            name: name_token.lexeme,
            name_span: name_token.span,
            base_types,
            members,
            span: start.merge(end),
        })
    }

    /// Parse a property (`[type] $Name = value`) or method
    /// (`[type] Name(params) { body }`), with leading attributes and modifiers
    fn parse_class_member(&mut self) -> Result<ClassMember, ()> {
        let start = self.peek().span;
        let mut attributes = Vec::new();
        let mut type_constraint = None;
        let mut modifiers = Vec::new();

        loop {
            if self.check(TokenKind::LeftBracket) {
                match self.parse_bracket()? {
                    Bracket::Attribute(attribute) => attributes.push(attribute),
                    Bracket::Type(ty) => type_constraint = Some(ty),
                }
            } else if self.peek().is_word("hidden") || self.peek().is_word("static") {
                modifiers.push(self.advance().lexeme.to_ascii_lowercase());
            } else if self.check(TokenKind::Newline) {
                self.advance();
            } else {
                break;
            }
        }

        if self.check(TokenKind::Variable) {
            let name = self.advance().lexeme.clone();
            let mut end = self.previous().map(|t| t.span).unwrap_or(start);
            let default = if self.match_token(TokenKind::Equal) {
                self.skip_newlines();
                let value = self.parse_statement()?;
                end = value.span;
                Some(value)
            } else {
                None
            };
            return Ok(ClassMember {
                attributes,
                modifiers,
                kind: MemberKind::Property {
                    type_constraint,
                    name,
                    default,
                },
                span: start.merge(end),
            });
        }

        if is_name_token(self.peek()) {
            let name = self.advance().lexeme.clone();
            let open = self
                .consume(TokenKind::LeftParen, "Expected '(' after method name")?
                .clone();
            let params = self.parse_parameter_list();
            self.close_group(TokenKind::RightParen, &open);
            self.skip_newlines();
            if !self.check(TokenKind::LeftBrace) {
                self.error("Expected '{' for method body");
                return Err(());
            }
            let body = self.parse_script_block()?;
            let span = start.merge(body.span);
            return Ok(ClassMember {
                attributes,
                modifiers,
                kind: MemberKind::Method {
                    return_type: type_constraint,
                    name,
                    params,
                    body,
                },
                span,
            });
        }

        let span = self.peek().span;
        self.error_at(
            error_codes::INVALID_CLASS_MEMBER,
            "Expected a property or method declaration",
            span,
            "not a class member",
        );
        Err(())
    }

    /// Parse `enum Name [: type] { A; B = 1 }`
    pub(super) fn parse_enum(&mut self, attributes: Vec<Attribute>) -> Result<EnumDecl, ()> {
        let enum_span = self.consume(TokenKind::Enum, "Expected 'enum'")?.span;
        let start = attributes.first().map(|a| a.span).unwrap_or(enum_span);
        let name_token = self.consume_type_name("enum")?;

        let base_type = if self.match_token(TokenKind::Colon) {
            Some(self.parse_bare_type_name())
        } else {
            None
        };

        self.skip_newlines();
        let open = self
            .consume(TokenKind::LeftBrace, "Expected '{' after enum name")?
            .clone();

        let mut members = Vec::new();
        loop {
            self.skip_separators();
            if self.is_at_end() || self.check(TokenKind::RightBrace) {
                break;
            }
            if self.peek().kind != TokenKind::Word {
                let span = self.peek().span;
                self.error_at(
                    error_codes::INVALID_ENUM_MEMBER,
                    "Expected an enum member name",
                    span,
                    "not an enum member",
                );
                self.synchronize();
                continue;
            }

            let name_token = self.advance().clone();
            let (value, span) = if self.match_token(TokenKind::Equal) {
                let value = self.parse_statement()?;
                let span = name_token.span.merge(value.span);
                (Some(value.elements), span)
            } else {
                (None, name_token.span)
            };
            members.push(EnumMember {
                name: name_token.lexeme,
                value,
                span,
            });
        }
        let end = self.close_group(TokenKind::RightBrace, &open);

        Ok(EnumDecl {
            attributes,
            name: name_token.lexeme,
            base_type,
            members,
            span: start.merge(end),
        })
    }

    /// Parse a statement up to a newline, `;` or an enclosing closer
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ()> {
        let mut elements: Vec<Element> = Vec::new();

        while !self.is_at_end() {
            let kind = self.peek().kind;
            if kind == TokenKind::Newline {
                if elements.last().is_some_and(continues_statement) {
                    self.skip_newlines();
                    continue;
                }
                break;
            }
            if kind == TokenKind::Semicolon || kind.is_closer() {
                break;
            }
            let element = self.parse_element(elements.last())?;
            elements.push(element);
        }

        Ok(make_statement(elements, self.peek().span))
    }

    /// Parse elements up to a `,` or an enclosing closer; newlines are
    /// insignificant. Used for attribute arguments and parameter defaults.
    pub(super) fn parse_list_element(&mut self) -> Result<Vec<Element>, ()> {
        let mut elements: Vec<Element> = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            let kind = self.peek().kind;
            if kind == TokenKind::Comma || kind.is_closer() {
                break;
            }
            let element = self.parse_element(elements.last())?;
            elements.push(element);
        }

        Ok(elements)
    }

    /// Parse a single element: a token, group, block, hashtable, index,
    /// attribute or type literal
    pub(super) fn parse_element(&mut self, previous: Option<&Element>) -> Result<Element, ()> {
        match self.peek().kind {
            TokenKind::LeftParen => self.parse_group(GroupKind::Paren),
            TokenKind::DollarParen => self.parse_group(GroupKind::Subexpression),
            TokenKind::AtParen => self.parse_group(GroupKind::Array),
            TokenKind::LeftBrace => {
                let block = self.parse_script_block()?;
                Ok(Element {
                    span: block.span,
                    kind: ElementKind::ScriptBlock(block),
                })
            }
            TokenKind::AtBrace => self.parse_hashtable(),
            TokenKind::LeftBracket => {
                if previous.is_some_and(|p| indexable(p, self.peek().span)) {
                    return self.parse_index();
                }
                let start = self.peek().span;
                let bracket = self.parse_bracket()?;
                let end = self.previous().map(|t| t.span).unwrap_or(start);
                let kind = match bracket {
                    Bracket::Attribute(attribute) => ElementKind::Attribute(attribute),
                    Bracket::Type(ty) => ElementKind::TypeLiteral(ty),
                };
                Ok(Element {
                    kind,
                    span: start.merge(end),
                })
            }
            _ => {
                let token = self.advance().clone();
                Ok(Element {
                    span: token.span,
                    kind: ElementKind::Token(token),
                })
            }
        }
    }

    /// Parse `{ [param(...)] items }`
    pub(super) fn parse_script_block(&mut self) -> Result<ScriptBlock, ()> {
        let open = self
            .consume(TokenKind::LeftBrace, "Expected '{'")?
            .clone();
        let (param_block, items) = self.parse_item_list(Some(TokenKind::RightBrace));
        let end = self.close_group(TokenKind::RightBrace, &open);

        Ok(ScriptBlock {
            param_block,
            items,
            span: open.span.merge(end),
        })
    }

    fn parse_group(&mut self, kind: GroupKind) -> Result<Element, ()> {
        let open = self.advance().clone();
        let (param_block, items) = self.parse_item_list(Some(TokenKind::RightParen));
        if let Some(block) = param_block {
            self.error_at(
                error_codes::MISPLACED_PARAM_BLOCK,
                "A param block is not allowed inside parentheses",
                block.span,
                "param block in expression",
            );
        }
        let end = self.close_group(TokenKind::RightParen, &open);

        Ok(Element {
            kind: ElementKind::Group { kind, items },
            span: open.span.merge(end),
        })
    }

    fn parse_index(&mut self) -> Result<Element, ()> {
        let open = self.advance().clone();
        let (_, items) = self.parse_item_list(Some(TokenKind::RightBracket));
        let end = self.close_group(TokenKind::RightBracket, &open);

        Ok(Element {
            kind: ElementKind::Index(items),
            span: open.span.merge(end),
        })
    }

    /// Parse `@{ Key = value; ... }`
    fn parse_hashtable(&mut self) -> Result<Element, ()> {
        let open = self.advance().clone();
        let mut entries = Vec::new();

        loop {
            self.skip_separators();
            if self.is_at_end() || self.peek().kind.is_closer() {
                break;
            }

            let key = self.parse_element(None)?;
            if !self.check(TokenKind::Equal) {
                let span = self.peek().span;
                self.error_at(
                    error_codes::MISSING_HASH_EQUALS,
                    "Missing '=' after hashtable key",
                    span,
                    "expected '='",
                );
                self.synchronize();
                continue;
            }
            self.advance();
            self.skip_newlines();

            let value = self.parse_statement()?;
            let span = key.span.merge(value.span);
            entries.push(HashEntry {
                key: vec![key],
                value,
                span,
            });
        }
        let end = self.close_group(TokenKind::RightBrace, &open);

        Ok(Element {
            kind: ElementKind::Hashtable(entries),
            span: open.span.merge(end),
        })
    }

    /// Consume the name of a class or enum declaration
    fn consume_type_name(&mut self, what: &str) -> Result<Token, ()> {
        if is_name_token(self.peek()) {
            return Ok(self.advance().clone());
        }
        let span = self.peek().span;
        self.error_at(
            error_codes::MISSING_TYPE_NAME,
            &format!("Missing name in {} declaration", what),
            span,
            "expected a type name",
        );
        Err(())
    }
}

/// Build a statement, using `fallback` as a zero-width position when empty
pub(super) fn make_statement(elements: Vec<Element>, fallback: Span) -> Statement {
    let span = match (elements.first(), elements.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => Span::new(fallback.start, fallback.start, fallback.line, fallback.column),
    };
    Statement { elements, span }
}

/// Whether a statement ending in `element` continues on the next line
fn continues_statement(element: &Element) -> bool {
    match &element.kind {
        ElementKind::Token(token) => match token.kind {
            TokenKind::Pipe | TokenKind::Comma | TokenKind::Equal => true,
            TokenKind::Operator => !matches!(token.lexeme.as_str(), "++" | "--" | "!"),
            _ => false,
        },
        _ => false,
    }
}

/// Whether a `[` at `bracket` indexes into `previous` (no space between)
fn indexable(previous: &Element, bracket: Span) -> bool {
    if previous.span.end != bracket.start {
        return false;
    }
    match &previous.kind {
        ElementKind::Token(token) => matches!(
            token.kind,
            TokenKind::Variable
                | TokenKind::Word
                | TokenKind::StringLiteral
                | TokenKind::StringExpandable
                | TokenKind::Number
        ),
        ElementKind::Group { .. } | ElementKind::Index(_) | ElementKind::Hashtable(_) => true,
        _ => false,
    }
}

/// Flatten elements back to text, joining adjacent tokens without spaces
fn render_elements(elements: &[Element]) -> String {
    let mut out = String::new();
    let mut last_end = None;

    for element in elements {
        if last_end.is_some_and(|end| end < element.span.start) {
            out.push(' ');
        }
        match &element.kind {
            ElementKind::Token(token) => out.push_str(&token.lexeme),
            ElementKind::Hashtable(_) => out.push_str("@{...}"),
            ElementKind::TypeLiteral(ty) => {
                out.push('[');
                out.push_str(&ty.name);
                out.push(']');
            }
            _ => out.push_str("(...)"),
        }
        last_end = Some(element.span.end);
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::diagnostic::{error_codes, Diagnostic};
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse_source(source: &str) -> (ScriptFile, Vec<Diagnostic>) {
        let mut lexer = Lexer::new(source);
        let (tokens, _) = lexer.tokenize();
        Parser::new(tokens).parse()
    }

    #[test]
    fn test_using_directives() {
        let (script, diagnostics) = parse_source(
            "using module Foo.Bar\nusing namespace System.IO\nusing assembly 'lib\\a.dll'",
        );
        assert!(diagnostics.is_empty());
        let targets: Vec<_> = script
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Using(u) => Some((u.kind.clone(), u.target.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                (UsingKind::Module, "Foo.Bar"),
                (UsingKind::Namespace, "System.IO"),
                (UsingKind::Assembly, "lib\\a.dll"),
            ]
        );
    }

    #[test]
    fn test_invalid_using() {
        let (_, diagnostics) = parse_source("using foo Bar");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::INVALID_USING);
    }

    #[test]
    fn test_function_with_inline_params() {
        let (script, diagnostics) =
            parse_source("function Add-Numbers([int]$a, $b = 2) { $a + $b }");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        match &script.items[0] {
            Item::Function(f) => {
                assert_eq!(f.name, "Add-Numbers");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.params[0].type_constraints[0].name, "int");
                assert!(f.params[1].default.is_some());
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_body_on_next_line() {
        let (script, diagnostics) =
            parse_source("filter Where-Even\n{\n  if ($_ % 2 -eq 0) { $_ }\n}");
        assert!(diagnostics.is_empty());
        assert!(matches!(&script.items[0], Item::Function(f) if f.kind == FunctionKind::Filter));
    }

    #[test]
    fn test_missing_function_body() {
        let (_, diagnostics) = parse_source("function Get-Widget\nGet-Item x");
        assert_eq!(diagnostics[0].code, error_codes::MISSING_FUNCTION_BODY);
    }

    #[test]
    fn test_nested_function() {
        let (script, diagnostics) =
            parse_source("function Outer {\n  function Inner { 1 }\n  Inner\n}");
        assert!(diagnostics.is_empty());
        match &script.items[0] {
            Item::Function(f) => {
                assert!(matches!(&f.body.items[0], Item::Function(inner) if inner.name == "Inner"));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_class_members() {
        let source = "class Widget : Base, IComparable {\n    [string] $Name\n    hidden [int] $Size = 3\n    static [Widget] Create([string]$name) {\n        return [Widget]::new()\n    }\n    Widget() { }\n}";
        let (script, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        match &script.items[0] {
            Item::Class(class) => {
                assert_eq!(class.name, "Widget");
                assert_eq!(class.base_types.len(), 2);
                assert_eq!(class.members.len(), 4);
                assert_eq!(class.members[1].modifiers, vec!["hidden".to_string()]);
                assert!(matches!(
                    &class.members[2].kind,
                    MemberKind::Method { name, params, .. } if name == "Create" && params.len() == 1
                ));
                assert_eq!(class.property_names().collect::<Vec<_>>(), vec!["Name", "Size"]);
            }
            other => panic!("Expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_attributed_class() {
        let source = "[DscResource()]\nclass Service {\n    [DscProperty(Key)] [string] $Name\n}";
        let (script, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty());
        match &script.items[0] {
            Item::Class(class) => {
                assert!(class.has_attribute("DscResource"));
                assert_eq!(class.members[0].attributes[0].name.name, "DscProperty");
            }
            other => panic!("Expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_class_member() {
        let (_, diagnostics) = parse_source("class A {\n  42\n  [string] $Ok\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::INVALID_CLASS_MEMBER);
        assert_eq!(diagnostics[0].line, 2);
    }

    #[test]
    fn test_enum_members() {
        let (script, diagnostics) =
            parse_source("[Flags()] enum Color {\n  Red = 1\n  Green = 2; Blue\n}");
        assert!(diagnostics.is_empty());
        match &script.items[0] {
            Item::Enum(e) => {
                assert_eq!(e.attributes.len(), 1);
                let names: Vec<_> = e.members.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["Red", "Green", "Blue"]);
                assert!(e.members[2].value.is_none());
            }
            other => panic!("Expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_enum_member() {
        let (_, diagnostics) = parse_source("enum E {\n  'quoted'\n  Fine\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::INVALID_ENUM_MEMBER);
    }

    #[test]
    fn test_hashtable_entries() {
        let (script, diagnostics) = parse_source(
            "@{\n  ModuleVersion = '1.0.0'\n  Tags = @('a', 'b'); Nested = @{ X = 1 }\n}",
        );
        assert!(diagnostics.is_empty());
        match &script.items[0] {
            Item::Statement(stmt) => match &stmt.elements[0].kind {
                ElementKind::Hashtable(entries) => assert_eq!(entries.len(), 3),
                other => panic!("Expected hashtable, got {:?}", other),
            },
            other => panic!("Expected statement, got {:?}", other),
        }
    }

    #[test]
    fn test_hashtable_missing_equals() {
        let (_, diagnostics) = parse_source("@{\n  Key 'value'\n  Other = 1\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::MISSING_HASH_EQUALS);
    }

    #[test]
    fn test_index_versus_type_literal() {
        let (script, diagnostics) = parse_source("$items[0] + [int]'5'");
        assert!(diagnostics.is_empty());
        match &script.items[0] {
            Item::Statement(stmt) => {
                assert!(matches!(stmt.elements[1].kind, ElementKind::Index(_)));
                assert!(matches!(stmt.elements[3].kind, ElementKind::TypeLiteral(_)));
            }
            other => panic!("Expected statement, got {:?}", other),
        }
    }
}
