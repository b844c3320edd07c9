//! Metadata values
//!
//! Values read from and written to the metadata hashtable. Reading turns
//! parsed elements into a `MetadataValue`; writing renders a value back to
//! the literal syntax the document uses.

use modkit_syntax::ast::{Element, ElementKind, GroupKind, Item};
use modkit_syntax::TokenKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    /// Numeric literal, kept as written
    Number(String),
    Array(Vec<MetadataValue>),
    Table(Vec<(String, MetadataValue)>),
    /// Anything else, kept as source text
    Expression(String),
}

impl MetadataValue {
    pub fn string(value: impl Into<String>) -> Self {
        MetadataValue::String(value.into())
    }

    /// Array of strings
    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetadataValue::Array(values.into_iter().map(|v| Self::string(v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// A single string reads as a one-element list
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            MetadataValue::String(s) => Some(vec![s.clone()]),
            MetadataValue::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    /// Whether the value carries nothing (`''`, `@()`, `@{}`)
    pub fn is_empty(&self) -> bool {
        match self {
            MetadataValue::String(s) => s.is_empty(),
            MetadataValue::Array(items) => items.is_empty(),
            MetadataValue::Table(entries) => entries.is_empty(),
            MetadataValue::Expression(text) => text.trim().is_empty(),
            MetadataValue::Bool(_) | MetadataValue::Number(_) => false,
        }
    }

    /// Literal syntax for this value
    pub fn render(&self) -> String {
        match self {
            MetadataValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            MetadataValue::Bool(true) => "$true".to_string(),
            MetadataValue::Bool(false) => "$false".to_string(),
            MetadataValue::Number(n) => n.clone(),
            MetadataValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|item| item.render()).collect();
                format!("@({})", rendered.join(", "))
            }
            MetadataValue::Table(entries) => {
                if entries.is_empty() {
                    return "@{}".to_string();
                }
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{} = {}", key, value.render()))
                    .collect();
                format!("@{{ {} }}", rendered.join("; "))
            }
            MetadataValue::Expression(text) => text.clone(),
        }
    }

    /// Interpret the elements of a hashtable value. `source` is the document
    /// text the element spans point into.
    pub(crate) fn from_elements(elements: &[Element], source: &str) -> Self {
        let pieces = split_on_commas(elements);
        if pieces.len() > 1 {
            return MetadataValue::Array(
                pieces
                    .into_iter()
                    .map(|piece| Self::from_single(piece, source))
                    .collect(),
            );
        }
        Self::from_single(elements, source)
    }

    fn from_single(elements: &[Element], source: &str) -> Self {
        let [element] = elements else {
            return Self::expression(elements, source);
        };

        match &element.kind {
            ElementKind::Token(token) => match token.kind {
                TokenKind::StringLiteral | TokenKind::StringExpandable => {
                    MetadataValue::String(token.lexeme.clone())
                }
                TokenKind::Number => MetadataValue::Number(token.lexeme.clone()),
                TokenKind::Variable if token.lexeme.eq_ignore_ascii_case("true") => {
                    MetadataValue::Bool(true)
                }
                TokenKind::Variable if token.lexeme.eq_ignore_ascii_case("false") => {
                    MetadataValue::Bool(false)
                }
                _ => Self::expression(elements, source),
            },
            ElementKind::Group {
                kind: GroupKind::Array | GroupKind::Paren,
                items,
            } => {
                let mut values = Vec::new();
                for item in items {
                    let Item::Statement(stmt) = item else {
                        return Self::expression(elements, source);
                    };
                    match Self::from_elements(&stmt.elements, source) {
                        MetadataValue::Array(inner) => values.extend(inner),
                        other => values.push(other),
                    }
                }
                MetadataValue::Array(values)
            }
            ElementKind::Hashtable(entries) => MetadataValue::Table(
                entries
                    .iter()
                    .map(|entry| {
                        (
                            key_text(&entry.key, source),
                            Self::from_elements(&entry.value.elements, source),
                        )
                    })
                    .collect(),
            ),
            _ => Self::expression(elements, source),
        }
    }

    fn expression(elements: &[Element], source: &str) -> Self {
        match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => {
                MetadataValue::Expression(first.span.merge(last.span).text(source).to_string())
            }
            _ => MetadataValue::Expression(String::new()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Text of a hashtable key: bare words and quoted strings both read as
/// their contents
pub(crate) fn key_text(key: &[Element], source: &str) -> String {
    match key {
        [Element {
            kind: ElementKind::Token(token),
            ..
        }] => token.lexeme.clone(),
        [only] => only.span.text(source).to_string(),
        [first, .., last] => first.span.merge(last.span).text(source).to_string(),
        [] => String::new(),
    }
}

fn split_on_commas(elements: &[Element]) -> Vec<&[Element]> {
    elements
        .split(|element| {
            matches!(&element.kind, ElementKind::Token(token) if token.kind == TokenKind::Comma)
        })
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_string_escapes_quotes() {
        assert_eq!(MetadataValue::string("it's").render(), "'it''s'");
    }

    #[test]
    fn test_render_list() {
        let value = MetadataValue::string_list(["Get-Widget", "Set-Widget"]);
        assert_eq!(value.render(), "@('Get-Widget', 'Set-Widget')");
        assert_eq!(MetadataValue::Array(Vec::new()).render(), "@()");
    }

    #[test]
    fn test_render_bool_and_table() {
        assert_eq!(MetadataValue::Bool(true).render(), "$true");
        let table = MetadataValue::Table(vec![(
            "Tags".to_string(),
            MetadataValue::string_list(["a"]),
        )]);
        assert_eq!(table.render(), "@{ Tags = @('a') }");
    }

    #[test]
    fn test_string_reads_as_list() {
        assert_eq!(
            MetadataValue::string("*").as_string_list(),
            Some(vec!["*".to_string()])
        );
        assert_eq!(MetadataValue::Bool(false).as_string_list(), None);
    }

    #[test]
    fn test_single_non_token_key_reads_as_source() {
        let source = "[Version] = '1.0'";
        let span = modkit_syntax::Span::new(0, 9, 1, 1);
        let key = [Element {
            kind: ElementKind::TypeLiteral(modkit_syntax::ast::TypeName {
                name: "Version".to_string(),
                span,
            }),
            span,
        }];
        assert_eq!(key_text(&key, source), "[Version]");
        assert_eq!(key_text(&[], source), "");
    }
}
