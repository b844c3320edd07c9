//! modkit syntax - script lexer, parser and diagnostics
//!
//! This library provides the syntax layer used by the build:
//! - Lexical analysis and parsing into a typed tree
//! - Diagnostics with file/line/column and source snippets
//! - Tree traversal for attribute and declaration discovery

/// modkit-syntax version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;
pub mod visit;

pub use ast::ScriptFile;
pub use diagnostic::{error_codes, sort_diagnostics, Diagnostic, DiagnosticLevel, DIAG_VERSION};
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::Span;
pub use token::{Token, TokenKind};

/// Lex and parse `source`, returning the tree and every lexer and parser
/// diagnostic (with snippets filled in), sorted by position.
pub fn parse(source: &str) -> (ScriptFile, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let (tokens, lex_diags) = lexer.tokenize();
    let mut parser = Parser::new(tokens);
    let (script, parse_diags) = parser.parse();

    let mut diagnostics: Vec<Diagnostic> = lex_diags
        .into_iter()
        .chain(parse_diags)
        .map(|d| d.with_source(source))
        .collect();
    sort_diagnostics(&mut diagnostics);

    (script, diagnostics)
}

/// Like [`parse`], with `file` recorded on every diagnostic
pub fn parse_file(file: &str, source: &str) -> (ScriptFile, Vec<Diagnostic>) {
    let (script, diagnostics) = parse(source);
    let diagnostics = diagnostics
        .into_iter()
        .map(|d| d.with_file(file))
        .collect();
    (script, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combines_lexer_and_parser_diagnostics() {
        let (_, diagnostics) = parse("function A {\n  'open\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == error_codes::UNTERMINATED_STRING));
        assert!(diagnostics
            .iter()
            .all(|d| !d.snippet.is_empty() || d.line > 2));
    }

    #[test]
    fn test_parse_file_sets_file() {
        let (_, diagnostics) = parse_file("Public/Broken.ps1", "function {");
        assert!(!diagnostics.is_empty());
        assert!(diagnostics.iter().all(|d| d.file == "Public/Broken.ps1"));
    }
}
