use modkit_syntax::{Lexer, TokenKind};
use rstest::rstest;

fn lex(source: &str) -> Vec<(TokenKind, String)> {
    let mut lexer = Lexer::new(source);
    let (tokens, diagnostics) = lexer.tokenize();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    tokens
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
        .map(|t| (t.kind, t.lexeme))
        .collect()
}

#[rstest]
#[case::verbatim("'a''b'", TokenKind::StringLiteral, "a'b")]
#[case::expandable("\"x `$y\"", TokenKind::StringExpandable, "x $y")]
#[case::variable("$MyVar", TokenKind::Variable, "MyVar")]
#[case::braced_variable("${a-b}", TokenKind::Variable, "a-b")]
#[case::splat("@params", TokenKind::Splat, "params")]
#[case::parameter("-ErrorAction", TokenKind::Parameter, "ErrorAction")]
#[case::hex("0xFF", TokenKind::Number, "0xFF")]
#[case::size("512KB", TokenKind::Number, "512KB")]
#[case::command("Export-ModuleMember", TokenKind::Word, "Export-ModuleMember")]
#[case::path("C:\\temp\\file.txt", TokenKind::Word, "C:\\temp\\file.txt")]
fn test_single_token(#[case] source: &str, #[case] kind: TokenKind, #[case] lexeme: &str) {
    let tokens = lex(source);
    assert_eq!(tokens, vec![(kind, lexeme.to_string())]);
}

#[test]
fn test_attribute_tokens() {
    let kinds: Vec<_> = lex("[Parameter(Mandatory = $true)]")
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::LeftBracket,
            TokenKind::Word,
            TokenKind::LeftParen,
            TokenKind::Word,
            TokenKind::Equal,
            TokenKind::Variable,
            TokenKind::RightParen,
            TokenKind::RightBracket,
        ]
    );
}

#[test]
fn test_crlf_line_endings() {
    let mut lexer = Lexer::new("a\r\nb\r\n");
    let (tokens, _) = lexer.tokenize();
    let words: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Word)
        .map(|t| (t.lexeme.as_str(), t.span.line))
        .collect();
    assert_eq!(words, vec![("a", 1), ("b", 2)]);
}

#[test]
fn test_comment_only_file() {
    let tokens = lex("# just a comment\n<# and\na block #>\n");
    assert!(tokens.is_empty());
}
