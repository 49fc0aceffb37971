use rlox::scanner::Scanner;
use rlox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn punctuation_and_operators() {
    assert_token_sequence(
        "(){};,.-+*/! != = == < <= > >=",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::COMMA, ","),
            (TokenType::DOT, "."),
            (TokenType::MINUS, "-"),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::SLASH, "/"),
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_token_sequence(
        "class Foo < Bar { init this super fun var }",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "Foo"),
            (TokenType::LESS, "<"),
            (TokenType::IDENTIFIER, "Bar"),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::IDENTIFIER, "init"),
            (TokenType::THIS, "this"),
            (TokenType::SUPER, "super"),
            (TokenType::FUN, "fun"),
            (TokenType::VAR, "var"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_and_string_literals() {
    let tokens: Vec<Token> = Scanner::new(b"3 3.14 \"hi there\"")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens.len(), 4);

    assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 3.0));
    assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 3.14));
    assert!(matches!(&tokens[2].token_type, TokenType::STRING(s) if s == "hi there"));
    assert_eq!(tokens[3].token_type, TokenType::EOF);
}

#[test]
fn comments_and_whitespace_are_skipped() {
    assert_token_sequence(
        "// leading comment\nprint 1; // trailing",
        &[
            (TokenType::PRINT, "print"),
            (TokenType::NUMBER(1.0), "1"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn lines_are_tracked_across_newlines_and_strings() {
    let tokens: Vec<Token> = Scanner::new(b"var a;\nvar b;\n\"multi\nline\" c")
        .filter_map(Result::ok)
        .collect();

    let c = tokens
        .iter()
        .find(|t| t.lexeme == "c")
        .expect("identifier c scanned");

    // The string literal spans lines 3-4, so `c` lands on line 4.
    assert_eq!(c.line, 4);
}

#[test]
fn errors_are_interleaved_with_tokens() {
    let results: Vec<_> = Scanner::new(b",$.#").collect();

    // COMMA, error for '$', DOT, error for '#', EOF.
    assert_eq!(results.len(), 5);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert!(results[3].is_err());
    assert!(results[4].is_ok());

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            err.to_string().contains("Unexpected character"),
            "unexpected message: {}",
            err
        );
    }
}

#[test]
fn unterminated_string_reports_error() {
    let results: Vec<_> = Scanner::new(b"\"oops").collect();

    assert!(results[0].is_err());
    assert!(results[0]
        .as_ref()
        .err()
        .map(|e| e.to_string().contains("Unterminated string."))
        .unwrap_or(false));
}
