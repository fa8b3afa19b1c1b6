#[cfg(test)]
mod scanner_tests {
    use rox as lox;

    use lox::error::{LoxError, Result};
    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenKind, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(|r| r.ok()).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_kind, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.kind, *expected_kind);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenKind::LeftParen, "("),
                (TokenKind::LeftBrace, "{"),
                (TokenKind::Star, "*"),
                (TokenKind::Dot, "."),
                (TokenKind::Comma, ","),
                (TokenKind::Plus, "+"),
                (TokenKind::Star, "*"),
                (TokenKind::RightBrace, "}"),
                (TokenKind::RightParen, ")"),
                (TokenKind::Eof, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators_and_comments() {
        assert_token_sequence(
            "!= == <= >= < > ! = / // the rest is ignored\n-",
            &[
                (TokenKind::BangEqual, "!="),
                (TokenKind::EqualEqual, "=="),
                (TokenKind::LessEqual, "<="),
                (TokenKind::GreaterEqual, ">="),
                (TokenKind::Less, "<"),
                (TokenKind::Greater, ">"),
                (TokenKind::Bang, "!"),
                (TokenKind::Equal, "="),
                (TokenKind::Slash, "/"),
                (TokenKind::Minus, "-"),
                (TokenKind::Eof, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class Foo < Bar { init() { this.x = super.y; } } orchid _x1",
            &[
                (TokenKind::Class, "class"),
                (TokenKind::Identifier, "Foo"),
                (TokenKind::Less, "<"),
                (TokenKind::Identifier, "Bar"),
                (TokenKind::LeftBrace, "{"),
                (TokenKind::Identifier, "init"),
                (TokenKind::LeftParen, "("),
                (TokenKind::RightParen, ")"),
                (TokenKind::LeftBrace, "{"),
                (TokenKind::This, "this"),
                (TokenKind::Dot, "."),
                (TokenKind::Identifier, "x"),
                (TokenKind::Equal, "="),
                (TokenKind::Super, "super"),
                (TokenKind::Dot, "."),
                (TokenKind::Identifier, "y"),
                (TokenKind::Semicolon, ";"),
                (TokenKind::RightBrace, "}"),
                (TokenKind::RightBrace, "}"),
                (TokenKind::Identifier, "orchid"),
                (TokenKind::Identifier, "_x1"),
                (TokenKind::Eof, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals() {
        let tokens: Vec<Token> = Scanner::new("12 3.25 \"hi\" 7.")
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, Some(Literal::Number(12.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.25)));

        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].literal, Some(Literal::Str("hi".to_string())));
        assert_eq!(tokens[2].lexeme, "\"hi\"");

        // A trailing dot is not part of the number.
        assert_eq!(tokens[3].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[4].kind, TokenKind::Dot);
        assert_eq!(tokens[4].literal, None);
    }

    #[test]
    fn test_scanner_05_token_display() {
        let tokens: Vec<Token> = Scanner::new("42 1.5 \"s\" foo")
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tokens[0].to_string(), "NUMBER 42 42.0");
        assert_eq!(tokens[1].to_string(), "NUMBER 1.5 1.5");
        assert_eq!(tokens[2].to_string(), "STRING \"s\" s");
        assert_eq!(tokens[3].to_string(), "IDENTIFIER foo null");
        assert_eq!(tokens[4].to_string(), "EOF  null");
    }

    #[test]
    fn test_scanner_06_line_numbers() {
        let tokens: Vec<Token> = Scanner::new("a\n\"multi\nline\"\nb")
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_unterminated_string() {
        let results: Vec<_> = Scanner::new("\"open").collect();

        assert_eq!(results.len(), 2);
        match &results[0] {
            Err(e) => assert_eq!(e.to_string(), "[line 1] Error: Unterminated string."),
            Ok(t) => panic!("Expected error but got token: {}", t),
        }
        assert_token_matches(&results[1], TokenKind::Eof, "");
    }

    #[test]
    fn test_multibyte_unexpected_character() {
        let results: Vec<_> = Scanner::new("é;").collect();

        match &results[0] {
            Err(e) => assert_eq!(e.to_string(), "[line 1] Error: Unexpected character: é"),
            Ok(t) => panic!("Expected error but got token: {}", t),
        }
        assert_token_matches(&results[1], TokenKind::Semicolon, ";");
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenKind::Comma, ",");
        assert_token_matches(&results[1], TokenKind::Dot, ".");
        assert_token_matches(&results[3], TokenKind::LeftParen, "(");
        assert_token_matches(&results[5], TokenKind::Eof, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(err, LoxError::Lex { .. }),
                "Expected a lexical error, got: {:?}",
                err
            );
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(Token { kind: TokenKind::Eof, .. }))));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    fn assert_token_matches(result: &Result<Token>, expected_kind: TokenKind, expected_lexeme: &str) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.kind, expected_kind,
                    "Expected token kind {:?}, got {:?}",
                    expected_kind, token.kind
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }
}
