// 导入父模块（也就是 lexer 模块）的所有内容
use super::*;

/// 辅助函数：只比较 (种类, 文本)，忽略位置信息。结尾的 Eof 也去掉。
fn kinds_and_values(source: &str) -> Vec<(TokenKind, String)> {
    let (tokens, warnings) = tokenize(source);
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| (t.kind, t.value))
        .collect()
}

fn kinds(source: &str) -> Vec<TokenKind> {
    kinds_and_values(source).into_iter().map(|(k, _)| k).collect()
}

// --- 成功案例 (Happy Path) ---

#[test]
fn test_keywords_and_identifiers() {
    let tokens = kinds_and_values("let total = 10;");
    assert_eq!(
        tokens,
        vec![
            (TokenKind::Keyword, "let".to_string()),
            (TokenKind::Identifier, "total".to_string()),
            (TokenKind::Assignment, "=".to_string()),
            (TokenKind::Number, "10".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
        ]
    );
}

#[test]
fn test_operator_categories() {
    let source = "+ - * / % == != === !== < > <= >= && || ! ++ -- = += -= *= /=";
    let expected = [
        vec![TokenKind::Arithmetic; 5],
        vec![TokenKind::Comparison; 8],
        vec![TokenKind::Logical; 2],
        vec![TokenKind::Unary; 3],
        vec![TokenKind::Assignment; 5],
    ]
    .concat();
    assert_eq!(kinds(source), expected);
}

#[test]
fn test_longest_match_wins() {
    let values: Vec<String> = kinds_and_values("a===b").into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec!["a", "===", "b"]);
    let values: Vec<String> = kinds_and_values("i++").into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec!["i", "++"]);
}

#[test]
fn test_numbers() {
    assert_eq!(
        kinds_and_values("3.14 42"),
        vec![
            (TokenKind::Number, "3.14".to_string()),
            (TokenKind::Number, "42".to_string()),
        ]
    );
}

#[test]
fn test_strings_decode_escapes() {
    let tokens = kinds_and_values(r#""a\nb" 'it\'s' `x`"#);
    assert_eq!(
        tokens,
        vec![
            (TokenKind::String, "a\nb".to_string()),
            (TokenKind::String, "it's".to_string()),
            (TokenKind::String, "x".to_string()),
        ]
    );
}

#[test]
fn test_unterminated_string_runs_to_end() {
    let tokens = kinds_and_values("\"abc");
    assert_eq!(tokens, vec![(TokenKind::String, "abc".to_string())]);
}

#[test]
fn test_comments_are_tokens() {
    let source = "x // line\n# hash\n/* block\n comment */ y";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Identifier,
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::Comment,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("( ) { } [ ] ; , . :"),
        vec![
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Semicolon,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::Colon,
        ]
    );
}

// --- 位置信息 ---

#[test]
fn test_line_and_column_are_one_based() {
    let (tokens, _) = tokenize("a\n  b");
    assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
    assert_eq!(tokens[1].kind, TokenKind::Newline);
    assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    assert_eq!(tokens[2].span, Span::new(4, 5));
}

#[test]
fn test_stream_always_ends_with_eof() {
    let (tokens, _) = tokenize("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);

    let (tokens, _) = tokenize("x");
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}

// --- 失败案例 ---

#[test]
fn test_unrecognized_characters_are_skipped_with_warning() {
    let (tokens, warnings) = tokenize("a @ b");
    let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, vec!["a", "b", ""]);
    assert_eq!(
        warnings,
        vec![LexerWarning::UnrecognizedCharacter {
            character: '@',
            line: 1,
            column: 3,
            span: Span::new(2, 3),
        }]
    );
}

#[test]
fn test_tokenize_is_deterministic() {
    let source = "for (let i = 0; i < 10; i++) { console.log(i); }";
    assert_eq!(tokenize(source), tokenize(source));
}
