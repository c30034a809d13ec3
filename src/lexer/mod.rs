//! 词法分析阶段：把源代码切分成带行列信息的扁平 Token 流。
//!
//! 底层的字符匹配交给 `logos` 生成的自动机完成（最长匹配），
//! 这里负责把原始匹配结果加工成 [`Token`]：关键字重分类、字符串转义解码、行列计算。

use log::{debug, warn};
use logos::Logos;

use crate::reporter::LexerWarning;
use crate::utils::Span;

pub mod token;
pub use token::{is_keyword, Token, TokenKind, KEYWORDS};

// 声明单元测试模块
#[cfg(test)]
mod test;

// logos 解析时需要使用的错误类型
#[derive(Debug, Default, Clone, PartialEq)]
pub enum LexingError {
    #[default]
    InvalidToken,
}

/// 原始词素。只描述"匹配到了什么形状"，不携带值。
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(error = LexingError)]
// 跳过除换行以外的空白
#[logos(skip r"[ \t\r\f\x0B]+")]
enum RawToken {
    #[token("\n")]
    Newline,

    // 数字：一串数字，最多一个小数点
    #[regex(r"[0-9]+(\.[0-9]*)?")]
    Number,

    // 三种引号的字符串；未闭合时一直吃到输入结束
    #[regex(r#""([^"\\]|\\(.|\n))*"?"#)]
    #[regex(r#"'([^'\\]|\\(.|\n))*'?"#)]
    #[regex(r#"`([^`\\]|\\(.|\n))*`?"#)]
    Str,

    // 行注释 `//`、`#`，以及块注释（在第一个 `*/` 处结束，未闭合时吃到结尾）
    #[regex(r"//[^\n]*")]
    #[regex(r"#[^\n]*")]
    #[regex(r"/\*([^*]|\*+[^*/])*(\*+/|\**)")]
    Comment,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Word,

    #[token("===")]
    #[token("!==")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    Comparison,

    #[token("&&")]
    #[token("||")]
    Logical,

    #[token("++")]
    #[token("--")]
    #[token("!")]
    Unary,

    #[token("=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("=>")]
    Assignment,

    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    Arithmetic,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
}

/// 把字节偏移换算成 (行, 列)，两者都从 1 开始。
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { source, line_starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self.source[start..offset].chars().count();
        (line as u32 + 1, column as u32 + 1)
    }
}

/// 对源代码进行词法分析。
///
/// 该函数是全函数：无法识别的字符会被跳过，并以 [`LexerWarning`] 的形式返回，
/// 不会中断分析。返回的 Token 流总是以一个 `Eof` 结尾。
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexerWarning>) {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut warnings = Vec::new();

    for (result, range) in RawToken::lexer(source).spanned() {
        let slice = &source[range.clone()];
        let (line, column) = index.position(range.start);
        let span = Span::from(range);

        let raw = match result {
            Ok(raw) => raw,
            Err(_) => {
                // logos 的错误本身不带字符信息，从源码切片里取出来
                let character = slice.chars().next().unwrap_or_default();
                warn!("skipping unrecognized character {:?} at {}:{}", character, line, column);
                warnings.push(LexerWarning::UnrecognizedCharacter {
                    character,
                    line,
                    column,
                    span,
                });
                continue;
            }
        };

        let (kind, value) = match raw {
            RawToken::Newline => (TokenKind::Newline, slice.to_string()),
            RawToken::Number => (TokenKind::Number, slice.to_string()),
            RawToken::Str => (TokenKind::String, decode_string(slice)),
            RawToken::Comment => (TokenKind::Comment, slice.to_string()),
            RawToken::Word if is_keyword(slice) => (TokenKind::Keyword, slice.to_string()),
            RawToken::Word => (TokenKind::Identifier, slice.to_string()),
            RawToken::Comparison => (TokenKind::Comparison, slice.to_string()),
            RawToken::Logical => (TokenKind::Logical, slice.to_string()),
            RawToken::Unary => (TokenKind::Unary, slice.to_string()),
            RawToken::Assignment => (TokenKind::Assignment, slice.to_string()),
            RawToken::Arithmetic => (TokenKind::Arithmetic, slice.to_string()),
            RawToken::LParen => (TokenKind::LParen, slice.to_string()),
            RawToken::RParen => (TokenKind::RParen, slice.to_string()),
            RawToken::LBrace => (TokenKind::LBrace, slice.to_string()),
            RawToken::RBrace => (TokenKind::RBrace, slice.to_string()),
            RawToken::LBracket => (TokenKind::LBracket, slice.to_string()),
            RawToken::RBracket => (TokenKind::RBracket, slice.to_string()),
            RawToken::Semicolon => (TokenKind::Semicolon, slice.to_string()),
            RawToken::Comma => (TokenKind::Comma, slice.to_string()),
            RawToken::Dot => (TokenKind::Dot, slice.to_string()),
            RawToken::Colon => (TokenKind::Colon, slice.to_string()),
        };
        tokens.push(Token::new(kind, value, line, column, span));
    }

    let (line, column) = index.position(source.len());
    tokens.push(Token::new(
        TokenKind::Eof,
        "",
        line,
        column,
        Span::new(source.len(), source.len()),
    ));

    debug!(
        "lexer produced {} tokens ({} skipped characters)",
        tokens.len(),
        warnings.len()
    );
    (tokens, warnings)
}

/// 去掉首尾引号并处理转义。未闭合的字符串只去掉开头的引号，内容原样保留。
fn decode_string(slice: &str) -> String {
    let mut chars = slice.chars();
    let quote = chars.next().unwrap_or('"');
    let body = chars.as_str();
    // 末尾引号存在且没有被反斜杠吞掉时才剥掉
    let inner = match body.strip_suffix(quote) {
        Some(inner) if !ends_with_escape(inner) => inner,
        _ => body,
    };

    let mut s = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => s.push('\n'),
            Some('t') => s.push('\t'),
            Some('r') => s.push('\r'),
            Some('\\') => s.push('\\'),
            Some('"') => s.push('"'),
            Some('\'') => s.push('\''),
            // 未知的转义序列：保留被转义的字符本身
            Some(other) => s.push(other),
            None => {}
        }
    }
    s
}

/// 末尾是否是一个未配对的反斜杠（奇数个连续反斜杠）。
fn ends_with_escape(text: &str) -> bool {
    text.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}
