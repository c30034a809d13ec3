use crate::utils::Span;
use std::fmt::{Display, Formatter, Result};

/// 主体 Token 定义：种类、原始文本（字符串已解码转义）、以及在源码中的位置。
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// 从 1 开始的行号。
    pub line: u32,
    /// 从 1 开始的列号（按字符计）。
    pub column: u32,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: u32, column: u32, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
            span,
        }
    }

    /// 判断是否为给定文本的关键字。
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.value == word
    }

    /// 判断是否为给定种类且文本相同的 token（用于运算符匹配）。
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.value == text
    }

    /// 一个用于错误报告的简单字符串表示。
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::String => format!("string \"{}\"", self.value),
            _ => format!("{} '{}'", self.kind, self.value),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self.kind {
            TokenKind::Newline => write!(f, "{}:{} {}", self.line, self.column, self.kind),
            TokenKind::Eof => write!(f, "{}:{} {}", self.line, self.column, self.kind),
            _ => write!(f, "{}:{} {} {:?}", self.line, self.column, self.kind, self.value),
        }
    }
}

/// 词法单元的种类。运算符只按类别区分，具体符号保存在 `Token::value` 里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Keyword,

    // --- 运算符类别 ---
    /// `+ - * / %`
    Arithmetic,
    /// `== != === !== < > <= >=`
    Comparison,
    /// `&& ||`
    Logical,
    /// `= += -= *= /= =>`
    Assignment,
    /// `! ++ --`
    Unary,

    // --- 标点 ---
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,

    Comment,
    Newline,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let name = match self {
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Arithmetic => "ARITHMETIC",
            TokenKind::Comparison => "COMPARISON",
            TokenKind::Logical => "LOGICAL",
            TokenKind::Assignment => "ASSIGNMENT",
            TokenKind::Unary => "UNARY",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Colon => "COLON",
            TokenKind::Comment => "COMMENT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

/// 保留字集合。四种源语言共用一张表，方言差异由语法分析器处理。
pub const KEYWORDS: &[&str] = &[
    // 脚本语言
    "function", "var", "let", "const", "if", "else", "for", "while", "do",
    "switch", "case", "default", "break", "continue", "return", "try", "catch",
    "finally", "throw", "class", "extends", "import", "export", "from",
    "async", "await", "true", "false", "null", "undefined", "new", "this",
    "super", "static", "public", "private", "protected", "abstract", "interface",
    // Python 风格
    "def", "elif", "in", "and", "or", "not", "pass", "True", "False", "None",
    "raise", "except", "as", "lambda",
    // C / Java 类型与修饰符
    "int", "float", "double", "char", "long", "short", "bool", "boolean",
    "void", "unsigned", "final",
];

/// 尝试将一个标识符归类为关键字。
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}
