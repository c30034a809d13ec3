//! 这个模块是整个编译器错误处理系统的核心。
//! 它使用 `thiserror` 定义所有结构化的诊断信息；每个变体都带有 `Span`
//! 并对应 `diagnostics::codes` 中的一个错误码。

use thiserror::Error;

use crate::diagnostics::codes::{self, ErrorCode};
use crate::utils::Span;

/// 顶层的编译器错误枚举。
/// 所有编译阶段（词法、语法、语义、转换请求）的问题都会被包含在这里。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilerError {
    /// 词法分析阶段的异常（非致命）
    #[error(transparent)]
    Lexical(#[from] LexerWarning),

    /// 语法分析阶段的错误
    #[error(transparent)]
    Parsing(#[from] ParserError),

    /// 语义分析阶段的错误
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// 语言对校验失败
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl CompilerError {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            CompilerError::Lexical(e) => e.code(),
            CompilerError::Parsing(e) => e.code(),
            CompilerError::Semantic(e) => e.code(),
            CompilerError::Conversion(e) => e.code(),
        }
    }

    /// 错误在源码中的位置。转换错误与源码无关，返回 `None`。
    pub fn span(&self) -> Option<Span> {
        match self {
            CompilerError::Lexical(e) => Some(e.span()),
            CompilerError::Parsing(e) => Some(e.span()),
            CompilerError::Semantic(e) => Some(e.span()),
            CompilerError::Conversion(_) => None,
        }
    }
}

/// 词法分析器可能产生的异常。它们只会被记录为警告，不会让编译失败。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerWarning {
    #[error("Unrecognized character {character:?} at line {line}, column {column} was skipped")]
    UnrecognizedCharacter {
        character: char,
        line: u32,
        column: u32,
        span: Span,
    },
}

impl LexerWarning {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            LexerWarning::UnrecognizedCharacter { .. } => &codes::E0000_UNRECOGNIZED_CHAR,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LexerWarning::UnrecognizedCharacter { span, .. } => *span,
        }
    }
}

/// 语法分析器可能产生的所有错误的集合。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    #[error("Syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
        column: u32,
        span: Span,
    },

    #[error("Syntax error at line {line}, column {column}: unexpected end of input, expected {expected}")]
    UnexpectedEof {
        expected: String,
        line: u32,
        column: u32,
        span: Span,
    },

    #[error("Syntax error at line {line}, column {column}: unindent does not match any outer indentation level")]
    InconsistentIndentation { line: u32, column: u32, span: Span },

    #[error("Syntax error at line {line}, column {column}: invalid assignment target")]
    InvalidAssignmentTarget { line: u32, column: u32, span: Span },
}

impl ParserError {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            ParserError::UnexpectedToken { .. } => &codes::E0100_SYNTAX_ERROR,
            ParserError::UnexpectedEof { .. } => &codes::E0101_UNEXPECTED_EOF,
            ParserError::InconsistentIndentation { .. } => &codes::E0102_INCONSISTENT_INDENTATION,
            ParserError::InvalidAssignmentTarget { .. } => &codes::E0103_INVALID_ASSIGNMENT_TARGET,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParserError::UnexpectedToken { span, .. }
            | ParserError::UnexpectedEof { span, .. }
            | ParserError::InconsistentIndentation { span, .. }
            | ParserError::InvalidAssignmentTarget { span, .. } => *span,
        }
    }
}

/// 语义分析器可能产生的所有错误的集合。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    #[error("Variable '{name}' already declared in current scope")]
    Redeclaration { name: String, span: Span },

    #[error("'{object}' has no member '{member}'")]
    UnknownBuiltinMember {
        object: String,
        member: String,
        span: Span,
    },
}

impl SemanticError {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            SemanticError::UndefinedVariable { .. } => &codes::E0200_UNDEFINED_VARIABLE,
            SemanticError::Redeclaration { .. } => &codes::E0201_REDECLARATION,
            SemanticError::UnknownBuiltinMember { .. } => &codes::E0202_UNKNOWN_BUILTIN_MEMBER,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SemanticError::UndefinedVariable { span, .. }
            | SemanticError::Redeclaration { span, .. }
            | SemanticError::UnknownBuiltinMember { span, .. } => *span,
        }
    }
}

/// 在运行任何编译阶段之前，语言对校验失败时产生的错误。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Unsupported conversion: {from} to {to}")]
    Unsupported { from: String, to: String },

    #[error("Unknown language '{name}'")]
    UnknownLanguage { name: String },
}

impl ConversionError {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            ConversionError::Unsupported { .. } => &codes::E0300_UNSUPPORTED_CONVERSION,
            ConversionError::UnknownLanguage { .. } => &codes::E0301_UNKNOWN_LANGUAGE,
        }
    }
}
