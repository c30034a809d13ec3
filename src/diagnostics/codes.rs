// src/diagnostics/codes.rs

use crate::diagnostics::DiagnosticLevel;

/// Represents a specific error code with its associated information.
/// Every diagnostic the compiler can emit points at exactly one of these.
#[derive(Debug, Clone)]
pub struct ErrorCode {
    pub code: &'static str,
    pub level: DiagnosticLevel,
    pub message: &'static str,
    pub explanation: &'static str,
}

/*
E00xx: 词法分析 (Lexical Analysis) 警告。

E01xx: 语法分析 (Parsing / Syntax) 错误。

E02xx: 语义分析 (Semantic Analysis) 错误。

E03xx: 转换请求 (Conversion / Facade) 错误。
*/
// --- E00xx: Lexical Analysis ---

pub const E0000_UNRECOGNIZED_CHAR: ErrorCode = ErrorCode {
    code: "E0000",
    level: DiagnosticLevel::Warning,
    message: "Unrecognized character",
    explanation: "The lexer met a character that belongs to none of the supported languages. \
                  The character is skipped and compilation continues, so the translated program \
                  may differ from the source around this position.",
};

// --- E01xx: Syntax Analysis (Parsing) Errors ---

pub const E0100_SYNTAX_ERROR: ErrorCode = ErrorCode {
    code: "E0100",
    level: DiagnosticLevel::Error,
    message: "Syntax error",
    explanation: "The arrangement of tokens does not match any grammar rule of the source language. \
                  Check for missing semicolons, mismatched brackets, or a statement written in a different dialect.",
};

pub const E0101_UNEXPECTED_EOF: ErrorCode = ErrorCode {
    code: "E0101",
    level: DiagnosticLevel::Error,
    message: "Unexpected end of input",
    explanation: "The source ended while a construct was still open, for example an unclosed block or parenthesis.",
};

pub const E0102_INCONSISTENT_INDENTATION: ErrorCode = ErrorCode {
    code: "E0102",
    level: DiagnosticLevel::Error,
    message: "Inconsistent indentation",
    explanation: "In Python-like sources a dedent must return to the column of an enclosing block. \
                  This line is indented to a column that matches no open block.",
};

pub const E0103_INVALID_ASSIGNMENT_TARGET: ErrorCode = ErrorCode {
    code: "E0103",
    level: DiagnosticLevel::Error,
    message: "Invalid assignment target",
    explanation: "Only variables, member accesses (`a.b`) and indexed accesses (`a[i]`) can appear on the \
                  left-hand side of an assignment or an increment.",
};

// --- E02xx: Semantic Analysis Errors ---

pub const E0200_UNDEFINED_VARIABLE: ErrorCode = ErrorCode {
    code: "E0200",
    level: DiagnosticLevel::Error,
    message: "Undefined variable",
    explanation: "The name is not declared in the current scope, any enclosing scope, or the builtin table. \
                  Variables declared inside a block stop being visible when the block closes.",
};

pub const E0201_REDECLARATION: ErrorCode = ErrorCode {
    code: "E0201",
    level: DiagnosticLevel::Error,
    message: "Variable already declared in current scope",
    explanation: "A variable or function with this name was already declared in the same scope. \
                  Shadowing is only allowed from an inner scope.",
};

pub const E0202_UNKNOWN_BUILTIN_MEMBER: ErrorCode = ErrorCode {
    code: "E0202",
    level: DiagnosticLevel::Error,
    message: "Unknown member of builtin object",
    explanation: "Builtin namespaces such as `console`, `Math` or `JSON` only expose a fixed list of members.",
};

// --- E03xx: Conversion Errors ---

pub const E0300_UNSUPPORTED_CONVERSION: ErrorCode = ErrorCode {
    code: "E0300",
    level: DiagnosticLevel::Error,
    message: "Unsupported conversion",
    explanation: "The requested source/target pair is not in the support matrix. \
                  A language cannot be translated into itself.",
};

pub const E0301_UNKNOWN_LANGUAGE: ErrorCode = ErrorCode {
    code: "E0301",
    level: DiagnosticLevel::Error,
    message: "Unknown language",
    explanation: "Language names are `c`, `java`, `python` (or `py`) and `javascript` (or `js`), case-insensitive.",
};
