// src/analyzer/types.rs

use std::fmt;

use crate::parser::ast::{BinaryOp, Literal, UnaryOp};

/// 语义分析推断出的值类型。推断是尽力而为的，只服务于代码生成，不用来拒绝程序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Null,
    Function,
    Object,
    Unknown,
}

impl ValueType {
    /// 由字面量的词法形式决定类型。
    pub fn of_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Number(_) => ValueType::Number,
            Literal::String(_) => ValueType::String,
            Literal::Boolean(_) => ValueType::Boolean,
            Literal::Null => ValueType::Null,
        }
    }

    /// 把 C/Java 源里写出的类型名映射到值类型。
    pub fn of_declared(name: &str) -> Self {
        let base = name.trim_start_matches("const ").trim();
        match base {
            "char*" | "char[]" | "String" | "string" | "str" => ValueType::String,
            "bool" | "boolean" => ValueType::Boolean,
            "void" => ValueType::Null,
            _ if base.ends_with("[]") || base.ends_with('*') => ValueType::Object,
            "int" | "long" | "short" | "float" | "double" | "char" | "unsigned" | "unsigned int"
            | "long long" | "Integer" | "Double" | "Long" | "Float" => ValueType::Number,
            _ => ValueType::Object,
        }
    }

    /// 二元运算的结果类型：任一侧为字符串的 `+` 得到字符串，其余算术得到数字，
    /// 比较和逻辑运算得到布尔值。
    pub fn of_binary(op: BinaryOp, left: ValueType, right: ValueType) -> Self {
        if op == BinaryOp::Add && (left == ValueType::String || right == ValueType::String) {
            ValueType::String
        } else if op.is_arithmetic() {
            ValueType::Number
        } else {
            ValueType::Boolean
        }
    }

    pub fn of_unary(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Not => ValueType::Boolean,
            UnaryOp::Neg | UnaryOp::Plus => ValueType::Number,
        }
    }
}

/// C/Java 的整数类型名（指针和数组除外）。
pub fn is_integral_type(name: &str) -> bool {
    let base = name.trim_start_matches("const ").trim_start_matches("final ").trim();
    matches!(
        base,
        "int" | "long" | "short" | "byte" | "unsigned" | "unsigned int" | "long long" | "Integer" | "Long"
    )
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
            ValueType::Function => "function",
            ValueType::Object => "object",
            ValueType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
