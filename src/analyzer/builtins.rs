//! 每次分析时预先放进全局作用域的内建符号。这张表在编译期就确定，只读。

use super::types::ValueType;

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub ty: ValueType,
    /// 命名空间对象允许访问的成员；`None` 表示不做成员检查。
    pub members: Option<&'static [&'static str]>,
}

const MATH_MEMBERS: &[&str] = &[
    "abs", "sqrt", "pow", "floor", "ceil", "round", "max", "min", "random", "sin", "cos", "tan",
    "log", "PI", "E",
];

pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "console", ty: ValueType::Object, members: Some(&["log", "error", "warn", "info"]) },
    Builtin { name: "print", ty: ValueType::Function, members: None },
    Builtin { name: "printf", ty: ValueType::Function, members: None },
    Builtin { name: "Math", ty: ValueType::Object, members: Some(MATH_MEMBERS) },
    Builtin { name: "math", ty: ValueType::Object, members: Some(MATH_MEMBERS) },
    Builtin { name: "Date", ty: ValueType::Object, members: Some(&["now"]) },
    Builtin { name: "JSON", ty: ValueType::Object, members: Some(&["stringify", "parse"]) },
    Builtin { name: "System", ty: ValueType::Object, members: Some(&["out", "err", "in"]) },
    Builtin { name: "len", ty: ValueType::Function, members: None },
    Builtin { name: "range", ty: ValueType::Function, members: None },
    Builtin { name: "str", ty: ValueType::Function, members: None },
    Builtin { name: "int", ty: ValueType::Function, members: None },
    Builtin { name: "float", ty: ValueType::Function, members: None },
    Builtin { name: "input", ty: ValueType::Function, members: None },
    Builtin { name: "String", ty: ValueType::Object, members: None },
    Builtin { name: "Integer", ty: ValueType::Object, members: None },
    Builtin { name: "Double", ty: ValueType::Object, members: None },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// 内建函数调用的结果类型，未知的返回 `Unknown`。
pub fn call_result(callee: &str) -> ValueType {
    match callee {
        "len" | "int" | "float" => ValueType::Number,
        "str" | "input" | "String" => ValueType::String,
        _ => ValueType::Unknown,
    }
}
