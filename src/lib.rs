// In src/lib.rs

//! `crossc`：在 C、Java、Python、JavaScript 四种过程式语言之间翻译源程序。
//!
//! 翻译经过一条完整的编译流水线：词法分析、语法分析、语义分析、
//! 三地址 IR 生成、IR 优化，最后由目标语言的生成器输出源代码。
//! 对外只有 [`compile`] 这一个入口，调用方不需要了解流水线内部。

// 1. 声明所有模块
pub mod analyzer;
pub mod codegen;
pub mod compiler;
pub mod diagnostics;
pub mod ir;
pub mod language;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod reporter;
mod utils;

// 2. 顶层的、干净的公共 API
pub use compiler::{compile, CompileOptions, CompileOutput, CompileResult, CompilerContext};
pub use language::Language;
pub use utils::Span;
