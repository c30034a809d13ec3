//! src/parser/mod.rs
//!
//! 语法分析阶段的公共接口：接收 Token 流，按源语言的方言构建抽象语法树。

pub mod ast;
mod main;
//测试模块
#[cfg(test)]
mod test;

use log::debug;

use crate::language::Language;
use crate::lexer::Token;
use crate::reporter::ParserError;
use ast::Ast;
use main::{Parse, Parser};

/// parser 模块唯一的公共入口函数。
///
/// - 输入: 词法分析得到的 Token 流，以及源代码所属的语言（决定方言）。
/// - 输出: 以 PROGRAM 为根的 AST；遇到第一处无法匹配的产生式时返回语法错误。
pub fn parse(tokens: &[Token], dialect: Language) -> Result<Ast, ParserError> {
    let ast = Parser::new(tokens, dialect).parse()?;
    debug!("parser built {} AST nodes ({} dialect)", ast.len(), dialect);
    Ok(ast)
}
