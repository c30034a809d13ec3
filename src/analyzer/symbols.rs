// src/analyzer/symbols.rs

use std::collections::HashMap;
use std::fmt;

use crate::analyzer::types::ValueType;
use crate::reporter::SemanticError;
use crate::utils::Span;

/// 符号表中存储的一条记录。
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: ValueType,
    /// 声明所在作用域的深度，全局作用域为 0。
    pub scope: usize,
    pub used: bool,
    pub span: Span,
    /// C/Java 源里写出的类型；函数符号是返回类型
    pub declared_type: Option<String>,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (scope {}{})",
            self.name,
            self.ty,
            self.scope,
            if self.used { "" } else { ", unused" }
        )
    }
}

/// 单个作用域：名字到 `symbols` 下标的映射
type Scope = HashMap<String, usize>;

/// 符号表，使用一个栈来管理嵌套的作用域。
/// 作用域退出后符号本身仍保留在 `symbols` 里，分析结束时整体交给调用方。
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// 创建一个新的符号表，并自动进入全局作用域
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
            symbols: Vec::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// 退出当前作用域；全局作用域永远不会被弹出
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// 当前作用域的深度，全局为 0
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// 在当前作用域中声明一个新符号
    pub fn declare(&mut self, name: &str, ty: ValueType, span: Span) -> Result<usize, SemanticError> {
        self.declare_at(self.depth(), name, ty, span)
    }

    /// 在指定深度的作用域中声明（隐式声明会用到外层的函数作用域）
    pub fn declare_at(&mut self, depth: usize, name: &str, ty: ValueType, span: Span) -> Result<usize, SemanticError> {
        let depth = depth.min(self.depth());
        if self.scopes[depth].contains_key(name) {
            return Err(SemanticError::Redeclaration {
                name: name.to_string(),
                span,
            });
        }
        let index = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            ty,
            scope: depth,
            used: false,
            span,
            declared_type: None,
        });
        self.scopes[depth].insert(name.to_string(), index);
        Ok(index)
    }

    /// 从内到外查找一个名字
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    /// 只在 `depth` 及更内层的作用域里查找（不越过外围函数）
    pub fn lookup_within(&self, depth: usize, name: &str) -> Option<usize> {
        let depth = depth.min(self.depth());
        self.scopes[depth..].iter().rev().find_map(|scope| scope.get(name).copied())
    }

    pub fn symbol(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }

    pub fn set_declared_type(&mut self, index: usize, declared_type: &str) {
        if let Some(symbol) = self.symbols.get_mut(index) {
            symbol.declared_type = Some(declared_type.to_string());
        }
    }

    pub fn mark_used(&mut self, index: usize) {
        if let Some(symbol) = self.symbols.get_mut(index) {
            symbol.used = true;
        }
    }

    /// 已声明的符号总数（包括已退出作用域中的）
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// 按声明顺序交出所有符号
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }
}
