// In src/analyzer/mod.rs

//! 语义分析：遍历 AST，维护作用域栈，收集错误并为每个表达式推断一个尽力而为的类型。
//!
//! 分析从不中断：每个问题都被记录下来，继续分析兄弟节点，由调用方决定是否终止编译。
//! 推断出的类型写入以 `NodeId` 为键的旁表，语法树本身保持不变。

// 1. 声明所有模块
pub mod builtins;
pub mod symbols;
pub mod types;

#[cfg(test)]
mod test;

// 2. 导入依赖
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::language::Language;
use crate::parser::ast::{Ast, BinaryOp, Literal, NodeId, NodeType, NodeValue, Number, UnaryOp};
use crate::reporter::SemanticError;
use crate::utils::Span;
use symbols::{Symbol, SymbolTable};
use types::ValueType;

/// 一次分析的全部产物。
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// 按声明顺序排列的所有用户符号（不含内建符号）
    pub symbols: Vec<Symbol>,
    /// 按发现顺序排列的语义错误
    pub errors: Vec<SemanticError>,
    /// 表达式节点的推断类型
    pub types: HashMap<NodeId, ValueType>,
    /// 在函数里引入新局部变量的赋值节点（Python 的隐式声明）
    pub locals: HashSet<NodeId>,
    /// 两侧都是整数的除法（C/Java 源），结果向零截断
    pub int_divisions: HashSet<NodeId>,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn type_of(&self, id: NodeId) -> ValueType {
        self.types.get(&id).copied().unwrap_or(ValueType::Unknown)
    }
}

// --- Analyzer 结构体与实现 ---
pub struct Analyzer {
    dialect: Language,
    table: SymbolTable,
    errors: Vec<SemanticError>,
    types: HashMap<NodeId, ValueType>,
    locals: HashSet<NodeId>,
    int_divisions: HashSet<NodeId>,
    /// 每个外围函数的形参作用域深度，用于 Python 的隐式声明
    function_scopes: Vec<usize>,
    /// 与 `function_scopes` 对应：函数里 `global` / `nonlocal` 声明的名字
    shared: Vec<Vec<String>>,
}

impl Analyzer {
    pub fn new(dialect: Language) -> Self {
        Self {
            dialect,
            table: SymbolTable::new(),
            errors: Vec::new(),
            types: HashMap::new(),
            locals: HashSet::new(),
            int_divisions: HashSet::new(),
            function_scopes: Vec::new(),
            shared: Vec::new(),
        }
    }

    /// 主入口：分析整棵树并交出符号表、错误列表和类型旁表。
    pub fn analyze(mut self, ast: &Ast) -> Analysis {
        self.visit(ast, ast.root());
        debug!(
            "semantic analysis finished: {} symbols, {} errors",
            self.table.len(),
            self.errors.len()
        );
        Analysis {
            symbols: self.table.into_symbols(),
            errors: self.errors,
            types: self.types,
            locals: self.locals,
            int_divisions: self.int_divisions,
        }
    }

    fn visit(&mut self, ast: &Ast, id: NodeId) -> ValueType {
        let node = ast.node(id);
        let ty = match node.node_type {
            NodeType::Program => {
                self.visit_body(ast, &node.children);
                ValueType::Unknown
            }
            NodeType::BlockStatement => {
                self.table.enter_scope();
                self.visit_body(ast, &node.children);
                self.table.exit_scope();
                ValueType::Unknown
            }
            NodeType::FunctionDeclaration => {
                // 函数名已经在所在代码块的提升阶段声明过了
                self.table.enter_scope();
                self.function_scopes.push(self.table.depth());
                self.shared.push(node.attributes.shared.clone());
                for param in &node.attributes.params {
                    let declared = param.declared_type.as_deref();
                    let ty = declared.map_or(ValueType::Unknown, ValueType::of_declared);
                    self.declare(&param.name, ty, declared, node.span);
                }
                for &child in &node.children {
                    self.visit(ast, child);
                }
                self.shared.pop();
                self.function_scopes.pop();
                self.table.exit_scope();
                ValueType::Function
            }
            NodeType::VariableDeclaration => {
                // 先分析初始值，`let x = x;` 里右侧的 x 指向外层
                let init = node
                    .children
                    .first()
                    .map_or(ValueType::Unknown, |&init| self.visit(ast, init));
                let ty = node
                    .attributes
                    .declared_type
                    .as_deref()
                    .map_or(init, ValueType::of_declared);
                if let Some(name) = node.name() {
                    self.declare(name, ty, node.attributes.declared_type.as_deref(), node.span);
                }
                ty
            }
            NodeType::Assignment => {
                let value = self.visit(ast, node.children[1]);
                let target = node.children[0];
                match ast.node(target).name() {
                    Some(name) if ast.node(target).node_type == NodeType::Identifier => {
                        let ty = self.assign(id, name, value, ast.node(target).span);
                        self.types.insert(target, ty);
                    }
                    _ => {
                        self.visit(ast, target);
                    }
                }
                value
            }
            NodeType::Identifier => match node.name() {
                Some(name) => self.resolve(name, node.span),
                None => ValueType::Unknown,
            },
            NodeType::Literal => match &node.value {
                NodeValue::Literal(literal) => ValueType::of_literal(literal),
                _ => ValueType::Unknown,
            },
            NodeType::BinaryExpression => {
                let left = self.visit(ast, node.children[0]);
                let right = self.visit(ast, node.children[1]);
                if node.value == NodeValue::Binary(BinaryOp::Div)
                    && self.dialect.requires_declarations()
                    && self.is_integral(ast, node.children[0])
                    && self.is_integral(ast, node.children[1])
                {
                    self.int_divisions.insert(id);
                }
                match node.value {
                    NodeValue::Binary(op) => ValueType::of_binary(op, left, right),
                    _ => ValueType::Unknown,
                }
            }
            NodeType::UnaryExpression => {
                self.visit(ast, node.children[0]);
                match node.value {
                    NodeValue::Unary(op) => ValueType::of_unary(op),
                    _ => ValueType::Unknown,
                }
            }
            NodeType::CallExpression => {
                for &child in &node.children {
                    self.visit(ast, child);
                }
                self.call_result(ast, node.children[0])
            }
            NodeType::MemberExpression => self.visit_member(ast, id),
            NodeType::ForStatement => {
                // for 头部声明的变量只在循环内部可见
                self.table.enter_scope();
                for &child in &node.children {
                    self.visit(ast, child);
                }
                self.table.exit_scope();
                ValueType::Unknown
            }
            NodeType::TryStatement => {
                let attributes = &node.attributes;
                let mut children = node.children.iter().copied();
                if let Some(block) = children.next() {
                    self.visit(ast, block);
                }
                if attributes.has_handler {
                    if let Some(handler) = children.next() {
                        self.table.enter_scope();
                        if let Some(param) = &attributes.catch_param {
                            self.declare(param, ValueType::Object, None, node.span);
                        }
                        self.visit(ast, handler);
                        self.table.exit_scope();
                    }
                }
                for finalizer in children {
                    self.visit(ast, finalizer);
                }
                ValueType::Unknown
            }
            NodeType::IfStatement
            | NodeType::WhileStatement
            | NodeType::ReturnStatement
            | NodeType::ExpressionStatement
            | NodeType::ThrowStatement => {
                for &child in &node.children {
                    self.visit(ast, child);
                }
                ValueType::Unknown
            }
            NodeType::BreakStatement | NodeType::ContinueStatement => ValueType::Unknown,
        };
        self.types.insert(id, ty);
        ty
    }

    /// 代码块内的语句：先提升函数声明，再依次分析
    fn visit_body(&mut self, ast: &Ast, children: &[NodeId]) {
        for &child in children {
            let node = ast.node(child);
            if node.node_type == NodeType::FunctionDeclaration {
                if let Some(name) = node.name() {
                    self.declare(name, ValueType::Function, node.attributes.declared_type.as_deref(), node.span);
                }
            }
        }
        for &child in children {
            self.visit(ast, child);
        }
    }

    fn visit_member(&mut self, ast: &Ast, id: NodeId) -> ValueType {
        let node = ast.node(id);
        let object = node.children[0];
        self.visit(ast, object);
        if node.attributes.computed {
            if let Some(&index) = node.children.get(1) {
                self.visit(ast, index);
            }
            return ValueType::Unknown;
        }

        let Some(property) = node.attributes.property.as_deref() else {
            return ValueType::Unknown;
        };
        let object_node = ast.node(object);
        let Some(object_name) = object_node.name().filter(|_| object_node.node_type == NodeType::Identifier) else {
            return ValueType::Unknown;
        };
        // 被用户符号遮蔽的名字不再是内建对象
        if self.table.lookup(object_name).is_some() {
            return ValueType::Unknown;
        }
        let Some(members) = builtins::lookup(object_name).and_then(|b| b.members) else {
            return ValueType::Unknown;
        };
        if !members.contains(&property) {
            self.errors.push(SemanticError::UnknownBuiltinMember {
                object: object_name.to_string(),
                member: property.to_string(),
                span: node.span,
            });
            return ValueType::Unknown;
        }
        match (object_name, property) {
            ("Math" | "math", "PI" | "E") => ValueType::Number,
            ("Math" | "math", _) | ("Date", _) | ("JSON", "stringify") | ("console", _) | ("System", _) => {
                ValueType::Function
            }
            _ => ValueType::Unknown,
        }
    }

    fn call_result(&self, ast: &Ast, callee: NodeId) -> ValueType {
        let node = ast.node(callee);
        match node.node_type {
            NodeType::Identifier => match node.name() {
                Some(name) if self.table.lookup(name).is_none() => builtins::call_result(name),
                _ => ValueType::Unknown,
            },
            NodeType::MemberExpression => {
                let object = ast.node(node.children[0]);
                match (object.name(), node.attributes.property.as_deref()) {
                    (Some("Math" | "math"), _) | (Some("Date"), Some("now")) => ValueType::Number,
                    (Some("JSON"), Some("stringify")) => ValueType::String,
                    _ => ValueType::Unknown,
                }
            }
            _ => ValueType::Unknown,
        }
    }

    /// `declared` 是源码里写出的类型（变量类型或函数返回类型）。
    fn declare(&mut self, name: &str, ty: ValueType, declared: Option<&str>, span: Span) {
        match self.table.declare(name, ty, span) {
            Ok(index) => {
                if let Some(declared) = declared {
                    self.table.set_declared_type(index, declared);
                }
            }
            Err(error) => self.errors.push(error),
        }
    }

    /// 值一定是整数的表达式：整数字面量、声明为整型的变量和函数调用，以及它们的算术组合。
    fn is_integral(&self, ast: &Ast, id: NodeId) -> bool {
        let node = ast.node(id);
        match (node.node_type, &node.value) {
            (NodeType::Literal, NodeValue::Literal(Literal::Number(Number::Int(_)))) => true,
            (NodeType::Identifier, _) => node.name().is_some_and(|name| self.declared_integral(name)),
            (NodeType::CallExpression, _) => {
                let callee = ast.node(node.children[0]);
                callee.node_type == NodeType::Identifier && callee.name().is_some_and(|name| self.declared_integral(name))
            }
            (NodeType::UnaryExpression, NodeValue::Unary(UnaryOp::Neg | UnaryOp::Plus)) => {
                self.is_integral(ast, node.children[0])
            }
            (NodeType::BinaryExpression, NodeValue::Binary(op)) => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod => {
                    self.is_integral(ast, node.children[0]) && self.is_integral(ast, node.children[1])
                }
                BinaryOp::Div => self.int_divisions.contains(&id),
                _ => false,
            },
            _ => false,
        }
    }

    fn declared_integral(&self, name: &str) -> bool {
        self.table
            .lookup(name)
            .and_then(|index| self.table.symbol(index).declared_type.as_deref())
            .is_some_and(types::is_integral_type)
    }

    /// 读取一个名字：用户符号优先，然后是内建表
    fn resolve(&mut self, name: &str, span: Span) -> ValueType {
        if let Some(index) = self.table.lookup(name) {
            self.table.mark_used(index);
            return self.table.symbol(index).ty;
        }
        if let Some(builtin) = builtins::lookup(name) {
            return builtin.ty;
        }
        self.errors.push(SemanticError::UndefinedVariable {
            name: name.to_string(),
            span,
        });
        ValueType::Unknown
    }

    /// 给一个名字赋值。未声明的名字在 Python/JavaScript 里会被隐式声明。
    ///
    /// Python 函数里的赋值总是引入局部变量（即使外层有同名变量），
    /// 除非这个名字在函数里被声明为 `global` / `nonlocal`。
    fn assign(&mut self, id: NodeId, name: &str, value: ValueType, span: Span) -> ValueType {
        if let (Language::Python, Some(&depth)) = (self.dialect, self.function_scopes.last()) {
            let shared = self.shared.last().is_some_and(|names| names.iter().any(|n| n == name));
            if !shared && self.table.lookup_within(depth, name).is_none() {
                if let Err(error) = self.table.declare_at(depth, name, value, span) {
                    self.errors.push(error);
                }
                self.locals.insert(id);
                return value;
            }
        }
        if let Some(index) = self.table.lookup(name) {
            return self.table.symbol(index).ty;
        }
        if builtins::lookup(name).is_some() {
            return value;
        }
        let depth = match self.dialect {
            // 函数里的 global 名字，或者顶层代码
            Language::Python | Language::JavaScript => 0,
            Language::C | Language::Java => {
                self.errors.push(SemanticError::UndefinedVariable {
                    name: name.to_string(),
                    span,
                });
                return ValueType::Unknown;
            }
        };
        if let Err(error) = self.table.declare_at(depth, name, value, span) {
            self.errors.push(error);
        }
        value
    }
}
