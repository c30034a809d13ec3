// In src/codegen/mod.rs

//! 目标代码生成：把（优化后的）IR 渲染成四种目标语言之一的源代码。
//!
//! 所有生成器共享同一个前置步骤 [`lift::lift`]，把扁平 IR 还原成结构化语句；
//! 之后每个生成器按自己的语法分派渲染。生成器之间互不依赖，也从不修改输入的 IR。
//! 生成总是会产出文本：认不出的指令渲染成可见的注释。

// 1. 声明所有子模块
pub mod lift;
pub mod types;
mod c;
mod java;
mod javascript;
mod python;
#[cfg(test)]
mod test;

// 2. 导入依赖
use std::collections::HashSet;

use log::warn;

use crate::ir::{Instruction, Label};
use crate::language::Language;
use crate::parser::ast::{BinaryOp, Literal, UnaryOp};
use lift::{stmt_exprs, walk, Expr, Function, Program, Stmt};
use types::{Kind, TypeEnv};

pub use c::CGenerator;
pub use java::JavaGenerator;
pub use javascript::JavaScriptGenerator;
pub use python::PythonGenerator;

// --- 核心抽象 ---

/// 一个目标语言的代码生成器。
pub trait CodeGenerator {
    fn target(&self) -> Language;
    fn generate(&self, instructions: &[Instruction]) -> String;
}

pub fn generator_for(target: Language) -> &'static dyn CodeGenerator {
    match target {
        Language::C => &CGenerator,
        Language::Java => &JavaGenerator,
        Language::Python => &PythonGenerator,
        Language::JavaScript => &JavaScriptGenerator,
    }
}

/// 顶层代码生成函数
pub fn generate(instructions: &[Instruction], target: Language) -> String {
    generator_for(target).generate(instructions)
}

// --- 输出缓冲 ---

const INDENT: &str = "    ";

/// 按行输出并维护缩进层级。
#[derive(Debug, Default)]
pub(crate) struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    pub fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    /// 空行；不会连续输出两个。
    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        let trimmed = self.out.trim_end_matches('\n');
        format!("{}\n", trimmed)
    }
}

// --- 表达式渲染 ---

pub(crate) const PREC_OR: u8 = 2;
pub(crate) const PREC_AND: u8 = 3;
pub(crate) const PREC_EQUALITY: u8 = 5;
pub(crate) const PREC_RELATIONAL: u8 = 6;
pub(crate) const PREC_ADDITIVE: u8 = 7;
pub(crate) const PREC_MULTIPLICATIVE: u8 = 8;
pub(crate) const PREC_UNARY: u8 = 9;
pub(crate) const PREC_POSTFIX: u8 = 10;

pub(crate) fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => PREC_OR,
        BinaryOp::And => PREC_AND,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => PREC_EQUALITY,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => PREC_RELATIONAL,
        BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::IntDiv | BinaryOp::Mod => PREC_MULTIPLICATIVE,
    }
}

fn wrap(text: String, precedence: u8, min: u8) -> String {
    if precedence < min {
        format!("({})", text)
    } else {
        text
    }
}

/// 双引号字符串字面量，四种目标语言通用的转义。
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// 目标语言的表达式语法。默认实现是 C 家族的写法。
pub(crate) trait Syntax {
    fn env(&self) -> &TypeEnv;

    fn literal(&self, literal: &Literal) -> String;

    fn binary_op(&self, op: BinaryOp, _left: &Expr, _right: &Expr) -> &'static str {
        match op {
            BinaryOp::StrictEq => "==",
            BinaryOp::StrictNotEq => "!=",
            op => op.symbol(),
        }
    }

    fn unary_op(&self, op: UnaryOp) -> &'static str {
        op.symbol()
    }

    fn unary_precedence(&self, _op: UnaryOp) -> u8 {
        PREC_UNARY
    }

    /// `a < b < c` 在 Python 里是链式比较，两侧都要加括号。
    fn chains_comparisons(&self) -> bool {
        false
    }

    /// 整数除法需要包一层的截断函数；`None` 表示 `/` 本身就截断。
    fn truncation(&self) -> Option<&'static str> {
        None
    }

    /// 两个整数做真除法时对被除数的转换；`/` 对整数本来就不截断的语言原样返回。
    fn float_operand(&self, text: String) -> String {
        text
    }

    /// 二元运算的操作数在渲染前的调整（例如 Python 的 `str()` 转换）。
    fn coerce(&self, _op: BinaryOp, _operand: &Expr, _other: &Expr, text: String) -> String {
        text
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> String {
        format!("{}({})", self.postfix(callee), self.args(args))
    }

    fn member(&self, object: &Expr, member: &str) -> String {
        format!("{}.{}", self.postfix(object), member)
    }

    fn expr(&self, expr: &Expr) -> String {
        self.expr_at(expr, 0)
    }

    fn postfix(&self, expr: &Expr) -> String {
        self.expr_at(expr, PREC_POSTFIX)
    }

    fn args(&self, args: &[Expr]) -> String {
        args.iter().map(|a| self.expr(a)).collect::<Vec<_>>().join(", ")
    }

    fn kind(&self, expr: &Expr) -> Kind {
        self.env().kind_of(expr)
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, min: u8) -> String {
        let p = precedence(op);
        if let (BinaryOp::IntDiv, Some(truncate)) = (op, self.truncation()) {
            let quotient = format!("{} / {}", self.expr_at(left, p), self.expr_at(right, p + 1));
            return format!("{}({})", truncate, quotient);
        }
        let left_min = if op.is_comparison() && self.chains_comparisons() { p + 1 } else { p };
        let mut l = self.coerce(op, left, right, self.expr_at(left, left_min));
        if op == BinaryOp::Div && self.kind(left) == Kind::Int && self.kind(right) == Kind::Int {
            l = self.float_operand(l);
        }
        let r = self.coerce(op, right, left, self.expr_at(right, p + 1));
        wrap(format!("{} {} {}", l, self.binary_op(op, left, right), r), p, min)
    }

    fn expr_at(&self, expr: &Expr, min: u8) -> String {
        match expr {
            Expr::Var(name) => name.clone(),
            Expr::Temp(temp) => temp.to_string(),
            Expr::Const(literal) => {
                let text = self.literal(literal);
                if min > PREC_UNARY && text.starts_with('-') {
                    format!("({})", text)
                } else {
                    text
                }
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right, min),
            Expr::Unary(op, inner) => {
                let p = self.unary_precedence(*op);
                let mut text = self.expr_at(inner, p);
                if text.starts_with(['-', '+']) {
                    text = format!("({})", text);
                }
                wrap(format!("{}{}", self.unary_op(*op), text), p, min)
            }
            Expr::Member(object, member) => wrap(self.member(object, member), PREC_POSTFIX, min),
            Expr::Index(object, index) => format!("{}[{}]", self.postfix(object), self.expr(index)),
            Expr::Call(callee, args) => wrap(self.call(callee, args), PREC_POSTFIX, min),
        }
    }
}

// --- 内建调用的识别 ---

/// 各目标语言需要改写的内建调用。
pub(crate) enum Builtin<'a> {
    Print { args: &'a [Expr], newline: bool },
    Printf { format: &'a Expr, args: &'a [Expr] },
    /// 数学函数，名字统一为小写（`pi`、`sqrt`、`max` ...）
    Math { name: String, args: &'a [Expr] },
    Len(&'a Expr),
    ToStr(&'a Expr),
    ToInt(&'a Expr),
    ToFloat(&'a Expr),
}

pub(crate) fn math_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Member(object, member) if matches!(object.as_var(), Some("Math" | "math")) => {
            Some(member.to_ascii_lowercase())
        }
        _ => None,
    }
}

pub(crate) fn builtin_call<'a>(callee: &Expr, args: &'a [Expr]) -> Option<Builtin<'a>> {
    let path = callee.dotted_path()?;
    let single = match args {
        [only] => Some(only),
        _ => None,
    };
    let builtin = match path.as_str() {
        "print" | "console.log" | "console.info" | "console.error" | "console.warn" | "System.out.println"
        | "System.err.println" => Builtin::Print { args, newline: true },
        "System.out.print" | "System.err.print" => Builtin::Print { args, newline: false },
        "printf" | "System.out.printf" | "System.out.format" => match args.split_first() {
            Some((format, rest)) => Builtin::Printf { format, args: rest },
            None => Builtin::Print { args, newline: false },
        },
        "len" => Builtin::Len(single?),
        "str" | "String" | "String.valueOf" => Builtin::ToStr(single?),
        "int" | "parseInt" | "Integer.parseInt" => Builtin::ToInt(single?),
        "float" | "parseFloat" | "Double.parseDouble" => Builtin::ToFloat(single?),
        "abs" | "max" | "min" | "round" | "pow" => Builtin::Math { name: path.clone(), args },
        _ => Builtin::Math {
            name: math_name(callee)?,
            args,
        },
    };
    Some(builtin)
}

/// 格式串末尾的 `\n`：去掉之后返回新的格式串。
pub(crate) fn strip_newline(format: &Expr) -> Option<Expr> {
    match format {
        Expr::Const(Literal::String(text)) => text
            .strip_suffix('\n')
            .map(|rest| Expr::Const(Literal::String(rest.to_string()))),
        _ => None,
    }
}

// --- 变量布局分析 ---

/// 语句中提到（读或写）的具名变量。
pub(crate) fn mentioned(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    walk(stmts, &mut |stmt| {
        match stmt {
            Stmt::Assign { name, .. } | Stmt::Declare { name, .. } => {
                names.insert(name.clone());
            }
            Stmt::Try { handler: Some((Some(param), _)), .. } => {
                names.insert(param.clone());
            }
            _ => {}
        }
        for expr in stmt_exprs(stmt) {
            expr.visit_vars(&mut |name| {
                names.insert(name.to_string());
            });
        }
    });
    names
}

/// 被赋值（或声明）的变量，按首次出现的顺序。
pub(crate) fn assigned(stmts: &[Stmt]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    walk(stmts, &mut |stmt| {
        if let Stmt::Assign { name, .. } | Stmt::Declare { name, .. } = stmt {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    });
    names
}

/// 函数自己的名字：形参和函数体里声明的变量。它们遮蔽同名的全局变量。
pub(crate) fn own_names(function: &Function) -> HashSet<String> {
    let mut names: HashSet<String> = function.params.iter().cloned().collect();
    walk(&function.body, &mut |stmt| {
        if let Stmt::Declare { name, .. } = stmt {
            names.insert(name.clone());
        }
    });
    names
}

/// 顶层赋值、同时被某个函数当作全局变量使用的变量：在 C/Java 里提升为文件/类级别的全局变量，
/// 在 Python 里需要 `global` 声明。
pub(crate) fn globals(program: &Program) -> Vec<String> {
    let function_names: HashSet<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
    let mut used: HashSet<String> = HashSet::new();
    for function in &program.functions {
        let own = own_names(function);
        used.extend(mentioned(&function.body).into_iter().filter(|name| !own.contains(name)));
    }
    assigned(&program.top_level)
        .into_iter()
        .filter(|name| used.contains(name) && !function_names.contains(name.as_str()))
        .collect()
}

/// 进入函数体时已经可见的名字：没有被遮蔽的全局变量和形参。
pub(crate) fn predeclared(globals: &[String], function: &Function) -> HashSet<String> {
    let own = own_names(function);
    globals
        .iter()
        .filter(|name| !own.contains(*name))
        .chain(function.params.iter())
        .cloned()
        .collect()
}

/// 需要在函数体开头统一声明的局部变量。
///
/// 首次赋值出现在嵌套块里的变量必须提前声明，否则块结束后就不可见了。
/// `for` 初始化部分引入、且循环之外没有再提到的变量就地声明在循环头里。
pub(crate) fn hoisted_locals(body: &[Stmt], predeclared: &HashSet<String>) -> Vec<String> {
    let mut seen = predeclared.clone();
    let mut hoisted = Vec::new();
    for (index, stmt) in body.iter().enumerate() {
        match stmt {
            Stmt::Assign { name, .. } | Stmt::Declare { name, .. } => {
                seen.insert(name.clone());
            }
            Stmt::For { init, .. } => {
                let elsewhere: HashSet<String> = body
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .flat_map(|(_, s)| mentioned(std::slice::from_ref(s)))
                    .collect();
                let in_header: Vec<String> = match init.as_slice() {
                    [Stmt::Assign { name, .. } | Stmt::Declare { name, value: Some(_), .. }] => vec![name.clone()],
                    _ => vec![],
                };
                for name in assigned(std::slice::from_ref(stmt)) {
                    if !seen.insert(name.clone()) {
                        continue;
                    }
                    if !(in_header.contains(&name) && !elsewhere.contains(&name)) {
                        hoisted.push(name);
                    }
                }
            }
            other => {
                for name in assigned(std::slice::from_ref(other)) {
                    if seen.insert(name.clone()) {
                        hoisted.push(name);
                    }
                }
            }
        }
    }
    hoisted
}

/// 把 `for` 的更新部分复制到循环体里每个（属于这个循环的）`continue` 之前。
/// 循环改写成 `while` 时使用。
pub(crate) fn update_before_continue(body: &[Stmt], update: &[Stmt]) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        match stmt {
            Stmt::Continue => {
                out.extend(update.iter().cloned());
                out.push(Stmt::Continue);
            }
            Stmt::If { cond, then, otherwise } => out.push(Stmt::If {
                cond: cond.clone(),
                then: update_before_continue(then, update),
                otherwise: otherwise.as_ref().map(|o| update_before_continue(o, update)),
            }),
            Stmt::Try { body, handler, finalizer } => out.push(Stmt::Try {
                body: update_before_continue(body, update),
                handler: handler
                    .as_ref()
                    .map(|(param, h)| (param.clone(), update_before_continue(h, update))),
                finalizer: finalizer.as_ref().map(|f| update_before_continue(f, update)),
            }),
            // 嵌套循环里的 continue 属于内层循环
            other => out.push(other.clone()),
        }
    }
    out
}

/// 表达式是否读取 `name`。
pub(crate) fn reads(expr: &Expr, name: &str) -> bool {
    let mut found = false;
    expr.visit_vars(&mut |var| found |= var == name);
    found
}

/// 语句树里是否包含 `target` 这一条语句（按地址比较）。
pub(crate) fn contains(stmts: &[Stmt], target: &Stmt) -> bool {
    let mut found = false;
    walk(stmts, &mut |stmt| found |= std::ptr::eq(stmt, target));
    found
}

/// `name` 在 `skip` 这条语句之外是否还被提到（读或写）。
///
/// 从头重新给 `name` 赋值的计数循环不算在内：进入它们时旧值已经作废。
/// 包含 `skip` 的循环除外，它的条件和更新部分会读到 `skip` 结束时的值。
pub(crate) fn mentioned_outside(stmts: &[Stmt], skip: &Stmt, name: &str) -> bool {
    stmts.iter().any(|stmt| {
        if std::ptr::eq(stmt, skip) {
            return false;
        }
        match stmt {
            Stmt::If { cond, then, otherwise } => {
                reads(cond, name)
                    || mentioned_outside(then, skip, name)
                    || otherwise.as_deref().is_some_and(|o| mentioned_outside(o, skip, name))
            }
            Stmt::While { cond, body } => reads(cond, name) || mentioned_outside(body, skip, name),
            Stmt::For { init, cond, update, body } => {
                let restarts = matches!(
                    init.as_slice(),
                    [Stmt::Assign { name: var, value } | Stmt::Declare { name: var, value: Some(value), .. }]
                        if var == name && !reads(value, name)
                );
                if restarts && !contains(body, skip) {
                    return false;
                }
                reads(cond, name)
                    || mentioned_outside(init, skip, name)
                    || mentioned_outside(body, skip, name)
                    || mentioned_outside(update, skip, name)
            }
            Stmt::Try { body, handler, finalizer } => {
                mentioned_outside(body, skip, name)
                    || handler.as_ref().is_some_and(|(param, stmts)| {
                        param.as_deref() == Some(name) || mentioned_outside(stmts, skip, name)
                    })
                    || finalizer.as_deref().is_some_and(|f| mentioned_outside(f, skip, name))
            }
            other => mentioned(std::slice::from_ref(other)).contains(name),
        }
    })
}

/// `throw new Error(msg)`、`raise ValueError(msg)` 这类"构造异常对象"的写法：返回消息参数。
pub(crate) fn exception_message(expr: &Expr) -> Option<Option<&Expr>> {
    match expr {
        Expr::Call(callee, args) => {
            let name = callee.as_var()?;
            (name.ends_with("Error") || name.ends_with("Exception")).then(|| args.first())
        }
        _ => None,
    }
}

/// 函数体里是否有带值的 `return`。
pub(crate) fn returns_value(stmts: &[Stmt]) -> bool {
    let mut found = false;
    walk(stmts, &mut |stmt| {
        if let Stmt::Return(Some(_)) = stmt {
            found = true;
        }
    });
    found
}

pub(crate) fn ends_with_return(stmts: &[Stmt]) -> bool {
    matches!(stmts.last(), Some(Stmt::Return(_)))
}

// --- 花括号语言共用的语句渲染 ---

/// C / Java / JavaScript 之间只在这些地方不同。
pub(crate) trait BraceDialect: Syntax {
    /// 不带分号的变量声明。
    fn declaration(&self, name: &str, kind: Kind, init: Option<&str>) -> String;

    /// 函数开头统一声明的变量的初始值。
    fn default_value(&self, kind: Kind) -> Option<&'static str>;

    /// `catch` 子句的头部；`None` 表示目标语言没有异常。
    fn catch_clause(&self, param: Option<&str>) -> Option<String>;

    fn throw(&self, value: Option<&Expr>) -> String;

    fn label(&self, label: Label) -> String;

    fn goto(&self, label: Label) -> String;

    fn comment(&self, text: &str) -> String {
        format!("/* {} */", text)
    }
}

/// `return` 语句在当前函数里的写法。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ReturnMode {
    Plain,
    /// 没有值的 `return` 补上这个值（C 的 `main`）
    Value(&'static str),
    /// 丢弃返回值（Java 的 `main`）
    Void,
}

pub(crate) struct BraceWriter<'d, D: BraceDialect> {
    dialect: &'d D,
    pub w: Writer,
    declared: HashSet<String>,
    returns: ReturnMode,
}

impl<'d, D: BraceDialect> BraceWriter<'d, D> {
    pub fn new(dialect: &'d D) -> Self {
        Self {
            dialect,
            w: Writer::default(),
            declared: HashSet::new(),
            returns: ReturnMode::Plain,
        }
    }

    /// 渲染一个函数体：先声明需要提前的局部变量，再逐条渲染语句。
    pub fn body(&mut self, stmts: &[Stmt], predeclared: HashSet<String>, returns: ReturnMode) {
        let d = self.dialect;
        let hoisted = hoisted_locals(stmts, &predeclared);
        self.declared = predeclared;
        self.returns = returns;
        for name in hoisted {
            let kind = d.env().var(&name);
            let text = d.declaration(&name, kind, d.default_value(kind));
            self.w.line(format!("{};", text));
            self.declared.insert(name);
        }
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        let saved = self.declared.clone();
        self.w.indent();
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.w.dedent();
        self.declared = saved;
    }

    /// 第一次写入时声明，之后是普通赋值。
    fn declare(&mut self, name: &str, declared_type: Option<&str>, value: &Expr) -> String {
        let d = self.dialect;
        let text = d.expr(value);
        if self.declared.contains(name) {
            return format!("{} = {}", name, text);
        }
        self.declared.insert(name.to_string());
        let kind = self.kind_for(name, declared_type, Some(value));
        d.declaration(name, kind, Some(&text))
    }

    /// 写出的类型优先，其次是推断出的变量类型，最后是初始值的类型。
    fn kind_for(&self, name: &str, declared_type: Option<&str>, value: Option<&Expr>) -> Kind {
        let d = self.dialect;
        [declared_type.map(Kind::of_declared), Some(d.env().var(name)), value.map(|v| d.kind(v))]
            .into_iter()
            .flatten()
            .find(|kind| kind.is_known())
            .unwrap_or(Kind::Unknown)
    }

    /// 可以放进 `for (...)` 头部的单条语句。
    fn inline(&mut self, stmt: &Stmt) -> Option<String> {
        let d = self.dialect;
        match stmt {
            Stmt::Assign { name, value } => Some(self.declare(name, None, value)),
            Stmt::Declare { name, declared_type, value: Some(value) } => {
                Some(self.declare(name, declared_type.as_deref(), value))
            }
            Stmt::Store { target, value } => Some(format!("{} = {}", d.expr(target), d.expr(value))),
            Stmt::Expr(expr) => Some(d.expr(expr)),
            _ => None,
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        let d = self.dialect;
        match stmt {
            Stmt::Declare { name, declared_type, value: Some(value) } => {
                let text = self.declare(name, declared_type.as_deref(), value);
                self.w.line(format!("{};", text));
            }
            Stmt::Declare { name, declared_type, value: None } => {
                if self.declared.insert(name.clone()) {
                    let kind = self.kind_for(name, declared_type.as_deref(), None);
                    self.w.line(format!("{};", d.declaration(name, kind, None)));
                }
            }
            Stmt::Assign { name, value } => {
                let text = self.declare(name, None, value);
                self.w.line(format!("{};", text));
            }
            Stmt::Let { temp, value } => {
                let name = temp.to_string();
                let kind = match d.env().temp(*temp) {
                    Kind::Unknown => d.kind(value),
                    kind => kind,
                };
                let text = d.expr(value);
                self.w.line(format!("{};", d.declaration(&name, kind, Some(&text))));
                self.declared.insert(name);
            }
            Stmt::Store { target, value } => {
                self.w.line(format!("{} = {};", d.expr(target), d.expr(value)));
            }
            Stmt::Expr(expr) => self.w.line(format!("{};", d.expr(expr))),
            Stmt::If { cond, then, otherwise } => {
                self.w.line(format!("if ({}) {{", d.expr(cond)));
                self.block(then);
                let mut otherwise = otherwise.as_deref();
                // else if 链
                while let Some([Stmt::If { cond, then, otherwise: next }]) = otherwise {
                    self.w.line(format!("}} else if ({}) {{", d.expr(cond)));
                    self.block(then);
                    otherwise = next.as_deref();
                }
                if let Some(stmts) = otherwise {
                    self.w.line("} else {");
                    self.block(stmts);
                }
                self.w.line("}");
            }
            Stmt::While { cond, body } => {
                self.w.line(format!("while ({}) {{", d.expr(cond)));
                self.block(body);
                self.w.line("}");
            }
            Stmt::For { init, cond, update, body } => self.for_loop(init, cond, update, body),
            Stmt::Return(value) => {
                let line = match (value, self.returns) {
                    (_, ReturnMode::Void) | (None, ReturnMode::Plain) => "return;".to_string(),
                    (Some(value), _) => format!("return {};", d.expr(value)),
                    (None, ReturnMode::Value(default)) => format!("return {};", default),
                };
                self.w.line(line);
            }
            Stmt::Break => self.w.line("break;"),
            Stmt::Continue => self.w.line("continue;"),
            Stmt::Throw(value) => self.w.line(d.throw(value.as_ref())),
            Stmt::Try { body, handler, finalizer } => self.try_statement(body, handler, finalizer),
            Stmt::Label(label) => self.w.line(d.label(*label)),
            Stmt::Goto(label) => self.w.line(d.goto(*label)),
            Stmt::Unknown(text) => {
                warn!("generation gap: no rendering for IR `{}`", text);
                self.w.line(d.comment(&format!("unsupported: {}", text)));
            }
        }
    }

    fn for_loop(&mut self, init: &[Stmt], cond: &Expr, update: &[Stmt], body: &[Stmt]) {
        let d = self.dialect;
        let saved = self.declared.clone();

        let init_text = match init {
            [] => String::new(),
            [single] => match self.inline(single) {
                Some(text) => text,
                None => {
                    self.stmt(single);
                    String::new()
                }
            },
            many => {
                for stmt in many {
                    self.stmt(stmt);
                }
                String::new()
            }
        };

        let (update_text, body) = match update {
            [] => (String::new(), body.to_vec()),
            [single @ (Stmt::Assign { .. } | Stmt::Store { .. } | Stmt::Expr(_))] => {
                (self.inline(single).unwrap_or_default(), body.to_vec())
            }
            many => {
                let mut rewritten = update_before_continue(body, many);
                rewritten.extend(many.iter().cloned());
                (String::new(), rewritten)
            }
        };

        self.w.line(format!("for ({}; {}; {}) {{", init_text, d.expr(cond), update_text));
        self.block(&body);
        self.w.line("}");
        self.declared = saved;
    }

    fn try_statement(
        &mut self,
        body: &[Stmt],
        handler: &Option<(Option<String>, Vec<Stmt>)>,
        finalizer: &Option<Vec<Stmt>>,
    ) {
        let d = self.dialect;
        match d.catch_clause(None) {
            Some(_) => {
                self.w.line("try {");
                self.block(body);
                if let Some((param, stmts)) = handler {
                    let clause = d.catch_clause(param.as_deref()).unwrap_or_default();
                    self.w.line(format!("}} {} {{", clause));
                    let saved = self.declared.clone();
                    if let Some(param) = param {
                        self.declared.insert(param.clone());
                    }
                    self.block(stmts);
                    self.declared = saved;
                }
                if let Some(stmts) = finalizer {
                    self.w.line("} finally {");
                    self.block(stmts);
                }
                self.w.line("}");
            }
            // 没有异常机制：try 块照常执行，处理器无法触发
            None => {
                warn!("generation gap: exception handling has no equivalent in the target");
                self.w.line(format!("{} {{", d.comment("try")));
                self.block(body);
                self.w.line("}");
                if let Some((param, _)) = handler {
                    let text = format!("catch ({}) omitted: no exceptions", param.as_deref().unwrap_or("_"));
                    self.w.line(d.comment(&text));
                }
                if let Some(stmts) = finalizer {
                    self.w.line(format!("{} {{", d.comment("finally")));
                    self.block(stmts);
                    self.w.line("}");
                }
            }
        }
    }
}
