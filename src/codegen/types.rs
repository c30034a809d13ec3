//! 静态类型目标（C / Java）需要为每个变量、临时变量、形参和返回值选定一个类型。
//! 这里在提升后的程序上做一次尽力而为的推断：字面量的词法形式、算术结果、
//! 内建函数的已知结果、用户函数的返回语句以及调用点的实参。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::lift::{walk, Expr, Function, Program, Stmt};
use super::own_names;
use crate::ir::Temp;
use crate::parser::ast::{BinaryOp, Literal, Number, UnaryOp};

/// 生成器关心的值的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Float,
    Bool,
    Str,
    Unknown,
}

impl Kind {
    pub fn of_literal(literal: &Literal) -> Kind {
        match literal {
            Literal::Number(Number::Int(_)) => Kind::Int,
            Literal::Number(Number::Float(_)) => Kind::Float,
            Literal::String(_) => Kind::Str,
            Literal::Boolean(_) => Kind::Bool,
            Literal::Null => Kind::Unknown,
        }
    }

    /// C / Java 源中写出的类型名。
    pub fn of_declared(name: &str) -> Kind {
        let base = name.trim_end_matches("[]").trim_end_matches('*').trim();
        match base {
            "int" | "long" | "short" | "byte" | "unsigned" | "Integer" | "Long" => Kind::Int,
            "float" | "double" | "Float" | "Double" => Kind::Float,
            "boolean" | "bool" | "Boolean" => Kind::Bool,
            "String" | "char" => Kind::Str,
            _ => Kind::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != Kind::Unknown
    }

    /// 两个已知种类合并：整数和浮点混合时取浮点，其余以先出现的为准。
    fn merge(self, other: Kind) -> Kind {
        match (self, other) {
            (Kind::Unknown, k) | (k, Kind::Unknown) => k,
            (Kind::Int, Kind::Float) | (Kind::Float, Kind::Int) => Kind::Float,
            (k, _) => k,
        }
    }
}

/// 内建调用的已知结果种类。
fn builtin_result(path: &str) -> Option<Kind> {
    let kind = match path {
        "len" | "int" | "Integer.parseInt" | "parseInt" | "Math.floor" | "Math.ceil" | "Math.round"
        | "math.floor" | "math.ceil" | "round" => Kind::Int,
        "float" | "parseFloat" | "Double.parseDouble" | "Math.random" => Kind::Float,
        "str" | "input" | "String" | "String.valueOf" | "JSON.stringify" => Kind::Str,
        _ if path.starts_with("Math.") || path.starts_with("math.") => Kind::Float,
        _ => return None,
    };
    Some(kind)
}

/// 变量的归属：`None` 是顶层（全局），`Some(f)` 是函数 `f` 自己声明的局部变量。
type Scoped = (Option<String>, String);

/// 整个程序的类型环境。
///
/// 函数的形参和它声明的变量按函数分开存放，其余名字都属于顶层。
/// 查询时使用 [`TypeEnv::enter`] 设定的当前函数。
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    vars: HashMap<Scoped, Kind>,
    /// 源程序写出的类型，优先于推断结果
    declared: HashMap<Scoped, Kind>,
    temps: HashMap<Temp, Kind>,
    returns: HashMap<String, Kind>,
    params: HashMap<String, Vec<Kind>>,
    owned: HashMap<String, HashSet<String>>,
    current: RefCell<Option<String>>,
}

impl TypeEnv {
    pub fn infer(program: &Program) -> TypeEnv {
        let mut env = TypeEnv::default();
        for function in &program.functions {
            env.params
                .insert(function.name.clone(), vec![Kind::Unknown; function.params.len()]);
            env.owned.insert(function.name.clone(), own_names(function));
        }
        // 两轮：让先调用、后定义的函数也能拿到返回类型
        for _ in 0..2 {
            for function in &program.functions {
                env.scan_function(function);
            }
            env.enter(None);
            env.scan(&program.top_level, None);
        }
        env.enter(None);
        env
    }

    /// 设定之后的查询所在的函数（`None` 为顶层）。
    pub fn enter(&self, function: Option<&str>) {
        *self.current.borrow_mut() = function.map(str::to_string);
    }

    fn scan_function(&mut self, function: &Function) {
        self.enter(Some(&function.name));
        let kinds = self.params.get(&function.name).cloned().unwrap_or_default();
        for (param, kind) in function.params.iter().zip(kinds) {
            self.record_var(Some(&function.name), param, kind);
        }
        self.scan(&function.body, Some(&function.name));
    }

    fn key(&self, function: Option<&str>, name: &str) -> Scoped {
        let owner = function.filter(|f| self.owned.get(*f).is_some_and(|names| names.contains(name)));
        (owner.map(str::to_string), name.to_string())
    }

    fn record_var(&mut self, function: Option<&str>, name: &str, kind: Kind) {
        let key = self.key(function, name);
        let entry = self.vars.entry(key).or_insert(Kind::Unknown);
        *entry = entry.merge(kind);
    }

    fn record_declared(&mut self, function: Option<&str>, name: &str, kind: Kind) {
        if kind.is_known() {
            let key = self.key(function, name);
            self.declared.entry(key).or_insert(kind);
        }
    }

    fn scan(&mut self, stmts: &[Stmt], function: Option<&str>) {
        let mut found: Vec<(String, Kind)> = Vec::new();
        let mut declared: Vec<(String, Kind)> = Vec::new();
        let mut temps: Vec<(Temp, Kind)> = Vec::new();
        let mut returns: Vec<Kind> = Vec::new();
        let mut calls: Vec<(String, Vec<Kind>)> = Vec::new();

        walk(stmts, &mut |stmt| {
            match stmt {
                Stmt::Declare { name, declared_type, value } => {
                    if let Some(ty) = declared_type {
                        declared.push((name.clone(), Kind::of_declared(ty)));
                    }
                    if let Some(value) = value {
                        found.push((name.clone(), self.kind_of(value)));
                    }
                }
                Stmt::Assign { name, value } => found.push((name.clone(), self.kind_of(value))),
                Stmt::Let { temp, value } => temps.push((*temp, self.kind_of(value))),
                Stmt::Return(Some(value)) => returns.push(self.kind_of(value)),
                _ => {}
            }
            for expr in super::lift::stmt_exprs(stmt) {
                self.collect_calls(expr, &mut calls);
            }
        });

        for (name, kind) in declared {
            self.record_declared(function, &name, kind);
        }
        for (name, kind) in found {
            self.record_var(function, &name, kind);
        }
        self.temps.extend(temps);
        if let Some(function) = function {
            let kind = returns.into_iter().fold(Kind::Unknown, Kind::merge);
            if kind.is_known() {
                self.returns.insert(function.to_string(), kind);
            }
        }
        for (callee, args) in calls {
            if let Some(params) = self.params.get_mut(&callee) {
                for (param, arg) in params.iter_mut().zip(args) {
                    *param = param.merge(arg);
                }
            }
        }
    }

    fn collect_calls(&self, expr: &Expr, calls: &mut Vec<(String, Vec<Kind>)>) {
        match expr {
            Expr::Call(callee, args) => {
                if let Some(name) = callee.as_var() {
                    calls.push((name.to_string(), args.iter().map(|a| self.kind_of(a)).collect()));
                }
                for arg in args {
                    self.collect_calls(arg, calls);
                }
            }
            Expr::Binary(_, l, r) | Expr::Index(l, r) => {
                self.collect_calls(l, calls);
                self.collect_calls(r, calls);
            }
            Expr::Unary(_, e) | Expr::Member(e, _) => self.collect_calls(e, calls),
            _ => {}
        }
    }

    /// 当前函数里看到的变量类型。
    pub fn var(&self, name: &str) -> Kind {
        let current = self.current.borrow();
        self.var_in(current.as_deref(), name)
    }

    pub fn var_in(&self, function: Option<&str>, name: &str) -> Kind {
        let key = self.key(function, name);
        self.declared
            .get(&key)
            .or_else(|| self.vars.get(&key))
            .copied()
            .unwrap_or(Kind::Unknown)
    }

    pub fn temp(&self, temp: Temp) -> Kind {
        self.temps.get(&temp).copied().unwrap_or(Kind::Unknown)
    }

    pub fn return_of(&self, function: &str) -> Option<Kind> {
        self.returns.get(function).copied()
    }

    pub fn param(&self, function: &str, index: usize) -> Kind {
        self.params
            .get(function)
            .and_then(|kinds| kinds.get(index))
            .copied()
            .unwrap_or(Kind::Unknown)
    }

    pub fn kind_of(&self, expr: &Expr) -> Kind {
        match expr {
            Expr::Const(literal) => Kind::of_literal(literal),
            Expr::Var(name) => self.var(name),
            Expr::Temp(temp) => self.temp(*temp),
            Expr::Binary(op, left, right) => {
                if op.is_comparison() || op.is_logical() {
                    return Kind::Bool;
                }
                let (l, r) = (self.kind_of(left), self.kind_of(right));
                match (l, r) {
                    _ if *op == BinaryOp::Add && (l == Kind::Str || r == Kind::Str) => Kind::Str,
                    (Kind::Float, _) | (_, Kind::Float) => Kind::Float,
                    // 截断的整数除法已经是 IntDiv，剩下的 `/` 是真除法
                    (Kind::Int, Kind::Int) if *op == BinaryOp::Div => Kind::Float,
                    (Kind::Int, Kind::Int) => Kind::Int,
                    _ => Kind::Unknown,
                }
            }
            Expr::Unary(UnaryOp::Not, _) => Kind::Bool,
            Expr::Unary(_, inner) => self.kind_of(inner),
            Expr::Member(..) => match expr.dotted_path().as_deref() {
                Some("Math.PI" | "Math.E" | "math.pi" | "math.e") => Kind::Float,
                _ => Kind::Unknown,
            },
            Expr::Index(..) => Kind::Unknown,
            Expr::Call(callee, _) => {
                let Some(path) = callee.dotted_path() else {
                    return Kind::Unknown;
                };
                self.returns
                    .get(&path)
                    .copied()
                    .or_else(|| builtin_result(&path))
                    .unwrap_or(Kind::Unknown)
            }
        }
    }
}
