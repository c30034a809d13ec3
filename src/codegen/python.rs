// In src/codegen/python.rs

use std::cell::Cell;
use std::collections::HashSet;

use log::warn;

use super::lift::{lift, Expr, Program, Stmt};
use super::types::{Kind, TypeEnv};
use super::{
    assigned, builtin_call, exception_message, globals, math_name, mentioned_outside, own_names, quote,
    strip_newline, update_before_continue, Builtin, CodeGenerator, Syntax, Writer,
};
use crate::ir::Instruction;
use crate::language::Language;
use crate::parser::ast::{BinaryOp, Literal, Number, UnaryOp};

/// Python 生成器：缩进代替花括号，`for` 循环尽量还原成 `range`。
pub struct PythonGenerator;

impl CodeGenerator for PythonGenerator {
    fn target(&self) -> Language {
        Language::Python
    }

    fn generate(&self, instructions: &[Instruction]) -> String {
        let program = lift(instructions);
        let emitter = PythonEmitter {
            env: TypeEnv::infer(&program),
            math: Cell::new(false),
            random: Cell::new(false),
        };
        let body = emitter.render(&program);

        let mut out = String::new();
        if emitter.math.get() {
            out.push_str("import math\n");
        }
        if emitter.random.get() {
            out.push_str("import random\n");
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&body);
        out
    }
}

/// 正在渲染的函数体或顶层代码。
struct Scope<'s> {
    body: &'s [Stmt],
    /// 这里读写的全局变量，其他函数也看得到
    globals: HashSet<String>,
}

struct PythonEmitter {
    env: TypeEnv,
    math: Cell<bool>,
    random: Cell<bool>,
}

fn default_value(kind: Kind) -> &'static str {
    match kind {
        Kind::Int => "0",
        Kind::Float => "0.0",
        Kind::Bool => "False",
        Kind::Str => "\"\"",
        Kind::Unknown => "None",
    }
}

fn int_const(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Const(Literal::Number(Number::Int(n))) => Some(*n),
        Expr::Unary(UnaryOp::Neg, inner) => int_const(inner).map(|n| -n),
        _ => None,
    }
}

impl PythonEmitter {
    fn render(&self, program: &Program) -> String {
        let mut w = Writer::default();
        let globals = globals(program);

        for function in &program.functions {
            w.line(format!("def {}({}):", function.name, function.params.join(", ")));
            w.indent();
            self.env.enter(Some(&function.name));
            // 自己声明过的名字是局部变量，遮蔽同名的全局变量
            let own = own_names(function);
            let scope = Scope {
                body: &function.body,
                globals: globals.iter().filter(|name| !own.contains(*name)).cloned().collect(),
            };
            let written: Vec<String> = assigned(&function.body)
                .into_iter()
                .filter(|name| scope.globals.contains(name))
                .collect();
            if !written.is_empty() {
                w.line(format!("global {}", written.join(", ")));
            }
            if function.body.is_empty() && written.is_empty() {
                w.line("pass");
            }
            self.stmts(&mut w, &function.body, &scope);
            w.dedent();
            w.blank();
        }

        self.env.enter(None);
        let scope = Scope {
            body: &program.top_level,
            globals: globals.into_iter().collect(),
        };
        self.stmts(&mut w, &program.top_level, &scope);

        if program.function("main").is_some() {
            w.blank();
            w.line("if __name__ == \"__main__\":");
            w.indent();
            w.line("main()");
            w.dedent();
        }
        w.finish()
    }

    fn suite(&self, w: &mut Writer, stmts: &[Stmt], scope: &Scope) {
        w.indent();
        if stmts.is_empty() {
            w.line("pass");
        }
        self.stmts(w, stmts, scope);
        w.dedent();
    }

    fn stmts(&self, w: &mut Writer, stmts: &[Stmt], scope: &Scope) {
        for stmt in stmts {
            self.stmt(w, stmt, scope);
        }
    }

    fn stmt(&self, w: &mut Writer, stmt: &Stmt, scope: &Scope) {
        match stmt {
            Stmt::Declare { name, value: Some(value), .. } => w.line(format!("{} = {}", name, self.expr(value))),
            Stmt::Declare { name, declared_type, value: None } => {
                let kind = match declared_type {
                    Some(ty) => Kind::of_declared(ty),
                    None => self.env.var(name),
                };
                w.line(format!("{} = {}", name, default_value(kind)));
            }
            Stmt::Assign { name, value } => w.line(format!("{} = {}", name, self.expr(value))),
            Stmt::Let { temp, value } => w.line(format!("{} = {}", temp, self.expr(value))),
            Stmt::Store { target, value } => w.line(format!("{} = {}", self.expr(target), self.expr(value))),
            Stmt::Expr(expr) => w.line(self.expr(expr)),
            Stmt::If { cond, then, otherwise } => {
                w.line(format!("if {}:", self.expr(cond)));
                self.suite(w, then, scope);
                let mut otherwise = otherwise.as_deref();
                while let Some([Stmt::If { cond, then, otherwise: next }]) = otherwise {
                    w.line(format!("elif {}:", self.expr(cond)));
                    self.suite(w, then, scope);
                    otherwise = next.as_deref();
                }
                if let Some(stmts) = otherwise {
                    w.line("else:");
                    self.suite(w, stmts, scope);
                }
            }
            Stmt::While { cond, body } => {
                w.line(format!("while {}:", self.expr(cond)));
                self.suite(w, body, scope);
            }
            Stmt::For { .. } => self.for_loop(w, stmt, scope),
            Stmt::Return(Some(value)) => w.line(format!("return {}", self.expr(value))),
            Stmt::Return(None) => w.line("return"),
            Stmt::Break => w.line("break"),
            Stmt::Continue => w.line("continue"),
            Stmt::Throw(value) => w.line(self.raise(value.as_ref())),
            Stmt::Try { body, handler, finalizer } => {
                if handler.is_none() && finalizer.is_none() {
                    self.stmts(w, body, scope);
                    return;
                }
                w.line("try:");
                self.suite(w, body, scope);
                if let Some((param, stmts)) = handler {
                    match param {
                        Some(param) => w.line(format!("except Exception as {}:", param)),
                        None => w.line("except Exception:"),
                    }
                    self.suite(w, stmts, scope);
                }
                if let Some(stmts) = finalizer {
                    w.line("finally:");
                    self.suite(w, stmts, scope);
                }
            }
            Stmt::Label(label) => w.line(format!("# label {}", label)),
            Stmt::Goto(label) => w.line(format!("# goto {} (no goto in Python)", label)),
            Stmt::Unknown(text) => {
                warn!("generation gap: no rendering for IR `{}`", text);
                w.line(format!("# unsupported: {}", text));
            }
        }
    }

    fn raise(&self, value: Option<&Expr>) -> String {
        let Some(value) = value else {
            return "raise Exception()".to_string();
        };
        match exception_message(value) {
            Some(Some(message)) => format!("raise Exception({})", self.expr(message)),
            Some(None) => "raise Exception()".to_string(),
            None => format!("raise Exception({})", self.expr(value)),
        }
    }

    /// 计数循环改写成 `for v in range(...)`，其余的改写成 `while`。
    fn for_loop(&self, w: &mut Writer, stmt: &Stmt, scope: &Scope) {
        let Stmt::For { init, cond, update, body } = stmt else {
            return;
        };
        if let Some((name, range)) = self.range_header(stmt, scope) {
            w.line(format!("for {} in {}:", name, range));
            self.suite(w, body, scope);
            return;
        }
        self.stmts(w, init, scope);
        let mut rewritten = update_before_continue(body, update);
        rewritten.extend(update.iter().cloned());
        w.line(format!("while {}:", self.expr(cond)));
        self.suite(w, &rewritten, scope);
    }

    /// `range` 结束后循环变量停在最后一个取到的值上，而计数循环会多走一步。
    /// 所以只有循环变量在循环之外再也没人读写时才能改写。
    fn range_header(&self, stmt: &Stmt, scope: &Scope) -> Option<(String, String)> {
        let Stmt::For { init, cond, update, body } = stmt else {
            return None;
        };
        let [Stmt::Assign { name, value: start } | Stmt::Declare { name, value: Some(start), .. }] = init.as_slice()
        else {
            return None;
        };
        let [Stmt::Assign { name: updated, value: step }] = update.as_slice() else {
            return None;
        };
        if updated != name {
            return None;
        }
        let step = match step {
            Expr::Binary(BinaryOp::Add, l, r) if l.as_var() == Some(name.as_str()) => int_const(r)?,
            Expr::Binary(BinaryOp::Sub, l, r) if l.as_var() == Some(name.as_str()) => -int_const(r)?,
            _ => return None,
        };
        let Expr::Binary(op, l, bound) = cond else {
            return None;
        };
        if l.as_var() != Some(name.as_str()) || bound.contains_call() {
            return None;
        }

        // 循环变量和界限都不能在循环体里被改写
        let written = assigned(body);
        let mut bound_changes = false;
        bound.visit_vars(&mut |var| bound_changes |= written.iter().any(|w| w == var));
        if bound_changes || written.contains(name) {
            return None;
        }
        if scope.globals.contains(name) || mentioned_outside(scope.body, stmt, name) {
            return None;
        }

        let one = Box::new(Expr::Const(Literal::int(1)));
        let end = match (op, step) {
            (BinaryOp::Lt, 1..) | (BinaryOp::Gt, ..=-1) => self.expr(bound),
            (BinaryOp::LtEq, 1..) => match int_const(bound) {
                Some(n) => (n + 1).to_string(),
                None => self.expr(&Expr::Binary(BinaryOp::Add, bound.clone(), one)),
            },
            (BinaryOp::GtEq, ..=-1) => match int_const(bound) {
                Some(n) => (n - 1).to_string(),
                None => self.expr(&Expr::Binary(BinaryOp::Sub, bound.clone(), one)),
            },
            _ => return None,
        };
        let range = if step == 1 {
            format!("range({}, {})", self.expr(start), end)
        } else {
            format!("range({}, {}, {})", self.expr(start), end, step)
        };
        Some((name.clone(), range))
    }

    fn math_call(&self, name: &str, args: &[Expr]) -> String {
        match name {
            "abs" | "max" | "min" | "round" | "pow" => format!("{}({})", name, self.args(args)),
            "random" => {
                self.random.set(true);
                "random.random()".to_string()
            }
            _ => {
                self.math.set(true);
                format!("math.{}({})", name, self.args(args))
            }
        }
    }
}

impl Syntax for PythonEmitter {
    fn env(&self) -> &TypeEnv {
        &self.env
    }

    fn literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Number(n) => n.to_string(),
            Literal::String(s) => quote(s),
            Literal::Boolean(true) => "True".to_string(),
            Literal::Boolean(false) => "False".to_string(),
            Literal::Null => "None".to_string(),
        }
    }

    fn binary_op(&self, op: BinaryOp, _left: &Expr, _right: &Expr) -> &'static str {
        match op {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::StrictEq => "==",
            BinaryOp::StrictNotEq => "!=",
            op => op.symbol(),
        }
    }

    fn unary_op(&self, op: UnaryOp) -> &'static str {
        match op {
            UnaryOp::Not => "not ",
            op => op.symbol(),
        }
    }

    fn unary_precedence(&self, op: UnaryOp) -> u8 {
        match op {
            UnaryOp::Not => 4,
            _ => super::PREC_UNARY,
        }
    }

    // `//` 向下取整，负数时和 C 的截断不同
    fn truncation(&self) -> Option<&'static str> {
        Some("int")
    }

    fn chains_comparisons(&self) -> bool {
        true
    }

    /// 字符串拼接时把数字转换成字符串。
    fn coerce(&self, op: BinaryOp, operand: &Expr, other: &Expr, text: String) -> String {
        let needs_str = op == BinaryOp::Add
            && self.kind(other) == Kind::Str
            && matches!(self.kind(operand), Kind::Int | Kind::Float | Kind::Bool);
        if needs_str {
            format!("str({})", self.expr(operand))
        } else {
            text
        }
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> String {
        if let (Expr::Member(object, member), []) = (callee, args) {
            if member == "length" {
                return format!("len({})", self.expr(object));
            }
        }
        match builtin_call(callee, args) {
            Some(Builtin::Print { args, newline: true }) => format!("print({})", self.args(args)),
            Some(Builtin::Print { args: [], newline: false }) => "print(end=\"\")".to_string(),
            Some(Builtin::Print { args, newline: false }) => format!("print({}, end=\"\")", self.args(args)),
            Some(Builtin::Printf { format, args }) => {
                let (format, newline) = match strip_newline(format) {
                    Some(stripped) => (stripped, true),
                    None => (format.clone(), false),
                };
                let text = match args {
                    [] => self.expr(&format),
                    [single] => format!("{} % ({},)", self.expr(&format), self.expr(single)),
                    many => format!("{} % ({})", self.expr(&format), self.args(many)),
                };
                if newline {
                    format!("print({})", text)
                } else {
                    format!("print({}, end=\"\")", text)
                }
            }
            Some(Builtin::Math { name, args }) => self.math_call(&name, args),
            Some(Builtin::Len(value)) => format!("len({})", self.expr(value)),
            Some(Builtin::ToStr(value)) => format!("str({})", self.expr(value)),
            Some(Builtin::ToInt(value)) => format!("int({})", self.expr(value)),
            Some(Builtin::ToFloat(value)) => format!("float({})", self.expr(value)),
            None => format!("{}({})", self.postfix(callee), self.args(args)),
        }
    }

    fn member(&self, object: &Expr, member: &str) -> String {
        let whole = Expr::Member(Box::new(object.clone()), member.to_string());
        match math_name(&whole).as_deref() {
            Some(name @ ("pi" | "e")) => {
                self.math.set(true);
                format!("math.{}", name)
            }
            _ if member == "length" => format!("len({})", self.expr(object)),
            _ => format!("{}.{}", self.postfix(object), member),
        }
    }
}
