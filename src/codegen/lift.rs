//! 把扁平的三地址 IR 重新"提升"成结构化的语句树，供各个目标语言的生成器使用。
//!
//! IR 生成器以固定的形状降低控制流（见 `ir::generator`），这里按同样的形状
//! 把 `LABEL` / `GOTO` / `IF_FALSE` 以及循环、异常标记还原成 if / while / for / try。
//! 只被使用一次的临时变量被内联回表达式；被多次使用的临时变量保留为一次性的局部定义。
//! 认不出的形状原样保留成 `Label` / `Goto` / `Unknown`，由各生成器决定如何呈现。

use std::collections::HashMap;

use log::debug;

use crate::ir::{Instruction, Label, Op, Operand, Temp};
use crate::parser::ast::{BinaryOp, Literal, UnaryOp};

// --- 1. 结构化的表示 ---

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(String),
    /// 被多次使用、没有内联的临时变量
    Temp(Temp),
    Const(Literal),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
}

impl Expr {
    pub fn contains_call(&self) -> bool {
        match self {
            Expr::Call(..) => true,
            Expr::Binary(_, l, r) | Expr::Index(l, r) => l.contains_call() || r.contains_call(),
            Expr::Unary(_, e) | Expr::Member(e, _) => e.contains_call(),
            _ => false,
        }
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var(name) => Some(name),
            _ => None,
        }
    }

    /// `a.b.c` 形式的点路径，用于识别内建调用。
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Var(name) => Some(name.clone()),
            Expr::Member(object, member) => Some(format!("{}.{}", object.dotted_path()?, member)),
            _ => None,
        }
    }

    /// 按求值顺序访问表达式中出现的每个具名变量。
    pub fn visit_vars(&self, f: &mut dyn FnMut(&str)) {
        match self {
            Expr::Var(name) => f(name),
            Expr::Binary(_, l, r) | Expr::Index(l, r) => {
                l.visit_vars(f);
                r.visit_vars(f);
            }
            Expr::Unary(_, e) | Expr::Member(e, _) => e.visit_vars(f),
            Expr::Call(callee, args) => {
                callee.visit_vars(f);
                for arg in args {
                    arg.visit_vars(f);
                }
            }
            Expr::Temp(_) | Expr::Const(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// 变量声明；紧跟其后的初始赋值合并进 `value`
    Declare {
        name: String,
        declared_type: Option<String>,
        value: Option<Expr>,
    },
    Assign { name: String, value: Expr },
    /// 多次使用的临时变量的定义
    Let { temp: Temp, value: Expr },
    /// `obj.name = v` 或 `obj[i] = v`
    Store { target: Expr, value: Expr },
    Expr(Expr),
    If { cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>> },
    While { cond: Expr, body: Vec<Stmt> },
    For { init: Vec<Stmt>, cond: Expr, update: Vec<Stmt>, body: Vec<Stmt> },
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        handler: Option<(Option<String>, Vec<Stmt>)>,
        finalizer: Option<Vec<Stmt>>,
    },
    Label(Label),
    Goto(Label),
    /// 没有被识别的 IR 指令，保留其文本
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// 提升后的程序：所有函数（包括嵌套定义的，按出现顺序展平）以及顶层语句。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
    pub top_level: Vec<Stmt>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// 按源顺序访问语句树中的每条语句（深度优先）。
pub fn walk(stmts: &[Stmt], f: &mut dyn FnMut(&Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::If { then, otherwise, .. } => {
                walk(then, f);
                if let Some(otherwise) = otherwise {
                    walk(otherwise, f);
                }
            }
            Stmt::While { body, .. } => walk(body, f),
            Stmt::For { init, update, body, .. } => {
                walk(init, f);
                walk(body, f);
                walk(update, f);
            }
            Stmt::Try { body, handler, finalizer } => {
                walk(body, f);
                if let Some((_, handler)) = handler {
                    walk(handler, f);
                }
                if let Some(finalizer) = finalizer {
                    walk(finalizer, f);
                }
            }
            _ => {}
        }
    }
}

/// 访问一条语句直接包含的表达式（不进入子语句）。
pub fn stmt_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Assign { value, .. } | Stmt::Let { value, .. } | Stmt::Expr(value) => vec![value],
        Stmt::Declare { value: Some(value), .. } => vec![value],
        Stmt::Store { target, value } => vec![target, value],
        Stmt::If { cond, .. } | Stmt::While { cond, .. } | Stmt::For { cond, .. } => vec![cond],
        Stmt::Return(Some(value)) | Stmt::Throw(Some(value)) => vec![value],
        _ => vec![],
    }
}

// --- 2. 提升过程 ---

/// 块的结束条件。
#[derive(Debug, Clone, Copy)]
enum Stop {
    Label(Label),
    /// `GOTO label`
    GotoTo(Label),
    /// `GOTO _; LABEL label`：if 的 then 分支结束、else 分支开始
    ElseJump(Label),
    /// 带有指定标签参数的结构标记
    Marker(Op, Label),
    FuncEnd,
}

struct Lifter<'a> {
    ir: &'a [Instruction],
    pos: usize,
    uses: HashMap<Temp, usize>,
    pending: HashMap<Temp, Expr>,
    functions: Vec<Function>,
}

/// 提升入口。对任何指令列表都会给出结果。
pub fn lift(ir: &[Instruction]) -> Program {
    let mut uses = HashMap::new();
    for instruction in ir {
        for temp in instruction.uses().into_iter().filter_map(Operand::as_temp) {
            *uses.entry(temp).or_insert(0) += 1;
        }
    }
    let mut lifter = Lifter {
        ir,
        pos: 0,
        uses,
        pending: HashMap::new(),
        functions: Vec::new(),
    };
    let top_level = lifter.block(&[]);
    debug!(
        "lifted {} instructions into {} functions and {} top-level statements",
        ir.len(),
        lifter.functions.len(),
        top_level.len()
    );
    Program {
        functions: lifter.functions,
        top_level,
    }
}

fn label_of(operand: &Option<Operand>) -> Option<Label> {
    operand.as_ref().and_then(Operand::as_label)
}

impl Lifter<'_> {
    fn peek(&self) -> Option<&Instruction> {
        self.ir.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Instruction> {
        self.ir.get(self.pos + offset)
    }

    /// 当前指令满足 `op` 且标签参数为 `label` 时消费它。
    fn eat(&mut self, op: Op, label: Label) -> bool {
        let matched = self.peek().is_some_and(|i| {
            i.op == op
                && match op {
                    Op::Label | Op::Goto => label_of(&i.result) == Some(label),
                    _ => label_of(&i.arg1) == Some(label),
                }
        });
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn at_stop(&self, stops: &[Stop]) -> bool {
        let Some(current) = self.peek() else {
            return true;
        };
        stops.iter().any(|stop| match *stop {
            Stop::Label(label) => current.op == Op::Label && label_of(&current.result) == Some(label),
            Stop::GotoTo(label) => current.op == Op::Goto && label_of(&current.result) == Some(label),
            Stop::ElseJump(label) => {
                current.op == Op::Goto
                    && self
                        .peek_at(1)
                        .is_some_and(|next| next.op == Op::Label && label_of(&next.result) == Some(label))
            }
            Stop::Marker(op, label) => current.op == op && label_of(&current.arg1) == Some(label),
            Stop::FuncEnd => current.op == Op::FuncEnd,
        })
    }

    fn block(&mut self, stops: &[Stop]) -> Vec<Stmt> {
        let mut out = Vec::new();
        while !self.at_stop(stops) {
            self.statement(&mut out);
        }
        out
    }

    fn operand(&mut self, operand: &Option<Operand>) -> Expr {
        match operand {
            Some(Operand::Temp(t)) => self.pending.remove(t).unwrap_or(Expr::Temp(*t)),
            Some(Operand::Var(name)) | Some(Operand::Name(name)) => Expr::Var(name.clone()),
            Some(Operand::Const(literal)) => Expr::Const(literal.clone()),
            Some(Operand::Label(label)) => Expr::Var(label.to_string()),
            None => Expr::Const(Literal::Null),
        }
    }

    /// 记录临时变量的定义：单次使用的挂起等待内联，多次使用的成为 `Let`。
    fn define(&mut self, temp: Option<Temp>, value: Expr, out: &mut Vec<Stmt>) {
        let Some(temp) = temp else {
            out.push(Stmt::Expr(value));
            return;
        };
        match self.uses.get(&temp).copied().unwrap_or(0) {
            0 if value.contains_call() => out.push(Stmt::Expr(value)),
            // 没有副作用又没人读取
            0 => {}
            1 => {
                self.pending.insert(temp, value);
            }
            _ => out.push(Stmt::Let { temp, value }),
        }
    }

    fn statement(&mut self, out: &mut Vec<Stmt>) {
        let ir = self.ir;
        let instruction = &ir[self.pos];
        let temp = instruction.defined_temp();
        self.pos += 1;

        match instruction.op {
            Op::LoadConst | Op::Assign if temp.is_some() => {
                let value = self.operand(&instruction.arg1);
                self.define(temp, value, out);
            }
            Op::Assign => {
                let value = self.operand(&instruction.arg1);
                match &instruction.result {
                    Some(Operand::Var(name)) => out.push(Stmt::Assign { name: name.clone(), value }),
                    _ => out.push(Stmt::Unknown(instruction.to_string())),
                }
            }
            Op::LoadConst => out.push(Stmt::Unknown(instruction.to_string())),
            Op::Declare => match &instruction.result {
                Some(Operand::Var(name)) => {
                    let initializes = |next: &Instruction| {
                        next.op == Op::Assign
                            && next.defined_temp().is_none()
                            && next.result.as_ref().and_then(Operand::as_var) == Some(name.as_str())
                    };
                    let value = match ir.get(self.pos) {
                        Some(next) if initializes(next) => {
                            self.pos += 1;
                            Some(self.operand(&next.arg1))
                        }
                        _ => None,
                    };
                    out.push(Stmt::Declare {
                        name: name.clone(),
                        declared_type: instruction.arg1.as_ref().and_then(Operand::as_name).map(str::to_string),
                        value,
                    });
                }
                _ => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::Binary(op) => {
                let left = self.operand(&instruction.arg1);
                let right = self.operand(&instruction.arg2);
                self.define(temp, Expr::Binary(op, Box::new(left), Box::new(right)), out);
            }
            Op::Unary(op) => {
                let value = self.operand(&instruction.arg1);
                self.define(temp, Expr::Unary(op, Box::new(value)), out);
            }
            Op::MemberGet => {
                let object = self.operand(&instruction.arg1);
                let member = instruction.arg2.as_ref().map(ToString::to_string).unwrap_or_default();
                self.define(temp, Expr::Member(Box::new(object), member), out);
            }
            Op::ArrayGet => {
                let object = self.operand(&instruction.arg1);
                let index = self.operand(&instruction.arg2);
                self.define(temp, Expr::Index(Box::new(object), Box::new(index)), out);
            }
            Op::MemberSet => {
                let value = self.operand(&instruction.result);
                let object = self.operand(&instruction.arg1);
                let member = instruction.arg2.as_ref().map(ToString::to_string).unwrap_or_default();
                out.push(Stmt::Store {
                    target: Expr::Member(Box::new(object), member),
                    value,
                });
            }
            Op::ArraySet => {
                let value = self.operand(&instruction.result);
                let object = self.operand(&instruction.arg1);
                let index = self.operand(&instruction.arg2);
                out.push(Stmt::Store {
                    target: Expr::Index(Box::new(object), Box::new(index)),
                    value,
                });
            }
            Op::Call => {
                let callee = self.operand(&instruction.arg1);
                let args = instruction.params.iter().map(|p| self.operand(&Some(p.clone()))).collect();
                let call = Expr::Call(Box::new(callee), args);
                if temp.is_some() {
                    self.define(temp, call, out);
                } else {
                    out.push(Stmt::Expr(call));
                }
            }
            Op::FuncStart => self.function(instruction),
            Op::IfFalse => match label_of(&instruction.result) {
                Some(else_label) => {
                    let cond = self.operand(&instruction.arg1);
                    out.push(self.if_statement(cond, else_label));
                }
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::IfTrue => {
                let cond = self.operand(&instruction.arg1);
                let then = match label_of(&instruction.result) {
                    Some(label) => vec![Stmt::Goto(label)],
                    None => vec![Stmt::Unknown(instruction.to_string())],
                };
                out.push(Stmt::If { cond, then, otherwise: None });
            }
            Op::WhileStart => match label_of(&instruction.arg1) {
                Some(start) => self.while_loop(start, out),
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::ForInit => match label_of(&instruction.arg1) {
                Some(start) => self.for_loop(start, out),
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::Try => match label_of(&instruction.arg1) {
                Some(end) => out.push(self.try_statement(end)),
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::Return => {
                let value = instruction.arg1.is_some().then(|| self.operand(&instruction.arg1));
                out.push(Stmt::Return(value));
            }
            Op::Throw => {
                let value = instruction.arg1.is_some().then(|| self.operand(&instruction.arg1));
                out.push(Stmt::Throw(value));
            }
            Op::Break => out.push(Stmt::Break),
            Op::Continue => out.push(Stmt::Continue),
            Op::Label => match label_of(&instruction.result) {
                Some(label) => out.push(Stmt::Label(label)),
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::Goto => match label_of(&instruction.result) {
                Some(label) => out.push(Stmt::Goto(label)),
                None => out.push(Stmt::Unknown(instruction.to_string())),
            },
            Op::FuncEnd
            | Op::WhileEnd
            | Op::ForCondition
            | Op::ForUpdate
            | Op::Catch
            | Op::Finally => out.push(Stmt::Unknown(instruction.to_string())),
        }
    }

    fn function(&mut self, start: &Instruction) {
        let name = start.arg1.as_ref().map(ToString::to_string).unwrap_or_default();
        let params = start.params.iter().map(ToString::to_string).collect();
        let body = self.block(&[Stop::FuncEnd]);
        if self.peek().is_some_and(|i| i.op == Op::FuncEnd) {
            self.pos += 1;
        }
        self.functions.push(Function { name, params, body });
    }

    fn if_statement(&mut self, cond: Expr, else_label: Label) -> Stmt {
        let then = self.block(&[Stop::Label(else_label), Stop::ElseJump(else_label)]);
        let jump = self.peek().filter(|i| i.op == Op::Goto).and_then(|i| label_of(&i.result));
        match jump {
            Some(end_label) => {
                // GOTO end; LABEL else
                self.pos += 2;
                let otherwise = self.block(&[Stop::Label(end_label)]);
                self.eat(Op::Label, end_label);
                Stmt::If { cond, then, otherwise: Some(otherwise) }
            }
            None => {
                self.eat(Op::Label, else_label);
                Stmt::If { cond, then, otherwise: None }
            }
        }
    }

    /// 读取循环条件：`IF_FALSE c, end` 之前的指令。
    ///
    /// 条件若需要先执行语句（被多次使用的临时变量），一并返回这些语句，
    /// 调用方把循环改写成 `while (true) { pre; if (!c) break; ... }`。
    /// 形状不对时返回已经读到的语句。
    fn loop_condition(&mut self) -> Result<(Vec<Stmt>, Expr, Label), Vec<Stmt>> {
        let mut pre = Vec::new();
        loop {
            let Some(current) = self.peek() else {
                return Err(pre);
            };
            if current.op == Op::IfFalse {
                break;
            }
            if current.op.ends_region() {
                return Err(pre);
            }
            self.statement(&mut pre);
        }
        let ir = self.ir;
        let if_false = &ir[self.pos];
        let Some(end) = label_of(&if_false.result) else {
            return Err(pre);
        };
        self.pos += 1;
        let cond = self.operand(&if_false.arg1);
        Ok((pre, cond, end))
    }

    fn guard(pre: Vec<Stmt>, cond: Expr, body: Vec<Stmt>) -> (Expr, Vec<Stmt>) {
        if pre.is_empty() {
            return (cond, body);
        }
        let mut guarded = pre;
        guarded.push(Stmt::If {
            cond: Expr::Unary(UnaryOp::Not, Box::new(cond)),
            then: vec![Stmt::Break],
            otherwise: None,
        });
        guarded.extend(body);
        (Expr::Const(Literal::Boolean(true)), guarded)
    }

    fn while_loop(&mut self, start: Label, out: &mut Vec<Stmt>) {
        self.eat(Op::Label, start);
        let (pre, cond, end) = match self.loop_condition() {
            Ok(parts) => parts,
            Err(pre) => {
                out.push(Stmt::Label(start));
                out.extend(pre);
                return;
            }
        };
        let body = self.block(&[Stop::GotoTo(start)]);
        self.eat(Op::Goto, start);
        self.eat(Op::Label, end);
        self.eat(Op::WhileEnd, start);
        let (cond, body) = Self::guard(pre, cond, body);
        out.push(Stmt::While { cond, body });
    }

    fn for_loop(&mut self, start: Label, out: &mut Vec<Stmt>) {
        let init = self.block(&[Stop::Label(start)]);
        self.eat(Op::Label, start);
        self.eat(Op::ForCondition, start);
        let (pre, cond, end) = match self.loop_condition() {
            Ok(parts) => parts,
            Err(pre) => {
                out.extend(init);
                out.push(Stmt::Label(start));
                out.extend(pre);
                return;
            }
        };
        let body = self.block(&[Stop::Marker(Op::ForUpdate, start), Stop::GotoTo(start)]);
        self.eat(Op::ForUpdate, start);
        let update = self.block(&[Stop::GotoTo(start)]);
        self.eat(Op::Goto, start);
        self.eat(Op::Label, end);
        let (cond, body) = Self::guard(pre, cond, body);
        out.push(Stmt::For { init, cond, update, body });
    }

    fn try_statement(&mut self, end: Label) -> Stmt {
        let body = self.block(&[
            Stop::Marker(Op::Catch, end),
            Stop::Marker(Op::Finally, end),
            Stop::Label(end),
        ]);
        let mut handler = None;
        if let Some(catch) = self.peek().filter(|i| i.op == Op::Catch) {
            let param = catch.arg2.as_ref().and_then(Operand::as_var).map(str::to_string);
            self.pos += 1;
            let stmts = self.block(&[Stop::Marker(Op::Finally, end), Stop::Label(end)]);
            handler = Some((param, stmts));
        }
        let mut finalizer = None;
        if self.eat(Op::Finally, end) {
            finalizer = Some(self.block(&[Stop::Label(end)]));
        }
        self.eat(Op::Label, end);
        Stmt::Try { body, handler, finalizer }
    }
}
