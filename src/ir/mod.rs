//! 三地址中间表示。
//!
//! IR 是一个扁平、有序的指令列表，没有显式的基本块：`LABEL` 标记跳转目标，
//! `GOTO` / `IF_FALSE` / `IF_TRUE` 是仅有的非局部控制转移。
//! 临时变量 `tN` 只会在产生它的那条指令里被写入一次。

mod generator;
#[cfg(test)]
mod test;

use std::fmt;

use crate::parser::ast::{BinaryOp, Literal, UnaryOp};

pub use generator::{generate, IrGenerator};

// --- 1. 操作数 ---

/// 编译器生成的一次性临时变量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Temp(Temp),
    /// 源程序里的具名变量
    Var(String),
    Const(Literal),
    Label(Label),
    /// 不参与数据流的名字：函数名、成员名、类型名
    Name(String),
}

impl Operand {
    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Operand::Temp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<Label> {
        match self {
            Operand::Label(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Literal> {
        match self {
            Operand::Const(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Operand::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(t) => write!(f, "{}", t),
            Operand::Var(name) | Operand::Name(name) => f.write_str(name),
            Operand::Const(literal) => write!(f, "{}", literal),
            Operand::Label(label) => write!(f, "{}", label),
        }
    }
}

// --- 2. 操作码 ---

/// 封闭的操作码集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    LoadConst,
    Declare,
    Assign,
    Binary(BinaryOp),
    Unary(UnaryOp),
    MemberGet,
    MemberSet,
    ArrayGet,
    ArraySet,
    Call,
    FuncStart,
    FuncEnd,
    Label,
    Goto,
    IfFalse,
    IfTrue,
    Return,
    ForInit,
    ForCondition,
    ForUpdate,
    WhileStart,
    WhileEnd,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::LoadConst => "LOAD_CONST",
            Op::Declare => "DECLARE",
            Op::Assign => "ASSIGN",
            Op::Binary(op) => op.symbol(),
            Op::Unary(op) => op.symbol(),
            Op::MemberGet => "MEMBER_GET",
            Op::MemberSet => "MEMBER_SET",
            Op::ArrayGet => "ARRAY_GET",
            Op::ArraySet => "ARRAY_SET",
            Op::Call => "CALL",
            Op::FuncStart => "FUNC_START",
            Op::FuncEnd => "FUNC_END",
            Op::Label => "LABEL",
            Op::Goto => "GOTO",
            Op::IfFalse => "IF_FALSE",
            Op::IfTrue => "IF_TRUE",
            Op::Return => "RETURN",
            Op::ForInit => "FOR_INIT",
            Op::ForCondition => "FOR_CONDITION",
            Op::ForUpdate => "FOR_UPDATE",
            Op::WhileStart => "WHILE_START",
            Op::WhileEnd => "WHILE_END",
            Op::Break => "BREAK",
            Op::Continue => "CONTINUE",
            Op::Try => "TRY",
            Op::Catch => "CATCH",
            Op::Finally => "FINALLY",
            Op::Throw => "THROW",
        }
    }

    /// 结构标记：只描述源程序的结构，不产生值，优化器不会动它们。
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            Op::ForInit
                | Op::ForCondition
                | Op::ForUpdate
                | Op::WhileStart
                | Op::WhileEnd
                | Op::Try
                | Op::Catch
                | Op::Finally
        )
    }

    /// 无论结果是否被使用都必须保留的指令。
    ///
    /// `ASSIGN` 不在其中：写具名变量的 `ASSIGN` 不定义临时变量，本来就不会被当成死代码。
    pub fn has_side_effects(self) -> bool {
        self.is_marker()
            || matches!(
                self,
                Op::Call
                    | Op::Return
                    | Op::Label
                    | Op::Goto
                    | Op::IfFalse
                    | Op::IfTrue
                    | Op::FuncStart
                    | Op::FuncEnd
                    | Op::Break
                    | Op::Continue
                    | Op::Throw
                    | Op::Declare
                    | Op::MemberSet
                    | Op::ArraySet
            )
    }

    /// 直线区域的边界：复写传播在这里清空已知的映射。
    pub fn ends_region(self) -> bool {
        self.is_marker()
            || matches!(
                self,
                Op::Label
                    | Op::Goto
                    | Op::IfFalse
                    | Op::IfTrue
                    | Op::FuncStart
                    | Op::FuncEnd
                    | Op::Break
                    | Op::Continue
                    | Op::Return
                    | Op::Throw
            )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- 3. 指令 ---

/// 一条三地址指令：`{ op, arg1, arg2, result, params }`。
///
/// 各操作码的字段约定：
/// - `LOAD_CONST`: arg1 = 常量, result = 临时变量
/// - `DECLARE`: result = 变量, arg1 = 声明类型名（可选）
/// - `ASSIGN`: arg1 = 源, result = 变量
/// - 二元/一元运算: arg1 (, arg2), result = 临时变量
/// - `MEMBER_GET` / `ARRAY_GET`: arg1 = 对象, arg2 = 成员名 / 下标, result = 临时变量
/// - `MEMBER_SET` / `ARRAY_SET`: arg1 = 对象, arg2 = 成员名 / 下标, result = 被写入的值
/// - `CALL`: arg1 = 被调用者, params = 实参, result = 临时变量
/// - `FUNC_START` / `FUNC_END`: arg1 = 函数名, params = 形参
/// - `LABEL` / `GOTO`: result = 标签；`IF_FALSE` / `IF_TRUE`: arg1 = 条件, result = 标签
/// - 循环标记与 `BREAK` / `CONTINUE`: arg1 = 循环起始标签（`BREAK` 为结束标签）
/// - `TRY` / `CATCH` / `FINALLY`: arg1 = 收尾标签, `CATCH` 的 arg2 = 绑定的变量
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
    pub params: Vec<Operand>,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            arg1: None,
            arg2: None,
            result: None,
            params: Vec::new(),
        }
    }

    pub fn with_arg1(mut self, operand: Operand) -> Self {
        self.arg1 = Some(operand);
        self
    }

    pub fn with_arg2(mut self, operand: Operand) -> Self {
        self.arg2 = Some(operand);
        self
    }

    pub fn with_result(mut self, operand: Operand) -> Self {
        self.result = Some(operand);
        self
    }

    pub fn with_params(mut self, params: Vec<Operand>) -> Self {
        self.params = params;
        self
    }

    /// 该指令写入的临时变量。
    pub fn defined_temp(&self) -> Option<Temp> {
        match self.op {
            Op::MemberSet | Op::ArraySet => None,
            _ => self.result.as_ref().and_then(Operand::as_temp),
        }
    }

    /// 该指令读取的所有操作数（按求值顺序）。结构标记不读取任何值。
    pub fn uses(&self) -> Vec<&Operand> {
        let mut operands: Vec<&Operand> = Vec::new();
        if self.op.is_marker() {
            return operands;
        }
        operands.extend(self.arg1.iter());
        operands.extend(self.arg2.iter());
        if matches!(self.op, Op::MemberSet | Op::ArraySet) {
            operands.extend(self.result.iter());
        }
        if self.op == Op::Call {
            operands.extend(self.params.iter());
        }
        operands
    }

    /// 对该指令读取的每个操作数应用 `f`（写入位置不受影响）。
    pub fn map_uses(&mut self, mut f: impl FnMut(&Operand) -> Option<Operand>) {
        if self.op.is_marker() {
            return;
        }
        let is_store = matches!(self.op, Op::MemberSet | Op::ArraySet);
        let is_call = self.op == Op::Call;
        let slots = [Some(&mut self.arg1), Some(&mut self.arg2), is_store.then_some(&mut self.result)];
        for slot in slots.into_iter().flatten() {
            if let Some(operand) = slot.as_ref() {
                if let Some(replacement) = f(operand) {
                    *slot = Some(replacement);
                }
            }
        }
        if is_call {
            for param in &mut self.params {
                if let Some(replacement) = f(param) {
                    *param = replacement;
                }
            }
        }
    }
}

fn opt(operand: &Option<Operand>) -> String {
    operand.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn join(operands: &[Operand]) -> String {
    operands.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b, r) = (opt(&self.arg1), opt(&self.arg2), opt(&self.result));
        match self.op {
            Op::LoadConst | Op::Assign => write!(f, "{} = {}", r, a),
            Op::Declare if self.arg1.is_some() => write!(f, "DECLARE {} : {}", r, a),
            Op::Declare => write!(f, "DECLARE {}", r),
            Op::Binary(op) => write!(f, "{} = {} {} {}", r, a, op, b),
            Op::Unary(op) => write!(f, "{} = {}{}", r, op, a),
            Op::MemberGet => write!(f, "{} = {}.{}", r, a, b),
            Op::MemberSet => write!(f, "{}.{} = {}", a, b, r),
            Op::ArrayGet => write!(f, "{} = {}[{}]", r, a, b),
            Op::ArraySet => write!(f, "{}[{}] = {}", a, b, r),
            Op::Call => write!(f, "CALL {}({}) -> {}", a, join(&self.params), r),
            Op::FuncStart => write!(f, "FUNC_START {}({})", a, join(&self.params)),
            Op::Label => write!(f, "{}:", r),
            Op::Goto => write!(f, "GOTO {}", r),
            Op::IfFalse | Op::IfTrue => write!(f, "{} {} {}", self.op, a, r),
            Op::Catch if self.arg2.is_some() => write!(f, "CATCH {} {}", b, a),
            _ => {
                write!(f, "{}", self.op)?;
                for operand in [&self.arg1, &self.arg2, &self.result].into_iter().flatten() {
                    write!(f, " {}", operand)?;
                }
                Ok(())
            }
        }
    }
}

/// 把一段 IR 渲染成每行一条指令的文本。
pub fn listing(instructions: &[Instruction]) -> String {
    instructions.iter().map(|i| format!("{}\n", i)).collect()
}
