//! IR 层面的优化。
//!
//! 四个遍按固定顺序执行：常量折叠 → 死代码消除 → 复写传播 → 代数化简。
//! 每个遍都是扁平指令列表上的纯函数，不需要构建控制流图。
//! 整个序列反复执行直到列表不再变化，因此 `optimize` 在不动点上是幂等的。

#[cfg(test)]
mod test;

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::ir::{Instruction, Op, Operand, Temp};
use crate::parser::ast::{BinaryOp, Literal, Number, UnaryOp};

/// 整个遍序列的最大迭代轮数。正常的输入几轮之内就会稳定。
const MAX_ROUNDS: usize = 32;

/// 一个优化遍：输入一段 IR，输出改写后的 IR，不修改输入。
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, instructions: &[Instruction]) -> Vec<Instruction>;
}

pub struct ConstantFolding;
pub struct DeadCodeElimination;
pub struct CopyPropagation;
pub struct AlgebraicSimplification;

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&self, instructions: &[Instruction]) -> Vec<Instruction> {
        constant_folding(instructions)
    }
}

impl Pass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn run(&self, instructions: &[Instruction]) -> Vec<Instruction> {
        dead_code_elimination(instructions)
    }
}

impl Pass for CopyPropagation {
    fn name(&self) -> &'static str {
        "copy-propagation"
    }

    fn run(&self, instructions: &[Instruction]) -> Vec<Instruction> {
        copy_propagation(instructions)
    }
}

impl Pass for AlgebraicSimplification {
    fn name(&self) -> &'static str {
        "algebraic-simplification"
    }

    fn run(&self, instructions: &[Instruction]) -> Vec<Instruction> {
        algebraic_simplification(instructions)
    }
}

/// 固定的遍顺序。
pub fn passes() -> [&'static dyn Pass; 4] {
    [
        &ConstantFolding,
        &DeadCodeElimination,
        &CopyPropagation,
        &AlgebraicSimplification,
    ]
}

/// 优化器入口：重复执行全部遍，直到指令列表不再变化。
pub fn optimize(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut current = instructions.to_vec();
    for round in 1..=MAX_ROUNDS {
        let mut next = current.clone();
        for pass in passes() {
            let before = next.len();
            next = pass.run(&next);
            if next.len() != before {
                debug!("round {}: {} {} -> {} instructions", round, pass.name(), before, next.len());
            }
        }
        if next == current {
            debug!(
                "optimizer reached a fixed point after {} round(s): {} -> {} instructions",
                round,
                instructions.len(),
                current.len()
            );
            return current;
        }
        current = next;
    }
    warn!("optimizer stopped after {} rounds without reaching a fixed point", MAX_ROUNDS);
    current
}

// --- 1. 常量折叠 ---

/// 记录"临时变量 → 已知常量"。临时变量只写一次，所以这张表在整个列表上都成立。
fn known_constants(instructions: &[Instruction]) -> HashMap<Temp, Literal> {
    let mut constants = HashMap::new();
    for instruction in instructions {
        if let (Op::LoadConst, Some(temp), Some(Operand::Const(literal))) =
            (instruction.op, instruction.defined_temp(), &instruction.arg1)
        {
            constants.insert(temp, literal.clone());
        }
    }
    constants
}

fn constant_of<'a>(operand: Option<&'a Operand>, constants: &'a HashMap<Temp, Literal>) -> Option<&'a Literal> {
    match operand? {
        Operand::Const(literal) => Some(literal),
        Operand::Temp(temp) => constants.get(temp),
        _ => None,
    }
}

pub fn constant_folding(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut constants: HashMap<Temp, Literal> = HashMap::new();
    let mut output = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        let folded = match instruction.op {
            Op::Binary(op) => {
                let left = constant_of(instruction.arg1.as_ref(), &constants);
                let right = constant_of(instruction.arg2.as_ref(), &constants);
                match (left, right) {
                    (Some(l), Some(r)) => fold_binary(op, l, r),
                    _ => None,
                }
            }
            Op::Unary(op) => constant_of(instruction.arg1.as_ref(), &constants).and_then(|v| fold_unary(op, v)),
            // 临时变量之间的常量复制
            Op::Assign if instruction.defined_temp().is_some() => {
                constant_of(instruction.arg1.as_ref(), &constants).cloned()
            }
            _ => None,
        };

        let instruction = match (folded, instruction.defined_temp()) {
            (Some(value), Some(temp)) => Instruction::new(Op::LoadConst)
                .with_arg1(Operand::Const(value))
                .with_result(Operand::Temp(temp)),
            _ => instruction.clone(),
        };
        if let (Op::LoadConst, Some(temp), Some(Operand::Const(literal))) =
            (instruction.op, instruction.defined_temp(), &instruction.arg1)
        {
            constants.insert(temp, literal.clone());
        }
        output.push(instruction);
    }
    output
}

/// 两个数值常量的算术运算。
///
/// 除数（或模数）为零时退化为左操作数，保证折叠是全函数。
/// 普通除法在两个整数上只在能整除时折叠，取模只在两边都非负时折叠：
/// 这些情况下各目标语言的结果一致。整数除法按 C/Java 的规则向零截断。
fn fold_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Option<Literal> {
    let (Literal::Number(a), Literal::Number(b)) = (left, right) else {
        return None;
    };
    if !op.is_arithmetic() {
        return None;
    }
    if matches!(op, BinaryOp::Div | BinaryOp::IntDiv | BinaryOp::Mod) && b.as_f64() == 0.0 {
        return Some(left.clone());
    }

    let number = match (*a, *b) {
        (Number::Int(x), Number::Int(y)) => match op {
            BinaryOp::Add => Number::Int(x.checked_add(y)?),
            BinaryOp::Sub => Number::Int(x.checked_sub(y)?),
            BinaryOp::Mul => Number::Int(x.checked_mul(y)?),
            BinaryOp::Div if x.checked_rem(y)? == 0 => Number::Int(x.checked_div(y)?),
            BinaryOp::IntDiv => Number::Int(x.checked_div(y)?),
            BinaryOp::Mod if x >= 0 && y > 0 => Number::Int(x % y),
            _ => return None,
        },
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let value = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                BinaryOp::Mod if x >= 0.0 && y > 0.0 => x % y,
                _ => return None,
            };
            if !value.is_finite() {
                return None;
            }
            Number::Float(value)
        }
    };
    Some(Literal::Number(number))
}

fn fold_unary(op: UnaryOp, value: &Literal) -> Option<Literal> {
    let Literal::Number(n) = value else {
        return None;
    };
    let number = match (op, *n) {
        (UnaryOp::Plus, n) => n,
        (UnaryOp::Neg, Number::Int(i)) => Number::Int(i.checked_neg()?),
        (UnaryOp::Neg, Number::Float(x)) => Number::Float(-x),
        // 各语言的真值规则不同
        (UnaryOp::Not, _) => return None,
    };
    Some(Literal::Number(number))
}

// --- 2. 死代码消除 ---

/// 删除结果是"从未被读取的临时变量"的纯指令。
///
/// 控制流、调用、标记以及对具名变量/成员/数组元素的写入一律保留。
pub fn dead_code_elimination(instructions: &[Instruction]) -> Vec<Instruction> {
    let referenced: HashSet<Temp> = instructions
        .iter()
        .flat_map(|i| i.uses())
        .filter_map(Operand::as_temp)
        .collect();

    instructions
        .iter()
        .filter(|instruction| {
            instruction.op.has_side_effects()
                || instruction
                    .defined_temp()
                    .is_none_or(|temp| referenced.contains(&temp))
        })
        .cloned()
        .collect()
}

// --- 3. 复写传播 ---

/// 可以被复写传播替换的位置。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Temp(Temp),
    Var(String),
}

impl Slot {
    fn of(operand: &Operand) -> Option<Slot> {
        match operand {
            Operand::Temp(t) => Some(Slot::Temp(*t)),
            Operand::Var(name) => Some(Slot::Var(name.clone())),
            _ => None,
        }
    }

    fn is_var(&self) -> bool {
        matches!(self, Slot::Var(_))
    }
}

/// 指令写入的具名变量。
fn written_var(instruction: &Instruction) -> Option<&str> {
    match instruction.op {
        Op::Assign | Op::Declare => instruction.result.as_ref().and_then(Operand::as_var),
        Op::Catch => instruction.arg2.as_ref().and_then(Operand::as_var),
        _ => None,
    }
}

/// 在直线区域内，把 `ASSIGN a, src` 之后对 `a` 的读取替换成 `src`。
///
/// 写入 `a` 或 `src` 时映射失效；`CALL` 可能修改任何具名变量，
/// 所以涉及具名变量的映射在调用处全部失效。
/// 临时变量复制给具名变量（`x = t3`）不传播：临时变量必须保持单次使用。
pub fn copy_propagation(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut copies: HashMap<Slot, Operand> = HashMap::new();
    let mut output = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        let mut instruction = instruction.clone();
        if !copies.is_empty() {
            instruction.map_uses(|operand| Slot::of(operand).and_then(|slot| copies.get(&slot).cloned()));
        }

        if let Some(var) = written_var(&instruction) {
            let var = Slot::Var(var.to_string());
            copies.retain(|target, source| *target != var && Slot::of(source).as_ref() != Some(&var));
        }
        if instruction.op == Op::Call {
            copies.retain(|target, source| !target.is_var() && !Slot::of(source).is_some_and(|s| s.is_var()));
        }
        if instruction.op.ends_region() {
            copies.clear();
        }

        if instruction.op == Op::Assign {
            let target = instruction.result.as_ref().and_then(Slot::of);
            let source = instruction.arg1.as_ref().filter(|s| !matches!(s, Operand::Const(_)));
            if let (Some(target), Some(source)) = (target, source) {
                let temp_into_var = target.is_var() && source.as_temp().is_some();
                let self_copy = Slot::of(source).as_ref() == Some(&target);
                if !temp_into_var && !self_copy {
                    copies.insert(target, source.clone());
                }
            }
        }
        output.push(instruction);
    }
    output
}

// --- 4. 代数化简 ---

/// 已知携带字符串值的临时变量和具名变量，用于判断 `x + 0` 能否化简。
#[derive(Debug, Default)]
struct Strings {
    temps: HashSet<Temp>,
    vars: HashSet<String>,
}

impl Strings {
    fn collect(instructions: &[Instruction]) -> Self {
        let mut strings = Strings::default();
        for instruction in instructions {
            if !matches!(instruction.op, Op::LoadConst | Op::Assign | Op::Binary(BinaryOp::Add)) {
                continue;
            }
            if !instruction.uses().into_iter().any(|operand| strings.contains(operand)) {
                continue;
            }
            match &instruction.result {
                Some(Operand::Temp(t)) => {
                    strings.temps.insert(*t);
                }
                Some(Operand::Var(name)) => {
                    strings.vars.insert(name.clone());
                }
                _ => {}
            }
        }
        strings
    }

    fn contains(&self, operand: &Operand) -> bool {
        match operand {
            Operand::Temp(t) => self.temps.contains(t),
            Operand::Var(name) => self.vars.contains(name),
            Operand::Const(literal) => literal.is_string(),
            _ => false,
        }
    }
}

fn is_number(literal: Option<&Literal>, expected: f64) -> bool {
    matches!(literal, Some(Literal::Number(n)) if n.as_f64() == expected)
}

/// `x + 0 → x`、`x * 1 → x`、`1 * x → x`、`x * 0 → 0`、`0 * x → 0`。
///
/// 结果写成 `ASSIGN`（值是另一个操作数）或 `LOAD_CONST`（值是零）。
pub fn algebraic_simplification(instructions: &[Instruction]) -> Vec<Instruction> {
    let constants = known_constants(instructions);
    let strings = Strings::collect(instructions);

    instructions
        .iter()
        .map(|instruction| {
            let (Op::Binary(op), Some(left), Some(right), Some(temp)) = (
                instruction.op,
                instruction.arg1.as_ref(),
                instruction.arg2.as_ref(),
                instruction.defined_temp(),
            ) else {
                return instruction.clone();
            };
            let (lc, rc) = (constant_of(Some(left), &constants), constant_of(Some(right), &constants));
            let copy = |source: &Operand| {
                Instruction::new(Op::Assign)
                    .with_arg1(source.clone())
                    .with_result(Operand::Temp(temp))
            };
            let zero = |literal: &Literal| {
                Instruction::new(Op::LoadConst)
                    .with_arg1(Operand::Const(literal.clone()))
                    .with_result(Operand::Temp(temp))
            };

            match op {
                BinaryOp::Add if is_number(rc, 0.0) && !strings.contains(left) => copy(left),
                BinaryOp::Mul if is_number(rc, 1.0) => copy(left),
                BinaryOp::Mul if is_number(lc, 1.0) => copy(right),
                BinaryOp::Mul if is_number(rc, 0.0) => rc.map_or_else(|| instruction.clone(), zero),
                BinaryOp::Mul if is_number(lc, 0.0) => lc.map_or_else(|| instruction.clone(), zero),
                _ => instruction.clone(),
            }
        })
        .collect()
}
