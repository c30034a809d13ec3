// src/ir/generator.rs

use log::debug;

use super::{Instruction, Label, Op, Operand, Temp};
use crate::analyzer::Analysis;
use crate::parser::ast::{Ast, BinaryOp, Literal, NodeId, NodeType, NodeValue};

/// 遍历（已经通过语义分析的）AST，生成有序的 IR 指令列表。
///
/// 表达式按后序求值：先生成操作数，再生成运算指令，
/// 因此每个临时变量在被使用之前都已经存在。
/// 临时变量和标签的计数器只属于这一次生成。
/// 语义分析的旁表决定哪些赋值是隐式声明、哪些除法是整数除法。
pub struct IrGenerator<'a> {
    ast: &'a Ast,
    analysis: &'a Analysis,
    instructions: Vec<Instruction>,
    temp_counter: u32,
    label_counter: u32,
    /// 外围循环的 (起始, 结束) 标签，供 break / continue 使用
    loops: Vec<(Label, Label)>,
}

/// 便捷入口。
pub fn generate(ast: &Ast, analysis: &Analysis) -> Vec<Instruction> {
    IrGenerator::new(ast, analysis).generate()
}

impl<'a> IrGenerator<'a> {
    pub fn new(ast: &'a Ast, analysis: &'a Analysis) -> Self {
        Self {
            ast,
            analysis,
            instructions: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
            loops: Vec::new(),
        }
    }

    pub fn generate(mut self) -> Vec<Instruction> {
        self.statement(self.ast.root());
        debug!(
            "IR generation: {} instructions, {} temporaries, {} labels",
            self.instructions.len(),
            self.temp_counter,
            self.label_counter
        );
        self.instructions
    }

    // --- 分配与发射 ---

    fn new_temp(&mut self) -> Temp {
        let temp = Temp(self.temp_counter);
        self.temp_counter += 1;
        temp
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.label_counter);
        self.label_counter += 1;
        label
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn emit_label(&mut self, label: Label) {
        self.emit(Instruction::new(Op::Label).with_result(Operand::Label(label)));
    }

    fn emit_goto(&mut self, label: Label) {
        self.emit(Instruction::new(Op::Goto).with_result(Operand::Label(label)));
    }

    fn emit_marker(&mut self, op: Op, label: Label) {
        self.emit(Instruction::new(op).with_arg1(Operand::Label(label)));
    }

    /// `DECLARE name [: type]`
    fn emit_declare(&mut self, name: &str, declared_type: Option<&str>) {
        let mut declare = Instruction::new(Op::Declare).with_result(Operand::Var(name.to_string()));
        if let Some(ty) = declared_type {
            declare = declare.with_arg1(Operand::Name(ty.to_string()));
        }
        self.emit(declare);
    }

    // --- 语句 ---

    fn statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let node = ast.node(id);
        match node.node_type {
            NodeType::Program | NodeType::BlockStatement => {
                for &child in &node.children {
                    self.statement(child);
                }
            }
            NodeType::FunctionDeclaration => {
                let name = node.name().unwrap_or_default().to_string();
                let params = node
                    .attributes
                    .params
                    .iter()
                    .map(|p| Operand::Var(p.name.clone()))
                    .collect();
                self.emit(
                    Instruction::new(Op::FuncStart)
                        .with_arg1(Operand::Name(name.clone()))
                        .with_params(params),
                );
                // 函数体内的循环与外层无关
                let outer_loops = std::mem::take(&mut self.loops);
                for &child in &node.children {
                    self.statement(child);
                }
                self.loops = outer_loops;
                self.emit(Instruction::new(Op::FuncEnd).with_arg1(Operand::Name(name)));
            }
            // 初始值先求值（`let x = x` 右侧是外层的 x），再声明，最后赋值
            NodeType::VariableDeclaration => {
                let name = node.name().unwrap_or_default().to_string();
                let value = node.children.first().map(|&init| self.expression(init));
                self.emit_declare(&name, node.attributes.declared_type.as_deref());
                if let Some(value) = value {
                    self.emit(
                        Instruction::new(Op::Assign)
                            .with_arg1(value)
                            .with_result(Operand::Var(name)),
                    );
                }
            }
            NodeType::IfStatement => self.if_statement(id),
            NodeType::WhileStatement => self.while_statement(id),
            NodeType::ForStatement => self.for_statement(id),
            NodeType::TryStatement => self.try_statement(id),
            NodeType::ReturnStatement => {
                let mut ret = Instruction::new(Op::Return);
                if let Some(&value) = node.children.first() {
                    ret = ret.with_arg1(self.expression(value));
                }
                self.emit(ret);
            }
            NodeType::ThrowStatement => {
                let mut throw = Instruction::new(Op::Throw);
                if let Some(&value) = node.children.first() {
                    throw = throw.with_arg1(self.expression(value));
                }
                self.emit(throw);
            }
            NodeType::BreakStatement => {
                if let Some(&(_, end)) = self.loops.last() {
                    self.emit_marker(Op::Break, end);
                }
            }
            NodeType::ContinueStatement => {
                if let Some(&(start, _)) = self.loops.last() {
                    self.emit_marker(Op::Continue, start);
                }
            }
            NodeType::ExpressionStatement => {
                if let Some(&expr) = node.children.first() {
                    self.expression(expr);
                }
            }
            // 表达式出现在语句位置时按表达式处理
            _ => {
                self.expression(id);
            }
        }
    }

    /// `IF_FALSE c, else; A; GOTO end; LABEL else; B; LABEL end`，没有 else 时省略 GOTO 和 B。
    fn if_statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = &ast.node(id).children;
        let cond = self.expression(children[0]);
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.emit(
            Instruction::new(Op::IfFalse)
                .with_arg1(cond)
                .with_result(Operand::Label(else_label)),
        );
        self.statement(children[1]);

        match children.get(2) {
            Some(&alternate) => {
                self.emit_goto(end_label);
                self.emit_label(else_label);
                self.statement(alternate);
                self.emit_label(end_label);
            }
            None => self.emit_label(else_label),
        }
    }

    /// `LABEL start; c; IF_FALSE c, end; B; GOTO start; LABEL end`
    fn while_statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = &ast.node(id).children;
        let start = self.new_label();
        let end = self.new_label();

        self.emit_marker(Op::WhileStart, start);
        self.emit_label(start);
        let cond = self.expression(children[0]);
        self.emit(
            Instruction::new(Op::IfFalse)
                .with_arg1(cond)
                .with_result(Operand::Label(end)),
        );
        self.loops.push((start, end));
        self.statement(children[1]);
        self.loops.pop();
        self.emit_goto(start);
        self.emit_label(end);
        self.emit_marker(Op::WhileEnd, start);
    }

    /// `init; LABEL start; c; IF_FALSE c, end; B; update; GOTO start; LABEL end`
    fn for_statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = &ast.node(id).children;
        let start = self.new_label();
        let end = self.new_label();

        self.emit_marker(Op::ForInit, start);
        self.statement(children[0]);
        self.emit_label(start);
        self.emit_marker(Op::ForCondition, start);
        let cond = self.expression(children[1]);
        self.emit(
            Instruction::new(Op::IfFalse)
                .with_arg1(cond)
                .with_result(Operand::Label(end)),
        );
        self.loops.push((start, end));
        self.statement(children[3]);
        self.loops.pop();
        self.emit_marker(Op::ForUpdate, start);
        self.statement(children[2]);
        self.emit_goto(start);
        self.emit_label(end);
    }

    /// `TRY end; block; CATCH end [e]; handler; FINALLY end; finalizer; LABEL end`
    fn try_statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let node = ast.node(id);
        let attributes = &node.attributes;
        let end = self.new_label();
        let mut children = node.children.iter().copied();

        self.emit_marker(Op::Try, end);
        if let Some(block) = children.next() {
            self.statement(block);
        }
        if attributes.has_handler {
            let mut catch = Instruction::new(Op::Catch).with_arg1(Operand::Label(end));
            if let Some(param) = &attributes.catch_param {
                catch = catch.with_arg2(Operand::Var(param.clone()));
            }
            self.emit(catch);
            if let Some(handler) = children.next() {
                self.statement(handler);
            }
        }
        if attributes.has_finalizer {
            self.emit_marker(Op::Finally, end);
            if let Some(finalizer) = children.next() {
                self.statement(finalizer);
            }
        }
        self.emit_label(end);
    }

    // --- 表达式 ---

    /// 生成表达式，返回保存其值的操作数。
    fn expression(&mut self, id: NodeId) -> Operand {
        let ast = self.ast;
        let node = ast.node(id);
        match node.node_type {
            NodeType::Identifier => Operand::Var(node.name().unwrap_or_default().to_string()),
            NodeType::Literal => {
                let literal = match &node.value {
                    NodeValue::Literal(literal) => literal.clone(),
                    _ => Literal::Null,
                };
                let temp = self.new_temp();
                self.emit(
                    Instruction::new(Op::LoadConst)
                        .with_arg1(Operand::Const(literal))
                        .with_result(Operand::Temp(temp)),
                );
                Operand::Temp(temp)
            }
            NodeType::Assignment => {
                let value = self.expression(node.children[1]);
                let target = ast.node(node.children[0]);
                if target.node_type == NodeType::MemberExpression {
                    let object = self.expression(target.children[0]);
                    let instruction = if target.attributes.computed {
                        let index = self.expression(target.children[1]);
                        Instruction::new(Op::ArraySet).with_arg1(object).with_arg2(index)
                    } else {
                        let property = target.attributes.property.clone().unwrap_or_default();
                        Instruction::new(Op::MemberSet)
                            .with_arg1(object)
                            .with_arg2(Operand::Name(property))
                    };
                    self.emit(instruction.with_result(value.clone()));
                } else {
                    let name = target.name().unwrap_or_default().to_string();
                    if self.analysis.locals.contains(&id) {
                        self.emit_declare(&name, None);
                    }
                    self.emit(
                        Instruction::new(Op::Assign)
                            .with_arg1(value.clone())
                            .with_result(Operand::Var(name)),
                    );
                }
                value
            }
            NodeType::BinaryExpression => {
                let left = self.expression(node.children[0]);
                let right = self.expression(node.children[1]);
                let temp = self.new_temp();
                if let NodeValue::Binary(op) = node.value {
                    let op = match op {
                        BinaryOp::Div if self.analysis.int_divisions.contains(&id) => BinaryOp::IntDiv,
                        op => op,
                    };
                    self.emit(
                        Instruction::new(Op::Binary(op))
                            .with_arg1(left)
                            .with_arg2(right)
                            .with_result(Operand::Temp(temp)),
                    );
                }
                Operand::Temp(temp)
            }
            NodeType::UnaryExpression => {
                let operand = self.expression(node.children[0]);
                let temp = self.new_temp();
                if let NodeValue::Unary(op) = node.value {
                    self.emit(
                        Instruction::new(Op::Unary(op))
                            .with_arg1(operand)
                            .with_result(Operand::Temp(temp)),
                    );
                }
                Operand::Temp(temp)
            }
            NodeType::CallExpression => {
                let callee = self.expression(node.children[0]);
                let args = node.children[1..].iter().map(|&arg| self.expression(arg)).collect();
                let temp = self.new_temp();
                self.emit(
                    Instruction::new(Op::Call)
                        .with_arg1(callee)
                        .with_params(args)
                        .with_result(Operand::Temp(temp)),
                );
                Operand::Temp(temp)
            }
            NodeType::MemberExpression => {
                let object = self.expression(node.children[0]);
                let temp = self.new_temp();
                let instruction = if node.attributes.computed {
                    let index = self.expression(node.children[1]);
                    Instruction::new(Op::ArrayGet).with_arg1(object).with_arg2(index)
                } else {
                    let property = node.attributes.property.clone().unwrap_or_default();
                    Instruction::new(Op::MemberGet)
                        .with_arg1(object)
                        .with_arg2(Operand::Name(property))
                };
                self.emit(instruction.with_result(Operand::Temp(temp)));
                Operand::Temp(temp)
            }
            // 语句不会出现在表达式位置；出现时按语句生成，值为 null
            _ => {
                self.statement(id);
                Operand::Const(Literal::Null)
            }
        }
    }
}
