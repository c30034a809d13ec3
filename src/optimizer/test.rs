use super::*;
use crate::analyzer::Analyzer;
use crate::ir::{self, Label};
use crate::language::Language;
use crate::lexer;
use crate::parser;

fn lower(source: &str) -> Vec<Instruction> {
    let (tokens, _) = lexer::tokenize(source);
    let ast = parser::parse(&tokens, Language::JavaScript).expect("source should parse");
    let analysis = Analyzer::new(Language::JavaScript).analyze(&ast);
    ir::generate(&ast, &analysis)
}

fn text(instructions: &[Instruction]) -> Vec<String> {
    instructions.iter().map(ToString::to_string).collect()
}

fn var(name: &str) -> Operand {
    Operand::Var(name.to_string())
}

fn temp(n: u32) -> Operand {
    Operand::Temp(Temp(n))
}

fn load(n: u32, literal: Literal) -> Instruction {
    Instruction::new(Op::LoadConst)
        .with_arg1(Operand::Const(literal))
        .with_result(temp(n))
}

fn assign(target: Operand, source: Operand) -> Instruction {
    Instruction::new(Op::Assign).with_arg1(source).with_result(target)
}

fn add(n: u32, left: Operand, right: Operand) -> Instruction {
    Instruction::new(Op::Binary(BinaryOp::Add))
        .with_arg1(left)
        .with_arg2(right)
        .with_result(temp(n))
}

// --- 常量折叠 ---

#[test]
fn test_folds_nested_arithmetic_to_one_constant() {
    let optimized = optimize(&lower("let x = 2 + 3 * 4;"));
    assert_eq!(text(&optimized), vec!["t4 = 14", "DECLARE x", "x = t4"]);
    assert_eq!(optimized.iter().filter(|i| i.op == Op::LoadConst).count(), 1);
}

#[test]
fn test_division_by_zero_degrades_to_left_operand() {
    let optimized = optimize(&lower("let x = 7 / 0;"));
    assert_eq!(optimized[0].arg1, Some(Operand::Const(Literal::int(7))));
}

#[test]
fn test_inexact_integer_division_is_left_alone() {
    let optimized = optimize(&lower("let x = 7 / 2;"));
    assert!(optimized.iter().any(|i| i.op == Op::Binary(BinaryOp::Div)));
    let exact = optimize(&lower("let x = 8 / 2;"));
    assert_eq!(exact[0].arg1, Some(Operand::Const(Literal::int(4))));
}

#[test]
fn test_integer_division_folds_toward_zero() {
    let ir = vec![
        load(0, Literal::int(-7)),
        load(1, Literal::int(2)),
        Instruction::new(Op::Binary(BinaryOp::IntDiv))
            .with_arg1(temp(0))
            .with_arg2(temp(1))
            .with_result(temp(2)),
        assign(var("q"), temp(2)),
    ];
    assert_eq!(text(&optimize(&ir)), vec!["t2 = -3", "q = t2"]);
}

#[test]
fn test_float_and_unary_folding() {
    let optimized = optimize(&lower("let x = -1.5 * 2;"));
    assert_eq!(
        optimized[0].arg1,
        Some(Operand::Const(Literal::Number(Number::Float(-3.0))))
    );
}

#[test]
fn test_strings_are_not_folded() {
    let folded = constant_folding(&[
        load(0, Literal::String("a".into())),
        load(1, Literal::int(1)),
        add(2, temp(0), temp(1)),
    ]);
    assert_eq!(folded[2].op, Op::Binary(BinaryOp::Add));
}

// --- 死代码消除 ---

#[test]
fn test_unused_pure_results_are_removed() {
    let ir = vec![load(0, Literal::int(1)), load(1, Literal::int(2)), assign(var("x"), temp(1))];
    assert_eq!(text(&dead_code_elimination(&ir)), vec!["t1 = 2", "x = t1"]);
}

#[test]
fn test_control_and_calls_survive_even_when_unused() {
    let ir = vec![
        Instruction::new(Op::FuncStart).with_arg1(Operand::Name("f".into())),
        Instruction::new(Op::Label).with_result(Operand::Label(Label(0))),
        Instruction::new(Op::Call).with_arg1(var("g")).with_result(temp(0)),
        Instruction::new(Op::IfFalse).with_arg1(var("c")).with_result(Operand::Label(Label(1))),
        Instruction::new(Op::IfTrue).with_arg1(var("c")).with_result(Operand::Label(Label(0))),
        Instruction::new(Op::Goto).with_result(Operand::Label(Label(0))),
        Instruction::new(Op::Label).with_result(Operand::Label(Label(1))),
        Instruction::new(Op::Return),
        Instruction::new(Op::FuncEnd).with_arg1(Operand::Name("f".into())),
    ];
    assert_eq!(optimize(&ir), ir);
}

#[test]
fn test_stores_and_markers_are_kept() {
    let ir = lower("for (let i = 0; i < 3; i++) { obj.n = i; }");
    let optimized = optimize(&ir);
    for op in [Op::ForInit, Op::ForCondition, Op::ForUpdate, Op::MemberSet] {
        assert!(optimized.iter().any(|i| i.op == op), "{} was removed", op);
    }
}

// --- 复写传播 ---

#[test]
fn test_copies_are_propagated_within_a_region() {
    let ir = vec![
        assign(var("b"), var("a")),
        add(0, var("b"), var("b")),
        assign(var("c"), temp(0)),
    ];
    let propagated = copy_propagation(&ir);
    assert_eq!(propagated[1].to_string(), "t0 = a + a");
}

#[test]
fn test_copies_do_not_cross_labels() {
    let ir = vec![
        assign(var("b"), var("a")),
        Instruction::new(Op::Label).with_result(Operand::Label(Label(0))),
        add(0, var("b"), var("b")),
    ];
    assert_eq!(copy_propagation(&ir), ir);
}

#[test]
fn test_writing_the_source_kills_the_copy() {
    let ir = vec![
        assign(var("b"), var("a")),
        load(0, Literal::int(5)),
        assign(var("a"), temp(0)),
        add(1, var("b"), var("b")),
    ];
    assert_eq!(copy_propagation(&ir)[3].to_string(), "t1 = b + b");
}

#[test]
fn test_temporaries_are_not_propagated_into_named_uses() {
    let ir = vec![
        load(0, Literal::int(1)),
        assign(var("x"), temp(0)),
        add(1, var("x"), var("x")),
    ];
    assert_eq!(copy_propagation(&ir), ir);
}

// --- 代数化简 ---

#[test]
fn test_multiply_by_one_collapses_to_a_copy() {
    let optimized = optimize(&lower("let y = x * 1;"));
    assert_eq!(text(&optimized), vec!["y = x"]);
}

#[test]
fn test_multiply_by_zero_becomes_zero() {
    let optimized = optimize(&lower("let y = x * 0;"));
    assert_eq!(text(&optimized), vec!["t1 = 0", "y = t1"]);
}

#[test]
fn test_adding_zero_to_a_string_is_kept() {
    let optimized = optimize(&lower("let s = \"a\";\nlet z = s + 0;"));
    assert!(optimized.iter().any(|i| i.op == Op::Binary(BinaryOp::Add)));

    let numeric = optimize(&lower("let z = n + 0;"));
    assert_eq!(text(&numeric), vec!["z = n"]);
}

// --- 整体性质 ---

#[test]
fn test_optimize_is_idempotent() {
    let sources = [
        "let x = 2 + 3 * 4;",
        "let a = 1; let b = a; let c = b * 1 + 0; console.log(c);",
        "function f(n) { if (n < 2) { return n; } return f(n - 1) + f(n - 2); }",
        "let s = 0; for (let i = 0; i < 10; i++) { if (i % 2 == 0) { continue; } s += i * 1; }",
        "try { risky(); } catch (e) { console.log(e); } finally { done(); }",
    ];
    for source in sources {
        let once = optimize(&lower(source));
        assert_eq!(optimize(&once), once, "not idempotent for: {}", source);
    }
}

#[test]
fn test_empty_input() {
    assert!(optimize(&[]).is_empty());
}
