use super::*;
use crate::analyzer::Analyzer;
use crate::language::Language;
use crate::lexer;
use crate::parser;
use crate::parser::ast::{BinaryOp, Literal};

/// 辅助函数：词法 + 语法 + 语义分析后生成 IR（不要求分析没有错误）。
fn lower(source: &str, dialect: Language) -> Vec<Instruction> {
    let (tokens, warnings) = lexer::tokenize(source);
    assert!(warnings.is_empty(), "unexpected lexer warnings for: {}", source);
    let ast = parser::parse(&tokens, dialect).expect("source should parse");
    let analysis = Analyzer::new(dialect).analyze(&ast);
    generate(&ast, &analysis)
}

fn text(instructions: &[Instruction]) -> Vec<String> {
    instructions.iter().map(ToString::to_string).collect()
}

fn ops(instructions: &[Instruction]) -> Vec<Op> {
    instructions.iter().map(|i| i.op).collect()
}

fn count(instructions: &[Instruction], op: Op) -> usize {
    instructions.iter().filter(|i| i.op == op).count()
}

// --- 表达式 ---

#[test]
fn test_expression_is_post_order() {
    let ir = lower("2 + 3 * 4;", Language::JavaScript);
    assert_eq!(
        ops(&ir),
        vec![
            Op::LoadConst,
            Op::LoadConst,
            Op::LoadConst,
            Op::Binary(BinaryOp::Mul),
            Op::Binary(BinaryOp::Add),
        ]
    );
    assert_eq!(ir[3].to_string(), "t3 = t1 * t2");
    assert_eq!(ir[4].to_string(), "t4 = t0 + t3");
}

#[test]
fn test_temporaries_are_written_once() {
    let ir = lower("let a = 1 + 2; let b = a * 3; print(a, b);", Language::JavaScript);
    let defined: Vec<Temp> = ir.iter().filter_map(Instruction::defined_temp).collect();
    let mut unique = defined.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(defined.len(), unique.len(), "a temporary was written twice:\n{}", listing(&ir));
    // 编号单调递增
    assert!(defined.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_declaration_and_assignment() {
    let ir = lower("int x;\nint y = 5;", Language::C);
    assert_eq!(ir[0].op, Op::Declare);
    assert_eq!(ir[0].to_string(), "DECLARE x : int");
    assert_eq!(ir.last().map(ToString::to_string), Some("y = t0".to_string()));
}

#[test]
fn test_initialized_declaration_keeps_its_type() {
    let ir = lower("double d = 5;", Language::C);
    assert_eq!(text(&ir), vec!["t0 = 5", "DECLARE d : double", "d = t0"]);
    // 没有类型的声明同样留下 DECLARE
    let ir = lower("let x = 1;", Language::JavaScript);
    assert_eq!(text(&ir), vec!["t0 = 1", "DECLARE x", "x = t0"]);
}

#[test]
fn test_python_function_assignment_declares_a_local() {
    let ir = lower("x = 1\ndef f():\n    x = 2\n    return x\n", Language::Python);
    assert_eq!(count(&ir, Op::Declare), 1);
    let start = ir.iter().position(|i| i.op == Op::FuncStart).expect("FUNC_START");
    let declare = ir.iter().position(|i| i.op == Op::Declare).expect("DECLARE");
    assert!(start < declare);
    assert_eq!(ir[declare].to_string(), "DECLARE x");

    // global 声明的名字写的是全局变量
    let ir = lower("x = 1\ndef f():\n    global x\n    x = 2\n", Language::Python);
    assert_eq!(count(&ir, Op::Declare), 0);
}

#[test]
fn test_typed_integer_division_truncates() {
    let ir = lower("int a = 7;\nint b = a / 2;\ndouble c = a / 2.0;", Language::C);
    assert_eq!(count(&ir, Op::Binary(BinaryOp::IntDiv)), 1);
    assert_eq!(count(&ir, Op::Binary(BinaryOp::Div)), 1);
    // JavaScript 的除法总是浮点除法
    let ir = lower("let a = 7;\nlet b = a / 2;", Language::JavaScript);
    assert_eq!(count(&ir, Op::Binary(BinaryOp::IntDiv)), 0);
}

#[test]
fn test_member_and_array_stores() {
    let ir = lower("obj.a = 1;\narr[0] = 2;", Language::JavaScript);
    let member = ir.iter().find(|i| i.op == Op::MemberSet).expect("MEMBER_SET");
    assert_eq!(member.to_string(), "obj.a = t0");
    let array = ir.iter().find(|i| i.op == Op::ArraySet).expect("ARRAY_SET");
    assert_eq!(array.arg1, Some(Operand::Var("arr".into())));
    assert_eq!(count(&ir, Op::Assign), 0);
    // 存储指令不定义临时变量，但读取它保存的值
    assert_eq!(member.defined_temp(), None);
    assert!(member.uses().contains(&&Operand::Temp(Temp(0))));
}

#[test]
fn test_call_collects_params_in_order() {
    let ir = lower("console.log(1, x);", Language::JavaScript);
    assert_eq!(ir[0].op, Op::MemberGet);
    let call = ir.last().expect("call instruction");
    assert_eq!(call.op, Op::Call);
    assert_eq!(call.arg1, Some(Operand::Temp(Temp(0))));
    assert_eq!(
        call.params,
        vec![Operand::Temp(Temp(1)), Operand::Var("x".into())]
    );
    assert_eq!(call.to_string(), "CALL t0(t1, x) -> t2");
}

// --- 控制流 ---

#[test]
fn test_if_else_lowering() {
    let ir = lower("if (x) { y = 1; } else { y = 2; }", Language::JavaScript);
    assert_eq!(
        text(&ir),
        vec![
            "IF_FALSE x L0",
            "t0 = 1",
            "y = t0",
            "GOTO L1",
            "L0:",
            "t1 = 2",
            "y = t1",
            "L1:",
        ]
    );
}

#[test]
fn test_if_without_else_places_single_label() {
    let ir = lower("if (x) { y = 1; }", Language::JavaScript);
    assert_eq!(count(&ir, Op::Goto), 0);
    assert_eq!(count(&ir, Op::Label), 1);
    assert_eq!(ir.last().map(ToString::to_string), Some("L0:".to_string()));
}

#[test]
fn test_while_lowering() {
    let ir = lower("while (i < 3) { i = i + 1; }", Language::JavaScript);
    assert_eq!(ir[0].op, Op::WhileStart);
    assert_eq!(ir[1].to_string(), "L0:");
    let if_false = ir.iter().find(|i| i.op == Op::IfFalse).expect("IF_FALSE");
    assert_eq!(if_false.result, Some(Operand::Label(Label(1))));
    let tail: Vec<String> = ir[ir.len() - 3..].iter().map(ToString::to_string).collect();
    assert_eq!(tail, vec!["GOTO L0", "L1:", "WHILE_END L0"]);
}

#[test]
fn test_for_lowering_emits_body_before_update() {
    let ir = lower("for (i = 0; i < 3; i = i + 1) { print(i) }", Language::JavaScript);
    assert_eq!(count(&ir, Op::Label), 2);
    let gotos: Vec<&Instruction> = ir.iter().filter(|i| i.op == Op::Goto).collect();
    assert_eq!(gotos.len(), 1);
    assert_eq!(gotos[0].result, Some(Operand::Label(Label(0))));

    let call = ir.iter().position(|i| i.op == Op::Call).expect("CALL");
    let update = ir.iter().position(|i| i.op == Op::ForUpdate).expect("FOR_UPDATE");
    let condition = ir.iter().position(|i| i.op == Op::ForCondition).expect("FOR_CONDITION");
    let init = ir.iter().position(|i| i.op == Op::ForInit).expect("FOR_INIT");
    assert!(init < condition && condition < call && call < update);
    assert_eq!(ir.last().map(ToString::to_string), Some("L1:".to_string()));
}

#[test]
fn test_break_and_continue_target_innermost_loop() {
    let source = "while (a) { while (b) { break; } continue; }";
    let ir = lower(source, Language::JavaScript);
    let brk = ir.iter().find(|i| i.op == Op::Break).expect("BREAK");
    // 内层循环的标签是 L2/L3
    assert_eq!(brk.arg1, Some(Operand::Label(Label(3))));
    let cont = ir.iter().find(|i| i.op == Op::Continue).expect("CONTINUE");
    assert_eq!(cont.arg1, Some(Operand::Label(Label(0))));
}

#[test]
fn test_function_brackets_body() {
    let ir = lower("function add(a, b) { return a + b; }", Language::JavaScript);
    assert_eq!(ir[0].to_string(), "FUNC_START add(a, b)");
    assert_eq!(ir[1].op, Op::Binary(BinaryOp::Add));
    assert_eq!(ir[2].op, Op::Return);
    assert_eq!(ir[2].arg1, Some(Operand::Temp(Temp(0))));
    assert_eq!(ir[3].op, Op::FuncEnd);
}

#[test]
fn test_try_catch_finally_markers() {
    let source = "try { risky(); } catch (e) { print(e); } finally { done(); }";
    let ir = lower(source, Language::JavaScript);
    assert_eq!(ir[0].to_string(), "TRY L0");
    let catch = ir.iter().find(|i| i.op == Op::Catch).expect("CATCH");
    assert_eq!(catch.to_string(), "CATCH e L0");
    assert_eq!(count(&ir, Op::Finally), 1);
    assert_eq!(ir.last().map(ToString::to_string), Some("L0:".to_string()));
}

#[test]
fn test_throw_carries_value() {
    let ir = lower("throw \"bad\";", Language::JavaScript);
    assert_eq!(ir[0].arg1, Some(Operand::Const(Literal::String("bad".into()))));
    assert_eq!(ir[1].to_string(), "THROW t0");
}

// --- 数据模型 ---

#[test]
fn test_side_effect_classification() {
    for op in [Op::Call, Op::Return, Op::Label, Op::Goto, Op::IfFalse, Op::IfTrue, Op::FuncStart, Op::FuncEnd] {
        assert!(op.has_side_effects(), "{} must be retained", op);
    }
    assert!(!Op::LoadConst.has_side_effects());
    assert!(!Op::Binary(BinaryOp::Add).has_side_effects());
    assert!(!Op::MemberGet.has_side_effects());
    assert!(Op::ForInit.is_marker() && !Op::Label.is_marker());
}

#[test]
fn test_generation_is_deterministic() {
    let source = "let s = 0;\nfor (let i = 0; i < 10; i++) { if (i % 2 == 0) { s += i; } }\nconsole.log(s);";
    assert_eq!(
        lower(source, Language::JavaScript),
        lower(source, Language::JavaScript)
    );
}
