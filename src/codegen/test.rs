// In src/codegen/test.rs

use super::lift::{lift, Expr, Stmt};
use super::*;
use crate::analyzer::Analyzer;
use crate::ir::{self, Op, Operand, Temp};
use crate::lexer;
use crate::optimizer;
use crate::parser;

// --- Test Harness ---

/// 词法 -> 语法 -> 语义分析 -> IR（分析出错也照样生成）。
fn lower(source: &str, from: Language) -> Vec<Instruction> {
    let (tokens, _) = lexer::tokenize(source);
    let ast = parser::parse(&tokens, from).expect("source should parse");
    let analysis = Analyzer::new(from).analyze(&ast);
    ir::generate(&ast, &analysis)
}

/// 词法 -> 语法 -> 语义分析 -> IR -> 优化 -> 目标代码。
fn translate(source: &str, from: Language, to: Language) -> String {
    generate(&optimizer::optimize(&lower(source, from)), to)
}

fn lifted(source: &str) -> Program {
    lift(&lower(source, Language::JavaScript))
}

fn int(n: i64) -> Expr {
    Expr::Const(Literal::int(n))
}

fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary(op, Box::new(left), Box::new(right))
}

const COUNTING_LOOP: &str = "int sum = 0;
for (int i = 0; i < 10; i++) {
    sum = sum + i;
}
printf(\"%d\\n\", sum);
";

// --- 提升 ---

#[test]
fn test_single_use_temporaries_are_inlined() {
    let program = lifted("let x = 2 + 3 * 4;");
    assert_eq!(
        program.top_level,
        vec![Stmt::Declare {
            name: "x".into(),
            declared_type: None,
            value: Some(binary(BinaryOp::Add, int(2), binary(BinaryOp::Mul, int(3), int(4)))),
        }]
    );
}

#[test]
fn test_multi_use_temporary_becomes_local() {
    let t0 = Operand::Temp(Temp(0));
    let ir = vec![
        Instruction::new(Op::Binary(BinaryOp::Add))
            .with_arg1(Operand::Var("a".into()))
            .with_arg2(Operand::Var("b".into()))
            .with_result(t0.clone()),
        Instruction::new(Op::Binary(BinaryOp::Mul))
            .with_arg1(t0.clone())
            .with_arg2(t0)
            .with_result(Operand::Temp(Temp(1))),
        Instruction::new(Op::Assign)
            .with_arg1(Operand::Temp(Temp(1)))
            .with_result(Operand::Var("x".into())),
    ];
    let program = lift(&ir);
    assert_eq!(
        program.top_level,
        vec![
            Stmt::Let {
                temp: Temp(0),
                value: binary(BinaryOp::Add, var("a"), var("b")),
            },
            Stmt::Assign {
                name: "x".into(),
                value: binary(BinaryOp::Mul, Expr::Temp(Temp(0)), Expr::Temp(Temp(0))),
            },
        ]
    );
}

#[test]
fn test_lift_recovers_control_flow() {
    let program = lifted("while (i < 3) { if (i == 1) { break; } i = i + 1; }");
    let [Stmt::While { cond, body }] = program.top_level.as_slice() else {
        panic!("expected a single while loop, got {:?}", program.top_level);
    };
    assert_eq!(*cond, binary(BinaryOp::Lt, var("i"), int(3)));
    assert!(matches!(&body[0], Stmt::If { then, otherwise: None, .. } if then == &vec![Stmt::Break]));
    assert!(matches!(&body[1], Stmt::Assign { name, .. } if name == "i"));
}

#[test]
fn test_lift_separates_functions() {
    let program = lifted("function f(a) { return a; }\nf(1);");
    assert_eq!(program.functions.len(), 1);
    assert_eq!(program.functions[0].params, vec!["a".to_string()]);
    assert_eq!(program.functions[0].body, vec![Stmt::Return(Some(var("a")))]);
    assert_eq!(program.top_level.len(), 1);
}

#[test]
fn test_unrecognized_shapes_survive_as_statements() {
    // 孤立的 FOR_UPDATE 标记无法还原，但不能丢失
    let ir = vec![Instruction::new(Op::ForUpdate).with_arg1(Operand::Label(Label(0)))];
    let program = lift(&ir);
    assert_eq!(program.top_level, vec![Stmt::Unknown("FOR_UPDATE L0".into())]);
    for target in [Language::C, Language::Java, Language::Python, Language::JavaScript] {
        let out = generate(&ir, target);
        assert!(out.contains("unsupported: FOR_UPDATE L0"), "{}:\n{}", target, out);
    }
}

// --- 表达式渲染 ---

#[test]
fn test_precedence_is_preserved_with_minimal_parentheses() {
    let out = translate("let x = (a + b) * c - (d - e);", Language::JavaScript, Language::JavaScript);
    assert_eq!(out, "let x = (a + b) * c - (d - e);\n");
}

#[test]
fn test_string_escapes() {
    assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
}

// --- C ---

#[test]
fn test_c_counting_loop() {
    let out = translate(COUNTING_LOOP, Language::C, Language::C);
    assert_eq!(
        out,
        "#include <stdio.h>

int main(void) {
    int sum = 0;
    for (int i = 0; i < 10; i = i + 1) {
        sum = sum + i;
    }
    printf(\"%d\\n\", sum);
    return 0;
}
"
    );
}

#[test]
fn test_c_functions_get_prototypes_and_types() {
    let source = "def add(a, b):\n    return a + b\n\nprint(add(2, 3))\n";
    let out = translate(source, Language::Python, Language::C);
    assert!(out.contains("int add(int a, int b);\n"), "{}", out);
    assert!(out.contains("int add(int a, int b) {\n    return a + b;\n}"), "{}", out);
    assert!(out.contains("printf(\"%d\\n\", add(2, 3));"), "{}", out);
}

#[test]
fn test_c_math_adds_header() {
    let out = translate("let r = Math.sqrt(2.0);\nconsole.log(r);", Language::JavaScript, Language::C);
    assert!(out.contains("#include <math.h>"), "{}", out);
    assert!(out.contains("double r = sqrt(2.0);"), "{}", out);
    assert!(out.contains("printf(\"%g\\n\", r);"), "{}", out);
}

#[test]
fn test_c_has_no_exceptions() {
    let source = "try { risky(); } catch (e) { console.log(e); }";
    let out = translate(source, Language::JavaScript, Language::C);
    assert!(out.contains("/* try */ {"), "{}", out);
    assert!(out.contains("/* catch (e) omitted: no exceptions */"), "{}", out);
    assert!(out.contains("risky();"), "{}", out);
}

#[test]
fn test_c_true_division_of_integers_casts() {
    let out = translate("let a = 7;\nlet b = 2;\nconsole.log(a / b);", Language::JavaScript, Language::C);
    assert!(out.contains("printf(\"%g\\n\", (double) a / b);"), "{}", out);

    // C 源里的整数除法本来就截断
    let out = translate("int a = 7;\nint b = 2;\nint q = a / b;", Language::C, Language::C);
    assert!(out.contains("int q = a / b;"), "{}", out);
}

#[test]
fn test_function_locals_do_not_leak_into_top_level() {
    let source = "x = 1\ndef f():\n    x = 2\n    return x\nf()\nprint(x)\n";
    let out = translate(source, Language::Python, Language::JavaScript);
    assert!(out.contains("function f() {\n    let x = 2;\n    return x;\n}"), "{}", out);
    assert!(out.contains("let x = 1;\nf();\nconsole.log(x);"), "{}", out);

    let out = translate(source, Language::Python, Language::C);
    assert!(!out.contains("int x;\n"), "{}", out);
    assert!(out.contains("int f(void) {\n    int x = 2;\n    return x;\n}"), "{}", out);
    assert!(out.contains("    int x = 1;\n"), "{}", out);
}

#[test]
fn test_global_statement_keeps_the_shared_variable() {
    let source = "x = 1\ndef f():\n    global x\n    x = 2\n    return x\nf()\nprint(x)\n";
    let out = translate(source, Language::Python, Language::C);
    assert!(out.starts_with("#include <stdio.h>\n\nint x;\n"), "{}", out);
    assert!(out.contains("int f(void) {\n    x = 2;\n    return x;\n}"), "{}", out);
}

// --- Java ---

#[test]
fn test_java_initialized_declaration_keeps_written_type() {
    let out = translate("double d = 5;\nprintf(\"%f\\n\", d);", Language::C, Language::Java);
    assert!(out.contains("double d = 5;"), "{}", out);
    assert!(!out.contains("int d"), "{}", out);
}

#[test]
fn test_same_name_in_two_functions_keeps_separate_types() {
    let source = "function f() { let r = 1; return r; }\nfunction g() { let r = \"hi\"; return r; }\nconsole.log(f());\nconsole.log(g());";
    let out = translate(source, Language::JavaScript, Language::Java);
    assert!(out.contains("public static int f() {\n        int r = 1;"), "{}", out);
    assert!(out.contains("public static String g() {\n        String r = \"hi\";"), "{}", out);
    assert!(!out.contains("int r = \"hi\""), "{}", out);
}

#[test]
fn test_java_wraps_program_in_class() {
    let out = translate("x = 10\ny = x * 2\nprint(y)\n", Language::Python, Language::Java);
    assert_eq!(
        out,
        "public class GeneratedCode {
    public static void main(String[] args) {
        int x = 10;
        int y = x * 2;
        System.out.println(y);
    }
}
"
    );
}

#[test]
fn test_java_shared_variables_become_static_fields() {
    let source = "count = 0\n\ndef bump():\n    global count\n    count = count + 1\n\nbump()\nprint(count)\n";
    let out = translate(source, Language::Python, Language::Java);
    assert!(out.contains("static int count = 0;"), "{}", out);
    assert!(out.contains("public static void bump() {"), "{}", out);
    assert!(out.contains("        count = count + 1;"), "{}", out);
    assert!(!out.contains("int count = count"), "{}", out);
}

#[test]
fn test_java_throw_and_catch() {
    let source = "try { throw new Error(\"bad\"); } catch (e) { console.log(e); }";
    let out = translate(source, Language::JavaScript, Language::Java);
    assert!(out.contains("throw new RuntimeException(\"bad\");"), "{}", out);
    assert!(out.contains("} catch (Exception e) {"), "{}", out);
}

// --- JavaScript ---

#[test]
fn test_javascript_function_and_call() {
    let source = "def add(a, b):\n    return a + b\n\nprint(add(2, 3))\n";
    let out = translate(source, Language::Python, Language::JavaScript);
    assert_eq!(out, "function add(a, b) {\n    return a + b;\n}\n\nconsole.log(add(2, 3));\n");
}

#[test]
fn test_javascript_calls_main_when_present() {
    let source = "public class Main {\n    public static void main(String[] args) {\n        System.out.println(1);\n    }\n}\n";
    let out = translate(source, Language::Java, Language::JavaScript);
    assert!(out.contains("function main(args) {"), "{}", out);
    assert!(out.trim_end().ends_with("main();"), "{}", out);
}

#[test]
fn test_javascript_truncates_integer_division() {
    let out = translate("int a = -7;\nint b = 2;\nint q = a / b;", Language::C, Language::JavaScript);
    assert!(out.contains("let q = Math.trunc(a / b);"), "{}", out);
}

// --- Python ---

#[test]
fn test_python_counting_loop_uses_range() {
    let out = translate(COUNTING_LOOP, Language::C, Language::Python);
    assert_eq!(out, "sum = 0\nfor i in range(0, 10):\n    sum = sum + i\nprint(\"%d\" % (sum,))\n");
}

#[test]
fn test_python_range_needs_the_loop_variable_dead_afterwards() {
    // 外层循环结束后还会读 i
    let source = "let i = 0;\nlet n = 0;\nwhile (n < 2) {\n    for (i = 0; i < 3; i++) { console.log(i); }\n    n = n + 1;\n}\nconsole.log(i);";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert!(!out.contains(" in range("), "{}", out);
    assert!(out.contains("    i = 0\n    while i < 3:\n"), "{}", out);

    // 顶层循环变量被函数当作全局变量读取
    let source = "def show():\n    print(i)\n\nfor i in range(3):\n    print(i)\nshow()\n";
    let out = translate(source, Language::Python, Language::Python);
    assert!(!out.contains(" in range("), "{}", out);
    assert!(out.contains("i = 0\nwhile i < 3:\n"), "{}", out);
}

#[test]
fn test_python_consecutive_counting_loops_share_a_variable() {
    let source = "int s = 0;\nfor (int i = 0; i < 3; i++) { s = s + i; }\nfor (int i = 0; i < 2; i++) { s = s - i; }\nprintf(\"%d\\n\", s);";
    let out = translate(source, Language::C, Language::Python);
    assert!(out.contains("for i in range(0, 3):\n    s = s + i\nfor i in range(0, 2):\n"), "{}", out);
}

#[test]
fn test_range_bound_is_evaluated_once() {
    let source = "n = 3\nfor i in range(n):\n    n = n + 1\n    print(i)\nprint(n)\n";
    let out = translate(source, Language::Python, Language::Python);
    assert!(out.contains("__stop_0 = n\nfor i in range(0, __stop_0):\n"), "{}", out);

    let out = translate(source, Language::Python, Language::JavaScript);
    assert!(out.contains("let __stop_0 = n;"), "{}", out);
    assert!(out.contains("i < __stop_0;"), "{}", out);
}

#[test]
fn test_range_loop_variable_read_afterwards_stops_past_the_end() {
    // 循环之后读到的是第一个越界的值（3），而不是 Python 的最后一个值（2）
    let source = "n = 3\nfor i in range(n):\n    n = n + 1\n    print(i)\nprint(i)\n";
    let out = translate(source, Language::Python, Language::JavaScript);
    assert!(out.contains("let __stop_0 = n;"), "{}", out);
    assert!(out.contains("for (i = 0; i < __stop_0; i = i + 1) {"), "{}", out);
    assert!(out.trim_end().ends_with("console.log(i);"), "{}", out);
}

#[test]
fn test_python_integer_division_truncates_toward_zero() {
    // `//` 向下取整：-7 // 2 == -4，C 得到 -3
    let out = translate("int a = -7;\nint b = 2;\nint q = a / b;", Language::C, Language::Python);
    assert!(out.contains("q = int(a / b)"), "{}", out);
    assert!(!out.contains("//"), "{}", out);

    let out = translate("let a = 7;\nlet b = 2;\nconsole.log(a / b);", Language::JavaScript, Language::Python);
    assert!(out.contains("print(a / b)"), "{}", out);
}

#[test]
fn test_python_initialized_declaration_keeps_written_type() {
    let out = translate("double d = 5;\nd = d / 2;\nprintf(\"%f\\n\", d);", Language::C, Language::Python);
    assert!(out.contains("d = d / 2"), "{}", out);
    assert!(!out.contains("int("), "{}", out);
}

#[test]
fn test_python_local_shadowing_a_global_gets_no_global_statement() {
    let source = "let x = 1;\nfunction f() { let x = 2; return x; }\nfunction g() { return x; }\nf();\nconsole.log(g());";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert!(out.contains("def f():\n    x = 2\n    return x\n"), "{}", out);
    assert!(!out.contains("global x"), "{}", out);
}

#[test]
fn test_python_general_for_becomes_while() {
    let source = "for (let i = 1; i < 100; i = i * 2) { if (i == 8) { continue; } console.log(i); }";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert!(out.contains("i = 1\nwhile i < 100:\n"), "{}", out);
    // continue 之前补上更新部分
    assert!(out.contains("        i = i * 2\n        continue\n"), "{}", out);
    assert!(out.trim_end().ends_with("i = i * 2"), "{}", out);
}

#[test]
fn test_python_elif_chain() {
    let source = "let x = 5;
if (x > 3) { console.log(\"big\"); } else if (x > 1) { console.log(\"mid\"); } else { console.log(\"small\"); }";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert_eq!(
        out,
        "x = 5
if x > 3:
    print(\"big\")
elif x > 1:
    print(\"mid\")
else:
    print(\"small\")
"
    );
}

#[test]
fn test_python_operators() {
    let source = "let a = !done && x === 1;\nlet b = 7 / n;\nlet s = \"n = \" + n;";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert!(out.contains("a = not done and x == 1"), "{}", out);
    assert!(out.contains("s = \"n = \" + n"), "{}", out);

    assert!(out.contains("b = 7 / n"), "{}", out);

    let typed = translate("int n = 2;\nint b = 7 / n;", Language::C, Language::Python);
    assert!(typed.contains("b = int(7 / n)"), "{}", typed);
}

#[test]
fn test_python_try_and_raise() {
    let source = "try { risky(); } catch (e) { throw new Error(\"bad\"); } finally { console.log(\"done\"); }";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert_eq!(
        out,
        "try:
    risky()
except Exception as e:
    raise Exception(\"bad\")
finally:
    print(\"done\")
"
    );
}

#[test]
fn test_python_global_declaration() {
    let source = "let count = 0;\nfunction bump() { count = count + 1; }\nbump();";
    let out = translate(source, Language::JavaScript, Language::Python);
    assert!(out.contains("def bump():\n    global count\n    count = count + 1\n"), "{}", out);
}

// --- 通用性质 ---

#[test]
fn test_generation_is_deterministic_and_does_not_mutate_ir() {
    let ir = lower(COUNTING_LOOP, Language::C);
    let before = ir.clone();
    for target in [Language::C, Language::Java, Language::Python, Language::JavaScript] {
        assert_eq!(generate(&ir, target), generate(&ir, target));
    }
    assert_eq!(ir, before);
}

#[test]
fn test_generator_for_reports_its_target() {
    for target in [Language::C, Language::Java, Language::Python, Language::JavaScript] {
        assert_eq!(generator_for(target).target(), target);
    }
}
