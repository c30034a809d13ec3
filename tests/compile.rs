//! 端到端测试：只通过公共 API 驱动整条流水线。

use crossc::ir::{listing, Op};
use crossc::{compile, optimizer, CompileOptions, CompileResult, CompilerContext, Language};

const SOURCES: [(Language, &str); 4] = [
    (Language::C, "int x = 1;\nprintf(\"%d\\n\", x);\n"),
    (Language::Java, "int x = 1;\nSystem.out.println(x);\n"),
    (Language::Python, "x = 1\nprint(x)\n"),
    (Language::JavaScript, "let x = 1;\nconsole.log(x);\n"),
];

/// 每种目标语言的输出语句
fn print_hallmark(target: Language) -> &'static str {
    match target {
        Language::C => "printf(",
        // C 的 printf 对应 System.out.printf
        Language::Java => "System.out.print",
        Language::Python => "print(",
        Language::JavaScript => "console.log(",
    }
}

fn success(result: CompileResult) -> Box<crossc::CompileOutput> {
    match result {
        CompileResult::Success(output) => output,
        CompileResult::Failure(failure) => panic!("compilation failed: {}", failure.error),
    }
}

// --- 转换矩阵 ---

#[test]
fn every_supported_pair_translates() {
    for (from, source) in SOURCES {
        for &to in from.supported_targets() {
            let output = success(compile(source, from.into(), to.into()));
            assert!(
                output.target_code.contains(print_hallmark(to)),
                "{} -> {} produced:\n{}",
                from,
                to,
                output.target_code
            );
            assert!(output.target_code.ends_with('\n'));
            assert_eq!(output.symbol_table.len(), 1);
        }
    }
}

#[test]
fn translation_is_deterministic() {
    for (from, source) in SOURCES {
        for &to in from.supported_targets() {
            let first = compile(source, from.into(), to.into());
            let second = compile(source, from.into(), to.into());
            assert_eq!(first.target_code(), second.target_code());
        }
    }
}

#[test]
fn language_names_are_case_insensitive_aliases() {
    let result = compile("x = 1\nprint(x)\n", "PY", "JS");
    assert!(result.success(), "{:?}", result.error());
}

// --- 失败路径 ---

#[test]
fn same_language_pair_is_rejected() {
    let result = compile("int x = 1;", "c", "c");
    assert!(!result.success());
    assert_eq!(result.target_code(), None);
    assert_eq!(result.error(), Some("Unsupported conversion: c to c"));
}

#[test]
fn unknown_language_is_rejected() {
    let result = compile("x = 1", "cobol", "python");
    assert_eq!(result.error(), Some("Unknown language 'cobol'"));
}

#[test]
fn syntax_error_fails_without_output() {
    let result = compile("let = 5;", "javascript", "python");
    assert_eq!(result.target_code(), None);
    let error = result.error().unwrap_or_default();
    assert!(error.starts_with("Syntax error at line 1, column 5"), "{}", error);
}

#[test]
fn out_of_scope_use_is_a_semantic_error() {
    let result = compile("{ let y = 1; }\nconsole.log(y);", "javascript", "python");
    assert_eq!(result.error(), Some("Undefined variable 'y'"));
    match result {
        CompileResult::Failure(failure) => assert_eq!(failure.diagnostics.len(), 1),
        CompileResult::Success(_) => unreachable!(),
    }
}

#[test]
fn semantic_errors_are_joined_in_order() {
    let result = compile("a = 1;\nb = 2;", "c", "python");
    assert_eq!(
        result.error(),
        Some("Undefined variable 'a', Undefined variable 'b'")
    );
}

// --- 流水线产物 ---

#[test]
fn counting_loop_becomes_range() {
    let source = "int sum = 0;\nfor (int i = 0; i < 10; i++) {\n    sum = sum + i;\n}\nprintf(\"%d\\n\", sum);\n";
    let output = success(compile(source, "c", "python"));
    assert!(output.target_code.contains("for i in range(0, 10):"), "{}", output.target_code);
}

#[test]
fn constant_expressions_are_folded() {
    let output = success(compile("let x = 2 + 3 * 4;\nconsole.log(x);", "javascript", "python"));
    assert!(output.intermediate_code.iter().any(|i| matches!(i.op, Op::Binary(_))));
    assert!(!output.optimized_code.iter().any(|i| matches!(i.op, Op::Binary(_))));
    assert!(listing(&output.optimized_code).contains("= 14"));
    assert!(output.target_code.contains("14"), "{}", output.target_code);
}

#[test]
fn optimized_code_is_a_fixpoint() {
    let source = "let s = 0;\nfor (let i = 0; i < 10; i++) { if (i % 2 == 0) { s += i * 1; } }\nconsole.log(s);";
    let output = success(compile(source, "javascript", "c"));
    assert_eq!(optimizer::optimize(&output.optimized_code), output.optimized_code);
    assert!(output.optimized_code.len() <= output.intermediate_code.len());
}

#[test]
fn disabling_the_optimizer_keeps_the_ir() {
    let context = CompilerContext::new(CompileOptions { optimize: false });
    let output = success(context.compile("let x = 2 + 3;\nconsole.log(x);", "js", "java"));
    assert_eq!(output.optimized_code, output.intermediate_code);
}

#[test]
fn unrecognized_characters_are_warnings() {
    let output = success(compile("let x = 1;@\nconsole.log(x);", "javascript", "python"));
    assert_eq!(output.warnings.len(), 1);
    assert!(output.tokens.iter().all(|t| t.value != "@"));
}

#[test]
fn supported_targets_follow_the_matrix() {
    let context = CompilerContext::default();
    assert_eq!(
        context.supported_targets("python"),
        &[Language::JavaScript, Language::Java, Language::C]
    );
    assert_eq!(context.supported_targets("Java").len(), 3);
    assert!(context.supported_targets("fortran").is_empty());
}

#[test]
fn written_types_and_integer_division_survive_translation() {
    let source = "double d = 5;\nint a = 7;\nint b = 2;\nint q = a / b;\nprintf(\"%f %d\\n\", d, q);\n";
    let java = success(compile(source, "c", "java"));
    assert!(java.target_code.contains("double d = 5;"), "{}", java.target_code);
    assert!(java.target_code.contains("int q = a / b;"), "{}", java.target_code);

    let python = success(compile(source, "c", "python"));
    assert!(python.target_code.contains("q = int(a / b)"), "{}", python.target_code);
}
