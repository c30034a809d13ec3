// In src/analyzer/test.rs

use super::types::ValueType;
use super::*;
use crate::lexer;
use crate::parser;

// 一个通用的设置函数：词法和语法分析必须成功，然后运行语义分析
fn analyze(source: &str, dialect: Language) -> Analysis {
    let (tokens, warnings) = lexer::tokenize(source);
    assert!(warnings.is_empty(), "unexpected lexer warnings for: {}", source);
    let ast = match parser::parse(&tokens, dialect) {
        Ok(ast) => ast,
        Err(e) => panic!("setup failed for {:?}: {}", source, e),
    };
    Analyzer::new(dialect).analyze(&ast)
}

fn undefined_names(analysis: &Analysis) -> Vec<&str> {
    analysis
        .errors
        .iter()
        .filter_map(|e| match e {
            SemanticError::UndefinedVariable { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

fn symbol<'a>(analysis: &'a Analysis, name: &str) -> &'a Symbol {
    match analysis.symbols.iter().find(|s| s.name == name) {
        Some(symbol) => symbol,
        None => panic!("symbol '{}' was not recorded", name),
    }
}

// --- 成功案例 ---

#[test]
fn test_declared_variables_pass() {
    let analysis = analyze("int x = 1;\nprintf(\"%d\\n\", x);", Language::C);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    assert_eq!(analysis.symbols.len(), 1);
    assert!(symbol(&analysis, "x").used);
}

#[test]
fn test_recursive_function_resolves_itself() {
    let source = "function fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); }\nconsole.log(fact(5));";
    let analysis = analyze(source, Language::JavaScript);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    assert_eq!(symbol(&analysis, "fact").ty, ValueType::Function);
    assert_eq!(symbol(&analysis, "n").scope, 1);
}

#[test]
fn test_functions_are_hoisted() {
    let source = "console.log(later());\nfunction later() { return 1; }";
    assert!(analyze(source, Language::JavaScript).is_ok());
}

#[test]
fn test_python_assignment_declares_implicitly() {
    let analysis = analyze("x = 1\nprint(x)\nx = 2\n", Language::Python);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    // 第二次赋值不会产生新的符号
    assert_eq!(analysis.symbols.len(), 1);
    assert_eq!(symbol(&analysis, "x").ty, ValueType::Number);
}

#[test]
fn test_javascript_undeclared_assignment_becomes_global() {
    let source = "function f() { g = 1; }\nf();\nconsole.log(g);";
    let analysis = analyze(source, Language::JavaScript);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    assert_eq!(symbol(&analysis, "g").scope, 0);
}

#[test]
fn test_builtin_members_are_checked() {
    let analysis = analyze("let r = Math.sqrt(2) + Math.PI;", Language::JavaScript);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    assert_eq!(symbol(&analysis, "r").ty, ValueType::Number);

    let analysis = analyze("let r = Math.cube(2);", Language::JavaScript);
    assert_eq!(analysis.errors.len(), 1);
    assert!(matches!(
        &analysis.errors[0],
        SemanticError::UnknownBuiltinMember { object, member, .. } if object == "Math" && member == "cube"
    ));
}

// --- 类型推断 ---

#[test]
fn test_inferred_types() {
    let analysis = analyze("let s = \"n = \" + 1;\nlet b = 1 < 2;\nlet n = 2 * 3;", Language::JavaScript);
    assert_eq!(symbol(&analysis, "s").ty, ValueType::String);
    assert_eq!(symbol(&analysis, "b").ty, ValueType::Boolean);
    assert_eq!(symbol(&analysis, "n").ty, ValueType::Number);
}

#[test]
fn test_declared_type_wins_over_initializer() {
    let analysis = analyze("char* name = 0;\ndouble d = 1;", Language::C);
    assert_eq!(symbol(&analysis, "name").ty, ValueType::String);
    assert_eq!(symbol(&analysis, "d").ty, ValueType::Number);
}

#[test]
fn test_call_results_are_typed() {
    let analysis = analyze("n = len(\"abc\")\ns = str(n)\n", Language::Python);
    assert_eq!(symbol(&analysis, "n").ty, ValueType::Number);
    assert_eq!(symbol(&analysis, "s").ty, ValueType::String);
}

// --- 失败案例 ---

#[test]
fn test_undefined_variable_in_c() {
    let analysis = analyze("int x = 1;\nprintf(\"%d\\n\", y);", Language::C);
    assert_eq!(undefined_names(&analysis), vec!["y"]);
}

#[test]
fn test_assignment_without_declaration_in_java() {
    let analysis = analyze("count = 5;", Language::Java);
    assert_eq!(undefined_names(&analysis), vec!["count"]);
}

#[test]
fn test_redeclaration_in_same_scope() {
    let analysis = analyze("let a = 1;\nlet a = 2;", Language::JavaScript);
    assert_eq!(analysis.errors.len(), 1);
    assert!(matches!(&analysis.errors[0], SemanticError::Redeclaration { name, .. } if name == "a"));

    // 内层作用域可以遮蔽外层
    let analysis = analyze("let a = 1;\n{ let a = 2; }", Language::JavaScript);
    assert!(analysis.is_ok());
}

#[test]
fn test_block_scope_ends_with_block() {
    let analysis = analyze("{ let y = 1; }\nconsole.log(y);", Language::JavaScript);
    assert_eq!(analysis.errors.len(), 1);
    assert_eq!(undefined_names(&analysis), vec!["y"]);
}

#[test]
fn test_for_header_is_scoped_to_loop() {
    let source = "for (let i = 0; i < 3; i++) { console.log(i); }\nconsole.log(i);";
    let analysis = analyze(source, Language::JavaScript);
    assert_eq!(undefined_names(&analysis), vec!["i"]);
}

#[test]
fn test_python_locals_stay_in_function() {
    let source = "def f():\n    t = 1\n    return t\n\nprint(t)\n";
    let analysis = analyze(source, Language::Python);
    assert_eq!(undefined_names(&analysis), vec!["t"]);
}

#[test]
fn test_python_function_assignment_shadows_global() {
    let source = "x = 1\ndef f():\n    x = 2\n    return x\n\nf()\nprint(x)\n";
    let analysis = analyze(source, Language::Python);
    assert!(analysis.is_ok(), "{:?}", analysis.errors);
    assert_eq!(analysis.locals.len(), 1);
    assert_eq!(analysis.symbols.iter().filter(|s| s.name == "x").count(), 2);

    let shared = analyze("x = 1\ndef f():\n    global x\n    x = 2\n", Language::Python);
    assert!(shared.locals.is_empty());
    assert_eq!(shared.symbols.iter().filter(|s| s.name == "x").count(), 1);
}

#[test]
fn test_integer_division_is_marked_for_typed_sources() {
    let source = "int a = 7;\nint b = 2;\nint q = a / b;\nint r = -a / 2;\ndouble d = a / 2.0;";
    let analysis = analyze(source, Language::C);
    assert_eq!(analysis.int_divisions.len(), 2);

    let analysis = analyze("let a = 7;\nlet b = 2;\nlet q = a / b;", Language::JavaScript);
    assert!(analysis.int_divisions.is_empty());
}

#[test]
fn test_catch_parameter_is_visible_in_handler() {
    let source = "try { risky(); } catch (e) { console.log(e); }";
    let analysis = analyze(source, Language::JavaScript);
    assert_eq!(undefined_names(&analysis), vec!["risky"]);
}

#[test]
fn test_analysis_continues_after_errors() {
    let analysis = analyze("a = 1;\nb = 2;\nint c = d;", Language::C);
    assert_eq!(undefined_names(&analysis), vec!["a", "b", "d"]);
}
