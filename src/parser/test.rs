// In src/parser/test.rs

use super::ast::{Ast, BinaryOp, Literal, Node, NodeType, NodeValue};
use super::*;
use crate::reporter::ParserError;
use crate::lexer;

// --- Test Harness ---

fn parse_ok(source: &str, dialect: Language) -> Ast {
    let (tokens, _) = lexer::tokenize(source);
    match parse(&tokens, dialect) {
        Ok(ast) => ast,
        Err(e) => panic!("parse failed for {:?}: {}", source, e),
    }
}

fn parse_err(source: &str, dialect: Language) -> ParserError {
    let (tokens, _) = lexer::tokenize(source);
    match parse(&tokens, dialect) {
        Ok(ast) => panic!("expected a syntax error, got:\n{}", ast),
        Err(e) => e,
    }
}

/// 顶层语句
fn statements(ast: &Ast) -> Vec<&Node> {
    ast.children(ast.root()).iter().map(|&id| ast.node(id)).collect()
}

fn binary_op(node: &Node) -> Option<BinaryOp> {
    match node.value {
        NodeValue::Binary(op) => Some(op),
        _ => None,
    }
}

// --- 表达式 ---

#[test]
fn test_variable_declaration_with_initializer() {
    let ast = parse_ok("let x = 1 + 2;", Language::JavaScript);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0].node_type, NodeType::VariableDeclaration);
    assert_eq!(stmts[0].name(), Some("x"));

    let init = ast.node(stmts[0].children[0]);
    assert_eq!(init.node_type, NodeType::BinaryExpression);
    assert_eq!(binary_op(init), Some(BinaryOp::Add));
    assert_eq!(ast.node(init.children[0]).value, NodeValue::Literal(Literal::int(1)));
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let ast = parse_ok("a + b * c;", Language::JavaScript);
    let expr = ast.node(statements(&ast)[0].children[0]);
    assert_eq!(binary_op(expr), Some(BinaryOp::Add));
    assert_eq!(ast.node(expr.children[0]).name(), Some("a"));
    assert_eq!(binary_op(ast.node(expr.children[1])), Some(BinaryOp::Mul));
}

#[test]
fn test_comparison_and_logical_precedence() {
    let ast = parse_ok("a < b && c == d || e;", Language::JavaScript);
    let expr = ast.node(statements(&ast)[0].children[0]);
    assert_eq!(binary_op(expr), Some(BinaryOp::Or));
    let and = ast.node(expr.children[0]);
    assert_eq!(binary_op(and), Some(BinaryOp::And));
    assert_eq!(binary_op(ast.node(and.children[0])), Some(BinaryOp::Lt));
    assert_eq!(binary_op(ast.node(and.children[1])), Some(BinaryOp::Eq));
}

#[test]
fn test_compound_assignment_is_desugared() {
    let ast = parse_ok("x += 2;", Language::JavaScript);
    let assign = ast.node(statements(&ast)[0].children[0]);
    assert_eq!(assign.node_type, NodeType::Assignment);
    assert_eq!(ast.node(assign.children[0]).name(), Some("x"));
    let value = ast.node(assign.children[1]);
    assert_eq!(binary_op(value), Some(BinaryOp::Add));
    assert_eq!(ast.node(value.children[0]).name(), Some("x"));
    // 目标节点被复制，而不是共享
    assert_ne!(assign.children[0], value.children[0]);
}

#[test]
fn test_increment_is_desugared() {
    for source in ["i++;", "++i;"] {
        let ast = parse_ok(source, Language::JavaScript);
        let assign = ast.node(statements(&ast)[0].children[0]);
        assert_eq!(assign.node_type, NodeType::Assignment, "{}", source);
        let value = ast.node(assign.children[1]);
        assert_eq!(binary_op(value), Some(BinaryOp::Add));
        assert_eq!(ast.node(value.children[1]).value, NodeValue::Literal(Literal::int(1)));
    }
}

#[test]
fn test_member_call_and_index() {
    let ast = parse_ok("console.log(items[0], 2);", Language::JavaScript);
    let call = ast.node(statements(&ast)[0].children[0]);
    assert_eq!(call.node_type, NodeType::CallExpression);
    assert_eq!(call.children.len(), 3);

    let callee = ast.node(call.children[0]);
    assert_eq!(callee.node_type, NodeType::MemberExpression);
    assert_eq!(callee.attributes.property.as_deref(), Some("log"));
    assert!(!callee.attributes.computed);

    let index = ast.node(call.children[1]);
    assert_eq!(index.node_type, NodeType::MemberExpression);
    assert!(index.attributes.computed);
}

// --- 方言 ---

#[test]
fn test_js_semicolons_are_optional_at_line_end() {
    let ast = parse_ok("let a = 1\nlet b = 2\nconsole.log(a + b)", Language::JavaScript);
    assert_eq!(statements(&ast).len(), 3);
}

#[test]
fn test_c_requires_semicolons() {
    let error = parse_err("int a = 1\nint b = 2;", Language::C);
    assert!(matches!(error, ParserError::UnexpectedToken { ref expected, .. } if expected == "';'"));
}

#[test]
fn test_c_typed_declarations_and_functions() {
    let source = "int add(int a, int b) { return a + b; }\ndouble d;";
    let ast = parse_ok(source, Language::C);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 2);

    let function = stmts[0];
    assert_eq!(function.node_type, NodeType::FunctionDeclaration);
    assert_eq!(function.name(), Some("add"));
    assert_eq!(function.attributes.declared_type.as_deref(), Some("int"));
    let params: Vec<&str> = function.attributes.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["a", "b"]);
    assert_eq!(function.attributes.params[0].declared_type.as_deref(), Some("int"));

    assert_eq!(stmts[1].node_type, NodeType::VariableDeclaration);
    assert_eq!(stmts[1].attributes.declared_type.as_deref(), Some("double"));
    assert!(stmts[1].children.is_empty());
}

#[test]
fn test_java_class_members_are_flattened() {
    let source = "public class Main {\n    public static void main(String[] args) {\n        System.out.println(1);\n    }\n}";
    let ast = parse_ok(source, Language::Java);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0].node_type, NodeType::FunctionDeclaration);
    assert_eq!(stmts[0].name(), Some("main"));
    assert_eq!(stmts[0].attributes.params[0].name, "args");
}

#[test]
fn test_python_if_elif_else() {
    let source = "if x:\n    y = 1\nelif z:\n    y = 2\nelse:\n    y = 3\n";
    let ast = parse_ok(source, Language::Python);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 1);
    let outer = stmts[0];
    assert_eq!(outer.node_type, NodeType::IfStatement);
    assert_eq!(outer.children.len(), 3);
    let nested = ast.node(outer.children[2]);
    assert_eq!(nested.node_type, NodeType::IfStatement);
    assert_eq!(nested.children.len(), 3);
}

#[test]
fn test_python_def_and_return() {
    let source = "def add(a, b):\n    return a + b\n\nprint(add(1, 2))\n";
    let ast = parse_ok(source, Language::Python);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0].node_type, NodeType::FunctionDeclaration);
    let body = ast.node(stmts[0].children[0]);
    assert_eq!(body.node_type, NodeType::BlockStatement);
    assert_eq!(ast.node(body.children[0]).node_type, NodeType::ReturnStatement);
}

#[test]
fn test_python_for_range_desugars_to_for_statement() {
    let ast = parse_ok("for i in range(10, 0, -2):\n    print(i)\n", Language::Python);
    let node = statements(&ast)[0];
    assert_eq!(node.node_type, NodeType::ForStatement);
    assert_eq!(node.children.len(), 4);
    // 负步长时条件是 `>`
    assert_eq!(binary_op(ast.node(node.children[1])), Some(BinaryOp::Gt));
    let update = ast.node(ast.node(node.children[2]).children[0]);
    assert_eq!(update.node_type, NodeType::Assignment);
}

#[test]
fn test_python_range_bound_is_bound_once_before_the_loop() {
    let ast = parse_ok("for i in range(n):\n    n = n + 1\n", Language::Python);
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 2);
    let assign = ast.node(stmts[0].children[0]);
    assert_eq!(assign.node_type, NodeType::Assignment);
    assert_eq!(ast.node(assign.children[0]).value, NodeValue::Name("__stop_0".into()));
    assert_eq!(stmts[1].node_type, NodeType::ForStatement);
    let cond = ast.node(stmts[1].children[1]);
    assert_eq!(ast.node(cond.children[1]).value, NodeValue::Name("__stop_0".into()));

    // 常量界限不需要额外的变量
    let ast = parse_ok("for i in range(3):\n    print(i)\n", Language::Python);
    assert_eq!(statements(&ast).len(), 1);
}

#[test]
fn test_python_global_names_are_recorded_on_the_function() {
    let ast = parse_ok("def f():\n    global x, y\n    x = 2\n", Language::Python);
    let function = statements(&ast)[0];
    assert_eq!(function.attributes.shared, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn test_python_inconsistent_dedent_is_an_error() {
    let error = parse_err("if x:\n    y = 1\n  z = 2\n", Language::Python);
    assert!(matches!(error, ParserError::InconsistentIndentation { line: 3, .. }));
}

#[test]
fn test_try_catch_finally_attributes() {
    let ast = parse_ok("try { a(); } catch (e) { b(); } finally { c(); }", Language::JavaScript);
    let node = statements(&ast)[0];
    assert_eq!(node.node_type, NodeType::TryStatement);
    assert_eq!(node.children.len(), 3);
    assert!(node.attributes.has_handler && node.attributes.has_finalizer);
    assert_eq!(node.attributes.catch_param.as_deref(), Some("e"));

    let ast = parse_ok("try:\n    a()\nexcept ValueError as err:\n    b()\n", Language::Python);
    let node = statements(&ast)[0];
    assert_eq!(node.attributes.catch_param.as_deref(), Some("err"));
    assert!(!node.attributes.has_finalizer);
}

// --- 失败案例 ---

#[test]
fn test_missing_name_is_unexpected_token() {
    let error = parse_err("let = 5;", Language::JavaScript);
    assert!(matches!(error, ParserError::UnexpectedToken { line: 1, column: 5, .. }));
}

#[test]
fn test_unclosed_block_is_unexpected_eof() {
    let error = parse_err("if (x) {", Language::JavaScript);
    assert!(matches!(error, ParserError::UnexpectedEof { .. }));
}

#[test]
fn test_assignment_to_literal_is_rejected() {
    let error = parse_err("1 = 2;", Language::JavaScript);
    assert!(matches!(error, ParserError::InvalidAssignmentTarget { .. }));
}

#[test]
fn test_error_message_names_the_position() {
    let error = parse_err("let x = ;", Language::JavaScript);
    let text = error.to_string();
    assert!(text.starts_with("Syntax error at line 1, column 9"), "{}", text);
}
