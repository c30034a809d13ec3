//! 解析器实现。
//! 采用递归下降（语句）和普拉特解析（表达式），把 Token 流转换为 arena 形式的 AST。
//! 同一个解析器服务四种源语言：花括号方言共用一套语句文法，
//! Python 方言用列号判断缩进层级。

use super::ast::*;
use crate::language::Language;
use crate::lexer::{Token, TokenKind};
use crate::reporter::ParserError;
use crate::utils::Span;

pub type ParseResult<T> = Result<T, ParserError>;

/// C/Java 里可以出现在声明开头的类型关键字。
const TYPE_KEYWORDS: &[&str] = &[
    "int", "float", "double", "char", "long", "short", "bool", "boolean", "void", "unsigned",
    "const",
];

/// Java/C 的访问与存储修饰符，解析时直接跳过（`final` 记为常量）。
const MODIFIERS: &[&str] = &["public", "private", "protected", "static", "abstract", "final"];

// 运算符绑定力，数值越大结合越紧。
const ASSIGN_BP: (u8, u8) = (2, 1);
const NOT_KEYWORD_RBP: u8 = 7;
const PREFIX_RBP: u8 = 15;
const POSTFIX_BP: u8 = 17;

// --- 1. 主解析器结构体 ---

/// 解析器结构体，持有解析过程所需的全部状态。
pub struct Parser {
    /// 预处理过的 Token 流（去掉注释；花括号方言去掉换行），总以 `Eof` 结尾。
    tokens: Vec<Token>,
    /// 指向当前待处理 Token 的指针。
    current: usize,
    dialect: Language,
    /// 正在构建的节点 arena。
    nodes: Vec<Node>,
    /// 正在解析的 Python 函数里 `global` / `nonlocal` 声明的名字（按嵌套层次）
    shared: Vec<Vec<String>>,
    /// `range(...)` 脱糖时生成的隐藏变量计数
    hidden: u32,
}

// --- 2. Trait 定义：用于组织解析逻辑 ---

/// `Parse` Trait 是解析器的总入口。
pub trait Parse {
    /// 消耗解析器并启动整个解析过程，生成以 PROGRAM 为根的 AST。
    fn parse(self) -> ParseResult<Ast>;
}

/// `StatementParser` 负责花括号方言（C / Java / JavaScript）的语句。
trait StatementParser {
    /// 解析一条语句，结果追加到 `out`。空语句不产生节点，`int a, b;` 产生多个节点。
    fn parse_statement_into(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()>;
    /// 解析恰好一条语句（用作 if/while/for 的主体）。
    fn parse_statement(&mut self) -> ParseResult<NodeId>;
    fn parse_block(&mut self) -> ParseResult<NodeId>;
    fn parse_if(&mut self) -> ParseResult<NodeId>;
    fn parse_while(&mut self) -> ParseResult<NodeId>;
    fn parse_for(&mut self) -> ParseResult<NodeId>;
    fn parse_return(&mut self) -> ParseResult<NodeId>;
    fn parse_jump(&mut self) -> ParseResult<NodeId>;
    fn parse_throw(&mut self) -> ParseResult<NodeId>;
    fn parse_try(&mut self) -> ParseResult<NodeId>;
    fn parse_expression_statement(&mut self) -> ParseResult<NodeId>;
    /// `let/var/const` 声明，可带多个声明子。
    fn parse_var_declarations(&mut self, out: &mut Vec<NodeId>, terminate: bool) -> ParseResult<()>;
    /// `function name(a, b) { ... }`
    fn parse_js_function(&mut self) -> ParseResult<NodeId>;
    /// C/Java 的带类型声明：变量或函数。
    fn parse_typed_declaration(&mut self, out: &mut Vec<NodeId>, terminate: bool) -> ParseResult<()>;
    /// `class Name { ... }`，成员被直接摊平到 `out`。
    fn parse_class_into(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()>;
}

/// `PythonParser` 负责以缩进划分代码块的 Python 方言。
trait PythonParser {
    fn parse_python_statement(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()>;
    /// 解析 `:` 之后的代码块；`header_column` 是引导它的关键字所在列。
    fn parse_suite(&mut self, header_column: u32) -> ParseResult<NodeId>;
    fn parse_python_def(&mut self) -> ParseResult<NodeId>;
    fn parse_python_if(&mut self) -> ParseResult<NodeId>;
    fn parse_python_while(&mut self) -> ParseResult<NodeId>;
    /// `for v in range(...)`，脱糖为 FOR_STATEMENT。
    /// 不是常量的终值和步长先存进隐藏变量，只求值一次。
    fn parse_python_for(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()>;
    fn parse_python_try(&mut self) -> ParseResult<NodeId>;
    /// 简单语句的结尾：换行或输入结束。
    fn end_simple_statement(&mut self) -> ParseResult<()>;
}

/// `ExpressionParser` Trait 负责解析各类表达式（使用普拉特解析）。
trait ExpressionParser {
    /// 解析表达式的主入口（普拉特解析）。
    fn parse_expression(&mut self, min_bp: u8) -> ParseResult<NodeId>;
    /// 解析前缀表达式（例如 `-x`, `!flag`, `++i`）。
    fn parse_prefix(&mut self) -> ParseResult<NodeId>;
    /// 解析中缀表达式（二元运算与赋值）。
    fn parse_infix(&mut self, left: NodeId, rbp: u8) -> ParseResult<NodeId>;
    /// 解析后缀表达式（调用、成员访问、下标、`i++`）。
    fn parse_postfix(&mut self, left: NodeId) -> ParseResult<NodeId>;
    /// 解析原子表达式（字面量、标识符、括号表达式）。
    fn parse_atom(&mut self) -> ParseResult<NodeId>;
    fn parse_call_arguments(&mut self) -> ParseResult<Vec<NodeId>>;
}

/// `Util` Trait 提供了解析过程中常用的一系列辅助函数。
trait Util {
    // --- Token 流操作 ---
    fn peek(&self) -> &Token;
    fn peek_at(&self, offset: usize) -> &Token;
    fn previous(&self) -> &Token;
    fn is_at_end(&self) -> bool;
    fn advance(&mut self) -> Token;
    fn check(&self, kind: TokenKind) -> bool;
    fn check_op(&self, kind: TokenKind, text: &str) -> bool;
    fn check_keyword(&self, word: &str) -> bool;
    fn match_kind(&mut self, kind: TokenKind) -> bool;
    fn match_keyword(&mut self, word: &str) -> bool;
    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token>;
    fn expect_keyword(&mut self, word: &str) -> ParseResult<Token>;
    /// 花括号方言的语句结尾：`;`，JavaScript 方言允许在换行、`}` 或结尾处省略。
    fn consume_terminator(&mut self) -> ParseResult<()>;
    fn skip_newlines(&mut self);
    /// 跳过直到（并包括）`;` 或换行的所有 Token，用于 import 之类的行。
    fn skip_line(&mut self);

    // --- 错误 ---
    fn unexpected(&self, expected: &str) -> ParserError;
    fn indentation_error(&self) -> ParserError;

    // --- 节点构建 ---
    fn alloc(&mut self, node: Node) -> NodeId;
    fn make(&mut self, node_type: NodeType, value: NodeValue, children: Vec<NodeId>, span: Span) -> NodeId;
    fn span_of(&self, id: NodeId) -> Span;
    fn since(&self, start: Span) -> Span;
    /// 深拷贝一棵子树（复合赋值需要两份独立的目标节点）。
    fn clone_subtree(&mut self, id: NodeId) -> NodeId;
    fn empty_statement(&mut self, span: Span) -> NodeId;

    // --- C/Java 类型 ---
    /// 从 `start` 开始向前看，若是一个类型则返回类型之后的位置。
    fn scan_type(&self, start: usize) -> Option<usize>;
    fn at_typed_declaration(&self) -> bool;
    fn parse_type(&mut self) -> ParseResult<String>;
    fn skip_modifiers(&mut self) -> bool;
    fn parse_parameters(&mut self) -> ParseResult<Vec<Param>>;

    // --- 普拉特解析辅助函数 ---
    fn infix_binding_power(token: &Token) -> Option<(u8, u8)>;
    fn postfix_binding_power(token: &Token) -> Option<u8>;
    fn is_assignable(&self, id: NodeId) -> bool;
    /// 把 `x++` / `x += e` 这类写法脱糖为 `x = x op e`。
    fn desugar_update(&mut self, target: NodeId, op: BinaryOp, operand: NodeId, span: Span) -> NodeId;
}

// --- 3. 基础实现 ---

impl Parser {
    /// 创建一个新的解析器实例。
    pub fn new(tokens: &[Token], dialect: Language) -> Self {
        Parser {
            tokens: prepare(tokens, dialect),
            current: 0,
            dialect,
            nodes: Vec::new(),
            shared: Vec::new(),
            hidden: 0,
        }
    }

    /// `__role_N = value`：把只应求值一次的表达式存进隐藏变量，返回读取它的标识符节点。
    fn bind_hidden(&mut self, role: &str, value: NodeId, out: &mut Vec<NodeId>) -> NodeId {
        let name = format!("__{}_{}", role, self.hidden);
        self.hidden += 1;
        let span = self.span_of(value);
        let target = self.make(NodeType::Identifier, NodeValue::Name(name.clone()), vec![], span);
        let assign = self.make(NodeType::Assignment, NodeValue::None, vec![target, value], span);
        out.push(self.make(NodeType::ExpressionStatement, NodeValue::None, vec![assign], span));
        self.make(NodeType::Identifier, NodeValue::Name(name), vec![], span)
    }

    /// 字面量（可以带正负号）
    fn is_constant(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.index()];
        match node.node_type {
            NodeType::Literal => true,
            NodeType::UnaryExpression => {
                matches!(node.value, NodeValue::Unary(UnaryOp::Neg | UnaryOp::Plus))
                    && self.is_constant(node.children[0])
            }
            _ => false,
        }
    }
}

/// 预处理 Token 流：去掉注释；花括号方言丢弃全部换行，
/// Python 方言丢弃括号内部、开头以及重复的换行。
fn prepare(tokens: &[Token], dialect: Language) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 1);
    let mut depth = 0usize;

    for token in tokens {
        match token.kind {
            TokenKind::Comment | TokenKind::Eof => continue,
            TokenKind::Newline => {
                if dialect.uses_braces() || depth > 0 {
                    continue;
                }
                let redundant = out.last().is_none_or(|t| t.kind == TokenKind::Newline);
                if !redundant {
                    out.push(token.clone());
                }
            }
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1;
                out.push(token.clone());
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1);
                out.push(token.clone());
            }
            _ => out.push(token.clone()),
        }
    }

    let eof = match tokens.last() {
        Some(last) if last.kind == TokenKind::Eof => last.clone(),
        Some(last) => Token::new(
            TokenKind::Eof,
            "",
            last.line,
            last.column + 1,
            Span::new(last.span.end, last.span.end),
        ),
        None => Token::new(TokenKind::Eof, "", 1, 1, Span::default()),
    };
    out.push(eof);
    out
}

impl Parse for Parser {
    fn parse(mut self) -> ParseResult<Ast> {
        let start = self.peek().span;
        let mut body = Vec::new();

        if self.dialect.uses_braces() {
            while !self.is_at_end() {
                self.parse_statement_into(&mut body)?;
            }
        } else {
            self.skip_newlines();
            // 顶层代码块的缩进由第一条语句决定
            let indent = self.peek().column;
            while !self.is_at_end() {
                if self.peek().column != indent {
                    return Err(self.indentation_error());
                }
                self.parse_python_statement(&mut body)?;
                self.skip_newlines();
            }
        }

        let span = start.to(self.peek().span);
        let root = self.make(NodeType::Program, NodeValue::None, body, span);
        Ok(Ast::new(self.nodes, root))
    }
}

// --- 4. 花括号方言的语句 ---

impl StatementParser for Parser {
    fn parse_statement_into(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()> {
        if self.dialect.requires_declarations() && self.at_typed_declaration() {
            return self.parse_typed_declaration(out, true);
        }

        let token = self.peek().clone();
        match token.kind {
            TokenKind::LBrace => out.push(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
            }
            TokenKind::Keyword => match token.value.as_str() {
                "if" => out.push(self.parse_if()?),
                "while" => out.push(self.parse_while()?),
                "for" => out.push(self.parse_for()?),
                "return" => out.push(self.parse_return()?),
                "break" | "continue" => out.push(self.parse_jump()?),
                "throw" => out.push(self.parse_throw()?),
                "try" => out.push(self.parse_try()?),
                "function" => out.push(self.parse_js_function()?),
                "let" | "var" | "const" => self.parse_var_declarations(out, true)?,
                "import" => self.skip_line(),
                "export" => {
                    self.advance();
                }
                "class" => self.parse_class_into(out)?,
                word if MODIFIERS.contains(&word) => {
                    // 修饰符后面跟着的是类或者成员声明
                    self.skip_modifiers();
                    if self.check_keyword("class") {
                        self.parse_class_into(out)?;
                    } else {
                        self.parse_statement_into(out)?;
                    }
                }
                _ => out.push(self.parse_expression_statement()?),
            },
            TokenKind::Identifier if token.value == "package" && self.peek_at(1).kind == TokenKind::Identifier => {
                self.skip_line()
            }
            _ => out.push(self.parse_expression_statement()?),
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.peek().span;
        let mut items = Vec::new();
        self.parse_statement_into(&mut items)?;
        match items.as_slice() {
            [single] => Ok(*single),
            _ => {
                let span = self.since(start);
                Ok(self.make(NodeType::BlockStatement, NodeValue::None, items, span))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<NodeId> {
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("'}'"));
            }
            self.parse_statement_into(&mut body)?;
        }
        self.advance();
        let span = self.since(open.span);
        Ok(self.make(NodeType::BlockStatement, NodeValue::None, body, span))
    }

    fn parse_if(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("if")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')'")?;
        let then = self.parse_statement()?;
        let mut children = vec![cond, then];
        if self.match_keyword("else") {
            children.push(self.parse_statement()?);
        }
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::IfStatement, NodeValue::None, children, span))
    }

    fn parse_while(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("while")?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_statement()?;
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::WhileStatement, NodeValue::None, vec![cond, body], span))
    }

    fn parse_for(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("for")?;
        self.expect(TokenKind::LParen, "'('")?;

        // 1. 初始化部分
        let init = if self.check(TokenKind::Semicolon) {
            let span = self.peek().span;
            self.empty_statement(span)
        } else {
            let start = self.peek().span;
            let mut decls = Vec::new();
            if self.dialect.requires_declarations() && self.at_typed_declaration() {
                self.parse_typed_declaration(&mut decls, false)?;
            } else if ["let", "var", "const"].iter().any(|w| self.check_keyword(w)) {
                self.parse_var_declarations(&mut decls, false)?;
            } else {
                let expr = self.parse_expression(0)?;
                let span = self.span_of(expr);
                decls.push(self.make(NodeType::ExpressionStatement, NodeValue::None, vec![expr], span));
            }
            match decls.as_slice() {
                [single] => *single,
                _ => {
                    let span = self.since(start);
                    self.make(NodeType::BlockStatement, NodeValue::None, decls, span)
                }
            }
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        // 2. 条件部分，缺省为 true
        let cond = if self.check(TokenKind::Semicolon) {
            let span = self.peek().span;
            self.make(NodeType::Literal, NodeValue::Literal(Literal::Boolean(true)), vec![], span)
        } else {
            self.parse_expression(0)?
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        // 3. 更新部分
        let update = if self.check(TokenKind::RParen) {
            let span = self.peek().span;
            self.empty_statement(span)
        } else {
            let expr = self.parse_expression(0)?;
            let span = self.span_of(expr);
            self.make(NodeType::ExpressionStatement, NodeValue::None, vec![expr], span)
        };
        self.expect(TokenKind::RParen, "')'")?;

        let body = self.parse_statement()?;
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::ForStatement, NodeValue::None, vec![init, cond, update, body], span))
    }

    fn parse_return(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("return")?;
        let bare = self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.is_at_end()
            || (self.dialect == Language::JavaScript && self.peek().line > keyword.line);
        let children = if bare { vec![] } else { vec![self.parse_expression(0)?] };
        self.consume_terminator()?;
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::ReturnStatement, NodeValue::None, children, span))
    }

    fn parse_jump(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance();
        let node_type = if keyword.value == "break" {
            NodeType::BreakStatement
        } else {
            NodeType::ContinueStatement
        };
        self.consume_terminator()?;
        let span = self.since(keyword.span);
        Ok(self.make(node_type, NodeValue::None, vec![], span))
    }

    fn parse_throw(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("throw")?;
        let value = self.parse_expression(0)?;
        self.consume_terminator()?;
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::ThrowStatement, NodeValue::None, vec![value], span))
    }

    fn parse_try(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("try")?;
        let block = self.parse_block()?;
        let mut children = vec![block];
        let mut attributes = Attributes::default();

        if self.match_keyword("catch") {
            if self.match_kind(TokenKind::LParen) {
                // `catch (e)` 或 Java 的 `catch (Exception e)`：取最后一个名字
                while !self.check(TokenKind::RParen) {
                    if self.is_at_end() {
                        return Err(self.unexpected("')'"));
                    }
                    let token = self.advance();
                    if token.kind == TokenKind::Identifier {
                        attributes.catch_param = Some(token.value);
                    }
                }
                self.advance();
            }
            children.push(self.parse_block()?);
            attributes.has_handler = true;
        }
        if self.match_keyword("finally") {
            children.push(self.parse_block()?);
            attributes.has_finalizer = true;
        }
        if !attributes.has_handler && !attributes.has_finalizer {
            return Err(self.unexpected("'catch' or 'finally'"));
        }

        let span = self.since(keyword.span);
        let id = self.make(NodeType::TryStatement, NodeValue::None, children, span);
        self.nodes[id.index()].attributes = attributes;
        Ok(id)
    }

    fn parse_expression_statement(&mut self) -> ParseResult<NodeId> {
        let expr = self.parse_expression(0)?;
        self.consume_terminator()?;
        let span = self.since(self.span_of(expr));
        Ok(self.make(NodeType::ExpressionStatement, NodeValue::None, vec![expr], span))
    }

    fn parse_var_declarations(&mut self, out: &mut Vec<NodeId>, terminate: bool) -> ParseResult<()> {
        let keyword = self.advance();
        let constant = keyword.value == "const";
        loop {
            let name = self.expect(TokenKind::Identifier, "a variable name")?;
            let children = if self.check_op(TokenKind::Assignment, "=") {
                self.advance();
                vec![self.parse_expression(ASSIGN_BP.1)?]
            } else {
                vec![]
            };
            let span = self.since(name.span);
            let id = self.make(NodeType::VariableDeclaration, NodeValue::Name(name.value), children, span);
            self.nodes[id.index()].attributes.constant = constant;
            out.push(id);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        if terminate {
            self.consume_terminator()?;
        }
        Ok(())
    }

    fn parse_js_function(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("function")?;
        let name = self.expect(TokenKind::Identifier, "a function name")?;
        let params = self.parse_parameters()?;
        let body = self.parse_block()?;
        let span = self.since(keyword.span);
        let id = self.make(NodeType::FunctionDeclaration, NodeValue::Name(name.value), vec![body], span);
        self.nodes[id.index()].attributes.params = params;
        Ok(id)
    }

    fn parse_typed_declaration(&mut self, out: &mut Vec<NodeId>, terminate: bool) -> ParseResult<()> {
        let start = self.peek().span;
        let constant = self.skip_modifiers();
        let ty = self.parse_type()?;
        let constant = constant || ty.starts_with("const ");
        let name = self.expect(TokenKind::Identifier, "a name")?;

        // 函数定义（或 C 的函数原型）
        if self.check(TokenKind::LParen) {
            let params = self.parse_parameters()?;
            // Java 的 `throws X, Y`
            if self.peek().kind == TokenKind::Identifier && self.peek().value == "throws" {
                self.advance();
                while self.check(TokenKind::Identifier) || self.check(TokenKind::Comma) || self.check(TokenKind::Dot) {
                    self.advance();
                }
            }
            if self.match_kind(TokenKind::Semicolon) {
                // 只有原型，没有函数体
                return Ok(());
            }
            let body = self.parse_block()?;
            let span = self.since(start);
            let id = self.make(NodeType::FunctionDeclaration, NodeValue::Name(name.value), vec![body], span);
            let attributes = &mut self.nodes[id.index()].attributes;
            attributes.params = params;
            attributes.declared_type = Some(ty);
            out.push(id);
            return Ok(());
        }

        // 变量声明，可带多个声明子：`int a = 1, *b, c[3];`
        let mut name = name;
        loop {
            let mut declared = ty.clone();
            while self.match_kind(TokenKind::LBracket) {
                if !self.check(TokenKind::RBracket) {
                    self.parse_expression(0)?;
                }
                self.expect(TokenKind::RBracket, "']'")?;
                declared.push_str("[]");
            }
            let children = if self.check_op(TokenKind::Assignment, "=") {
                self.advance();
                vec![self.parse_expression(ASSIGN_BP.1)?]
            } else {
                vec![]
            };
            let span = self.since(name.span);
            let id = self.make(NodeType::VariableDeclaration, NodeValue::Name(name.value), children, span);
            let attributes = &mut self.nodes[id.index()].attributes;
            attributes.declared_type = Some(declared);
            attributes.constant = constant;
            out.push(id);

            if !self.match_kind(TokenKind::Comma) {
                break;
            }
            while self.check_op(TokenKind::Arithmetic, "*") {
                self.advance();
            }
            name = self.expect(TokenKind::Identifier, "a variable name")?;
        }
        if terminate {
            self.consume_terminator()?;
        }
        Ok(())
    }

    fn parse_class_into(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()> {
        self.expect_keyword("class")?;
        self.expect(TokenKind::Identifier, "a class name")?;
        // `extends Base` / `implements A, B`
        while !self.check(TokenKind::LBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("'{'"));
            }
            self.advance();
        }
        self.advance();
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("'}'"));
            }
            self.parse_statement_into(out)?;
        }
        self.advance();
        Ok(())
    }
}

// --- 5. Python 方言 ---

impl PythonParser for Parser {
    fn parse_python_statement(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()> {
        let token = self.peek().clone();
        match (token.kind, token.value.as_str()) {
            (TokenKind::Keyword, "def") => out.push(self.parse_python_def()?),
            (TokenKind::Keyword, "if") => out.push(self.parse_python_if()?),
            (TokenKind::Keyword, "while") => out.push(self.parse_python_while()?),
            (TokenKind::Keyword, "for") => self.parse_python_for(out)?,
            (TokenKind::Keyword, "try") => out.push(self.parse_python_try()?),
            (TokenKind::Keyword, "return") => {
                self.advance();
                let children = if self.check(TokenKind::Newline) || self.is_at_end() {
                    vec![]
                } else {
                    vec![self.parse_expression(0)?]
                };
                let span = self.since(token.span);
                out.push(self.make(NodeType::ReturnStatement, NodeValue::None, children, span));
                self.end_simple_statement()?;
            }
            (TokenKind::Keyword, "break") | (TokenKind::Keyword, "continue") => {
                self.advance();
                let node_type = if token.value == "break" {
                    NodeType::BreakStatement
                } else {
                    NodeType::ContinueStatement
                };
                out.push(self.make(node_type, NodeValue::None, vec![], token.span));
                self.end_simple_statement()?;
            }
            (TokenKind::Keyword, "raise") => {
                self.advance();
                let children = if self.check(TokenKind::Newline) || self.is_at_end() {
                    vec![]
                } else {
                    vec![self.parse_expression(0)?]
                };
                let span = self.since(token.span);
                out.push(self.make(NodeType::ThrowStatement, NodeValue::None, children, span));
                self.end_simple_statement()?;
            }
            (TokenKind::Keyword, "pass") => {
                self.advance();
                self.end_simple_statement()?;
            }
            (TokenKind::Keyword, "import") | (TokenKind::Keyword, "from") => self.skip_line(),
            (TokenKind::Identifier, "global") | (TokenKind::Identifier, "nonlocal")
                if self.peek_at(1).kind == TokenKind::Identifier =>
            {
                self.advance();
                loop {
                    let name = self.expect(TokenKind::Identifier, "a name")?;
                    // 顶层的 global 没有意义
                    if let Some(names) = self.shared.last_mut() {
                        names.push(name.value);
                    }
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
                self.end_simple_statement()?;
            }
            _ => {
                let expr = self.parse_expression(0)?;
                let span = self.span_of(expr);
                out.push(self.make(NodeType::ExpressionStatement, NodeValue::None, vec![expr], span));
                self.end_simple_statement()?;
            }
        }
        Ok(())
    }

    fn parse_suite(&mut self, header_column: u32) -> ParseResult<NodeId> {
        let colon = self.expect(TokenKind::Colon, "':'")?;
        let mut body = Vec::new();

        if !self.check(TokenKind::Newline) && !self.is_at_end() {
            // 单行代码块：`if x: y = 1`
            self.parse_python_statement(&mut body)?;
        } else {
            self.skip_newlines();
            if self.is_at_end() {
                return Err(self.unexpected("an indented block"));
            }
            let indent = self.peek().column;
            if indent <= header_column {
                return Err(self.unexpected("an indented block"));
            }
            loop {
                self.parse_python_statement(&mut body)?;
                self.skip_newlines();
                if self.is_at_end() {
                    break;
                }
                let column = self.peek().column;
                if column > indent {
                    return Err(self.indentation_error());
                }
                if column < indent {
                    // 反缩进：交给外层检查它是否回到了某个外层代码块的列
                    break;
                }
            }
        }

        let span = self.since(colon.span);
        Ok(self.make(NodeType::BlockStatement, NodeValue::None, body, span))
    }

    fn parse_python_def(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("def")?;
        let name = self.expect(TokenKind::Identifier, "a function name")?;
        let params = self.parse_parameters()?;
        // 返回值标注 `-> int`
        while !self.check(TokenKind::Colon) && !self.check(TokenKind::Newline) && !self.is_at_end() {
            self.advance();
        }
        self.shared.push(Vec::new());
        let body = self.parse_suite(keyword.column);
        let shared = self.shared.pop().unwrap_or_default();
        let body = body?;
        let span = self.since(keyword.span);
        let id = self.make(NodeType::FunctionDeclaration, NodeValue::Name(name.value), vec![body], span);
        let attributes = &mut self.nodes[id.index()].attributes;
        attributes.params = params;
        attributes.shared = shared;
        Ok(id)
    }

    fn parse_python_if(&mut self) -> ParseResult<NodeId> {
        // 既处理 `if`，也处理作为嵌套 if 的 `elif`
        let keyword = self.advance();
        let cond = self.parse_expression(0)?;
        let then = self.parse_suite(keyword.column)?;
        let mut children = vec![cond, then];

        if self.check_keyword("elif") && self.peek().column == keyword.column {
            children.push(self.parse_python_if()?);
        } else if self.check_keyword("else") && self.peek().column == keyword.column {
            self.advance();
            children.push(self.parse_suite(keyword.column)?);
        }

        let span = self.since(keyword.span);
        Ok(self.make(NodeType::IfStatement, NodeValue::None, children, span))
    }

    fn parse_python_while(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("while")?;
        let cond = self.parse_expression(0)?;
        let body = self.parse_suite(keyword.column)?;
        let span = self.since(keyword.span);
        Ok(self.make(NodeType::WhileStatement, NodeValue::None, vec![cond, body], span))
    }

    fn parse_python_for(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()> {
        let keyword = self.expect_keyword("for")?;
        let var = self.expect(TokenKind::Identifier, "a loop variable")?;
        self.expect_keyword("in")?;
        if !(self.check(TokenKind::Identifier) && self.peek().value == "range") {
            return Err(self.unexpected("'range(...)'"));
        }
        self.advance();
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.parse_call_arguments()?;

        // range(stop) / range(start, stop) / range(start, stop, step)
        let (from, to, step) = match args.as_slice() {
            [stop] => {
                let span = self.span_of(*stop);
                let zero = self.make(NodeType::Literal, NodeValue::Literal(Literal::int(0)), vec![], span);
                (zero, *stop, None)
            }
            [start, stop] => (*start, *stop, None),
            [start, stop, step] => (*start, *stop, Some(*step)),
            _ => return Err(self.unexpected("one to three range() arguments")),
        };
        let var_span = var.span;
        let ident = |p: &mut Parser| p.make(NodeType::Identifier, NodeValue::Name(var.value.clone()), vec![], var_span);

        // 0. range 只求值一次：终值和步长不是常量时先存起来
        let to = if self.is_constant(to) { to } else { self.bind_hidden("stop", to, out) };
        let step = match step {
            Some(step) if !self.is_constant(step) => Some(self.bind_hidden("step", step, out)),
            step => step,
        };

        // 1. init: v = start
        let target = ident(self);
        let assign = self.make(NodeType::Assignment, NodeValue::None, vec![target, from], var_span);
        let init = self.make(NodeType::ExpressionStatement, NodeValue::None, vec![assign], var_span);

        // 2. cond: v < stop（负步长时为 v > stop；步长的符号未知时两种都写出来）
        let cond = match step {
            Some(step) if !self.is_constant(step) => {
                let zero = |p: &mut Parser| p.make(NodeType::Literal, NodeValue::Literal(Literal::int(0)), vec![], var_span);
                let mut branches = Vec::with_capacity(2);
                for (sign, op) in [(BinaryOp::Gt, BinaryOp::Lt), (BinaryOp::Lt, BinaryOp::Gt)] {
                    let step = self.clone_subtree(step);
                    let zero = zero(self);
                    let positive = self.make(NodeType::BinaryExpression, NodeValue::Binary(sign), vec![step, zero], var_span);
                    let lhs = ident(self);
                    let bound = self.clone_subtree(to);
                    let compare = self.make(NodeType::BinaryExpression, NodeValue::Binary(op), vec![lhs, bound], var_span);
                    branches.push(self.make(
                        NodeType::BinaryExpression,
                        NodeValue::Binary(BinaryOp::And),
                        vec![positive, compare],
                        var_span,
                    ));
                }
                self.make(NodeType::BinaryExpression, NodeValue::Binary(BinaryOp::Or), branches, var_span)
            }
            _ => {
                let descending = step.is_some_and(|s| {
                    let node = &self.nodes[s.index()];
                    matches!(node.value, NodeValue::Unary(UnaryOp::Neg))
                        || matches!(node.value, NodeValue::Literal(Literal::Number(n)) if n.as_f64() < 0.0)
                });
                let lhs = ident(self);
                let op = if descending { BinaryOp::Gt } else { BinaryOp::Lt };
                self.make(NodeType::BinaryExpression, NodeValue::Binary(op), vec![lhs, to], var_span)
            }
        };

        // 3. update: v = v + step
        let step = match step {
            Some(step) => self.clone_subtree(step),
            None => self.make(NodeType::Literal, NodeValue::Literal(Literal::int(1)), vec![], var_span),
        };
        let target = ident(self);
        let assign = self.desugar_update(target, BinaryOp::Add, step, var_span);
        let update = self.make(NodeType::ExpressionStatement, NodeValue::None, vec![assign], var_span);

        let body = self.parse_suite(keyword.column)?;
        let span = self.since(keyword.span);
        out.push(self.make(NodeType::ForStatement, NodeValue::None, vec![init, cond, update, body], span));
        Ok(())
    }

    fn parse_python_try(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect_keyword("try")?;
        let block = self.parse_suite(keyword.column)?;
        let mut children = vec![block];
        let mut attributes = Attributes::default();

        if self.check_keyword("except") && self.peek().column == keyword.column {
            self.advance();
            // `except`、`except E`、`except E as e`
            while !self.check(TokenKind::Colon) && !self.is_at_end() {
                if self.match_keyword("as") {
                    let name = self.expect(TokenKind::Identifier, "a name")?;
                    attributes.catch_param = Some(name.value);
                } else {
                    self.advance();
                }
            }
            children.push(self.parse_suite(keyword.column)?);
            attributes.has_handler = true;
        }
        if self.check_keyword("finally") && self.peek().column == keyword.column {
            self.advance();
            children.push(self.parse_suite(keyword.column)?);
            attributes.has_finalizer = true;
        }
        if !attributes.has_handler && !attributes.has_finalizer {
            return Err(self.unexpected("'except' or 'finally'"));
        }

        let span = self.since(keyword.span);
        let id = self.make(NodeType::TryStatement, NodeValue::None, children, span);
        self.nodes[id.index()].attributes = attributes;
        Ok(id)
    }

    fn end_simple_statement(&mut self) -> ParseResult<()> {
        self.match_kind(TokenKind::Semicolon);
        if self.match_kind(TokenKind::Newline) || self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected("a newline"))
        }
    }
}

// --- 6. 表达式 ---

impl ExpressionParser for Parser {
    fn parse_expression(&mut self, min_bp: u8) -> ParseResult<NodeId> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let token = self.peek().clone();

            if let Some(lbp) = Self::postfix_binding_power(&token) {
                if lbp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs)?;
                continue;
            }

            if let Some((lbp, rbp)) = Self::infix_binding_power(&token) {
                if lbp < min_bp {
                    break;
                }
                lhs = self.parse_infix(lhs, rbp)?;
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<NodeId> {
        let token = self.peek().clone();
        let unary = match (token.kind, token.value.as_str()) {
            (TokenKind::Arithmetic, "-") => Some((UnaryOp::Neg, PREFIX_RBP)),
            (TokenKind::Arithmetic, "+") => Some((UnaryOp::Plus, PREFIX_RBP)),
            (TokenKind::Unary, "!") => Some((UnaryOp::Not, PREFIX_RBP)),
            (TokenKind::Keyword, "not") => Some((UnaryOp::Not, NOT_KEYWORD_RBP)),
            _ => None,
        };
        if let Some((op, rbp)) = unary {
            self.advance();
            let operand = self.parse_expression(rbp)?;
            let span = self.since(token.span);
            return Ok(self.make(NodeType::UnaryExpression, NodeValue::Unary(op), vec![operand], span));
        }

        match (token.kind, token.value.as_str()) {
            // `++i` / `--i`
            (TokenKind::Unary, "++") | (TokenKind::Unary, "--") => {
                self.advance();
                let target = self.parse_expression(PREFIX_RBP)?;
                if !self.is_assignable(target) {
                    return Err(ParserError::InvalidAssignmentTarget {
                        line: token.line,
                        column: token.column,
                        span: self.span_of(target),
                    });
                }
                let op = if token.value == "++" { BinaryOp::Add } else { BinaryOp::Sub };
                let span = self.since(token.span);
                let one = self.make(NodeType::Literal, NodeValue::Literal(Literal::int(1)), vec![], span);
                Ok(self.desugar_update(target, op, one, span))
            }
            // `new Foo(args)` 当作对 Foo 的调用
            (TokenKind::Keyword, "new") => {
                self.advance();
                self.parse_expression(POSTFIX_BP)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_infix(&mut self, left: NodeId, rbp: u8) -> ParseResult<NodeId> {
        let token = self.advance();

        if token.kind == TokenKind::Assignment {
            if !self.is_assignable(left) {
                let span = self.span_of(left);
                return Err(ParserError::InvalidAssignmentTarget {
                    line: token.line,
                    column: token.column,
                    span,
                });
            }
            let value = self.parse_expression(rbp)?;
            let span = self.span_of(left).to(self.span_of(value));
            return match token.value.as_str() {
                "=" => Ok(self.make(NodeType::Assignment, NodeValue::None, vec![left, value], span)),
                compound => {
                    let op = BinaryOp::from_symbol(&compound[..1]).ok_or_else(|| ParserError::UnexpectedToken {
                        expected: "an assignment operator".to_string(),
                        found: token.describe(),
                        line: token.line,
                        column: token.column,
                        span: token.span,
                    })?;
                    Ok(self.desugar_update(left, op, value, span))
                }
            };
        }

        let op = BinaryOp::from_symbol(&token.value).ok_or_else(|| ParserError::UnexpectedToken {
            expected: "a binary operator".to_string(),
            found: token.describe(),
            line: token.line,
            column: token.column,
            span: token.span,
        })?;
        let right = self.parse_expression(rbp)?;
        let span = self.span_of(left).to(self.span_of(right));
        Ok(self.make(NodeType::BinaryExpression, NodeValue::Binary(op), vec![left, right], span))
    }

    fn parse_postfix(&mut self, left: NodeId) -> ParseResult<NodeId> {
        let token = self.advance();
        let start = self.span_of(left);

        match token.kind {
            TokenKind::LParen => {
                let mut children = vec![left];
                children.extend(self.parse_call_arguments()?);
                let span = self.since(start);
                Ok(self.make(NodeType::CallExpression, NodeValue::None, children, span))
            }
            TokenKind::Dot => {
                let property = self.advance();
                if !matches!(property.kind, TokenKind::Identifier | TokenKind::Keyword) {
                    return Err(ParserError::UnexpectedToken {
                        expected: "a property name".to_string(),
                        found: property.describe(),
                        line: property.line,
                        column: property.column,
                        span: property.span,
                    });
                }
                let span = self.since(start);
                let id = self.make(NodeType::MemberExpression, NodeValue::None, vec![left], span);
                self.nodes[id.index()].attributes.property = Some(property.value);
                Ok(id)
            }
            TokenKind::LBracket => {
                let index = self.parse_expression(0)?;
                self.expect(TokenKind::RBracket, "']'")?;
                let span = self.since(start);
                let id = self.make(NodeType::MemberExpression, NodeValue::None, vec![left, index], span);
                self.nodes[id.index()].attributes.computed = true;
                Ok(id)
            }
            // `i++` / `i--`
            _ => {
                if !self.is_assignable(left) {
                    return Err(ParserError::InvalidAssignmentTarget {
                        line: token.line,
                        column: token.column,
                        span: start,
                    });
                }
                let op = if token.value == "++" { BinaryOp::Add } else { BinaryOp::Sub };
                let span = self.since(start);
                let one = self.make(NodeType::Literal, NodeValue::Literal(Literal::int(1)), vec![], token.span);
                Ok(self.desugar_update(left, op, one, span))
            }
        }
    }

    fn parse_atom(&mut self) -> ParseResult<NodeId> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                let number = if token.value.contains('.') {
                    Number::Float(token.value.parse().unwrap_or(0.0))
                } else {
                    // 超出 i64 范围的整数退化为浮点数
                    match token.value.parse::<i64>() {
                        Ok(i) => Number::Int(i),
                        Err(_) => Number::Float(token.value.parse().unwrap_or(f64::MAX)),
                    }
                };
                Ok(self.make(NodeType::Literal, NodeValue::Literal(Literal::Number(number)), vec![], token.span))
            }
            TokenKind::String => {
                self.advance();
                let literal = Literal::String(token.value);
                Ok(self.make(NodeType::Literal, NodeValue::Literal(literal), vec![], token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(self.make(NodeType::Identifier, NodeValue::Name(token.value), vec![], token.span))
            }
            TokenKind::Keyword => {
                let literal = match token.value.as_str() {
                    "true" | "True" => Some(Literal::Boolean(true)),
                    "false" | "False" => Some(Literal::Boolean(false)),
                    "null" | "None" | "undefined" => Some(Literal::Null),
                    _ => None,
                };
                if let Some(literal) = literal {
                    self.advance();
                    return Ok(self.make(NodeType::Literal, NodeValue::Literal(literal), vec![], token.span));
                }
                // `int(x)`、`float(x)` 这类以类型名作函数的调用，以及 `this`
                let callable = TYPE_KEYWORDS.contains(&token.value.as_str()) && self.peek_at(1).kind == TokenKind::LParen;
                if callable || token.value == "this" {
                    self.advance();
                    return Ok(self.make(NodeType::Identifier, NodeValue::Name(token.value), vec![], token.span));
                }
                Err(self.unexpected("an expression"))
            }
            TokenKind::LParen => {
                self.advance();
                // C/Java 的强制类型转换 `(int) x`：转换本身被忽略
                let is_cast = self.peek().kind == TokenKind::Keyword
                    && self
                        .scan_type(self.current)
                        .is_some_and(|end| self.tokens.get(end).is_some_and(|t| t.kind == TokenKind::RParen));
                if is_cast {
                    while !self.check(TokenKind::RParen) {
                        self.advance();
                    }
                    self.advance();
                    return self.parse_expression(PREFIX_RBP);
                }
                let expr = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call_arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        // 调用方已经消费了 `(`
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) {
            // Python 的关键字参数 `end=""` 没有对应的位置参数，直接丢弃
            let keyword_argument = self.dialect == Language::Python
                && self.check(TokenKind::Identifier)
                && self.peek_at(1).is(TokenKind::Assignment, "=");
            if keyword_argument {
                self.advance();
                self.advance();
                self.parse_expression(ASSIGN_BP.1)?;
            } else {
                args.push(self.parse_expression(ASSIGN_BP.1)?);
            }
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }
}

// --- 7. 辅助函数 ---

impl Util for Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + offset).min(last)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_op(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is(kind, text)
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.peek().is_keyword(word)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, word: &str) -> bool {
        if self.check_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> ParseResult<Token> {
        if self.check_keyword(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    fn consume_terminator(&mut self) -> ParseResult<()> {
        if self.match_kind(TokenKind::Semicolon) {
            return Ok(());
        }
        let inserted = self.dialect == Language::JavaScript
            && (self.check(TokenKind::RBrace)
                || self.is_at_end()
                || self.peek().line > self.previous().line);
        if inserted { Ok(()) } else { Err(self.unexpected("';'")) }
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        let line = self.peek().line;
        while !self.is_at_end() && self.peek().line == line {
            let token = self.advance();
            if matches!(token.kind, TokenKind::Semicolon | TokenKind::Newline) {
                break;
            }
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParserError::UnexpectedEof {
                expected: expected.to_string(),
                line: token.line,
                column: token.column,
                span: token.span,
            }
        } else {
            ParserError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.describe(),
                line: token.line,
                column: token.column,
                span: token.span,
            }
        }
    }

    fn indentation_error(&self) -> ParserError {
        let token = self.peek();
        ParserError::InconsistentIndentation {
            line: token.line,
            column: token.column,
            span: token.span,
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn make(&mut self, node_type: NodeType, value: NodeValue, children: Vec<NodeId>, span: Span) -> NodeId {
        self.alloc(Node::new(node_type, value, children, span))
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    fn since(&self, start: Span) -> Span {
        start.to(self.previous().span)
    }

    fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id.index()].clone();
        let children: Vec<NodeId> = node.children.iter().map(|&c| self.clone_subtree(c)).collect();
        self.alloc(Node { children, ..node })
    }

    fn empty_statement(&mut self, span: Span) -> NodeId {
        self.make(NodeType::ExpressionStatement, NodeValue::None, vec![], span)
    }

    fn scan_type(&self, start: usize) -> Option<usize> {
        let token_at = |i: usize| self.tokens.get(i);
        let mut i = start;
        let first = token_at(i)?;

        match first.kind {
            TokenKind::Keyword if TYPE_KEYWORDS.contains(&first.value.as_str()) => {
                // `unsigned int`、`long long`、`const char`
                while token_at(i).is_some_and(|t| t.kind == TokenKind::Keyword && TYPE_KEYWORDS.contains(&t.value.as_str())) {
                    i += 1;
                }
            }
            TokenKind::Identifier => {
                i += 1;
                // 限定名 `java.util.List`
                while token_at(i).is_some_and(|t| t.kind == TokenKind::Dot)
                    && token_at(i + 1).is_some_and(|t| t.kind == TokenKind::Identifier)
                {
                    i += 2;
                }
                // 泛型参数 `List<Integer>`
                if token_at(i).is_some_and(|t| t.is(TokenKind::Comparison, "<")) {
                    let mut depth = 0usize;
                    loop {
                        let t = token_at(i)?;
                        match (t.kind, t.value.as_str()) {
                            (TokenKind::Comparison, "<") => depth += 1,
                            (TokenKind::Comparison, ">") => {
                                depth -= 1;
                                if depth == 0 {
                                    i += 1;
                                    break;
                                }
                            }
                            (TokenKind::Identifier | TokenKind::Keyword | TokenKind::Comma | TokenKind::Dot, _) => {}
                            _ => return None,
                        }
                        i += 1;
                    }
                }
            }
            _ => return None,
        }

        // 后缀：`[]`、`*`、`...`
        loop {
            match token_at(i) {
                Some(t) if t.kind == TokenKind::LBracket && token_at(i + 1).is_some_and(|n| n.kind == TokenKind::RBracket) => i += 2,
                Some(t) if t.is(TokenKind::Arithmetic, "*") || t.kind == TokenKind::Dot => i += 1,
                _ => break,
            }
        }
        Some(i)
    }

    fn at_typed_declaration(&self) -> bool {
        let mut i = self.current;
        while self.tokens.get(i).is_some_and(|t| t.kind == TokenKind::Keyword && MODIFIERS.contains(&t.value.as_str())) {
            i += 1;
        }
        self.scan_type(i)
            .and_then(|end| self.tokens.get(end))
            .is_some_and(|t| t.kind == TokenKind::Identifier)
    }

    fn parse_type(&mut self) -> ParseResult<String> {
        let end = match self.scan_type(self.current) {
            Some(end) => end,
            None => return Err(self.unexpected("a type")),
        };
        let mut ty = String::new();
        while self.current < end {
            let token = self.advance();
            let glue = matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
                && ty.ends_with(|c: char| c.is_alphanumeric() || c == '_');
            if glue {
                ty.push(' ');
            }
            ty.push_str(&token.value);
        }
        Ok(ty)
    }

    fn skip_modifiers(&mut self) -> bool {
        let mut constant = false;
        while self.peek().kind == TokenKind::Keyword && MODIFIERS.contains(&self.peek().value.as_str()) {
            constant |= self.advance().value == "final";
        }
        constant
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();

        // C 的 `(void)`
        if self.check_keyword("void") && self.peek_at(1).kind == TokenKind::RParen {
            self.advance();
        }

        while !self.check(TokenKind::RParen) {
            let typed = self.dialect.requires_declarations();
            if typed {
                self.skip_modifiers();
                let ty = self.parse_type()?;
                // 原型里可以省略参数名
                let name = if self.check(TokenKind::Identifier) {
                    self.advance().value
                } else {
                    format!("arg{}", params.len())
                };
                let mut declared = ty;
                while self.match_kind(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "']'")?;
                    declared.push_str("[]");
                }
                params.push(Param { name, declared_type: Some(declared) });
            } else {
                let name = self.expect(TokenKind::Identifier, "a parameter name")?;
                // Python 类型标注 `a: int`
                if self.dialect == Language::Python && self.match_kind(TokenKind::Colon) {
                    self.parse_type()?;
                }
                // 默认值不参与翻译
                if self.check_op(TokenKind::Assignment, "=") {
                    self.advance();
                    self.parse_expression(ASSIGN_BP.1)?;
                }
                params.push(Param { name: name.value, declared_type: None });
            }
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn infix_binding_power(token: &Token) -> Option<(u8, u8)> {
        let bp = match (token.kind, token.value.as_str()) {
            (TokenKind::Assignment, "=>") => return None,
            (TokenKind::Assignment, _) => ASSIGN_BP,
            (TokenKind::Logical, "||") | (TokenKind::Keyword, "or") => (3, 4),
            (TokenKind::Logical, "&&") | (TokenKind::Keyword, "and") => (5, 6),
            (TokenKind::Comparison, "==" | "!=" | "===" | "!==") => (7, 8),
            (TokenKind::Comparison, _) => (9, 10),
            (TokenKind::Arithmetic, "+" | "-") => (11, 12),
            (TokenKind::Arithmetic, _) => (13, 14),
            _ => return None,
        };
        Some(bp)
    }

    fn postfix_binding_power(token: &Token) -> Option<u8> {
        match token.kind {
            TokenKind::LParen | TokenKind::Dot | TokenKind::LBracket => Some(POSTFIX_BP),
            TokenKind::Unary if token.value == "++" || token.value == "--" => Some(POSTFIX_BP),
            _ => None,
        }
    }

    fn is_assignable(&self, id: NodeId) -> bool {
        matches!(
            self.nodes[id.index()].node_type,
            NodeType::Identifier | NodeType::MemberExpression
        )
    }

    fn desugar_update(&mut self, target: NodeId, op: BinaryOp, operand: NodeId, span: Span) -> NodeId {
        let current = self.clone_subtree(target);
        let value = self.make(NodeType::BinaryExpression, NodeValue::Binary(op), vec![current, operand], span);
        self.make(NodeType::Assignment, NodeValue::None, vec![target, value], span)
    }
}
