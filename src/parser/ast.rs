//! 抽象语法树：所有节点存放在一个连续的 arena 里，通过 [`NodeId`] 互相引用。
//!
//! 语法树在解析完成后不再修改；语义分析和 IR 生成只读它，
//! 需要附加的信息（类型等）写进以 `NodeId` 为键的旁表。

use std::fmt;

use crate::utils::Span;

// --- 1. 节点索引与节点种类 ---

/// 节点在 arena 中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 节点种类（封闭枚举）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Program,
    FunctionDeclaration,
    VariableDeclaration,
    Assignment,
    BinaryExpression,
    UnaryExpression,
    CallExpression,
    MemberExpression,
    IfStatement,
    WhileStatement,
    ForStatement,
    ReturnStatement,
    BlockStatement,
    ExpressionStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    TryStatement,
    Identifier,
    Literal,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Program => "PROGRAM",
            NodeType::FunctionDeclaration => "FUNCTION_DECLARATION",
            NodeType::VariableDeclaration => "VARIABLE_DECLARATION",
            NodeType::Assignment => "ASSIGNMENT",
            NodeType::BinaryExpression => "BINARY_EXPRESSION",
            NodeType::UnaryExpression => "UNARY_EXPRESSION",
            NodeType::CallExpression => "CALL_EXPRESSION",
            NodeType::MemberExpression => "MEMBER_EXPRESSION",
            NodeType::IfStatement => "IF_STATEMENT",
            NodeType::WhileStatement => "WHILE_STATEMENT",
            NodeType::ForStatement => "FOR_STATEMENT",
            NodeType::ReturnStatement => "RETURN_STATEMENT",
            NodeType::BlockStatement => "BLOCK_STATEMENT",
            NodeType::ExpressionStatement => "EXPRESSION_STATEMENT",
            NodeType::BreakStatement => "BREAK_STATEMENT",
            NodeType::ContinueStatement => "CONTINUE_STATEMENT",
            NodeType::ThrowStatement => "THROW_STATEMENT",
            NodeType::TryStatement => "TRY_STATEMENT",
            NodeType::Identifier => "IDENTIFIER",
            NodeType::Literal => "LITERAL",
        };
        f.write_str(name)
    }
}

// --- 2. 字面量与运算符 ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(x) => x,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // 浮点数始终带小数点，避免与整数混淆
            Number::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(Number),
    String(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Literal::Number(Number::Int(value))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Literal::String(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// 向零截断的整数除法。源码里没有这个运算符，由语义分析在 C/Java 的整数操作数上标出
    IntDiv,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// 从源码中的运算符文本解析（`and`/`or` 也接受）。
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::LtEq,
            ">=" => BinaryOp::GtEq,
            "&&" | "and" => BinaryOp::And,
            "||" | "or" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// C 家族的写法，IR 打印也使用它。
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div | BinaryOp::IntDiv => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::IntDiv | BinaryOp::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::StrictEq
                | BinaryOp::StrictNotEq
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::LtEq
                | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// --- 3. 节点 ---

/// 节点的"值"：名字、运算符或字面量，取决于节点种类。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeValue {
    #[default]
    None,
    Name(String),
    Binary(BinaryOp),
    Unary(UnaryOp),
    Literal(Literal),
}

/// 函数形参。C/Java 源里带有声明类型。
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub declared_type: Option<String>,
}

/// 节点的附加属性。只有与节点种类相关的字段才会被填写。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    /// 函数形参（FUNCTION_DECLARATION）
    pub params: Vec<Param>,
    /// 变量的声明类型，或函数的返回类型（C/Java 源）
    pub declared_type: Option<String>,
    /// `const` / `final`
    pub constant: bool,
    /// `obj[expr]` 形式的成员访问
    pub computed: bool,
    /// `obj.name` 形式的成员名
    pub property: Option<String>,
    /// catch / except 子句绑定的名字
    pub catch_param: Option<String>,
    pub has_handler: bool,
    pub has_finalizer: bool,
    /// Python 函数里用 `global` / `nonlocal` 声明的名字：对它们的赋值不引入局部变量
    pub shared: Vec<String>,
}

/// 子节点约定：
/// - FUNCTION_DECLARATION: `[body]`
/// - VARIABLE_DECLARATION: `[init?]`
/// - ASSIGNMENT: `[target, value]`
/// - CALL_EXPRESSION: `[callee, args...]`
/// - MEMBER_EXPRESSION: `[object]` 或 `[object, index]`（computed）
/// - IF_STATEMENT: `[cond, then, else?]`
/// - FOR_STATEMENT: `[init, cond, update, body]`，缺省部分为空的 EXPRESSION_STATEMENT 或字面量 `true`
/// - TRY_STATEMENT: `[block, handler?, finalizer?]`，由 `has_handler` / `has_finalizer` 区分
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_type: NodeType,
    pub value: NodeValue,
    pub children: Vec<NodeId>,
    pub attributes: Attributes,
    pub span: Span,
}

impl Node {
    pub fn new(node_type: NodeType, value: NodeValue, children: Vec<NodeId>, span: Span) -> Self {
        Self {
            node_type,
            value,
            children,
            attributes: Attributes::default(),
            span,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Name(name) => Some(name),
            _ => None,
        }
    }
}

// --- 4. 整棵树 ---

#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    pub(crate) fn new(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        write!(f, "{:width$}{}", "", node.node_type, width = depth * 2)?;
        match &node.value {
            NodeValue::None => {}
            NodeValue::Name(name) => write!(f, " {}", name)?,
            NodeValue::Binary(op) => write!(f, " {}", op)?,
            NodeValue::Unary(op) => write!(f, " {}", op)?,
            NodeValue::Literal(lit) => write!(f, " {}", lit)?,
        }
        let attrs = &node.attributes;
        if let Some(ty) = &attrs.declared_type {
            write!(f, " : {}", ty)?;
        }
        if !attrs.params.is_empty() {
            let names: Vec<&str> = attrs.params.iter().map(|p| p.name.as_str()).collect();
            write!(f, " ({})", names.join(", "))?;
        }
        if let Some(property) = &attrs.property {
            write!(f, " .{}", property)?;
        }
        if attrs.computed {
            f.write_str(" [computed]")?;
        }
        if let Some(param) = &attrs.catch_param {
            write!(f, " catch({})", param)?;
        }
        writeln!(f)?;
        for &child in &node.children {
            self.dump(f, child, depth + 1)?;
        }
        Ok(())
    }
}

/// 以缩进树的形式打印，CLI 的 `--emit ast` 使用。
impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f, self.root, 0)
    }
}
