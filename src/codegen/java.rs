// In src/codegen/java.rs

use std::collections::HashSet;

use super::lift::{lift, Expr, Function, Program};
use super::types::{Kind, TypeEnv};
use super::{
    builtin_call, exception_message, globals, math_name, predeclared, quote, returns_value, BraceDialect, BraceWriter,
    Builtin, CodeGenerator, ReturnMode, Syntax,
};
use crate::ir::{Instruction, Label};
use crate::language::Language;
use crate::parser::ast::Literal;

/// 生成的代码总是放在这个类里。
const CLASS_NAME: &str = "GeneratedCode";

/// Java 生成器：一个公共类，全局变量是静态字段，函数是静态方法，顶层语句进入 `main`。
pub struct JavaGenerator;

impl CodeGenerator for JavaGenerator {
    fn target(&self) -> Language {
        Language::Java
    }

    fn generate(&self, instructions: &[Instruction]) -> String {
        let program = lift(instructions);
        let dialect = JavaDialect {
            env: TypeEnv::infer(&program),
        };
        dialect.render(&program)
    }
}

struct JavaDialect {
    env: TypeEnv,
}

/// 字段、形参、返回值这类必须写出类型的位置。
fn type_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Int => "int",
        Kind::Float => "double",
        Kind::Bool => "boolean",
        Kind::Str => "String",
        Kind::Unknown => "Object",
    }
}

impl JavaDialect {
    fn render(&self, program: &Program) -> String {
        let mut bw = BraceWriter::new(self);
        let globals = globals(program);

        bw.w.line(format!("public class {} {{", CLASS_NAME));
        bw.w.indent();

        if !globals.is_empty() {
            for name in &globals {
                let kind = self.env.var_in(None, name);
                let field = match self.default_value(kind) {
                    Some(value) => format!("static {} {} = {};", type_name(kind), name, value),
                    None => format!("static {} {};", type_name(kind), name),
                };
                bw.w.line(field);
            }
            bw.w.blank();
        }

        for function in program.functions.iter().filter(|f| f.name != "main") {
            bw.w.line(format!("{} {{", self.signature(function)));
            bw.w.indent();
            self.env.enter(Some(&function.name));
            bw.body(&function.body, predeclared(&globals, function), ReturnMode::Plain);
            bw.w.dedent();
            bw.w.line("}");
            bw.w.blank();
        }

        // 入口：顶层语句 + 源程序自己的 main
        let mut stmts = program.top_level.clone();
        let mut visible: HashSet<String> = globals.iter().cloned().collect();
        self.env.enter(None);
        if let Some(main) = program.function("main") {
            stmts.extend(main.body.iter().cloned());
            visible = predeclared(&globals, main);
            self.env.enter(Some("main"));
        }
        visible.insert("args".to_string());
        bw.w.line("public static void main(String[] args) {");
        bw.w.indent();
        bw.body(&stmts, visible, ReturnMode::Void);
        bw.w.dedent();
        bw.w.line("}");

        bw.w.dedent();
        bw.w.line("}");
        bw.w.finish()
    }

    fn signature(&self, function: &Function) -> String {
        let ret = match self.env.return_of(&function.name) {
            Some(kind) => type_name(kind),
            None if returns_value(&function.body) => type_name(Kind::Unknown),
            None => "void",
        };
        let params = function
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = match self.env.param(&function.name, i) {
                    Kind::Unknown => self.env.var_in(Some(&function.name), name),
                    kind => kind,
                };
                format!("{} {}", type_name(kind), name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("public static {} {}({})", ret, function.name, params)
    }

    fn math_call(&self, name: &str, args: &[Expr]) -> String {
        match name {
            // Math.round 返回 long
            "round" => format!("(int) Math.round({})", self.args(args)),
            _ => format!("Math.{}({})", name, self.args(args)),
        }
    }
}

impl Syntax for JavaDialect {
    fn env(&self) -> &TypeEnv {
        &self.env
    }

    fn literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Number(n) => n.to_string(),
            Literal::String(s) => quote(s),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }

    fn float_operand(&self, text: String) -> String {
        format!("(double) {}", text)
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> String {
        match builtin_call(callee, args) {
            Some(Builtin::Print { args, newline }) => {
                let method = if newline { "println" } else { "print" };
                let joined = args.iter().map(|a| self.expr(a)).collect::<Vec<_>>().join(" + \" \" + ");
                format!("System.out.{}({})", method, joined)
            }
            Some(Builtin::Printf { format, args }) => {
                let mut rendered = vec![self.expr(format)];
                rendered.extend(args.iter().map(|a| self.expr(a)));
                format!("System.out.printf({})", rendered.join(", "))
            }
            Some(Builtin::Math { name, args }) => self.math_call(&name, args),
            Some(Builtin::Len(value)) => format!("{}.length()", self.postfix(value)),
            Some(Builtin::ToStr(value)) => format!("String.valueOf({})", self.expr(value)),
            Some(Builtin::ToInt(value)) if self.kind(value) == Kind::Str => {
                format!("Integer.parseInt({})", self.expr(value))
            }
            Some(Builtin::ToInt(value)) => format!("(int) ({})", self.expr(value)),
            Some(Builtin::ToFloat(value)) if self.kind(value) == Kind::Str => {
                format!("Double.parseDouble({})", self.expr(value))
            }
            Some(Builtin::ToFloat(value)) => format!("(double) ({})", self.expr(value)),
            None => format!("{}({})", self.postfix(callee), self.args(args)),
        }
    }

    fn member(&self, object: &Expr, member: &str) -> String {
        let whole = Expr::Member(Box::new(object.clone()), member.to_string());
        match math_name(&whole).as_deref() {
            Some("pi") => "Math.PI".to_string(),
            Some("e") => "Math.E".to_string(),
            _ if member == "length" && self.kind(object) == Kind::Str => {
                format!("{}.length()", self.postfix(object))
            }
            _ => format!("{}.{}", self.postfix(object), member),
        }
    }
}

impl BraceDialect for JavaDialect {
    fn declaration(&self, name: &str, kind: Kind, init: Option<&str>) -> String {
        match (kind, init) {
            // 局部变量类型推断要求有非 null 的初始值
            (Kind::Unknown, Some(init)) if init != "null" => format!("var {} = {}", name, init),
            (kind, Some(init)) => format!("{} {} = {}", type_name(kind), name, init),
            (kind, None) => format!("{} {}", type_name(kind), name),
        }
    }

    fn default_value(&self, kind: Kind) -> Option<&'static str> {
        Some(match kind {
            Kind::Int => "0",
            Kind::Float => "0.0",
            Kind::Bool => "false",
            Kind::Str => "\"\"",
            Kind::Unknown => "null",
        })
    }

    fn catch_clause(&self, param: Option<&str>) -> Option<String> {
        Some(format!("catch (Exception {})", param.unwrap_or("e")))
    }

    fn throw(&self, value: Option<&Expr>) -> String {
        let message = match value {
            None => return "throw new RuntimeException();".to_string(),
            Some(value) => match exception_message(value) {
                Some(None) => return "throw new RuntimeException();".to_string(),
                Some(Some(message)) => message,
                None => value,
            },
        };
        if self.kind(message) == Kind::Str {
            format!("throw new RuntimeException({});", self.expr(message))
        } else {
            format!("throw new RuntimeException(String.valueOf({}));", self.expr(message))
        }
    }

    fn label(&self, label: Label) -> String {
        self.comment(&format!("label {}", label))
    }

    fn goto(&self, label: Label) -> String {
        self.comment(&format!("goto {} (no goto in Java)", label))
    }
}
