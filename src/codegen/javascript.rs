// In src/codegen/javascript.rs

use super::lift::{lift, Expr, Program};
use super::types::{Kind, TypeEnv};
use super::{
    builtin_call, exception_message, globals, math_name, predeclared, quote, strip_newline, BraceDialect, BraceWriter,
    Builtin, CodeGenerator, ReturnMode, Syntax,
};
use crate::ir::{Instruction, Label};
use crate::language::Language;
use crate::parser::ast::{BinaryOp, Literal};

/// JavaScript 生成器：函数声明在前，顶层语句在模块级执行，最后调用 `main()`（如果有）。
pub struct JavaScriptGenerator;

impl CodeGenerator for JavaScriptGenerator {
    fn target(&self) -> Language {
        Language::JavaScript
    }

    fn generate(&self, instructions: &[Instruction]) -> String {
        let program = lift(instructions);
        let dialect = JsDialect {
            env: TypeEnv::infer(&program),
        };
        dialect.render(&program)
    }
}

struct JsDialect {
    env: TypeEnv,
}

impl JsDialect {
    fn render(&self, program: &Program) -> String {
        let mut bw = BraceWriter::new(self);
        let globals = globals(program);

        for function in &program.functions {
            bw.w.line(format!("function {}({}) {{", function.name, function.params.join(", ")));
            bw.w.indent();
            self.env.enter(Some(&function.name));
            bw.body(&function.body, predeclared(&globals, function), ReturnMode::Plain);
            bw.w.dedent();
            bw.w.line("}");
            bw.w.blank();
        }

        self.env.enter(None);
        bw.body(&program.top_level, Default::default(), ReturnMode::Plain);

        if program.function("main").is_some() {
            bw.w.blank();
            bw.w.line("main();");
        }
        bw.w.finish()
    }
}

impl Syntax for JsDialect {
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

    fn truncation(&self) -> Option<&'static str> {
        Some("Math.trunc")
    }

    // 严格相等原样保留
    fn binary_op(&self, op: BinaryOp, _left: &Expr, _right: &Expr) -> &'static str {
        op.symbol()
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> String {
        match builtin_call(callee, args) {
            Some(Builtin::Print { args, newline: true }) => format!("console.log({})", self.args(args)),
            Some(Builtin::Print { args, newline: false }) => match args {
                [] => "process.stdout.write(\"\")".to_string(),
                [single] => format!("process.stdout.write(String({}))", self.expr(single)),
                many => format!("process.stdout.write([{}].join(\" \"))", self.args(many)),
            },
            Some(Builtin::Printf { format, args }) => {
                let mut rendered = Vec::with_capacity(args.len() + 1);
                match strip_newline(format) {
                    Some(stripped) => {
                        rendered.push(self.expr(&stripped));
                        rendered.extend(args.iter().map(|a| self.expr(a)));
                        format!("console.log({})", rendered.join(", "))
                    }
                    None => {
                        rendered.push(self.expr(format));
                        rendered.extend(args.iter().map(|a| self.expr(a)));
                        format!("process.stdout.write(require(\"util\").format({}))", rendered.join(", "))
                    }
                }
            }
            Some(Builtin::Math { name, args }) => format!("Math.{}({})", name, self.args(args)),
            Some(Builtin::Len(value)) => format!("{}.length", self.postfix(value)),
            Some(Builtin::ToStr(value)) => format!("String({})", self.expr(value)),
            Some(Builtin::ToInt(value)) if self.kind(value) == Kind::Str => format!("parseInt({})", self.expr(value)),
            Some(Builtin::ToInt(value)) => format!("Math.trunc({})", self.expr(value)),
            Some(Builtin::ToFloat(value)) if self.kind(value) == Kind::Str => {
                format!("parseFloat({})", self.expr(value))
            }
            Some(Builtin::ToFloat(value)) => format!("Number({})", self.expr(value)),
            None => format!("{}({})", self.postfix(callee), self.args(args)),
        }
    }

    fn member(&self, object: &Expr, member: &str) -> String {
        let whole = Expr::Member(Box::new(object.clone()), member.to_string());
        match math_name(&whole).as_deref() {
            Some("pi") => "Math.PI".to_string(),
            Some("e") => "Math.E".to_string(),
            _ => format!("{}.{}", self.postfix(object), member),
        }
    }
}

impl BraceDialect for JsDialect {
    fn declaration(&self, name: &str, _kind: Kind, init: Option<&str>) -> String {
        match init {
            Some(init) => format!("let {} = {}", name, init),
            None => format!("let {}", name),
        }
    }

    fn default_value(&self, _kind: Kind) -> Option<&'static str> {
        None
    }

    fn catch_clause(&self, param: Option<&str>) -> Option<String> {
        Some(format!("catch ({})", param.unwrap_or("e")))
    }

    fn throw(&self, value: Option<&Expr>) -> String {
        let Some(value) = value else {
            return "throw new Error();".to_string();
        };
        match exception_message(value) {
            Some(Some(message)) => format!("throw new Error({});", self.expr(message)),
            Some(None) => "throw new Error();".to_string(),
            None if self.kind(value) == Kind::Str => format!("throw new Error({});", self.expr(value)),
            None => format!("throw {};", self.expr(value)),
        }
    }

    fn label(&self, label: Label) -> String {
        self.comment(&format!("label {}", label))
    }

    fn goto(&self, label: Label) -> String {
        self.comment(&format!("goto {} (no goto in JavaScript)", label))
    }
}
