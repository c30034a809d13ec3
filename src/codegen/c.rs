// In src/codegen/c.rs

use std::cell::Cell;
use std::collections::HashSet;

use super::lift::{lift, Expr, Function, Program};
use super::types::{Kind, TypeEnv};
use super::{
    builtin_call, ends_with_return, globals, math_name, predeclared, quote, returns_value, BraceDialect, BraceWriter,
    Builtin, CodeGenerator, ReturnMode, Syntax,
};
use crate::ir::{Instruction, Label};
use crate::language::Language;
use crate::parser::ast::Literal;

/// C 生成器：文件级全局变量、函数原型、函数定义，最后是 `int main(void)`。
pub struct CGenerator;

impl CodeGenerator for CGenerator {
    fn target(&self) -> Language {
        Language::C
    }

    fn generate(&self, instructions: &[Instruction]) -> String {
        let program = lift(instructions);
        let dialect = CDialect {
            env: TypeEnv::infer(&program),
            math: Cell::new(false),
            stdlib: Cell::new(false),
            string: Cell::new(false),
        };
        let body = dialect.render(&program);

        // 头文件按实际用到的函数添加
        let mut out = String::from("#include <stdio.h>\n");
        if dialect.stdlib.get() {
            out.push_str("#include <stdlib.h>\n");
        }
        if dialect.string.get() {
            out.push_str("#include <string.h>\n");
        }
        if dialect.math.get() {
            out.push_str("#include <math.h>\n");
        }
        out.push('\n');
        out.push_str(&body);
        out
    }
}

struct CDialect {
    env: TypeEnv,
    math: Cell<bool>,
    stdlib: Cell<bool>,
    string: Cell<bool>,
}

fn type_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Int | Kind::Bool | Kind::Unknown => "int",
        Kind::Float => "double",
        Kind::Str => "char*",
    }
}

fn format_spec(kind: Kind) -> &'static str {
    match kind {
        Kind::Str => "%s",
        Kind::Float => "%g",
        Kind::Int | Kind::Bool | Kind::Unknown => "%d",
    }
}

impl CDialect {
    fn render(&self, program: &Program) -> String {
        let mut bw = BraceWriter::new(self);
        let globals = globals(program);

        // PASS 1: 全局变量
        for name in &globals {
            bw.w.line(format!("{};", self.declaration(name, self.env.var_in(None, name), None)));
        }
        bw.w.blank();

        // PASS 2: 函数原型，允许先调用后定义
        let functions: Vec<&Function> = program.functions.iter().filter(|f| f.name != "main").collect();
        for function in &functions {
            bw.w.line(format!("{};", self.signature(function)));
        }
        bw.w.blank();

        // PASS 3: 函数体
        for function in &functions {
            bw.w.line(format!("{} {{", self.signature(function)));
            bw.w.indent();
            self.env.enter(Some(&function.name));
            bw.body(&function.body, predeclared(&globals, function), ReturnMode::Plain);
            bw.w.dedent();
            bw.w.line("}");
            bw.w.blank();
        }

        // PASS 4: 入口。顶层语句放在源程序自己的 main 之前
        let mut stmts = program.top_level.clone();
        let mut visible: HashSet<String> = globals.iter().cloned().collect();
        self.env.enter(None);
        if let Some(main) = program.function("main") {
            stmts.extend(main.body.iter().cloned());
            visible = predeclared(&globals, main);
            self.env.enter(Some("main"));
        }
        bw.w.line("int main(void) {");
        bw.w.indent();
        bw.body(&stmts, visible, ReturnMode::Value("0"));
        if !ends_with_return(&stmts) {
            bw.w.line("return 0;");
        }
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
        let params = if function.params.is_empty() {
            "void".to_string()
        } else {
            function
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
                .join(", ")
        };
        format!("{} {}({})", ret, function.name, params)
    }

    fn math_call(&self, name: &str, args: &[Expr]) -> String {
        self.math.set(true);
        let function = match name {
            "abs" if args.iter().all(|a| self.kind(a) != Kind::Float) => {
                self.stdlib.set(true);
                "abs"
            }
            "abs" => "fabs",
            "max" => "fmax",
            "min" => "fmin",
            "random" => {
                self.stdlib.set(true);
                return "((double) rand() / RAND_MAX)".to_string();
            }
            other => return format!("{}({})", other, self.args(args)),
        };
        format!("{}({})", function, self.args(args))
    }
}

impl Syntax for CDialect {
    fn env(&self) -> &TypeEnv {
        &self.env
    }

    fn literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Number(n) => n.to_string(),
            Literal::String(s) => quote(s),
            Literal::Boolean(b) => (if *b { "1" } else { "0" }).to_string(),
            Literal::Null => "NULL".to_string(),
        }
    }

    fn float_operand(&self, text: String) -> String {
        format!("(double) {}", text)
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> String {
        match builtin_call(callee, args) {
            Some(Builtin::Print { args, newline }) => {
                let mut format: String = args
                    .iter()
                    .map(|a| format_spec(self.kind(a)))
                    .collect::<Vec<_>>()
                    .join(" ");
                if newline {
                    format.push('\n');
                }
                let mut rendered = vec![quote(&format)];
                rendered.extend(args.iter().map(|a| self.expr(a)));
                format!("printf({})", rendered.join(", "))
            }
            Some(Builtin::Printf { format, args }) => {
                let mut rendered = vec![self.expr(format)];
                rendered.extend(args.iter().map(|a| self.expr(a)));
                format!("printf({})", rendered.join(", "))
            }
            Some(Builtin::Math { name, args }) => self.math_call(&name, args),
            Some(Builtin::Len(value)) => {
                self.string.set(true);
                format!("strlen({})", self.expr(value))
            }
            Some(Builtin::ToStr(value)) => self.expr(value),
            Some(Builtin::ToInt(value)) if self.kind(value) == Kind::Str => {
                self.stdlib.set(true);
                format!("atoi({})", self.expr(value))
            }
            Some(Builtin::ToInt(value)) => format!("(int) ({})", self.expr(value)),
            Some(Builtin::ToFloat(value)) if self.kind(value) == Kind::Str => {
                self.stdlib.set(true);
                format!("atof({})", self.expr(value))
            }
            Some(Builtin::ToFloat(value)) => format!("(double) ({})", self.expr(value)),
            None => format!("{}({})", self.postfix(callee), self.args(args)),
        }
    }

    fn member(&self, object: &Expr, member: &str) -> String {
        let whole = Expr::Member(Box::new(object.clone()), member.to_string());
        match math_name(&whole).as_deref() {
            Some("pi") => {
                self.math.set(true);
                "M_PI".to_string()
            }
            Some("e") => {
                self.math.set(true);
                "M_E".to_string()
            }
            _ if member == "length" => {
                self.string.set(true);
                format!("strlen({})", self.expr(object))
            }
            _ => format!("{}.{}", self.postfix(object), member),
        }
    }
}

impl BraceDialect for CDialect {
    fn declaration(&self, name: &str, kind: Kind, init: Option<&str>) -> String {
        match init {
            Some(init) => format!("{} {} = {}", type_name(kind), name, init),
            None => format!("{} {}", type_name(kind), name),
        }
    }

    fn default_value(&self, kind: Kind) -> Option<&'static str> {
        Some(match kind {
            Kind::Float => "0.0",
            Kind::Str => "NULL",
            Kind::Int | Kind::Bool | Kind::Unknown => "0",
        })
    }

    fn catch_clause(&self, _param: Option<&str>) -> Option<String> {
        None
    }

    fn throw(&self, value: Option<&Expr>) -> String {
        self.stdlib.set(true);
        match value {
            Some(value) => format!("exit(1); {}", self.comment(&format!("throw {}", self.expr(value)))),
            None => "exit(1);".to_string(),
        }
    }

    fn label(&self, label: Label) -> String {
        format!("{}:;", label)
    }

    fn goto(&self, label: Label) -> String {
        format!("goto {};", label)
    }
}
