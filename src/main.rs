// src/main.rs

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process;

use clap::{Parser, ValueEnum};
use crossc::compiler::{CompileOptions, CompileResult, CompilerContext};
use crossc::diagnostics;
use crossc::ir;
use crossc::reporter::CompilerError;
use log::info;

/// 在 C、Java、Python、JavaScript 之间翻译源程序
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 源文件路径，`-` 表示从标准输入读取
    input: String,

    /// 源语言（c、java、python/py、javascript/js）
    #[arg(long)]
    from: String,

    /// 目标语言
    #[arg(long)]
    to: String,

    /// 输出哪个阶段的产物
    #[arg(long, value_enum, default_value_t = Emit::Target)]
    emit: Emit,

    /// 跳过 IR 优化
    #[arg(long)]
    no_optimize: bool,

    /// 输出文件；不提供时写到标准输出
    #[arg(short, long)]
    output: Option<String>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Target,
    Tokens,
    Ast,
    Ir,
    Optimized,
    Symbols,
}

fn read_source(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(input)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("crossc", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let source = read_source(&cli.input).map_err(|e| format!("Failed to read '{}': {}", cli.input, e))?;
    let file_name = if cli.input == "-" { "<stdin>" } else { cli.input.as_str() };
    let color = io::stderr().is_terminal();

    let context = CompilerContext::new(CompileOptions {
        optimize: !cli.no_optimize,
    });

    let output = match context.compile(&source, &cli.from, &cli.to) {
        CompileResult::Success(output) => output,
        CompileResult::Failure(failure) => {
            eprint!("{}", diagnostics::render(file_name, &source, &failure.diagnostics, color));
            eprintln!("Translation failed: {}", failure.error);
            process::exit(1);
        }
    };

    // 被跳过的字符只提示，不影响结果
    if !output.warnings.is_empty() {
        let warnings: Vec<CompilerError> = output.warnings.iter().cloned().map(CompilerError::from).collect();
        eprint!("{}", diagnostics::render(file_name, &source, &warnings, color));
    }

    let text = match cli.emit {
        Emit::Target => output.target_code.clone(),
        Emit::Tokens => output.tokens.iter().map(|t| format!("{}\n", t)).collect(),
        Emit::Ast => output.ast.to_string(),
        Emit::Ir => ir::listing(&output.intermediate_code),
        Emit::Optimized => ir::listing(&output.optimized_code),
        Emit::Symbols => output.symbol_table.iter().map(|s| format!("{}\n", s)).collect(),
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, text)?;
            info!("wrote {}", path);
        }
        None => print!("{}", text),
    }
    Ok(())
}
