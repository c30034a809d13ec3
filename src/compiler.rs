// In src/compiler.rs

//! 编译器门面：校验语言对，按顺序驱动各个阶段，统一打包结果和错误。
//! 各阶段之间互不调用，只有这里负责串联。

use log::debug;

use crate::analyzer::symbols::Symbol;
use crate::analyzer::Analyzer;
use crate::codegen;
use crate::ir::{self, Instruction};
use crate::language::Language;
use crate::lexer::{self, Token};
use crate::optimizer;
use crate::parser::{self, ast::Ast};
use crate::reporter::{CompilerError, ConversionError, LexerWarning};

/// 每次调用的选项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// 关闭时 `optimized_code` 与 `intermediate_code` 相同
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// 成功编译的全部产物。
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub target_code: String,
    pub tokens: Vec<Token>,
    pub ast: Ast,
    pub intermediate_code: Vec<Instruction>,
    pub optimized_code: Vec<Instruction>,
    pub symbol_table: Vec<Symbol>,
    /// 被跳过的无法识别字符；不会导致失败
    pub warnings: Vec<LexerWarning>,
}

#[derive(Debug, Clone)]
pub struct CompileFailure {
    /// 给调用方直接展示的错误文本
    pub error: String,
    /// 结构化的错误，供 CLI 渲染带源码位置的诊断
    pub diagnostics: Vec<CompilerError>,
}

/// 一次 `compile` 调用的结果：要么完整成功，要么失败且不带任何目标代码。
#[derive(Debug, Clone)]
pub enum CompileResult {
    Success(Box<CompileOutput>),
    Failure(CompileFailure),
}

impl CompileResult {
    pub fn success(&self) -> bool {
        matches!(self, CompileResult::Success(_))
    }

    pub fn target_code(&self) -> Option<&str> {
        match self {
            CompileResult::Success(output) => Some(&output.target_code),
            CompileResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CompileResult::Success(_) => None,
            CompileResult::Failure(failure) => Some(&failure.error),
        }
    }

    fn fail(diagnostics: Vec<CompilerError>) -> Self {
        let error = diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        CompileResult::Failure(CompileFailure { error, diagnostics })
    }
}

/// 编译器上下文。构造之后只读，可以在线程之间共享引用。
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerContext {
    pub options: CompileOptions,
}

impl CompilerContext {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// `from` 能翻译成的目标语言；未知语言返回空列表。
    pub fn supported_targets(&self, from: &str) -> &'static [Language] {
        from.parse::<Language>().map(Language::supported_targets).unwrap_or(&[])
    }

    /// 在运行任何阶段之前校验语言对。
    fn resolve(&self, from: &str, to: &str) -> Result<(Language, Language), ConversionError> {
        let parse = |name: &str| {
            name.parse::<Language>()
                .map_err(|_| ConversionError::UnknownLanguage { name: name.to_string() })
        };
        let (source, target) = (parse(from)?, parse(to)?);
        if !source.supports(target) {
            return Err(ConversionError::Unsupported {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok((source, target))
    }

    pub fn compile(&self, source: &str, from: &str, to: &str) -> CompileResult {
        let (dialect, target) = match self.resolve(from, to) {
            Ok(pair) => pair,
            Err(e) => return CompileResult::fail(vec![e.into()]),
        };
        debug!("compiling {} bytes of {} into {}", source.len(), dialect, target);

        // 1. 词法分析：异常字符只记录为警告
        let (tokens, warnings) = lexer::tokenize(source);

        // 2. 语法分析：语法错误立即终止
        let ast = match parser::parse(&tokens, dialect) {
            Ok(ast) => ast,
            Err(e) => return CompileResult::fail(vec![e.into()]),
        };

        // 3. 语义分析：错误收集成列表，非空则终止
        let analysis = Analyzer::new(dialect).analyze(&ast);
        if !analysis.is_ok() {
            return CompileResult::fail(analysis.errors.into_iter().map(CompilerError::from).collect());
        }

        // 4. IR 生成与优化
        let intermediate_code = ir::generate(&ast, &analysis);
        let optimized_code = if self.options.optimize {
            optimizer::optimize(&intermediate_code)
        } else {
            intermediate_code.clone()
        };
        debug!(
            "optimizer: {} -> {} instructions",
            intermediate_code.len(),
            optimized_code.len()
        );

        // 5. 目标代码
        let target_code = codegen::generate(&optimized_code, target);

        CompileResult::Success(Box::new(CompileOutput {
            target_code,
            tokens,
            ast,
            intermediate_code,
            optimized_code,
            symbol_table: analysis.symbols,
            warnings,
        }))
    }
}

/// 使用默认上下文编译。
pub fn compile(source: &str, from: &str, to: &str) -> CompileResult {
    CompilerContext::default().compile(source, from, to)
}
