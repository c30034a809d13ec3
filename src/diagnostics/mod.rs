pub mod codes;

use ariadne::{Color, Config, IndexType, Label as AriadneLabel, Report, ReportKind, Source};

use crate::reporter::CompilerError;
use codes::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// 把一组编译错误渲染成带源码片段的报告文本。
///
/// 没有源码位置的错误（例如语言对不受支持）只输出一行 `[code] message`。
/// `color` 为 `false` 时输出纯文本，便于写入文件或在测试中比对。
pub fn render(file_name: &str, source: &str, errors: &[CompilerError], color: bool) -> String {
    let mut out = Vec::new();

    for error in errors {
        let code = error.code();
        let Some(span) = error.span() else {
            out.extend_from_slice(format!("[{}] {}\n", code.code, error).as_bytes());
            continue;
        };

        // 报告的范围不能越过源码末尾，空范围至少覆盖一个位置
        let start = span.start.min(source.len());
        let end = span.end.clamp(start, source.len());

        let report = Report::build(report_kind(code), (file_name, start..end))
            .with_config(
                Config::default()
                    .with_color(color)
                    .with_index_type(IndexType::Byte),
            )
            .with_code(code.code)
            .with_message(code.message)
            .with_label(
                AriadneLabel::new((file_name, start..end))
                    .with_message(error.to_string())
                    .with_color(level_color(code)),
            )
            .with_note(code.explanation)
            .finish();

        if report.write((file_name, Source::from(source)), &mut out).is_err() {
            out.extend_from_slice(format!("[{}] {}\n", code.code, error).as_bytes());
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn report_kind(code: &ErrorCode) -> ReportKind<'static> {
    match code.level {
        DiagnosticLevel::Error => ReportKind::Error,
        DiagnosticLevel::Warning => ReportKind::Warning,
    }
}

fn level_color(code: &ErrorCode) -> Color {
    match code.level {
        DiagnosticLevel::Error => Color::Red,
        DiagnosticLevel::Warning => Color::Yellow,
    }
}
