//! 源/目标语言的枚举以及静态的转换支持矩阵。

use strum::{Display, EnumString, IntoStaticStr};

/// 编译器能够读入和输出的四种语言。
///
/// 通过 `strum` 从字符串解析，大小写不敏感：`"C"`、`"py"`、`"JS"` 都可以。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum Language {
    #[strum(to_string = "c", serialize = "c-like")]
    C,
    #[strum(to_string = "java", serialize = "java-like")]
    Java,
    #[strum(to_string = "python", serialize = "py", serialize = "python-like")]
    Python,
    #[strum(to_string = "javascript", serialize = "js", serialize = "js-like")]
    JavaScript,
}

impl Language {
    /// 该语言能被翻译成的目标语言，顺序固定。
    pub fn supported_targets(self) -> &'static [Language] {
        use Language::*;
        match self {
            JavaScript => &[Python, Java, C],
            Python => &[JavaScript, Java, C],
            Java => &[Python, JavaScript, C],
            C => &[Java, Python, JavaScript],
        }
    }

    pub fn supports(self, target: Language) -> bool {
        self.supported_targets().contains(&target)
    }

    /// 块结构由花括号而不是缩进决定。
    pub fn uses_braces(self) -> bool {
        !matches!(self, Language::Python)
    }

    /// 变量必须先声明后使用（C/Java）。
    pub fn requires_declarations(self) -> bool {
        matches!(self, Language::C | Language::Java)
    }
}
