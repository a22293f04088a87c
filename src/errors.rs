//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_autograde_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum AutoGradeError {
            $($variant(String),)*
        }

        impl AutoGradeError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(AutoGradeError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(AutoGradeError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(AutoGradeError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl AutoGradeError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        AutoGradeError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_autograde_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    FileOperation("E004", "File Operation Error"),
    Validation("E005", "Validation Error"),
    NotFound("E006", "Resource Not Found"),
    Serialization("E007", "Serialization Error"),
    Configuration("E008", "Model Configuration Error"),
    Content("E009", "Prompt Content Error"),
    Generation("E010", "Rubric Generation Error"),
    ModelCall("E011", "Model Call Error"),
}

impl AutoGradeError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AutoGradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AutoGradeError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AutoGradeError {
    fn from(err: sea_orm::DbErr) -> Self {
        AutoGradeError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for AutoGradeError {
    fn from(err: std::io::Error) -> Self {
        AutoGradeError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AutoGradeError {
    fn from(err: serde_json::Error) -> Self {
        AutoGradeError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AutoGradeError {
    fn from(err: reqwest::Error) -> Self {
        AutoGradeError::ModelCall(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AutoGradeError>;
