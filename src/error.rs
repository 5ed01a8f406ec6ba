//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use thiserror::Error;

use crate::models::validation::ValidationError;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数验证错误（携带具体字段）
    #[error("参数验证失败: {}", describe_violations(.0))]
    InvalidInput(Vec<ValidationError>),

    /// 资源不存在（含不属于当前用户的资源）
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 已初始化
    #[error("提醒已初始化: {0}")]
    AlreadyInitialized(String),

    /// 分类器错误
    #[error("分类器错误: {0}")]
    Classifier(String),

    /// 投递错误
    #[error("投递失败: {0}")]
    Delivery(String),

    /// 调度器状态错误
    #[error("调度器错误: {0}")]
    Scheduler(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl AppError {
    /// 单字段验证失败
    pub fn invalid(error: ValidationError) -> Self {
        AppError::InvalidInput(vec![error])
    }

    /// 验证失败的字段名
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            AppError::InvalidInput(errors) => errors.iter().map(|e| e.field()).collect(),
            _ => Vec::new(),
        }
    }
}

fn describe_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::invalid(e)
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_lists_fields() {
        let err = AppError::InvalidInput(vec![
            ValidationError::missing("title"),
            ValidationError::InvalidTime {
                field: "time".to_string(),
                value: "25:00".to_string(),
            },
        ]);

        assert_eq!(err.invalid_fields(), vec!["title", "time"]);
        let message = err.to_string();
        assert!(message.contains("title"));
        assert!(message.contains("25:00"));
    }

    #[test]
    fn test_non_validation_errors_have_no_fields() {
        assert!(AppError::NotFound("x".into()).invalid_fields().is_empty());
    }
}
