use thiserror::Error;

use crate::clients::OracleError;
use crate::infrastructure::StoreError;
use crate::models::SubmissionId;

/// 应用程序错误类型
///
/// 所有错误都会在 `ProgressionController` 边界被转换成调用方可见的
/// `ProgressionState::Error`，不会自动重试。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验失败（题目过短、附件格式不支持等）
    #[error("输入校验失败: {0}")]
    Validation(String),

    /// 解题步骤生成失败
    #[error("解题步骤生成失败: {0}")]
    Generation(String),

    /// 最终校验失败（已下发的步骤仍然有效）
    #[error("答案校验失败: {0}")]
    Verification(String),

    /// 会话不存在或已过期
    #[error("会话已过期或不存在: {0}")]
    StaleSession(SubmissionId),

    /// 会话已经结束（complete / error 均为终态）
    #[error("会话已结束，不再接受推进请求: {0}")]
    SessionClosed(SubmissionId),

    /// 题目分析失败
    #[error("题目分析失败: {0}")]
    Analysis(String),

    /// 存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 文件操作错误
    #[error("文件错误 ({path}): {message}")]
    File { path: String, message: String },
}

/// 错误分类，随 `ProgressionState::Error` 一起返回给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Generation,
    Verification,
    StaleSession,
    SessionClosed,
    Analysis,
    Internal,
}

impl AppError {
    /// 错误分类
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::Validation(_) => FailureKind::Validation,
            AppError::Generation(_) => FailureKind::Generation,
            AppError::Verification(_) => FailureKind::Verification,
            AppError::StaleSession(_) => FailureKind::StaleSession,
            AppError::SessionClosed(_) => FailureKind::SessionClosed,
            AppError::Analysis(_) => FailureKind::Analysis,
            AppError::Store(_) | AppError::Config(_) | AppError::File { .. } => {
                FailureKind::Internal
            }
        }
    }

    /// 创建生成阶段的 oracle 错误
    pub fn generation_oracle(source: OracleError) -> Self {
        AppError::Generation(source.to_string())
    }

    /// 创建校验阶段的 oracle 错误
    pub fn verification_oracle(source: OracleError) -> Self {
        AppError::Verification(source.to_string())
    }

    /// 创建文件错误
    pub fn file(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::File {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let id = SubmissionId::from("abc");
        assert_eq!(
            AppError::StaleSession(id.clone()).kind(),
            FailureKind::StaleSession
        );
        assert_eq!(AppError::SessionClosed(id).kind(), FailureKind::SessionClosed);
        assert_eq!(
            AppError::Store(StoreError::Internal("poisoned".into())).kind(),
            FailureKind::Internal
        );
        assert_eq!(
            AppError::generation_oracle(OracleError::Malformed("no steps".into())).kind(),
            FailureKind::Generation
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = AppError::StaleSession(SubmissionId::from("s-1"));
        assert!(err.to_string().contains("s-1"));

        let err = AppError::file("questions.toml", "not found");
        assert_eq!(err.to_string(), "文件错误 (questions.toml): not found");
    }
}
