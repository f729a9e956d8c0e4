//! 外部 oracle 接口
//!
//! 生成、纠错、校验、分析四类调用都是不透明的外部服务，
//! 这里只定义边界上的请求/响应结构和 trait。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FilePayload;

/// oracle 调用错误
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// 网络 / API 调用失败，可以重试
    #[error("oracle 调用失败: {0}")]
    Transport(String),

    /// 超时，可以重试
    #[error("oracle 调用超时 ({label}, {secs} 秒)")]
    Timeout { label: String, secs: u64 },

    /// 返回内容无法使用，不重试
    #[error("oracle 返回内容无效: {0}")]
    Malformed(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Transport(_) | OracleError::Timeout { .. })
    }
}

/// 生成请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_payload: Option<FilePayload>,
}

/// oracle 返回的原始步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    #[serde(default)]
    pub step_number: u32,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub formula: String,
}

/// 生成响应，`steps` 为空表示没有可用结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// 纠错响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResponse {
    pub corrected_text: String,
    pub is_correct: bool,
}

/// 校验请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub question: String,
    pub solution_text: String,
}

/// 校验响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub is_correct: bool,
    #[serde(default)]
    pub verification_details: String,
}

/// 分析响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub explanation: String,
}

#[async_trait]
pub trait GenerationOracle: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError>;
}

#[async_trait]
pub trait CorrectionOracle: Send + Sync {
    async fn correct(&self, text: &str) -> Result<CorrectionResponse, OracleError>;
}

#[async_trait]
pub trait VerificationOracle: Send + Sync {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse, OracleError>;
}

#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    async fn analyze(&self, question: &str) -> Result<AnalysisResponse, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_response_tolerates_missing_fields() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"steps":[{"explanation":"Subtract 5"}]}"#).unwrap();
        assert_eq!(response.steps.len(), 1);
        assert_eq!(response.steps[0].formula, "");

        let empty: GenerationResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.steps.is_empty());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(OracleError::Transport("reset".into()).is_retryable());
        assert!(OracleError::Timeout {
            label: "generate".into(),
            secs: 1
        }
        .is_retryable());
        assert!(!OracleError::Malformed("bad json".into()).is_retryable());
    }
}
