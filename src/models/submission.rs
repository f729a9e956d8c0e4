//! 提交记录相关的数据模型

use std::fmt::{self, Display};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 提交 ID
///
/// 不透明的唯一标识，在 submit 时生成，之后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    /// 生成新的随机 ID（UUID v4）
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 题目附件
///
/// 上游已经完成文件到数据的提取，这里只保存 mime 类型和 base64 编码后的内容。
/// 没有附件时使用 `Option::None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub mime_type: String,
    pub encoded_data: String,
}

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=\s]+)$")
        .expect("valid regex")
});

impl FilePayload {
    /// 创建附件，校验 mime 类型
    pub fn new(mime_type: impl Into<String>, encoded_data: impl Into<String>) -> AppResult<Self> {
        let mime_type = mime_type.into().to_ascii_lowercase();
        let encoded_data = encoded_data.into();

        if !Self::is_supported_mime(&mime_type) {
            return Err(AppError::Validation(format!(
                "不支持的附件类型: {}（仅支持图片或纯文本）",
                mime_type
            )));
        }
        if encoded_data.trim().is_empty() {
            return Err(AppError::Validation("附件内容为空".to_string()));
        }

        Ok(Self {
            mime_type,
            encoded_data,
        })
    }

    /// 从 `data:<mime>;base64,<data>` 格式解析
    pub fn from_data_uri(uri: &str) -> AppResult<Self> {
        let caps = DATA_URI
            .captures(uri.trim())
            .ok_or_else(|| AppError::Validation("附件不是合法的 base64 data URI".to_string()))?;

        Self::new(&caps[1], caps[2].split_whitespace().collect::<String>())
    }

    /// 还原为 data URI（图片会以这种形式发给 LLM）
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded_data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    fn is_supported_mime(mime_type: &str) -> bool {
        mime_type.starts_with("image/") || mime_type == "text/plain"
    }
}

/// 一次提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_payload: Option<FilePayload>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(id: SubmissionId, question: impl Into<String>, file_payload: Option<FilePayload>) -> Self {
        Self {
            id,
            question: question.into(),
            file_payload,
            created_at: Utc::now(),
        }
    }
}
