use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::AppError;
use crate::models::submission::FilePayload;

/// 待解答的题目文件
///
/// ```toml
/// [[questions]]
/// question = "Solve for x: 2x + 5 = 15"
///
/// [[questions]]
/// question = "图中三角形的面积是多少？"
/// attachment = "data:image/png;base64,iVBORw0KGgo..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionFile {
    #[serde(default)]
    pub questions: Vec<QuestionItem>,
}

/// 单个题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionItem {
    pub question: String,
    /// base64 data URI，可选
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl QuestionItem {
    /// 解析附件；没有附件时返回 None
    pub fn file_payload(&self) -> crate::error::AppResult<Option<FilePayload>> {
        self.attachment
            .as_deref()
            .map(FilePayload::from_data_uri)
            .transpose()
    }
}

/// 解析题目文件内容
pub fn parse_question_file(content: &str) -> Result<QuestionFile> {
    let file: QuestionFile = toml::from_str(content).context("无法解析题目文件")?;
    Ok(file)
}

/// 从磁盘加载题目文件
pub async fn load_question_file(path: &Path) -> Result<QuestionFile> {
    if !path.exists() {
        return Err(AppError::file(path.display().to_string(), "题目文件不存在").into());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取题目文件: {}", path.display()))?;

    let file = parse_question_file(&content)
        .with_context(|| format!("无法解析题目文件: {}", path.display()))?;

    tracing::info!(
        "成功加载 {} 道题目: {}",
        file.questions.len(),
        path.display()
    );

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_file() {
        let content = r#"
[[questions]]
question = "Solve for x: 2x + 5 = 15"

[[questions]]
question = "What is the area?"
attachment = "data:image/png;base64,iVBORw0KGgo="
"#;
        let file = parse_question_file(content).unwrap();
        assert_eq!(file.questions.len(), 2);
        assert!(file.questions[0].file_payload().unwrap().is_none());

        let payload = file.questions[1].file_payload().unwrap().unwrap();
        assert_eq!(payload.mime_type, "image/png");
    }

    #[test]
    fn test_empty_file_has_no_questions() {
        let file = parse_question_file("").unwrap();
        assert!(file.questions.is_empty());
    }

    #[test]
    fn test_bad_attachment_is_reported() {
        let item = QuestionItem {
            question: "q".into(),
            attachment: Some("data:application/zip;base64,UEsDBA==".into()),
        };
        assert!(item.file_payload().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let result = load_question_file(Path::new("does/not/exist.toml")).await;
        assert!(result.is_err());
    }
}
