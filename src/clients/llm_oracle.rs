//! 基于 LLM 的 oracle 实现
//!
//! 生成 / 纠错 / 校验 / 分析四类调用都走同一个 `LlmClient`，
//! 要求模型按 JSON 返回，再解析成边界上的响应结构。

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::clients::llm_client::LlmClient;
use crate::clients::oracle::{
    AnalysisOracle, AnalysisResponse, CorrectionOracle, CorrectionResponse, GenerationOracle,
    GenerationRequest, GenerationResponse, OracleError, VerificationOracle, VerificationRequest,
    VerificationResponse,
};
use crate::config::Config;
use crate::models::FilePayload;

const GENERATION_SYSTEM: &str = "你是一名数学解题专家，擅长把解题过程拆成清晰的若干步骤。\
                                 每一步包含一段文字讲解和一个 LaTeX 公式。";

const CORRECTION_SYSTEM: &str = "你是一名语言专家，负责检查文本的语法和语义是否正确。";

const VERIFICATION_SYSTEM: &str = "你是一名严谨的数学解答审核专家，负责判断给定解答是否正确。";

const ANALYSIS_SYSTEM: &str = "你是一名数学分析专家，负责简要说明一道题应该如何求解。";

/// LLM oracle
pub struct LlmOracle {
    client: LlmClient,
    output_language: String,
}

impl LlmOracle {
    pub fn new(config: &Config) -> Self {
        Self {
            client: LlmClient::new(config),
            output_language: config.output_language.clone(),
        }
    }

    /// 发送请求并把响应解析为指定类型
    async fn ask_json<T: DeserializeOwned>(
        &self,
        user_message: &str,
        system_message: &str,
        imgs: Option<&[String]>,
    ) -> Result<T, OracleError> {
        let response = self
            .client
            .send(user_message, Some(system_message), imgs)
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        parse_json_response(&response)
    }

    fn build_generation_prompt(&self, request: &GenerationRequest) -> String {
        let attachment = match &request.file_payload {
            Some(payload) if payload.is_image() => "题目附带一张图片，请结合图片内容解题。".to_string(),
            Some(payload) => format!("题目附带的文本内容：\n{}", decode_text_payload(payload)),
            None => "无附件".to_string(),
        };

        format!(
            r#"请为下面的数学题给出分步解答。

题目：{}
附件：{}

【要求】
- 一般拆成 3 个步骤，必要时可以增减
- 每一步的 explanation 使用{}书写
- 每一步的 formula 是该步骤对应的 LaTeX 公式，不要包含 $ 符号
- 只返回 JSON，不要返回任何其他内容，格式如下：
{{"steps":[{{"stepNumber":1,"explanation":"...","formula":"..."}}]}}"#,
            request.question, attachment, self.output_language
        )
    }

    fn build_correction_prompt(&self, text: &str) -> String {
        format!(
            r#"请检查下面这段{}文本的语法和语义是否正确。

- 如果有错误，修正后放在 correctedText 字段中
- 如果原文已经正确，correctedText 原样返回原文
- isCorrect 表示原文是否正确
- 不要修改其中的数学公式和数字

待检查文本：{}

只返回 JSON：{{"correctedText":"...","isCorrect":true}}"#,
            self.output_language, text
        )
    }

    fn build_verification_prompt(&self, request: &VerificationRequest) -> String {
        format!(
            r#"请验证下面的解答是否正确。

题目：{}
解答：
{}

请逐步复核每个计算，在 verificationDetails 中用{}说明复核过程和发现的问题。
只返回 JSON：{{"isCorrect":true,"verificationDetails":"..."}}"#,
            request.question, request.solution_text, self.output_language
        )
    }

    fn build_analysis_prompt(&self, question: &str) -> String {
        format!(
            r#"请分析下面的题目，用{}简要说明解题思路（不需要给出完整解答）。

题目：{}

只返回 JSON：{{"explanation":"..."}}"#,
            self.output_language, question
        )
    }
}

#[async_trait]
impl GenerationOracle for LlmOracle {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, OracleError> {
        let prompt = self.build_generation_prompt(request);
        let imgs: Option<Vec<String>> = request
            .file_payload
            .as_ref()
            .filter(|payload| payload.is_image())
            .map(|payload| vec![payload.to_data_uri()]);

        debug!("请求生成解题步骤，模型: {}", self.client.model_name());
        self.ask_json(&prompt, GENERATION_SYSTEM, imgs.as_deref())
            .await
    }
}

#[async_trait]
impl CorrectionOracle for LlmOracle {
    async fn correct(&self, text: &str) -> Result<CorrectionResponse, OracleError> {
        let prompt = self.build_correction_prompt(text);
        self.ask_json(&prompt, CORRECTION_SYSTEM, None).await
    }
}

#[async_trait]
impl VerificationOracle for LlmOracle {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse, OracleError> {
        let prompt = self.build_verification_prompt(request);
        self.ask_json(&prompt, VERIFICATION_SYSTEM, None).await
    }
}

#[async_trait]
impl AnalysisOracle for LlmOracle {
    async fn analyze(&self, question: &str) -> Result<AnalysisResponse, OracleError> {
        let prompt = self.build_analysis_prompt(question);
        self.ask_json(&prompt, ANALYSIS_SYSTEM, None).await
    }
}

// ========== 辅助函数 ==========

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

/// 从模型响应中取出 JSON 部分
///
/// 模型经常把 JSON 包在 ```json ... ``` 里，或者在前后加说明文字
fn extract_json(response: &str) -> Result<String, OracleError> {
    if let Some(caps) = FENCED_JSON.captures(response) {
        return Ok(caps[1].trim().to_string());
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(response[start..=end].to_string()),
        _ => Err(OracleError::Malformed(format!(
            "响应中没有 JSON: {}",
            crate::utils::logging::truncate_text(response, 80)
        ))),
    }
}

fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T, OracleError> {
    let json = extract_json(response)?;
    serde_json::from_str(&json).map_err(|e| {
        warn!("无法解析 LLM 响应: {}", e);
        OracleError::Malformed(format!("JSON 解析失败: {}", e))
    })
}

/// 文本附件是 base64 编码的纯文本（上游 PDF 提取的结果）
fn decode_text_payload(payload: &FilePayload) -> String {
    match base64::engine::general_purpose::STANDARD.decode(payload.encoded_data.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("附件 base64 解码失败: {}", e);
            String::new()
        }
    }
}
