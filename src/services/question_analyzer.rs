//! 题目分析服务 - 业务能力层
//!
//! 给出题目的解题思路说明，说明文本同样经过两遍纠错

use std::sync::Arc;
use tracing::debug;

use crate::clients::AnalysisOracle;
use crate::error::{AppError, AppResult};
use crate::services::oracle_guard::OracleGuard;
use crate::services::text_corrector::TextCorrector;

pub struct QuestionAnalyzer {
    oracle: Arc<dyn AnalysisOracle>,
    corrector: Arc<TextCorrector>,
    guard: OracleGuard,
}

impl QuestionAnalyzer {
    pub fn new(
        oracle: Arc<dyn AnalysisOracle>,
        corrector: Arc<TextCorrector>,
        guard: OracleGuard,
    ) -> Self {
        Self {
            oracle,
            corrector,
            guard,
        }
    }

    pub async fn analyze(&self, question: &str) -> AppResult<String> {
        let oracle = &self.oracle;
        let response = self
            .guard
            .call("analyze", move || oracle.analyze(question))
            .await
            .map_err(|e| AppError::Analysis(e.to_string()))?;

        if response.explanation.trim().is_empty() {
            return Err(AppError::Analysis("分析结果为空".to_string()));
        }

        debug!("题目分析长度: {} 字符", response.explanation.len());

        self.corrector
            .correct(&response.explanation)
            .await
            .map_err(|e| AppError::Analysis(e.to_string()))
    }
}
