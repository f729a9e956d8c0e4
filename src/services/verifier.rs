//! 最终校验服务 - 业务能力层
//!
//! 把题目和拼接后的完整解答交给校验 oracle（调用一次），
//! 校验说明再经过两遍纠错。

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{OracleError, VerificationOracle, VerificationRequest};
use crate::error::{AppError, AppResult};
use crate::models::VerificationResult;
use crate::services::oracle_guard::OracleGuard;
use crate::services::text_corrector::TextCorrector;

pub struct Verifier {
    oracle: Arc<dyn VerificationOracle>,
    corrector: Arc<TextCorrector>,
    guard: OracleGuard,
}

impl Verifier {
    pub fn new(
        oracle: Arc<dyn VerificationOracle>,
        corrector: Arc<TextCorrector>,
        guard: OracleGuard,
    ) -> Self {
        Self {
            oracle,
            corrector,
            guard,
        }
    }

    /// 校验完整解答
    pub async fn verify(&self, question: &str, solution_text: &str) -> AppResult<VerificationResult> {
        let request = VerificationRequest {
            question: question.to_string(),
            solution_text: solution_text.to_string(),
        };

        let oracle = &self.oracle;
        let request_ref = &request;
        let response = self
            .guard
            .call("verify", move || oracle.verify(request_ref))
            .await
            .map_err(AppError::verification_oracle)?;

        if response.verification_details.trim().is_empty() {
            warn!("校验 oracle 没有返回校验说明");
            return Err(AppError::verification_oracle(OracleError::Malformed(
                "校验说明为空".to_string(),
            )));
        }

        let details = self
            .corrector
            .correct(&response.verification_details)
            .await
            .map_err(AppError::verification_oracle)?;

        info!(
            "校验完成: {}",
            if response.is_correct { "✅ 正确" } else { "❌ 有误" }
        );

        Ok(VerificationResult {
            is_correct: response.is_correct,
            verification_details: details,
        })
    }
}
