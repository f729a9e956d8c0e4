//! 解题步骤生成服务 - 业务能力层
//!
//! 调用一次生成 oracle，得到有序的步骤列表，
//! 再把每个步骤的讲解交给 `TextCorrector` 做两遍纠错。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{GenerationOracle, GenerationRequest, RawStep};
use crate::error::{AppError, AppResult};
use crate::models::{SolutionSet, SolutionStep, Submission};
use crate::services::oracle_guard::OracleGuard;
use crate::services::text_corrector::TextCorrector;

pub struct StepGenerator {
    oracle: Arc<dyn GenerationOracle>,
    corrector: Arc<TextCorrector>,
    guard: OracleGuard,
}

impl StepGenerator {
    pub fn new(
        oracle: Arc<dyn GenerationOracle>,
        corrector: Arc<TextCorrector>,
        guard: OracleGuard,
    ) -> Self {
        Self {
            oracle,
            corrector,
            guard,
        }
    }

    /// 生成解题步骤
    ///
    /// oracle 没有返回可用步骤时返回 `AppError::Generation`
    pub async fn generate(&self, submission: &Submission) -> AppResult<SolutionSet> {
        let request = GenerationRequest {
            question: submission.question.clone(),
            file_payload: submission.file_payload.clone(),
        };

        let oracle = &self.oracle;
        let request_ref = &request;
        let response = self
            .guard
            .call("generate", move || oracle.generate(request_ref))
            .await
            .map_err(AppError::generation_oracle)?;

        let raw_steps = usable_steps(response.steps);
        if raw_steps.is_empty() {
            warn!("[会话 {}] ⚠️ oracle 没有返回可用的解题步骤", submission.id);
            return Err(AppError::Generation(
                "没有得到可用的解题步骤，请换个问法重新提交".to_string(),
            ));
        }

        debug!(
            "[会话 {}] 得到 {} 个原始步骤，开始纠错",
            submission.id,
            raw_steps.len()
        );

        let explanations: Vec<String> = raw_steps
            .iter()
            .map(|step| step.explanation.clone())
            .collect();
        let corrected = self
            .corrector
            .correct_all(&explanations)
            .await
            .map_err(AppError::generation_oracle)?;

        let steps = raw_steps
            .into_iter()
            .zip(corrected)
            .map(|(raw, explanation)| SolutionStep {
                step_number: raw.step_number,
                explanation,
                formula: raw.formula.trim().to_string(),
            })
            .collect();

        let solution_set = SolutionSet::new(steps);
        info!(
            "[会话 {}] ✓ 生成 {} 个解题步骤",
            submission.id,
            solution_set.len()
        );
        Ok(solution_set)
    }
}

/// 去掉空步骤；oracle 给出的编号都有效时按编号排序，否则保持原顺序
fn usable_steps(steps: Vec<RawStep>) -> Vec<RawStep> {
    let mut steps: Vec<RawStep> = steps
        .into_iter()
        .filter(|step| !step.explanation.trim().is_empty() || !step.formula.trim().is_empty())
        .collect();

    if steps.iter().all(|step| step.step_number > 0) {
        steps.sort_by_key(|step| step.step_number);
    }
    steps
}
