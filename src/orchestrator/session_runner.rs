//! 单题处理器 - 编排层
//!
//! ## 职责
//!
//! 把一道题从 submit 推进到终态（complete / error），
//! 沿途记录每个步骤，最后输出这道题的结果。

use tracing::{error, info};

use crate::config::Config;
use crate::models::{
    ProgressionState, QuestionItem, SolutionStep, SubmissionId, VerificationResult,
};
use crate::utils::logging::truncate_text;
use crate::workflow::ProgressionController;

/// 单题处理结果
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub question_index: usize,
    pub question: String,
    pub submission_id: Option<SubmissionId>,
    pub analysis: Option<String>,
    pub steps: Vec<SolutionStep>,
    pub verification: Option<VerificationResult>,
    pub error: Option<String>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.verification.is_some()
    }
}

/// 处理单道题
///
/// # 参数
/// - `controller`: 状态机
/// - `item`: 题目
/// - `question_index`: 题目序号（用于日志，从 1 开始）
/// - `config`: 配置
pub async fn run_session(
    controller: &ProgressionController,
    item: &QuestionItem,
    question_index: usize,
    config: &Config,
) -> SessionReport {
    let mut report = SessionReport {
        question_index,
        question: item.question.clone(),
        ..Default::default()
    };

    log_question_start(question_index, &item.question);

    let file_payload = match item.file_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!("[题目 {}] ❌ 附件无效: {}", question_index, e);
            report.error = Some(e.to_string());
            return report;
        }
    };

    if config.enable_analysis {
        match controller.analyze(&item.question).await {
            Ok(analysis) => {
                info!("[题目 {}] 💡 解题思路: {}", question_index, analysis);
                report.analysis = Some(analysis);
            }
            Err(e) => error!("[题目 {}] 题目分析失败: {}", question_index, e),
        }
    }

    let mut state = controller.submit(&item.question, file_payload).await;

    loop {
        match state {
            ProgressionState::StepByStep {
                submission_id,
                index,
                total_steps,
                step,
            } => {
                log_step(question_index, index, total_steps, &step, config.verbose_logging);
                report.steps.push(step);
                state = controller.advance(&submission_id).await;
                report.submission_id = Some(submission_id);
            }
            ProgressionState::Complete {
                submission_id,
                total_steps,
                final_step,
                verification,
            } => {
                if let Some(step) = final_step {
                    log_step(
                        question_index,
                        total_steps - 1,
                        total_steps,
                        &step,
                        config.verbose_logging,
                    );
                    report.steps.push(step);
                }
                log_verdict(question_index, &verification);
                report.submission_id = Some(submission_id);
                report.verification = Some(verification);
                break;
            }
            ProgressionState::Error {
                submission_id,
                message,
                ..
            } => {
                error!("[题目 {}] ❌ {}", question_index, message);
                if report.submission_id.is_none() {
                    report.submission_id = submission_id;
                }
                report.error = Some(message);
                break;
            }
            ProgressionState::Initial => {
                report.error = Some("状态机没有启动".to_string());
                break;
            }
        }
    }

    report
}

// ========== 日志辅助函数 ==========

fn log_question_start(question_index: usize, question: &str) {
    info!("\n[题目 {}] {}", question_index, "─".repeat(30));
    info!(
        "[题目 {}] 题干: {}",
        question_index,
        truncate_text(question, 80)
    );
}

fn log_step(question_index: usize, index: usize, total: usize, step: &SolutionStep, verbose: bool) {
    info!(
        "[题目 {}] 步骤 {}/{}: {}",
        question_index,
        index + 1,
        total,
        truncate_text(&step.explanation, 80)
    );
    if verbose {
        info!("[题目 {}]   公式: {}", question_index, step.formula);
    }
}

fn log_verdict(question_index: usize, verification: &VerificationResult) {
    let label = if verification.is_correct {
        "✅ 解答正确"
    } else {
        "⚠️ 解答有误"
    };
    info!(
        "[题目 {}] {} - {}",
        question_index,
        label,
        truncate_text(&verification.verification_details, 120)
    );
}
