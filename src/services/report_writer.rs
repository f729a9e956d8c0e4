//! 结果写入服务 - 业务能力层
//!
//! 只负责把单个会话的结果追加到输出文件，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;
use tracing::debug;

use crate::models::{SolutionStep, VerificationResult};

/// 结果写入服务
///
/// 多个会话并发完成时按整段写入，避免内容交错
pub struct ReportWriter {
    output_file_path: String,
    write_lock: Mutex<()>,
}

impl ReportWriter {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            output_file_path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// 写入一道题的结果
    ///
    /// # 参数
    /// - `question_index`: 题目序号（从 1 开始）
    /// - `question`: 题目内容
    /// - `steps`: 已下发的步骤
    /// - `verification`: 校验结果（可选）
    /// - `error`: 错误信息（可选）
    pub fn write(
        &self,
        question_index: usize,
        question: &str,
        steps: &[SolutionStep],
        verification: Option<&VerificationResult>,
        error: Option<&str>,
    ) -> Result<()> {
        debug!(
            "写入结果: 题目 {} | 步骤数: {}",
            question_index,
            steps.len()
        );

        let text = render_report(question_index, question, steps, verification, error);

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| anyhow::anyhow!("写入锁异常: {}", e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_file_path)?;
        file.write_all(text.as_bytes())?;

        Ok(())
    }
}

fn render_report(
    question_index: usize,
    question: &str,
    steps: &[SolutionStep],
    verification: Option<&VerificationResult>,
    error: Option<&str>,
) -> String {
    let mut text = format!("题目 {} | {}\n", question_index, question);
    for step in steps {
        text.push_str(&format!(
            "  步骤 {}: {}\n    {}\n",
            step.step_number, step.explanation, step.formula
        ));
    }
    if let Some(verification) = verification {
        text.push_str(&format!(
            "  校验: {} | {}\n",
            if verification.is_correct { "正确" } else { "有误" },
            verification.verification_details
        ));
    }
    if let Some(error) = error {
        text.push_str(&format!("  错误: {}\n", error));
    }
    text.push('\n');
    text
}
