//! 会话状态：缓存条目、推进阶段与返回给调用方的状态

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FailureKind};
use crate::models::solution::{SolutionSet, SolutionStep, VerificationResult};
use crate::models::submission::{FilePayload, Submission, SubmissionId};

/// 服务端记录的推进阶段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// 已下发到 `cursor`（含）
    Stepping { cursor: usize },
    /// 全部步骤已下发且校验完成
    Complete,
    /// 校验失败，`cursor` 之前（含）的步骤仍然有效
    Failed { cursor: usize, message: String },
}

/// 一次 advance 应该做什么
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 下发第 n 个步骤
    Reveal(usize),
    /// 下发最后一个步骤并执行最终校验
    RevealAndVerify(usize),
    /// 所有步骤都已下发，只执行最终校验
    Verify,
    /// 终态，拒绝推进
    Closed,
}

impl Phase {
    /// 状态转移表
    ///
    /// | 当前阶段              | 条件                  | 转移                    |
    /// |-----------------------|-----------------------|-------------------------|
    /// | `Stepping{cursor}`    | `cursor + 2 <  total` | `Reveal(cursor+1)`      |
    /// | `Stepping{cursor}`    | `cursor + 2 == total` | `RevealAndVerify(last)` |
    /// | `Stepping{cursor}`    | `cursor + 1 >= total` | `Verify`                |
    /// | `Complete`/`Failed`   | -                     | `Closed`                |
    pub fn on_advance(&self, total: usize) -> Transition {
        match self {
            Phase::Complete | Phase::Failed { .. } => Transition::Closed,
            Phase::Stepping { cursor } => {
                let next = cursor + 1;
                if next + 1 < total {
                    Transition::Reveal(next)
                } else if next + 1 == total {
                    Transition::RevealAndVerify(next)
                } else {
                    Transition::Verify
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Stepping { .. })
    }
}

/// 缓存条目
///
/// 生成成功后写入一次；之后只有游标推进和最终校验结果会修改它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub submission_id: SubmissionId,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_payload: Option<FilePayload>,
    pub solution_set: SolutionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// 生成成功后的新条目，第一个步骤视为已下发
    pub fn new(submission: Submission, solution_set: SolutionSet) -> Self {
        Self {
            submission_id: submission.id,
            question: submission.question,
            file_payload: submission.file_payload,
            solution_set,
            verification: None,
            phase: Phase::Stepping { cursor: 0 },
            created_at: submission.created_at,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.solution_set.len()
    }

    /// 最后一个已下发步骤的索引
    pub fn cursor(&self) -> usize {
        match &self.phase {
            Phase::Stepping { cursor } | Phase::Failed { cursor, .. } => *cursor,
            Phase::Complete => self.total_steps().saturating_sub(1),
        }
    }

    /// 已下发给调用方的全部步骤
    pub fn delivered_steps(&self) -> &[SolutionStep] {
        let steps = self.solution_set.steps();
        let end = (self.cursor() + 1).min(steps.len());
        &steps[..end]
    }
}

/// 返回给调用方的状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProgressionState {
    /// 尚未提交
    #[default]
    Initial,
    /// 逐步展示中
    StepByStep {
        submission_id: SubmissionId,
        index: usize,
        total_steps: usize,
        step: SolutionStep,
    },
    /// 全部完成
    Complete {
        submission_id: SubmissionId,
        total_steps: usize,
        /// 本次推进一并下发的最后一个步骤（单步题目时为 None）
        final_step: Option<SolutionStep>,
        verification: VerificationResult,
    },
    /// 出错（终态）
    Error {
        submission_id: Option<SubmissionId>,
        kind: FailureKind,
        message: String,
    },
}

impl ProgressionState {
    pub fn from_error(submission_id: Option<SubmissionId>, err: &AppError) -> Self {
        ProgressionState::Error {
            submission_id,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn submission_id(&self) -> Option<&SubmissionId> {
        match self {
            ProgressionState::Initial => None,
            ProgressionState::StepByStep { submission_id, .. }
            | ProgressionState::Complete { submission_id, .. } => Some(submission_id),
            ProgressionState::Error { submission_id, .. } => submission_id.as_ref(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProgressionState::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// 状态名（用于日志）
    pub fn label(&self) -> &'static str {
        match self {
            ProgressionState::Initial => "initial",
            ProgressionState::StepByStep { .. } => "step_by_step",
            ProgressionState::Complete { .. } => "complete",
            ProgressionState::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_steps(n: usize) -> CacheEntry {
        let steps = (0..n)
            .map(|i| SolutionStep {
                step_number: i as u32 + 1,
                explanation: format!("step {}", i + 1),
                formula: format!("x_{}", i + 1),
            })
            .collect();
        let submission = Submission::new(SubmissionId::from("s"), "question", None);
        CacheEntry::new(submission, SolutionSet::new(steps))
    }

    #[test]
    fn test_transition_table_three_steps() {
        assert_eq!(Phase::Stepping { cursor: 0 }.on_advance(3), Transition::Reveal(1));
        assert_eq!(
            Phase::Stepping { cursor: 1 }.on_advance(3),
            Transition::RevealAndVerify(2)
        );
        assert_eq!(Phase::Stepping { cursor: 2 }.on_advance(3), Transition::Verify);
        assert_eq!(Phase::Complete.on_advance(3), Transition::Closed);
        assert_eq!(
            Phase::Failed {
                cursor: 1,
                message: "x".into()
            }
            .on_advance(3),
            Transition::Closed
        );
    }

    #[test]
    fn test_transition_table_small_sets() {
        assert_eq!(Phase::Stepping { cursor: 0 }.on_advance(1), Transition::Verify);
        assert_eq!(
            Phase::Stepping { cursor: 0 }.on_advance(2),
            Transition::RevealAndVerify(1)
        );
    }

    #[test]
    fn test_delivered_steps_follow_phase() {
        let mut entry = entry_with_steps(3);
        assert_eq!(entry.delivered_steps().len(), 1);

        entry.phase = Phase::Stepping { cursor: 1 };
        assert_eq!(entry.delivered_steps().len(), 2);

        entry.phase = Phase::Failed {
            cursor: 1,
            message: "boom".into(),
        };
        assert_eq!(entry.delivered_steps().len(), 2);
        assert!(entry.phase.is_terminal());

        entry.phase = Phase::Complete;
        assert_eq!(entry.delivered_steps().len(), 3);
    }

    #[test]
    fn test_error_state_carries_kind_and_message() {
        let err = AppError::Validation("题目太短".into());
        let state = ProgressionState::from_error(None, &err);
        assert_eq!(state.failure_kind(), Some(FailureKind::Validation));
        assert_eq!(state.label(), "error");
        assert!(state.submission_id().is_none());
    }
}
