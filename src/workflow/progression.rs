//! 逐步解题流程 - 流程层
//!
//! 核心职责：把生成、纠错、校验串成一个按提交 ID 划分的状态机
//!
//! 流程顺序：
//! 1. submit → 校验输入 → 生成步骤（单飞）→ 写缓存 → 返回第 1 步
//! 2. advance → 从缓存回放下一步
//! 3. 最后一步 → 校验完整解答（只执行一次）→ 写回校验结果 → complete
//!
//! 同一个 ID 上的 submit / advance 通过 `KeyedLock` 串行执行，
//! 保证游标单调递增、生成和校验各最多执行一次。

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{
    AnalysisOracle, CorrectionOracle, GenerationOracle, LlmOracle, VerificationOracle,
};
use crate::config::Config;
use crate::error::{AppError, AppResult, FailureKind};
use crate::infrastructure::{InMemorySubmissionStore, KeyedLock, StoreError, SubmissionStore};
use crate::models::{
    CacheEntry, FilePayload, Phase, ProgressionState, SolutionStep, Submission, SubmissionId,
    Transition, VerificationResult,
};
use crate::services::{OracleGuard, QuestionAnalyzer, StepGenerator, TextCorrector, Verifier};
use crate::utils::logging::truncate_text;

/// 流程依赖的全部外部 oracle
#[derive(Clone)]
pub struct Oracles {
    pub generation: Arc<dyn GenerationOracle>,
    pub correction: Arc<dyn CorrectionOracle>,
    pub verification: Arc<dyn VerificationOracle>,
    pub analysis: Arc<dyn AnalysisOracle>,
}

impl Oracles {
    /// 四类调用都使用同一个 LLM
    pub fn from_llm(config: &Config) -> Self {
        let llm = Arc::new(LlmOracle::new(config));
        Self {
            generation: llm.clone(),
            correction: llm.clone(),
            verification: llm.clone(),
            analysis: llm,
        }
    }
}

/// 逐步解题状态机
///
/// - 持有缓存（由外部注入）和按 ID 的锁
/// - 所有错误在这里被转换成 `ProgressionState::Error`，不自动重试
pub struct ProgressionController {
    store: Arc<dyn SubmissionStore>,
    locks: KeyedLock,
    generator: StepGenerator,
    verifier: Verifier,
    analyzer: QuestionAnalyzer,
    min_question_chars: usize,
    max_question_chars: usize,
}

impl ProgressionController {
    pub fn new(config: &Config, oracles: Oracles, store: Arc<dyn SubmissionStore>) -> Self {
        let guard = OracleGuard::from_config(config);
        let corrector = Arc::new(TextCorrector::new(oracles.correction, guard.clone()));

        Self {
            store,
            locks: KeyedLock::new(),
            generator: StepGenerator::new(oracles.generation, corrector.clone(), guard.clone()),
            verifier: Verifier::new(oracles.verification, corrector.clone(), guard.clone()),
            analyzer: QuestionAnalyzer::new(oracles.analysis, corrector, guard),
            min_question_chars: config.min_question_chars,
            max_question_chars: config.max_question_chars,
        }
    }

    /// 使用 LLM oracle 和进程内缓存
    pub fn with_llm(config: &Config) -> Self {
        let store = Arc::new(InMemorySubmissionStore::with_limits(
            config.max_sessions,
            config.session_ttl(),
        ));
        Self::new(config, Oracles::from_llm(config), store)
    }

    // ========== 对外操作 ==========

    /// 提交题目，返回第 1 个步骤
    pub async fn submit(
        &self,
        question: &str,
        file_payload: Option<FilePayload>,
    ) -> ProgressionState {
        self.submit_with_id(SubmissionId::new(), question, file_payload)
            .await
    }

    /// 使用调用方指定的 ID 提交
    ///
    /// 同一个 ID 的生成只执行一次；该 ID 已有缓存时直接回放第 1 个步骤
    pub async fn submit_with_id(
        &self,
        id: SubmissionId,
        question: &str,
        file_payload: Option<FilePayload>,
    ) -> ProgressionState {
        let result = self.try_submit(&id, question, file_payload).await;
        Self::settle(id, result)
    }

    /// 推进到下一步（服务端游标）
    pub async fn advance(&self, id: &SubmissionId) -> ProgressionState {
        let result = self.try_advance(id, None).await;
        Self::settle(id.clone(), result)
    }

    /// 带客户端游标的推进
    ///
    /// `last_seen` 落后于服务端游标时说明是重复请求，回放已下发的下一步而不改变状态
    pub async fn advance_from(&self, id: &SubmissionId, last_seen: usize) -> ProgressionState {
        let result = self.try_advance(id, Some(last_seen)).await;
        Self::settle(id.clone(), result)
    }

    /// 已经下发给调用方的步骤（终态会话同样可读）
    pub async fn delivered_steps(&self, id: &SubmissionId) -> AppResult<Vec<SolutionStep>> {
        let entry = self.load(id).await?;
        Ok(entry.delivered_steps().to_vec())
    }

    /// 已缓存的最终校验结果
    pub async fn verdict(&self, id: &SubmissionId) -> AppResult<Option<VerificationResult>> {
        let entry = self.load(id).await?;
        Ok(entry.verification)
    }

    /// 丢弃会话缓存
    pub async fn invalidate(&self, id: &SubmissionId) -> AppResult<bool> {
        let _guard = self.locks.acquire(id).await;
        Ok(self.store.invalidate(id).await?)
    }

    /// 题目分析（不创建会话）
    pub async fn analyze(&self, question: &str) -> AppResult<String> {
        let question = self.validate_question(question)?;
        self.analyzer.analyze(&question).await
    }

    // ========== 状态机 ==========

    async fn try_submit(
        &self,
        id: &SubmissionId,
        question: &str,
        file_payload: Option<FilePayload>,
    ) -> AppResult<ProgressionState> {
        let question = self.validate_question(question)?;

        let _guard = self.locks.acquire(id).await;

        if let Some(entry) = self.store.get(id).await? {
            if entry.question != question {
                warn!("[会话 {}] ⚠️ 重复提交的题目与缓存不一致，沿用缓存", id);
            }
            return match entry.phase {
                Phase::Stepping { .. } => {
                    info!("[会话 {}] ♻️ 已有缓存，回放第 1 步", id);
                    step_state(&entry, 0)
                }
                Phase::Complete => {
                    info!("[会话 {}] ♻️ 会话已完成，回放校验结果", id);
                    complete_state(&entry)
                }
                Phase::Failed { .. } => Err(AppError::SessionClosed(id.clone())),
            };
        }

        info!("[会话 {}] 📝 新题目: {}", id, truncate_text(&question, 80));

        let submission = Submission::new(id.clone(), question, file_payload);
        let solution_set = self.generator.generate(&submission).await?;

        let entry = CacheEntry::new(submission, solution_set);
        let state = step_state(&entry, 0)?;
        self.store.put(id, entry).await?;

        Ok(state)
    }

    async fn try_advance(
        &self,
        id: &SubmissionId,
        last_seen: Option<usize>,
    ) -> AppResult<ProgressionState> {
        let _guard = self.locks.acquire(id).await;

        let mut entry = self.load(id).await?;
        let total = entry.total_steps();

        if let Some(seen) = last_seen {
            let cursor = entry.cursor();
            if seen > cursor {
                return Err(AppError::Validation(format!(
                    "客户端步骤索引 {} 超出服务端进度 {}",
                    seen, cursor
                )));
            }
            if seen < cursor {
                info!("[会话 {}] ♻️ 重复请求，回放步骤 {}/{}", id, seen + 2, total);
                // 终态下的最后一步是和结果一起下发的，回放原来的结果
                if seen + 1 == cursor && entry.phase.is_terminal() {
                    return replay_terminal(&entry);
                }
                return step_state(&entry, seen + 1);
            }
        }

        match entry.phase.on_advance(total) {
            Transition::Reveal(index) => {
                entry.phase = Phase::Stepping { cursor: index };
                let state = step_state(&entry, index)?;
                self.store.put(id, entry).await?;
                info!("[会话 {}] ▶ 下发步骤 {}/{}", id, index + 1, total);
                Ok(state)
            }
            Transition::RevealAndVerify(index) => self.finish(id, entry, Some(index)).await,
            Transition::Verify => self.finish(id, entry, None).await,
            Transition::Closed => Err(AppError::SessionClosed(id.clone())),
        }
    }

    /// 最终校验，成功与否都会把终态写回缓存
    async fn finish(
        &self,
        id: &SubmissionId,
        mut entry: CacheEntry,
        final_index: Option<usize>,
    ) -> AppResult<ProgressionState> {
        let total = entry.total_steps();
        info!("[会话 {}] 🔍 全部 {} 个步骤已就绪，开始校验", id, total);

        let solution_text = entry.solution_set.joined_text();
        match self.verifier.verify(&entry.question, &solution_text).await {
            Ok(verification) => {
                entry.verification = Some(verification);
                entry.phase = Phase::Complete;
                let state = complete_state(&entry)?;
                self.store.put(id, entry).await?;
                Ok(state)
            }
            Err(e) => {
                // 最后一步已经生成并纠错，校验失败也算已下发
                let cursor = final_index.unwrap_or_else(|| entry.cursor());
                entry.phase = Phase::Failed {
                    cursor,
                    message: e.to_string(),
                };
                self.store.put(id, entry).await?;
                Err(e)
            }
        }
    }

    // ========== 辅助方法 ==========

    fn validate_question(&self, question: &str) -> AppResult<String> {
        let question = question.trim();
        let chars = question.chars().count();

        if chars < self.min_question_chars {
            return Err(AppError::Validation(format!(
                "题目至少需要 {} 个字符",
                self.min_question_chars
            )));
        }
        if chars > self.max_question_chars {
            return Err(AppError::Validation(format!(
                "题目不能超过 {} 个字符",
                self.max_question_chars
            )));
        }
        Ok(question.to_string())
    }

    async fn load(&self, id: &SubmissionId) -> AppResult<CacheEntry> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::StaleSession(id.clone()))
    }

    /// 把内部结果转换成调用方可见的状态
    fn settle(id: SubmissionId, result: AppResult<ProgressionState>) -> ProgressionState {
        match result {
            Ok(state) => {
                debug!("[会话 {}] 状态: {}", id, state.label());
                state
            }
            Err(e) => {
                error!("[会话 {}] ❌ {}", id, e);
                ProgressionState::from_error(Some(id), &e)
            }
        }
    }
}

fn step_state(entry: &CacheEntry, index: usize) -> AppResult<ProgressionState> {
    let step = entry.solution_set.get(index).cloned().ok_or_else(|| {
        AppError::Store(StoreError::Internal(format!(
            "会话 {} 缺少步骤 {}",
            entry.submission_id, index
        )))
    })?;

    Ok(ProgressionState::StepByStep {
        submission_id: entry.submission_id.clone(),
        index,
        total_steps: entry.total_steps(),
        step,
    })
}

/// 完成态：最后一步（多步题目）和缓存的校验结果
fn complete_state(entry: &CacheEntry) -> AppResult<ProgressionState> {
    let verification = entry.verification.clone().ok_or_else(|| {
        AppError::Store(StoreError::Internal(format!(
            "会话 {} 已完成但缺少校验结果",
            entry.submission_id
        )))
    })?;
    let total = entry.total_steps();
    let final_step = if total > 1 {
        entry.solution_set.get(total - 1).cloned()
    } else {
        None
    };

    Ok(ProgressionState::Complete {
        submission_id: entry.submission_id.clone(),
        total_steps: total,
        final_step,
        verification,
    })
}

/// 回放终态会话最后一次推进的结果
fn replay_terminal(entry: &CacheEntry) -> AppResult<ProgressionState> {
    match &entry.phase {
        Phase::Complete => complete_state(entry),
        Phase::Failed { message, .. } => Ok(ProgressionState::Error {
            submission_id: Some(entry.submission_id.clone()),
            kind: FailureKind::Verification,
            message: message.clone(),
        }),
        Phase::Stepping { cursor } => step_state(entry, *cursor),
    }
}
