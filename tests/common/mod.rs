#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stepwise_solver::clients::{
    AnalysisOracle, AnalysisResponse, CorrectionOracle, CorrectionResponse, GenerationOracle,
    GenerationRequest, GenerationResponse, OracleError, RawStep, VerificationOracle,
    VerificationRequest, VerificationResponse,
};
use stepwise_solver::infrastructure::{InMemorySubmissionStore, StoreError, SubmissionStore};
use stepwise_solver::models::{CacheEntry, SubmissionId};
use stepwise_solver::{Config, Oracles, ProgressionController};

/// 生成 oracle：返回固定步骤，可选延迟
pub struct ScriptedGeneration {
    pub steps: Vec<RawStep>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedGeneration {
    pub fn with_steps(n: usize) -> Self {
        let steps = (1..=n)
            .map(|i| RawStep {
                step_number: i as u32,
                explanation: format!("step {} explanation", i),
                formula: format!("formula_{}", i),
            })
            .collect();
        Self {
            steps,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(n: usize, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::with_steps(n)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationOracle for ScriptedGeneration {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(GenerationResponse {
            steps: self.steps.clone(),
        })
    }
}

/// 纠错 oracle：原样返回并计数
#[derive(Default)]
pub struct CountingCorrection {
    pub calls: AtomicUsize,
}

impl CountingCorrection {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CorrectionOracle for CountingCorrection {
    async fn correct(&self, text: &str) -> Result<CorrectionResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CorrectionResponse {
            corrected_text: text.to_string(),
            is_correct: true,
        })
    }
}

/// 校验 oracle：返回固定结果并计数
pub struct ScriptedVerification {
    pub outcome: Result<VerificationResponse, OracleError>,
    pub calls: AtomicUsize,
}

impl ScriptedVerification {
    pub fn correct() -> Self {
        Self {
            outcome: Ok(VerificationResponse {
                is_correct: true,
                verification_details: "x = 5 satisfies 2x + 5 = 15".to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err(OracleError::Malformed("verifier unavailable".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationOracle for ScriptedVerification {
    async fn verify(
        &self,
        _request: &VerificationRequest,
    ) -> Result<VerificationResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

pub struct FixedAnalysis;

#[async_trait]
impl AnalysisOracle for FixedAnalysis {
    async fn analyze(&self, question: &str) -> Result<AnalysisResponse, OracleError> {
        Ok(AnalysisResponse {
            explanation: format!("先移项再化简: {}", question),
        })
    }
}

/// 统计写入次数的缓存
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemorySubmissionStore,
    pub puts: AtomicUsize,
}

impl CountingStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionStore for CountingStore {
    async fn get(&self, id: &SubmissionId) -> Result<Option<CacheEntry>, StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, id: &SubmissionId, entry: CacheEntry) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(id, entry).await
    }

    async fn invalidate(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        self.inner.invalidate(id).await
    }
}

/// 测试夹具：状态机和它用到的全部替身
pub struct Harness {
    pub controller: Arc<ProgressionController>,
    pub generation: Arc<ScriptedGeneration>,
    pub correction: Arc<CountingCorrection>,
    pub verification: Arc<ScriptedVerification>,
    pub store: Arc<CountingStore>,
}

pub fn test_config() -> Config {
    Config {
        oracle_timeout_secs: 5,
        oracle_max_retries: 0,
        oracle_retry_delay_ms: 0,
        ..Config::default()
    }
}

pub fn harness(generation: ScriptedGeneration, verification: ScriptedVerification) -> Harness {
    harness_with_config(&test_config(), generation, verification)
}

pub fn harness_with_config(
    config: &Config,
    generation: ScriptedGeneration,
    verification: ScriptedVerification,
) -> Harness {
    let generation = Arc::new(generation);
    let correction = Arc::new(CountingCorrection::default());
    let verification = Arc::new(verification);
    let store = Arc::new(CountingStore::default());

    let oracles = Oracles {
        generation: generation.clone(),
        correction: correction.clone(),
        verification: verification.clone(),
        analysis: Arc::new(FixedAnalysis),
    };
    let controller = Arc::new(ProgressionController::new(config, oracles, store.clone()));

    Harness {
        controller,
        generation,
        correction,
        verification,
        store,
    }
}
