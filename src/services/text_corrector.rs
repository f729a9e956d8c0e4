//! 文本纠错服务 - 业务能力层
//!
//! 所有展示给用户的自然语言文本（步骤讲解、校验说明）都必须经过这里：
//! 无条件调用两遍纠错 oracle，只采用第二遍的结果。

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::{CorrectionOracle, OracleError};
use crate::services::oracle_guard::OracleGuard;
use crate::utils::logging::truncate_text;

/// 每段文本的纠错遍数
pub const CORRECTION_PASSES: usize = 2;

/// 两遍纠错
///
/// 单遍纠错不保证幂等，第二遍对第一遍的结果再做一次校验。
/// 某一遍判定文本已经正确时原样返回输入，所以对正确文本做两遍是 no-op。
pub struct TextCorrector {
    oracle: Arc<dyn CorrectionOracle>,
    guard: OracleGuard,
}

impl TextCorrector {
    pub fn new(oracle: Arc<dyn CorrectionOracle>, guard: OracleGuard) -> Self {
        Self { oracle, guard }
    }

    /// 对一段文本做两遍纠错
    pub async fn correct(&self, text: &str) -> Result<String, OracleError> {
        let mut current = text.to_string();
        for pass in 1..=CORRECTION_PASSES {
            current = self.single_pass(&current, pass).await?;
        }
        Ok(current)
    }

    /// 并发纠错多段文本，保持输入顺序
    pub async fn correct_all(&self, texts: &[String]) -> Result<Vec<String>, OracleError> {
        try_join_all(texts.iter().map(|text| self.correct(text))).await
    }

    async fn single_pass(&self, text: &str, pass: usize) -> Result<String, OracleError> {
        let oracle = &self.oracle;
        let response = self
            .guard
            .call("correct", move || oracle.correct(text))
            .await?;

        if response.is_correct {
            debug!("纠错第 {} 遍: 文本无误", pass);
            return Ok(text.to_string());
        }

        if response.corrected_text.trim().is_empty() {
            warn!(
                "纠错第 {} 遍返回空文本，保留原文: {}",
                pass,
                truncate_text(text, 40)
            );
            return Ok(text.to_string());
        }

        debug!(
            "纠错第 {} 遍: {} -> {}",
            pass,
            truncate_text(text, 40),
            truncate_text(&response.corrected_text, 40)
        );
        Ok(response.corrected_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CorrectionResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 把 "teh" 改成 "the"；文本里没有 "teh" 时判定为正确
    struct TypoOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CorrectionOracle for TypoOracle {
        async fn correct(&self, text: &str) -> Result<CorrectionResponse, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let is_correct = !text.contains("teh");
            Ok(CorrectionResponse {
                corrected_text: if is_correct {
                    // 判定正确时返回的内容不应被采用
                    format!("{} (rewritten)", text)
                } else {
                    text.replace("teh", "the")
                },
                is_correct,
            })
        }
    }

    fn corrector() -> (TextCorrector, Arc<TypoOracle>) {
        let oracle = Arc::new(TypoOracle {
            calls: AtomicUsize::new(0),
        });
        (
            TextCorrector::new(oracle.clone(), OracleGuard::default()),
            oracle,
        )
    }

    #[tokio::test]
    async fn test_always_two_passes() {
        let (corrector, oracle) = corrector();
        let corrected = corrector.correct("Subtract 5 from teh both sides").await.unwrap();
        assert_eq!(corrected, "Subtract 5 from the both sides");
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_correct_text_passes_through_unchanged() {
        let (corrector, oracle) = corrector();
        let text = "Divide both sides by 2";
        assert_eq!(corrector.correct(text).await.unwrap(), text);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_correct_all_keeps_order() {
        let (corrector, oracle) = corrector();
        let texts = vec!["teh first".to_string(), "second".to_string()];
        let corrected = corrector.correct_all(&texts).await.unwrap();
        assert_eq!(corrected, vec!["the first", "second"]);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 4);
    }

    struct EmptyOracle;

    #[async_trait]
    impl CorrectionOracle for EmptyOracle {
        async fn correct(&self, _text: &str) -> Result<CorrectionResponse, OracleError> {
            Ok(CorrectionResponse {
                corrected_text: "  ".into(),
                is_correct: false,
            })
        }
    }

    #[tokio::test]
    async fn test_empty_correction_keeps_original() {
        let corrector = TextCorrector::new(Arc::new(EmptyOracle), OracleGuard::default());
        assert_eq!(corrector.correct("x = 5").await.unwrap(), "x = 5");
    }
}
