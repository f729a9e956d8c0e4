//! oracle 调用保护：超时 + 有限次重试
//!
//! 外部调用可能无限期挂起，所有 oracle 调用都经过这里。
//! 只重试网络错误和超时；返回内容无效的情况直接失败。

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::clients::OracleError;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct OracleGuard {
    timeout: Duration,
    max_retries: usize,
    retry_delay: Duration,
}

impl OracleGuard {
    pub fn new(timeout: Duration, max_retries: usize, retry_delay: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            retry_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.oracle_timeout(),
            config.oracle_max_retries,
            config.oracle_retry_delay(),
        )
    }

    /// 执行一次受保护的调用
    ///
    /// `call` 每次尝试都会被重新调用，生成新的 future
    pub async fn call<T, F, Fut>(&self, label: &str, call: F) -> Result<T, OracleError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let attempts = self.max_retries + 1;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout {
                    label: label.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        "{} 调用失败 (尝试 {}/{}): {}，{:?} 后重试...",
                        label, attempt, attempts, e, self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!("{} 调用失败，已重试 {} 次", label, attempt - 1);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for OracleGuard {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
