use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    /// 讲解、纠错、校验说明使用的语言
    pub output_language: String,
    // --- 输入校验 ---
    pub min_question_chars: usize,
    pub max_question_chars: usize,
    // --- oracle 调用 ---
    /// 单次 oracle 调用超时（秒）
    pub oracle_timeout_secs: u64,
    /// 网络错误 / 超时的最大重试次数
    pub oracle_max_retries: usize,
    pub oracle_retry_delay_ms: u64,
    // --- 会话缓存 ---
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
    // --- 批量运行 ---
    /// 同时处理的题目数量
    pub max_concurrent_sessions: usize,
    /// 题目 TOML 文件
    pub question_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 是否在解题前输出题目分析
    pub enable_analysis: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 2048,
            output_language: "简体中文".to_string(),
            min_question_chars: 3,
            max_question_chars: 4000,
            oracle_timeout_secs: 60,
            oracle_max_retries: 2,
            oracle_retry_delay_ms: 500,
            session_ttl_secs: 3600,
            max_sessions: 5000,
            max_concurrent_sessions: 4,
            question_file: "questions.toml".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            enable_analysis: false,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: env_or("LLM_TEMPERATURE", default.llm_temperature),
            llm_max_tokens: env_or("LLM_MAX_TOKENS", default.llm_max_tokens),
            output_language: std::env::var("OUTPUT_LANGUAGE").unwrap_or(default.output_language),
            min_question_chars: env_or("MIN_QUESTION_CHARS", default.min_question_chars),
            max_question_chars: env_or("MAX_QUESTION_CHARS", default.max_question_chars),
            oracle_timeout_secs: env_or("ORACLE_TIMEOUT_SECS", default.oracle_timeout_secs),
            oracle_max_retries: env_or("ORACLE_MAX_RETRIES", default.oracle_max_retries),
            oracle_retry_delay_ms: env_or("ORACLE_RETRY_DELAY_MS", default.oracle_retry_delay_ms),
            session_ttl_secs: env_or("SESSION_TTL_SECS", default.session_ttl_secs),
            max_sessions: env_or("MAX_SESSIONS", default.max_sessions),
            max_concurrent_sessions: env_or(
                "MAX_CONCURRENT_SESSIONS",
                default.max_concurrent_sessions,
            ),
            question_file: std::env::var("QUESTION_FILE").unwrap_or(default.question_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
            enable_analysis: env_or("ENABLE_ANALYSIS", default.enable_analysis),
        }
    }

    /// 检查相互矛盾的取值
    pub fn validate(&self) -> AppResult<()> {
        if self.min_question_chars == 0 {
            return Err(AppError::Config("MIN_QUESTION_CHARS 必须大于 0".into()));
        }
        if self.min_question_chars > self.max_question_chars {
            return Err(AppError::Config(format!(
                "MIN_QUESTION_CHARS ({}) 不能大于 MAX_QUESTION_CHARS ({})",
                self.min_question_chars, self.max_question_chars
            )));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(AppError::Config("ORACLE_TIMEOUT_SECS 必须大于 0".into()));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(AppError::Config("MAX_CONCURRENT_SESSIONS 必须大于 0".into()));
        }
        Ok(())
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn oracle_retry_delay(&self) -> Duration {
        Duration::from_millis(self.oracle_retry_delay_ms)
    }

    /// 0 表示不过期
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_question_chars, 3);
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_contradictory_limits_are_rejected() {
        let config = Config {
            min_question_chars: 10,
            max_question_chars: 5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = Config {
            oracle_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = Config {
            session_ttl_secs: 0,
            ..Config::default()
        };
        assert!(config.session_ttl().is_none());
    }
}
