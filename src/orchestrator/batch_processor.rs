//! 批量题目处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责批量题目的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、初始化结果文件、创建状态机
//! 2. **批量加载**：读取题目 TOML 文件
//! 3. **并发控制**：使用 Semaphore 限制同时进行的会话数量
//! 4. **全局统计**：汇总所有题目的处理结果

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_question_file, QuestionItem};
use crate::orchestrator::session_runner::{self, SessionReport};
use crate::services::ReportWriter;
use crate::utils::logging;
use crate::workflow::ProgressionController;

/// 应用主结构
pub struct App {
    config: Config,
    controller: Arc<ProgressionController>,
    writer: Arc<ReportWriter>,
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl App {
    /// 初始化应用（使用 LLM oracle）
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        if config.llm_api_key.trim().is_empty() {
            anyhow::bail!("未配置 LLM_API_KEY");
        }

        let controller = Arc::new(ProgressionController::with_llm(&config));
        Self::with_controller(config, controller)
    }

    /// 使用已有的状态机初始化
    pub fn with_controller(config: Config, controller: Arc<ProgressionController>) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_concurrent_sessions, &config.llm_model_name);

        let writer = Arc::new(ReportWriter::with_path(config.output_log_file.clone()));
        Ok(Self {
            config,
            controller,
            writer,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        info!("\n📁 正在读取题目文件: {}", self.config.question_file);
        let question_file = load_question_file(Path::new(&self.config.question_file)).await?;

        if question_file.questions.is_empty() {
            warn!("⚠️ 题目文件中没有题目，程序结束");
            return Ok(RunStats::default());
        }

        logging::log_questions_loaded(
            question_file.questions.len(),
            self.config.max_concurrent_sessions,
        );

        let stats = self.process_all(question_file.questions).await?;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 并发处理所有题目
    pub async fn process_all(&self, questions: Vec<QuestionItem>) -> Result<RunStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sessions));
        let mut handles = Vec::new();

        for (idx, item) in questions.into_iter().enumerate() {
            let question_index = idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let controller = self.controller.clone();
            let writer = self.writer.clone();
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let report =
                    session_runner::run_session(&controller, &item, question_index, &config)
                        .await;
                if let Err(e) = write_report(&writer, &report) {
                    error!("[题目 {}] 结果写入失败: {}", question_index, e);
                }
                report
            });
            handles.push((question_index, handle));
        }

        let mut stats = RunStats {
            total: handles.len(),
            ..Default::default()
        };

        for (question_index, handle) in handles {
            match handle.await {
                Ok(report) if report.is_success() => stats.success += 1,
                Ok(_) => stats.failed += 1,
                Err(e) => {
                    error!("[题目 {}] 任务执行失败: {}", question_index, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

fn write_report(writer: &ReportWriter, report: &SessionReport) -> Result<()> {
    writer.write(
        report.question_index,
        &report.question,
        &report.steps,
        report.verification.as_ref(),
        report.error.as_deref(),
    )
}

fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n解题日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}
