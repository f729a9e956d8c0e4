//! # Stepwise Solver
//!
//! 逐步解题：提交一道题，按步骤逐个下发解答，最后一步之后校验整份解答
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 会话缓存（`SubmissionStore`）和按 ID 的锁（`KeyedLock`）
//! - `clients/` - oracle 接口定义以及基于 LLM 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只处理一件事
//! - `TextCorrector` - 两遍纠错
//! - `StepGenerator` - 生成解题步骤
//! - `Verifier` - 校验完整解答
//! - `QuestionAnalyzer` - 题目分析
//! - `OracleGuard` - 超时与重试
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - `ProgressionController`，按提交 ID 推进的状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理题目文件，管理并发
//! - `orchestrator/session_runner` - 把一道题从 submit 推进到终态
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, FailureKind};
pub use infrastructure::{InMemorySubmissionStore, SubmissionStore};
pub use models::{
    FilePayload, ProgressionState, SolutionSet, SolutionStep, SubmissionId, VerificationResult,
};
pub use orchestrator::{run_session, App, RunStats, SessionReport};
pub use workflow::{Oracles, ProgressionController};
