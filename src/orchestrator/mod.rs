//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量题目处理器
//! - 读取题目文件（Vec<QuestionItem>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `session_runner` - 单题处理器
//! - 从 submit 开始不断 advance，直到 complete / error
//! - 收集已下发的步骤和校验结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<QuestionItem>)
//!     ↓
//! session_runner (处理单道题)
//!     ↓
//! workflow::ProgressionController (状态机)
//!     ↓
//! services (能力层：生成 / 纠错 / 校验 / 分析)
//!     ↓
//! clients + infrastructure (oracle、缓存、锁)
//! ```

pub mod batch_processor;
pub mod session_runner;

pub use batch_processor::{App, RunStats};
pub use session_runner::{run_session, SessionReport};
