//! 基础设施层
//!
//! 持有共享的可变资源（缓存、按 ID 的锁），只暴露能力，不认识解题流程。

pub mod keyed_lock;
pub mod submission_store;

pub use keyed_lock::KeyedLock;
pub use submission_store::{InMemorySubmissionStore, StoreError, SubmissionStore};
