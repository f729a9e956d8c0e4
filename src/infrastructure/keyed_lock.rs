//! 按提交 ID 加锁
//!
//! 同一个 ID 上的 submit / advance 互斥，不同 ID 之间互不阻塞。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::SubmissionId;

/// 每个提交 ID 一把异步锁
#[derive(Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<SubmissionId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定 ID 的锁，guard 释放前同一 ID 的其他调用会等待
    pub async fn acquire(&self, id: &SubmissionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // 没有人持有也没有人等待的锁可以清掉
            locks.retain(|key, lock| key == id || Arc::strong_count(lock) > 1);
            locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}
